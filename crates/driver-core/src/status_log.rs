use chrono::{SecondsFormat, Utc};
use std::path::Path;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only sink for the status lines a supervisor records on each poll.
/// Without a path every write is a no-op.
pub struct StatusLog {
    file: Option<File>,
}

impl StatusLog {
    pub async fn open(path: Option<&Path>) -> Result<Self, std::io::Error> {
        let file = match path {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .await?,
            ),
            None => None,
        };
        Ok(Self { file })
    }

    pub async fn record(&mut self, remote_id: &str, status: &str) -> Result<(), std::io::Error> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };
        let line = format_line(remote_id, status);
        file.write_all(line.as_bytes()).await?;
        file.flush().await
    }

    pub async fn close(mut self) -> Result<(), std::io::Error> {
        match self.file.take() {
            Some(mut file) => file.shutdown().await,
            None => Ok(()),
        }
    }
}

fn format_line(remote_id: &str, status: &str) -> String {
    format!(
        "[{}] - client is remotely monitoring task: {} with status {}\n",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        remote_id,
        status
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_appends_status_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("task.stdout");

        let mut log = StatusLog::open(Some(&path)).await.unwrap();
        log.record("arn-1", "PENDING").await.unwrap();
        log.record("arn-1", "RUNNING").await.unwrap();
        log.close().await.unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("client is remotely monitoring task: arn-1 with status PENDING"));
        assert!(lines[1].ends_with("with status RUNNING"));
    }

    #[tokio::test]
    async fn test_without_path_is_noop() {
        let mut log = StatusLog::open(None).await.unwrap();
        log.record("arn-1", "RUNNING").await.unwrap();
        log.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("task.stdout");
        assert!(StatusLog::open(Some(&path)).await.is_err());
    }
}
