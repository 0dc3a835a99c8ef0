use tokio_util::sync::CancellationToken;

/// A flag that can only move from unset to set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StickyFlag(bool);

impl StickyFlag {
    pub fn new() -> Self {
        Self(false)
    }

    pub fn set(&mut self) {
        self.0 = true;
    }

    pub fn is_set(&self) -> bool {
        self.0
    }
}

/// Fires once; every waiter, whether it started waiting before or after the
/// latch fired, observes it.
#[derive(Debug, Clone, Default)]
pub struct CompletionLatch {
    token: CancellationToken,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    pub(crate) fn fire(&self) {
        self.token.cancel();
    }

    pub fn is_fired(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait(&self) {
        self.token.cancelled().await
    }
}
