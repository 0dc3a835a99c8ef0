use driver_core::DriverConfig;

const SAMPLE_CONFIG: &str = r#"# ECS driver configuration

# Tasks are only launched while enabled.
enabled: true
cluster: default
region: us-east-1

# Seconds between remote status polls for each task.
poll_interval_secs: 5

# Seconds between health reports.
fingerprint_period_secs: 30

# aws CLI used to reach ECS.
aws_path: aws
"#;

pub async fn run(path: bool, init: bool) -> anyhow::Result<()> {
    if path {
        println!("{}", DriverConfig::default_path().display());
        return Ok(());
    }

    if init {
        let config_path = DriverConfig::default_path();
        if config_path.exists() {
            println!("Config already exists at: {}", config_path.display());
            println!("Remove it first if you want to reinitialize.");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, SAMPLE_CONFIG)?;
        println!("Sample config written to: {}", config_path.display());
        return Ok(());
    }

    let config_path = DriverConfig::default_path();
    println!("Config path: {}", config_path.display());
    if config_path.exists() {
        let config = DriverConfig::load_from(&config_path)?;
        println!("Enabled:     {}", config.enabled);
        println!("Cluster:     {}", config.cluster);
        println!("Region:      {}", config.region.as_deref().unwrap_or("(aws default)"));
        println!("Poll:        {}s", config.poll_interval_secs);
    } else {
        println!("Status:      not found");
        println!("Run `ecs-driver config --init` to create one.");
    }

    Ok(())
}
