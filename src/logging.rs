use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout carries the IPC protocol and must stay clean.
pub fn init_logging(filter: &str) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_new(filter)
        .map_err(|e| anyhow!("invalid log filter {:?}: {}", filter, e))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))
}
