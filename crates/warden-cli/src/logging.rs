//! Tracing subscriber setup

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use warden_core::{LogFormat, LoggingConfig};

/// Install the global subscriber
///
/// `RUST_LOG` wins over `--log-level`, which wins over the config file.
pub fn init(
    config: &LoggingConfig,
    level_override: Option<&str>,
    format_override: Option<&str>,
) -> anyhow::Result<()> {
    let mut effective = config.clone();
    if level_override.is_some() || format_override.is_some() {
        let format = match format_override {
            Some(raw) => raw
                .parse::<LogFormat>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("invalid --log-format")?,
            None => config.format,
        };
        effective.merge(LoggingConfig {
            level: level_override.unwrap_or_default().to_string(),
            format,
        });
    }

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&effective.level))
        .with_context(|| format!("invalid log level '{}'", effective.level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match effective.format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}
