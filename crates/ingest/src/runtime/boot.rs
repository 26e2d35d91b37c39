//! Boot — logging init, config load, CLI inputs, parser construction.

use std::sync::Arc;
use tracing::{info, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::conf::IngestConfig;
use crate::parser::{build_parser, RecordParser};

/// Initialise the tracing / logging subsystem.
///
/// Logs go to stderr; stdout carries the parsed metrics.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Load config, let positional CLI arguments replace the configured inputs,
/// validate, and build the parser for the configured format.
pub fn boot<I>(args: I) -> Result<(IngestConfig, Arc<dyn RecordParser>), Box<dyn std::error::Error>>
where
    I: IntoIterator<Item = String>,
{
    info!("Starting ingest v{}", env!("CARGO_PKG_VERSION"));

    let mut config = IngestConfig::load()?;
    apply_args(&mut config, args);

    info!(
        "Loaded configuration: format={}, workers={}, max_input_bytes={}",
        config.format, config.workers, config.max_input_bytes
    );

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let parser = build_parser(config.format, config.structured_data_options()).map_err(|e| {
        error!("Failed to build parser: {}", e);
        e
    })?;

    Ok((config, parser))
}

fn apply_args<I>(config: &mut IngestConfig, args: I)
where
    I: IntoIterator<Item = String>,
{
    let inputs: Vec<String> = args.into_iter().collect();
    if !inputs.is_empty() {
        config.inputs = inputs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_replace_configured_inputs() {
        let mut config = IngestConfig {
            inputs: vec!["from-config.lp".to_string()],
            ..Default::default()
        };
        apply_args(&mut config, vec!["a.lp".to_string(), "-".to_string()]);
        assert_eq!(config.inputs, vec!["a.lp".to_string(), "-".to_string()]);
    }

    #[test]
    fn test_no_args_keep_configured_inputs() {
        let mut config = IngestConfig {
            inputs: vec!["from-config.lp".to_string()],
            ..Default::default()
        };
        apply_args(&mut config, Vec::new());
        assert_eq!(config.inputs, vec!["from-config.lp".to_string()]);
    }
}
