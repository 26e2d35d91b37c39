/// Telemetry record parsing
///
/// Converts raw wire-format bytes into an ordered `Container` of metrics.
///
/// # Architecture
///
/// - `scanner.rs`: escape- and quote-aware tokenizer shared by all formats
/// - `coerce.rs`: typed field values from raw tokens
/// - `formats/`: line protocol and RFC 5424 structured data parsers
/// - `traits.rs`: the `RecordParser` seam used by the runtime
/// - `metrics.rs`: parse counters
///
/// Every parse call is a pure function over its input: parsers hold no state
/// besides their immutable configuration and can be shared across threads.

pub mod traits;
pub mod model;
pub mod error;
pub mod scanner;
pub mod coerce;
pub mod metrics;
pub mod formats;

use std::sync::Arc;
use tracing::debug;

// Re-export commonly used types
pub use traits::RecordParser;
pub use model::{Container, InputFormat, Metric, Value};
pub use error::{LineFailure, ParseError};
pub use formats::{LineProtocolParser, StructuredDataOptions, StructuredDataParser};

// Constants
pub const DEFAULT_MAX_INPUT_SIZE: usize = 16 * 1_048_576; // 16MB

/// Build the parser for `format`. Options are validated here, once, so the
/// returned parser is ready for any number of concurrent parse calls.
pub fn build_parser(
    format: InputFormat,
    options: StructuredDataOptions,
) -> Result<Arc<dyn RecordParser>, ParseError> {
    let parser: Arc<dyn RecordParser> = match format {
        InputFormat::LineProtocol => Arc::new(LineProtocolParser),
        InputFormat::StructuredData => Arc::new(options.build()?),
    };
    debug!(format = %format, "Built record parser");
    Ok(parser)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parser_for_each_format() {
        for format in [InputFormat::LineProtocol, InputFormat::StructuredData] {
            let parser = build_parser(format, StructuredDataOptions::default()).unwrap();
            assert_eq!(parser.format(), format);
        }
    }

    #[test]
    fn test_build_parser_rejects_bad_options() {
        let options = StructuredDataOptions::new().sd_id_field(" ");
        assert!(matches!(
            build_parser(InputFormat::StructuredData, options.clone()),
            Err(ParseError::InvalidConfig(_))
        ));
        // line protocol has nothing to validate
        assert!(build_parser(InputFormat::LineProtocol, options).is_ok());
    }

    #[test]
    fn test_parser_shared_across_threads() {
        let parser = build_parser(InputFormat::LineProtocol, StructuredDataOptions::default()).unwrap();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let parser = Arc::clone(&parser);
                std::thread::spawn(move || {
                    let input = format!("cpu,worker={} v={}i 1", i, i);
                    parser.parse(input.as_bytes()).unwrap()
                })
            })
            .collect();

        for (i, handle) in handles.into_iter().enumerate() {
            let container = handle.join().unwrap();
            assert_eq!(container.metrics[0].data.get("v"), Some(&Value::Integer(i as i64)));
        }
    }
}
