use thiserror::Error;

use super::model::Container;

#[derive(Debug, Error)]
pub enum ParseError {
    /// No unescaped `,` or space terminates a measurement name
    #[error("could not find a measurement name")]
    MalformedLine,

    #[error("invalid timestamp '{value}': expected integer nanoseconds since epoch")]
    InvalidTimestamp { value: String },

    #[error("malformed structured data: {0}")]
    MalformedStructuredData(String),

    #[error("failed to parse any RFC5424 structured data groups")]
    NoRecordsParsed,

    #[error("Non-UTF8 content")]
    NonUtf8,

    #[error("Input too large: {0} bytes (max: {1} bytes)")]
    InputTooLarge(usize, usize),

    #[error("Invalid parser configuration: {0}")]
    InvalidConfig(String),

    /// Some lines failed; the container still holds every line that parsed.
    #[error(
        "one or more line protocol parse failures: returning {} successful parses and skipping {} errors: {}",
        .container.len(),
        .failures.len(),
        describe_failures(.failures)
    )]
    PartialFailure {
        container: Container,
        failures: Vec<LineFailure>,
    },
}

impl ParseError {
    /// Recover the partial container carried by `PartialFailure`.
    pub fn into_partial(self) -> Option<(Container, Vec<LineFailure>)> {
        match self {
            ParseError::PartialFailure { container, failures } => Some((container, failures)),
            _ => None,
        }
    }
}

/// `line <index>: <cause>` for each failure, joined with `; `.
fn describe_failures(failures: &[LineFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("line {}: {}", f.index, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single input line that could not be parsed.
#[derive(Debug, Error)]
#[error("failed to parse line {index} '{line}': {error}")]
pub struct LineFailure {
    /// Zero-based index of the physical line in the input
    pub index: usize,
    pub line: String,
    #[source]
    pub error: ParseError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_failure_message_counts() {
        let err = ParseError::PartialFailure {
            container: Container::default(),
            failures: vec![LineFailure {
                index: 3,
                line: "bad".into(),
                error: ParseError::MalformedLine,
            }],
        };
        let msg = err.to_string();
        assert!(msg.contains("0 successful"), "{}", msg);
        assert!(msg.contains("1 errors"), "{}", msg);
        assert!(msg.contains("line 3: could not find a measurement name"), "{}", msg);
    }

    #[test]
    fn test_partial_failure_message_lists_every_line() {
        let err = ParseError::PartialFailure {
            container: Container::default(),
            failures: vec![
                LineFailure {
                    index: 0,
                    line: "bad".into(),
                    error: ParseError::MalformedLine,
                },
                LineFailure {
                    index: 2,
                    line: "cpu v=1 x".into(),
                    error: ParseError::InvalidTimestamp { value: "x".into() },
                },
            ],
        };
        let msg = err.to_string();
        assert!(
            msg.ends_with("line 0: could not find a measurement name; line 2: invalid timestamp 'x': expected integer nanoseconds since epoch"),
            "{}",
            msg
        );
    }

    #[test]
    fn test_into_partial_only_for_partial_failure() {
        assert!(ParseError::NoRecordsParsed.into_partial().is_none());

        let err = ParseError::PartialFailure {
            container: Container::default(),
            failures: Vec::new(),
        };
        let (container, failures) = err.into_partial().unwrap();
        assert!(container.is_empty());
        assert!(failures.is_empty());
    }

    #[test]
    fn test_line_failure_display_includes_cause() {
        let failure = LineFailure {
            index: 7,
            line: "cpu value=1 abc".into(),
            error: ParseError::InvalidTimestamp { value: "abc".into() },
        };
        let msg = failure.to_string();
        assert!(msg.contains("line 7"));
        assert!(msg.contains("invalid timestamp 'abc'"));
    }
}
