use std::borrow::Cow;
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::parser::coerce::{coerce, parse_int_literal};
use crate::parser::scanner::{ScanPolicy, Scanner};
use crate::parser::traits::*;

/// Metadata key holding the measurement name.
pub const MEASUREMENT_KEY: &str = "measurement";

/// One parsed line of InfluxDB line protocol, before projection into a metric.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    /// Measurement name, escape markers retained
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
}

impl LineRecord {
    /// Parse a single trimmed line, stamping it with the current time when it
    /// carries no timestamp section.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        Self::parse_at(line, Utc::now())
    }

    /// Parse a single trimmed line, using `now` for a missing timestamp.
    pub fn parse_at(line: &str, now: DateTime<Utc>) -> Result<Self, ParseError> {
        let (boundary, separator) = measurement_boundary(line).ok_or(ParseError::MalformedLine)?;
        if boundary == 0 {
            return Err(ParseError::MalformedLine);
        }
        let measurement = line[..boundary].to_string();

        // the separator is ASCII, skip it
        let mut sections = Scanner::new(&line[boundary + 1..], ScanPolicy::LINE_SECTION);

        // `cpu value=1`: no tag section at all
        let tag_section = if separator == ',' {
            sections.next().map(|t| t.into_content()).unwrap_or(Cow::Borrowed(""))
        } else {
            Cow::Borrowed("")
        };
        let field_section = sections.next().map(|t| t.into_content()).unwrap_or(Cow::Borrowed(""));
        let timestamp_section = sections.next().map(|t| t.into_content());

        if !sections.is_exhausted() {
            let trailing = sections.remainder();
            if timestamp_section.as_deref().is_some_and(str::is_empty) {
                warn!(trailing, "Empty timestamp section followed by more content, using the current time");
            } else {
                debug!(trailing, "Ignoring content after the timestamp section");
            }
        }

        let timestamp = match timestamp_section {
            Some(ts) if !ts.is_empty() => {
                let nanos = parse_int_literal(&ts).ok_or_else(|| ParseError::InvalidTimestamp {
                    value: ts.to_string(),
                })?;
                DateTime::from_timestamp_nanos(nanos)
            }
            _ => now,
        };

        let tags = pairs(&tag_section).collect();
        let fields = pairs(&field_section)
            .map(|(key, value)| {
                let value = coerce(&value);
                (key, value)
            })
            .collect();

        Ok(Self {
            measurement,
            tags,
            fields,
            timestamp,
        })
    }

    /// Project into a metric: tags plus the measurement name become metadata,
    /// fields become data.
    pub fn into_metric(self) -> Metric {
        let mut metadata: BTreeMap<String, Value> = self
            .tags
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        metadata.insert(MEASUREMENT_KEY.to_string(), Value::String(self.measurement));

        Metric {
            time: self.timestamp,
            metadata,
            data: self.fields,
        }
    }
}

/// Position and character of the first unescaped `,` or space.
fn measurement_boundary(line: &str) -> Option<(usize, char)> {
    let mut escaped = false;
    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            ',' | ' ' => return Some((idx, c)),
            _ => {}
        }
    }
    None
}

/// `key=value` pairs of a tag or field section, split on the first `=`.
/// Iteration stops at the first token without a `=`.
fn pairs(section: &str) -> impl Iterator<Item = (String, String)> + '_ {
    Scanner::new(section, ScanPolicy::LINE_PAIR).map_while(|token| {
        let (key, value) = token.as_str().split_once('=')?;
        Some((key.to_string(), value.to_string()))
    })
}

/// Parser for InfluxDB line protocol
/// <https://docs.influxdata.com/influxdb/v1.7/write_protocols/line_protocol_tutorial/>
///
/// Lines are parsed independently: a bad line is logged and skipped while the
/// rest of the input is still converted.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineProtocolParser;

impl LineProtocolParser {
    /// Parse every line, returning the metrics of the lines that parsed along
    /// with the failures of those that did not.
    pub fn parse_lenient(&self, raw: &[u8]) -> (Container, Vec<LineFailure>) {
        let now = Utc::now();
        let mut metrics = Vec::new();
        let mut failures = Vec::new();

        for (index, raw_line) in raw.split(|&b| b == b'\n').enumerate() {
            let line = match std::str::from_utf8(raw_line) {
                Ok(text) => text.trim(),
                Err(_) => {
                    warn!(line = index, "Skipping non-UTF8 line protocol line");
                    failures.push(LineFailure {
                        index,
                        line: String::from_utf8_lossy(raw_line).trim().to_string(),
                        error: ParseError::NonUtf8,
                    });
                    continue;
                }
            };

            if line.is_empty() {
                continue;
            }

            match LineRecord::parse_at(line, now) {
                Ok(record) => metrics.push(record.into_metric()),
                Err(error) => {
                    warn!(line = index, error = %error, "Failed to parse influx line protocol");
                    failures.push(LineFailure {
                        index,
                        line: line.to_string(),
                        error,
                    });
                }
            }
        }

        (Container::new(metrics), failures)
    }
}

impl RecordParser for LineProtocolParser {
    fn parse(&self, raw: &[u8]) -> Result<Container, ParseError> {
        let (container, failures) = self.parse_lenient(raw);
        if failures.is_empty() {
            Ok(container)
        } else {
            Err(ParseError::PartialFailure { container, failures })
        }
    }

    fn format(&self) -> InputFormat {
        InputFormat::LineProtocol
    }
}
