use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::parser::scanner::{ScanPolicy, Scanner};
use crate::parser::traits::*;

/// Metadata field receiving the SD-ID unless configured otherwise.
pub const DEFAULT_SD_ID_FIELD: &str = "sd-id";

/// One RFC 5424 SD-ELEMENT: an optional SD-ID and its parameters.
///
/// See <https://datatracker.ietf.org/doc/html/rfc5424#section-6.3>
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredGroup {
    pub id: Option<String>,
    pub params: BTreeMap<String, String>,
}

impl StructuredGroup {
    /// Parse the content of a group, without its brackets.
    ///
    /// The first bare token is the SD-ID, even when empty (`[ a="1"]`). A
    /// later non-empty bare token is an error, an empty one ends the group.
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut group = Self::default();

        for token in Scanner::new(content, ScanPolicy::SD_PAIR) {
            let token = token.as_str();
            match token.split_once('=') {
                Some((name, value)) => {
                    let value = value.strip_prefix('"').unwrap_or(value);
                    let value = value.strip_suffix('"').unwrap_or(value);
                    group.params.insert(name.to_string(), value.to_string());
                }
                None if group.id.is_none() => group.id = Some(token.to_string()),
                None if token.trim().is_empty() => break,
                None => {
                    return Err(ParseError::MalformedStructuredData(format!(
                        "unexpected bare token '{}' in the middle of a group",
                        token
                    )))
                }
            }
        }

        Ok(group)
    }

    pub fn into_metric(self, sd_id_field: &str, time: DateTime<Utc>) -> Metric {
        let mut metric = Metric::new(time);
        if let Some(id) = self.id {
            metric.metadata.insert(sd_id_field.to_string(), Value::String(id));
        }
        metric.data = self
            .params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        metric
    }
}

/// Unvalidated structured data parser settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuredDataOptions {
    /// Metadata field to store the SD-ID in (default `sd-id`)
    pub sd_id_field: Option<String>,
}

impl StructuredDataOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sd_id_field(mut self, field: impl Into<String>) -> Self {
        self.sd_id_field = Some(field.into());
        self
    }

    pub fn validate(&self) -> Result<(), ParseError> {
        match &self.sd_id_field {
            Some(field) if field.trim().is_empty() => Err(ParseError::InvalidConfig(
                "sd_id_field must not be empty".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Validate and produce an immutable parser.
    pub fn build(self) -> Result<StructuredDataParser, ParseError> {
        self.validate()?;
        Ok(StructuredDataParser {
            sd_id_field: self
                .sd_id_field
                .unwrap_or_else(|| DEFAULT_SD_ID_FIELD.to_string()),
        })
    }
}

/// Parser for RFC 5424 structured data. This does not parse a full syslog
/// message, only `[id name="value" ...]` groups, one metric per group.
///
/// Lines starting with a space are rejected whole. A malformed group is
/// dropped on its own; the call only fails when nothing at all was parsed.
#[derive(Debug, Clone)]
pub struct StructuredDataParser {
    sd_id_field: String,
}

impl StructuredDataParser {
    pub fn new() -> Self {
        Self {
            sd_id_field: DEFAULT_SD_ID_FIELD.to_string(),
        }
    }

    pub fn sd_id_field(&self) -> &str {
        &self.sd_id_field
    }

    /// Parse the input, also returning the groups that were dropped.
    pub fn parse_lenient(&self, raw: &[u8]) -> Result<(Container, Vec<LineFailure>), ParseError> {
        let text = std::str::from_utf8(raw).map_err(|_| ParseError::NonUtf8)?;

        // every metric of one call shares a timestamp
        let now = Utc::now();
        let mut metrics = Vec::new();
        let mut dropped = Vec::new();

        for (index, line) in text.split('\n').enumerate() {
            if line.starts_with(' ') {
                warn!(line = index, "Rejecting structured data line starting with a space");
            }

            let mut groups = Scanner::new(line, ScanPolicy::SD_GROUP);
            while let Some(token) = groups.next() {
                let content = token.as_str();
                let content = content.strip_prefix('[').unwrap_or(content);

                if !content.trim().is_empty() {
                    match StructuredGroup::parse(content) {
                        Ok(group) => metrics.push(group.into_metric(&self.sd_id_field, now)),
                        Err(error) => {
                            warn!(line = index, error = %error, "Dropping structured data group");
                            dropped.push(LineFailure {
                                index,
                                line: content.to_string(),
                                error,
                            });
                        }
                    }
                }

                groups.skip_whitespace();
            }
        }

        if metrics.is_empty() {
            warn!(bytes = raw.len(), "RFC5424/Structured Data parser failed to parse any groups");
            return Err(ParseError::NoRecordsParsed);
        }

        Ok((Container::new(metrics), dropped))
    }
}

impl Default for StructuredDataParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordParser for StructuredDataParser {
    fn parse(&self, raw: &[u8]) -> Result<Container, ParseError> {
        self.parse_lenient(raw).map(|(container, _)| container)
    }

    fn format(&self) -> InputFormat {
        InputFormat::StructuredData
    }
}
