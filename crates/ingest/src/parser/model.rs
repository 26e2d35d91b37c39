use std::collections::BTreeMap;
use std::fmt;
use serde::{Serialize, Deserialize};
use chrono::{DateTime, Utc};

/// Wire formats understood by the record parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    /// InfluxDB line protocol: `measurement[,tag=v] field=v [timestamp]`
    #[serde(alias = "influxdb", alias = "influx")]
    LineProtocol,
    /// RFC 5424 structured data: `[id key="value" ...]`
    #[serde(alias = "rfc5424", alias = "sd")]
    StructuredData,
}

impl InputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputFormat::LineProtocol => "line_protocol",
            InputFormat::StructuredData => "structured_data",
        }
    }

    /// Resolve a configuration name, accepting the same aliases as serde.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "line_protocol" | "influxdb" | "influx" => Some(InputFormat::LineProtocol),
            "structured_data" | "rfc5424" | "sd" => Some(InputFormat::StructuredData),
            _ => None,
        }
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed metadata or data value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

/// One timestamped record handed to downstream pipeline stages.
///
/// `metadata` carries identity/context fields (tags, measurement name, SD-ID),
/// `data` carries the values. Both maps are owned by the metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    /// Serializes as RFC 3339 with nanosecond precision
    pub time: DateTime<Utc>,
    pub metadata: BTreeMap<String, Value>,
    pub data: BTreeMap<String, Value>,
}

impl Metric {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            time,
            metadata: BTreeMap::new(),
            data: BTreeMap::new(),
        }
    }
}

/// Ordered metrics produced by a single parse call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Container {
    pub metrics: Vec<Metric>,
}

impl Container {
    pub fn new(metrics: Vec<Metric>) -> Self {
        Self { metrics }
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Metric> {
        self.metrics.iter()
    }
}

impl IntoIterator for Container {
    type Item = Metric;
    type IntoIter = std::vec::IntoIter<Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.into_iter()
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = &'a Metric;
    type IntoIter = std::slice::Iter<'a, Metric>;

    fn into_iter(self) -> Self::IntoIter {
        self.metrics.iter()
    }
}
