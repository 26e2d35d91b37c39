pub use super::model::{Container, InputFormat, Metric, Value};
pub use super::error::{LineFailure, ParseError};

pub trait RecordParser: Send + Sync {
    /// parse a raw input buffer into an ordered container of metrics
    fn parse(&self, raw: &[u8]) -> Result<Container, ParseError>;
    fn format(&self) -> InputFormat;
}
