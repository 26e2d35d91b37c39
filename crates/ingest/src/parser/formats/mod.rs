/// Individual wire format parsers

pub mod line_protocol;
pub mod structured_data;

// Re-export parser implementations
pub use line_protocol::{LineProtocolParser, LineRecord, MEASUREMENT_KEY};
pub use structured_data::{
    StructuredDataOptions, StructuredDataParser, StructuredGroup, DEFAULT_SD_ID_FIELD,
};
