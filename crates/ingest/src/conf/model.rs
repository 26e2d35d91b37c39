//! Model — IngestConfig and its defaults.

use serde::{Deserialize, Serialize};

use crate::parser::formats::DEFAULT_SD_ID_FIELD;
use crate::parser::{InputFormat, StructuredDataOptions, DEFAULT_MAX_INPUT_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Wire format of every input
    pub format: InputFormat,
    /// Metadata field receiving structured data SD-IDs
    pub sd_id_field: String,
    /// Files to parse; empty reads stdin
    pub inputs: Vec<String>,
    /// Inputs larger than this are rejected before parsing
    pub max_input_bytes: usize,
    /// Parse calls allowed in flight at once
    pub workers: usize,
    /// Pretty-print emitted JSON
    pub pretty: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            format: InputFormat::LineProtocol,
            sd_id_field: DEFAULT_SD_ID_FIELD.to_string(),
            inputs: Vec::new(),
            max_input_bytes: DEFAULT_MAX_INPUT_SIZE,
            workers: 4,
            pretty: false,
        }
    }
}

impl IngestConfig {
    /// Options for the structured data parser derived from this config
    pub fn structured_data_options(&self) -> StructuredDataOptions {
        StructuredDataOptions::new().sd_id_field(self.sd_id_field.clone())
    }
}
