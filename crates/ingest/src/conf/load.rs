//! Load — config loading from file and environment variables.

use std::path::Path;
use std::fs::File;
use std::io::Read;

use crate::parser::InputFormat;
use super::model::IngestConfig;

impl IngestConfig {
    /// Load configuration from file or environment variables
    /// Priority: Environment Variables > Config File > Defaults
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::env::var("INGEST_CONFIG_FILE")
            .unwrap_or_else(|_| "/etc/ingest/ingest.toml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            tracing::info!("Loading configuration from: {}", config_path);
            Self::from_file(&config_path)?
        } else {
            tracing::info!("Config file not found at {}, using environment variables", config_path);
            Self::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: IngestConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Override settings from `lookup` (normally the process environment).
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("INGEST_FORMAT") {
            match InputFormat::from_name(&name) {
                Some(format) => self.format = format,
                None => tracing::warn!("Ignoring unknown INGEST_FORMAT: {}", name),
            }
        }
        if let Some(field) = lookup("INGEST_SD_ID_FIELD") {
            self.sd_id_field = field;
        }
        if let Some(inputs) = lookup("INGEST_INPUTS") {
            self.inputs = inputs
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(bytes) = lookup("INGEST_MAX_INPUT_BYTES") {
            match bytes.parse() {
                Ok(bytes) => self.max_input_bytes = bytes,
                Err(_) => tracing::warn!("Ignoring invalid INGEST_MAX_INPUT_BYTES: {}", bytes),
            }
        }
        if let Some(workers) = lookup("INGEST_WORKERS") {
            match workers.parse() {
                Ok(workers) => self.workers = workers,
                Err(_) => tracing::warn!("Ignoring invalid INGEST_WORKERS: {}", workers),
            }
        }
        if let Some(pretty) = lookup("INGEST_PRETTY") {
            if let Ok(pretty) = pretty.parse() {
                self.pretty = pretty;
            }
        }
    }

    /// Validate that configuration values are sane
    pub fn validate(&self) -> Result<(), String> {
        if self.sd_id_field.trim().is_empty() {
            return Err("sd_id_field must not be empty".to_string());
        }
        if self.max_input_bytes == 0 {
            return Err("max_input_bytes must be > 0".to_string());
        }
        if self.workers == 0 {
            return Err("workers must be > 0".to_string());
        }
        self.structured_data_options()
            .validate()
            .map_err(|e| e.to_string())?;
        for input in &self.inputs {
            self.validate_file(input)?;
        }
        Ok(())
    }

    fn validate_file(&self, path: &str) -> Result<(), String> {
        if path == "-" {
            return Ok(());
        }
        if !Path::new(path).is_file() {
            return Err(format!("input not found at: {}", path));
        }
        Ok(())
    }
}
