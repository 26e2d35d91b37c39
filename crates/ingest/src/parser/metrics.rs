use std::sync::atomic::{AtomicU64, Ordering};
use serde::Serialize;

use super::error::ParseError;
use super::model::InputFormat;

/// Reasons a whole input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricErrorType {
    /// Input exceeded the configured byte limit
    TooLarge,
    /// Non-UTF8 content encountered
    NonUtf8,
    /// Structured data input without a single group
    NoRecords,
    /// Other/generic parse errors
    Other,
}

impl From<&ParseError> for MetricErrorType {
    fn from(error: &ParseError) -> Self {
        match error {
            ParseError::InputTooLarge(..) => MetricErrorType::TooLarge,
            ParseError::NonUtf8 => MetricErrorType::NonUtf8,
            ParseError::NoRecordsParsed => MetricErrorType::NoRecords,
            _ => MetricErrorType::Other,
        }
    }
}

/// A wrapper that forces the wrapped data onto its own cache line(s).
///
/// Uses `#[repr(align(64))]` so counter groups updated from different worker
/// threads do not share a cache line.
#[repr(align(64))]
#[derive(Debug, Default)]
pub struct CacheAligned<T>(pub T);

/// Metrics produced, by input format
#[derive(Debug, Default)]
pub struct FormatMetrics {
    pub line_protocol: AtomicU64,
    pub structured_data: AtomicU64,
}

/// Aggregate timing and volume of successful parse calls
#[derive(Debug, Default)]
pub struct TotalMetrics {
    pub inputs: AtomicU64,
    pub bytes: AtomicU64,
    pub time_nanos: AtomicU64,
}

/// Failures: skipped lines/groups and rejected inputs
#[derive(Debug, Default)]
pub struct ErrorMetrics {
    pub failed_units: AtomicU64,
    pub too_large: AtomicU64,
    pub non_utf8: AtomicU64,
    pub no_records: AtomicU64,
    pub generic: AtomicU64,
}

/// Process-wide parse counters.
///
/// All operations use `Ordering::Relaxed`; `snapshot()` reads are not
/// transactional across fields.
#[derive(Debug, Default)]
pub struct ParsingMetrics {
    pub formats: CacheAligned<FormatMetrics>,
    pub totals: CacheAligned<TotalMetrics>,
    pub errors: CacheAligned<ErrorMetrics>,
}

impl ParsingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a parse call that produced a container (possibly partial).
    #[inline]
    pub fn record_parse(&self, format: InputFormat, produced: usize, bytes: usize, time_nanos: u64) {
        self.totals.0.inputs.fetch_add(1, Ordering::Relaxed);
        self.totals.0.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
        self.totals.0.time_nanos.fetch_add(time_nanos, Ordering::Relaxed);

        let counter = match format {
            InputFormat::LineProtocol => &self.formats.0.line_protocol,
            InputFormat::StructuredData => &self.formats.0.structured_data,
        };
        counter.fetch_add(produced as u64, Ordering::Relaxed);
    }

    /// Record lines or groups skipped inside an otherwise successful call.
    #[inline]
    pub fn record_failed_units(&self, count: usize) {
        self.errors.0.failed_units.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record an input rejected as a whole.
    #[inline]
    pub fn record_error(&self, error_type: MetricErrorType) {
        match error_type {
            MetricErrorType::TooLarge => self.errors.0.too_large.fetch_add(1, Ordering::Relaxed),
            MetricErrorType::NonUtf8 => self.errors.0.non_utf8.fetch_add(1, Ordering::Relaxed),
            MetricErrorType::NoRecords => self.errors.0.no_records.fetch_add(1, Ordering::Relaxed),
            MetricErrorType::Other => self.errors.0.generic.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inputs_parsed = self.totals.0.inputs.load(Ordering::Relaxed);
        let total_time_ns = self.totals.0.time_nanos.load(Ordering::Relaxed);
        let line_protocol_metrics = self.formats.0.line_protocol.load(Ordering::Relaxed);
        let structured_data_metrics = self.formats.0.structured_data.load(Ordering::Relaxed);

        let rejected_too_large = self.errors.0.too_large.load(Ordering::Relaxed);
        let rejected_non_utf8 = self.errors.0.non_utf8.load(Ordering::Relaxed);
        let rejected_no_records = self.errors.0.no_records.load(Ordering::Relaxed);
        let other_errors = self.errors.0.generic.load(Ordering::Relaxed);
        let total_rejected = rejected_too_large + rejected_non_utf8 + rejected_no_records + other_errors;
        let total_attempts = inputs_parsed + total_rejected;

        MetricsSnapshot {
            inputs_parsed,
            bytes_parsed: self.totals.0.bytes.load(Ordering::Relaxed),
            line_protocol_metrics,
            structured_data_metrics,
            total_metrics: line_protocol_metrics + structured_data_metrics,
            avg_parse_time_us: if inputs_parsed > 0 {
                (total_time_ns as f64 / inputs_parsed as f64) / 1000.0
            } else {
                0.0
            },
            failed_units: self.errors.0.failed_units.load(Ordering::Relaxed),
            rejected_too_large,
            rejected_non_utf8,
            rejected_no_records,
            other_errors,
            success_rate: if total_attempts > 0 {
                inputs_parsed as f64 / total_attempts as f64
            } else {
                1.0
            },
        }
    }
}

/// A read-only snapshot of parsing metrics, serializable for logging.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    // Inputs
    pub inputs_parsed: u64,
    pub bytes_parsed: u64,

    // Metrics produced
    pub line_protocol_metrics: u64,
    pub structured_data_metrics: u64,
    pub total_metrics: u64,

    // Performance
    pub avg_parse_time_us: f64,

    // Errors
    pub failed_units: u64,
    pub rejected_too_large: u64,
    pub rejected_non_utf8: u64,
    pub rejected_no_records: u64,
    pub other_errors: u64,
    pub success_rate: f64,
}
