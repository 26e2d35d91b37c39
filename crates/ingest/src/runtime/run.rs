//! Run — read inputs, parse them on the blocking pool, emit JSON lines.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::conf::IngestConfig;
use crate::parser::metrics::{MetricErrorType, ParsingMetrics};
use crate::parser::{Container, ParseError, RecordParser};

/// Input name that reads standard input.
pub const STDIN_SOURCE: &str = "-";

/// Errors that abort the whole run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to write output: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode metric: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("input task failed: {0}")]
    Task(String),
}

/// Errors confined to a single input.
#[derive(Debug, Error)]
enum InputError {
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("parse task failed: {0}")]
    Task(String),
}

impl InputError {
    fn metric_type(&self) -> MetricErrorType {
        match self {
            InputError::Parse(error) => MetricErrorType::from(error),
            _ => MetricErrorType::Other,
        }
    }
}

struct Parsed {
    container: Container,
    skipped: usize,
    bytes: usize,
    elapsed_nanos: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub inputs: usize,
    pub failed_inputs: usize,
    pub metrics_written: usize,
}

/// Process every configured input and write metrics to stdout.
///
/// Fails when output cannot be written or when any input was rejected.
pub async fn run(
    config: IngestConfig,
    parser: Arc<dyn RecordParser>,
) -> Result<(), Box<dyn std::error::Error>> {
    let metrics = Arc::new(ParsingMetrics::new());
    let mut stdout = tokio::io::stdout();

    let summary = ingest(&config, parser, Arc::clone(&metrics), &mut stdout).await?;

    info!(
        inputs = summary.inputs,
        failed = summary.failed_inputs,
        metrics = summary.metrics_written,
        "Ingest finished"
    );
    info!("Parsing metrics: {}", serde_json::to_string(&metrics.snapshot())?);

    if summary.failed_inputs > 0 {
        return Err(format!(
            "{} of {} inputs failed to parse",
            summary.failed_inputs, summary.inputs
        )
        .into());
    }
    Ok(())
}

/// Parse the inputs of `config` concurrently and write their metrics to `out`
/// in input order.
///
/// At most `config.workers` inputs are in flight, counting both inputs being
/// read or parsed and parsed inputs waiting to be written. The next input is
/// spawned only once the oldest one has been written.
pub async fn ingest<W>(
    config: &IngestConfig,
    parser: Arc<dyn RecordParser>,
    metrics: Arc<ParsingMetrics>,
    out: &mut W,
) -> Result<RunSummary, IngestError>
where
    W: AsyncWrite + Unpin,
{
    let sources: Vec<String> = if config.inputs.is_empty() {
        vec![STDIN_SOURCE.to_string()]
    } else {
        config.inputs.clone()
    };

    let window = config.workers.max(1);
    let max_bytes = config.max_input_bytes;
    let format = parser.format();
    info!(format = %format, inputs = sources.len(), workers = window, "Starting ingest");

    let mut pending = sources.into_iter();
    let mut in_flight: VecDeque<(String, JoinHandle<Result<Parsed, InputError>>)> =
        VecDeque::with_capacity(window);
    let mut summary = RunSummary::default();

    loop {
        while in_flight.len() < window {
            let Some(source) = pending.next() else { break };
            let parser = Arc::clone(&parser);
            let name = source.clone();
            let handle = tokio::spawn(async move {
                let raw = read_input(&source, max_bytes).await?;
                parse_input(parser, raw).await
            });
            in_flight.push_back((name, handle));
        }

        let Some((source, handle)) = in_flight.pop_front() else { break };
        summary.inputs += 1;
        let outcome = handle
            .await
            .map_err(|e| IngestError::Task(e.to_string()))?;

        match outcome {
            Ok(parsed) => {
                metrics.record_parse(format, parsed.container.len(), parsed.bytes, parsed.elapsed_nanos);
                if parsed.skipped > 0 {
                    metrics.record_failed_units(parsed.skipped);
                    warn!(source = %source, skipped = parsed.skipped, "Input parsed with failures");
                }
                debug!(source = %source, metrics = parsed.container.len(), "Input parsed");
                summary.metrics_written += write_container(out, &parsed.container, config.pretty).await?;
            }
            Err(error) => {
                metrics.record_error(error.metric_type());
                error!(source = %source, error = %error, "Failed to ingest input");
                summary.failed_inputs += 1;
            }
        }
    }

    Ok(summary)
}

async fn read_input(source: &str, max_bytes: usize) -> Result<Bytes, InputError> {
    if source == STDIN_SOURCE {
        return read_limited(tokio::io::stdin(), max_bytes).await;
    }

    let file = tokio::fs::File::open(source).await?;
    let len = file.metadata().await?.len();
    if len > max_bytes as u64 {
        return Err(ParseError::InputTooLarge(len as usize, max_bytes).into());
    }
    read_limited(file, max_bytes).await
}

/// Read at most `max_bytes`; one byte past the limit rejects the input.
async fn read_limited<R>(reader: R, max_bytes: usize) -> Result<Bytes, InputError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    let mut limited = reader.take(max_bytes as u64 + 1);
    limited.read_to_end(&mut buf).await?;

    if buf.len() > max_bytes {
        return Err(ParseError::InputTooLarge(buf.len(), max_bytes).into());
    }
    Ok(Bytes::from(buf))
}

async fn parse_input(parser: Arc<dyn RecordParser>, raw: Bytes) -> Result<Parsed, InputError> {
    tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let result = parser.parse(&raw);
        let elapsed_nanos = start.elapsed().as_nanos() as u64;

        let (container, skipped) = match result {
            Ok(container) => (container, 0),
            Err(ParseError::PartialFailure { container, failures }) => (container, failures.len()),
            Err(error) => return Err(InputError::Parse(error)),
        };

        Ok(Parsed {
            container,
            skipped,
            bytes: raw.len(),
            elapsed_nanos,
        })
    })
    .await
    .map_err(|e| InputError::Task(e.to_string()))?
}

async fn write_container<W>(out: &mut W, container: &Container, pretty: bool) -> Result<usize, IngestError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    for metric in container.iter() {
        if pretty {
            serde_json::to_writer_pretty(&mut buf, metric)?;
        } else {
            serde_json::to_writer(&mut buf, metric)?;
        }
        buf.push(b'\n');
    }

    out.write_all(&buf).await?;
    out.flush().await?;
    Ok(container.len())
}
