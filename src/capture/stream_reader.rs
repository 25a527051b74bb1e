//! Consumers of the capture tool's output streams.
//!
//! stdout carries one packet record per line and feeds the metric sink;
//! stderr carries free-form diagnostics that are surfaced as warnings. Both
//! readers stop at end-of-stream or when their cancellation token fires,
//! whichever comes first. Cancellation is a clean stop.

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::decoding::record::parse_record;
use crate::decoding::tzsp::decode;
use crate::decoding::types::DecodeOutcome;
use crate::error_handling::types::{CaptureError, DecodeError, RecordError};
use crate::metrics::sink::MetricSink;

/// What happened to one stdout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Recorded,
    NotIpv4,
    Malformed(RecordError),
    Undecodable(DecodeError),
}

/// Per-run tallies of the data stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub lines: u64,
    pub recorded: u64,
    pub not_ipv4: u64,
    pub malformed: u64,
    pub undecodable: u64,
}

impl StreamStats {
    fn tally(&mut self, outcome: &LineOutcome) {
        self.lines += 1;
        match outcome {
            LineOutcome::Recorded => self.recorded += 1,
            LineOutcome::NotIpv4 => self.not_ipv4 += 1,
            LineOutcome::Malformed(_) => self.malformed += 1,
            LineOutcome::Undecodable(_) => self.undecodable += 1,
        }
    }
}

/// Parses, decodes and records a single output line.
pub fn ingest_line(line: &str, sink: &MetricSink) -> LineOutcome {
    let record = match parse_record(line) {
        Ok(record) => record,
        Err(e) => return LineOutcome::Malformed(e),
    };

    match decode(&record.bytes, record.kind, record.port) {
        Ok(DecodeOutcome::Packet(packet)) => {
            sink.record(&packet);
            LineOutcome::Recorded
        }
        Ok(DecodeOutcome::NotIpv4) => LineOutcome::NotIpv4,
        Err(e) => LineOutcome::Undecodable(e),
    }
}

/// Drains the record stream into `sink`.
///
/// Per-line failures are logged at debug level and skipped. Only an I/O error
/// on the stream itself (invalid UTF-8 included) is returned.
pub async fn read_data_stream<R>(
    stream: R,
    sink: &MetricSink,
    cancel: CancellationToken,
    session_id: Uuid,
) -> Result<StreamStats, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut stats = StreamStats::default();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[{}] stdout reader cancelled", session_id);
                break;
            }
            line = lines.next_line() => line.map_err(CaptureError::StreamError)?,
        };

        let Some(line) = line else {
            debug!("[{}] stdout reached end of stream", session_id);
            break;
        };

        let outcome = ingest_line(&line, sink);
        match &outcome {
            LineOutcome::Malformed(e) => debug!("[{}] Skipping line: {}", session_id, e),
            LineOutcome::Undecodable(e) => debug!("[{}] Skipping packet: {}", session_id, e),
            LineOutcome::Recorded | LineOutcome::NotIpv4 => {}
        }
        stats.tally(&outcome);
    }

    Ok(stats)
}

/// Surfaces every diagnostic line as a warning.
pub async fn read_diagnostic_stream<R>(
    stream: R,
    cancel: CancellationToken,
    session_id: Uuid,
) -> Result<u64, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    let mut count = 0;

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("[{}] stderr reader cancelled", session_id);
                break;
            }
            line = lines.next_line() => line.map_err(CaptureError::StreamError)?,
        };

        match line {
            Some(line) => {
                if !line.trim().is_empty() {
                    warn!("[{}] tshark: {}", session_id, line);
                }
                count += 1;
            }
            None => {
                debug!("[{}] stderr reached end of stream", session_id);
                break;
            }
        }
    }

    Ok(count)
}
