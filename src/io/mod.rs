// src/io/mod.rs
//
// Byte transports feeding the receive assembler, and the polling loop that
// connects a transport, the assembler and a sink.

pub mod capture;
mod error;
pub mod serial;

pub use capture::{CaptureFormat, CaptureSource};
pub use error::IoError;

use std::time::Duration;

use crate::protocol::ReceiveAssembler;
use crate::sink::{dispatch, DecodeSink};

// ============================================================================
// Transport Seam
// ============================================================================

/// A source of received bytes.
///
/// `poll_bytes` never blocks for long: it returns whatever has arrived
/// (possibly nothing). `Ok(None)` means the stream has ended.
pub trait ByteSource {
    fn name(&self) -> &str;

    fn poll_bytes(&mut self) -> Result<Option<Vec<u8>>, IoError>;
}

/// Totals reported when a decoder loop finishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub bytes_received: usize,
    pub events: usize,
}

// ============================================================================
// Decoder Loop
// ============================================================================

/// Poll `source` until it ends, feeding the assembler and dispatching every
/// event to `sink`.
///
/// A pending recheck is served before the transport is polled again. When
/// the transport has nothing, the loop sleeps for `idle_sleep`. Transport
/// errors end the loop; malformed input never does.
pub fn run_decoder_loop<S, K>(
    source: &mut S,
    assembler: &mut ReceiveAssembler,
    sink: &mut K,
    idle_sleep: Duration,
) -> Result<LoopStats, String>
where
    S: ByteSource + ?Sized,
    K: DecodeSink + ?Sized,
{
    let mut stats = LoopStats::default();
    tlog!("[decoder] Listening on {}", source.name());

    loop {
        let events = if assembler.needs_recheck() {
            assembler.poll(&[])
        } else {
            match source.poll_bytes()? {
                None => break,
                Some(bytes) if bytes.is_empty() => {
                    if !idle_sleep.is_zero() {
                        std::thread::sleep(idle_sleep);
                    }
                    continue;
                }
                Some(bytes) => {
                    stats.bytes_received += bytes.len();
                    vlog!("[decoder] Received {} bytes: {}", bytes.len(), hex::encode(&bytes));
                    assembler.poll(&bytes)
                }
            }
        };

        for event in &events {
            dispatch(sink, event)?;
        }
        stats.events += events.len();
    }

    if !assembler.buffer().is_empty() {
        tlog!(
            "[decoder] Stream ended with {} undecoded bytes",
            assembler.buffer().len()
        );
    }
    tlog!(
        "[decoder] {} finished: {} bytes, {} events",
        source.name(),
        stats.bytes_received,
        stats.events
    );
    Ok(stats)
}
