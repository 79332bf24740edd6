//! Per-port serial ingestion loop.
//!
//! One loop runs per registered port: it reads a packet, attempts one
//! frame decode, forwards the request on success and discards the bytes
//! on failure. The line protocol has no retransmission, so the server's
//! posture is to wait for the next clean frame, never to ask the sender
//! to resend. A malformed packet must not terminate the listener; only
//! cancellation or a failed read does.

use std::fmt;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{DecodeError, ServerResult};
use crate::frame::AsciiFrame;
use crate::port::PortHandle;

/// Receive buffer size per read, comfortably above the longest legal
/// ASCII frame.
const READ_BUFFER_SIZE: usize = 512;

/// Delay between polls while the port reports end-of-stream.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A decoded frame paired with the port it arrived on, so the response
/// can be written back to the same physical channel.
///
/// The loop hands a request off exactly once; afterwards the downstream
/// consumer owns it.
pub struct Request {
    pub port: PortHandle,
    pub frame: AsciiFrame,
}

impl Request {
    pub fn new(port: PortHandle, frame: AsciiFrame) -> Self {
        Self { port, frame }
    }

    /// Encode `frame` and write it to the originating port.
    pub async fn respond(&self, frame: &AsciiFrame) -> ServerResult<()> {
        let bytes = frame.to_bytes();
        self.port.lock().await.write_all(&bytes).await?;
        Ok(())
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}

/// Outcome of one loop iteration.
#[derive(Debug)]
pub enum IngestStep {
    /// A well-formed frame, ready for the request channel.
    Accepted(Request),
    /// The packet failed decoding and was dropped; the loop continues.
    Discarded(DecodeError),
    /// Nothing to read this iteration.
    Idle,
    /// The loop must terminate.
    Stop(StopReason),
}

/// Why an ingestion loop terminated.
#[derive(Debug)]
pub enum StopReason {
    /// The shutdown token was cancelled.
    Cancelled,
    /// The port read failed; the port is presumed dead and is not
    /// reopened.
    ReadFailed(io::Error),
    /// The downstream request channel was dropped.
    SinkClosed,
}

/// Read one packet from `reader` and classify it.
///
/// Cancellation is checked before blocking on the read and raced
/// against it, so shutdown is never delayed by an idle device.
pub async fn poll_port<R>(
    reader: &mut R,
    port: &PortHandle,
    shutdown: &CancellationToken,
    buffer: &mut [u8],
) -> IngestStep
where
    R: AsyncRead + Unpin,
{
    if shutdown.is_cancelled() {
        return IngestStep::Stop(StopReason::Cancelled);
    }

    let read = tokio::select! {
        _ = shutdown.cancelled() => return IngestStep::Stop(StopReason::Cancelled),
        read = reader.read(buffer) => read,
    };

    let packet = match read {
        Ok(0) => return IngestStep::Idle,
        Ok(n) => &buffer[..n],
        Err(err) => return IngestStep::Stop(StopReason::ReadFailed(err)),
    };

    match AsciiFrame::decode(packet) {
        Ok(frame) => IngestStep::Accepted(Request::new(port.clone(), frame)),
        Err(err) => {
            debug!("rejected packet: {}", format_hex_packet(packet));
            IngestStep::Discarded(err)
        }
    }
}

/// Run the ingestion loop for one port until shutdown or a fatal read
/// error, forwarding decoded requests in arrival order.
pub async fn ingest_loop(
    mut reader: impl AsyncRead + Unpin + Send,
    port: PortHandle,
    requests: mpsc::Sender<Request>,
    shutdown: CancellationToken,
) -> StopReason {
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match poll_port(&mut reader, &port, &shutdown, &mut buffer).await {
            IngestStep::Accepted(request) => {
                // The only backpressure point: block until the consumer
                // drains the channel.
                if requests.send(request).await.is_err() {
                    error!("request channel closed, stopping listener");
                    return StopReason::SinkClosed;
                }
            }
            IngestStep::Discarded(err) => {
                warn!("discarding bad serial frame: {err}");
            }
            IngestStep::Idle => {
                tokio::select! {
                    _ = shutdown.cancelled() => return StopReason::Cancelled,
                    _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                }
            }
            IngestStep::Stop(reason) => {
                match &reason {
                    StopReason::ReadFailed(err) => error!("serial read error: {err}"),
                    StopReason::Cancelled => debug!("listener cancelled"),
                    StopReason::SinkClosed => {}
                }
                return reason;
            }
        }
    }
}

/// Format raw bytes as hex for packet logging.
fn format_hex_packet(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
