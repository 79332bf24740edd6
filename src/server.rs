//! Multi-port Modbus ASCII server.
//!
//! The server is a registry of serial ports feeding one shared request
//! channel. Each call to [`AsciiServer::listen`] or
//! [`AsciiServer::attach`] spawns an independent ingestion loop; frames
//! from different lines interleave on the channel, but each port's own
//! requests stay in arrival order. Stopping the server cancels every
//! loop through one shared token and waits for them to unwind.

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use std::sync::Arc;

use crate::error::ServerResult;
use crate::listener::{ingest_loop, Request, StopReason};
use crate::port::{open_serial, PortHandle, SerialConfig};

/// Capacity of the shared request channel.
const REQUEST_QUEUE_DEPTH: usize = 64;

/// Registry and lifecycle manager for Modbus ASCII serial ports.
pub struct AsciiServer {
    requests: mpsc::Sender<Request>,
    /// Held until [`take_requests`](Self::take_requests) hands it to the
    /// consumer.
    receiver: Option<mpsc::Receiver<Request>>,
    shutdown: CancellationToken,
    listeners: Vec<JoinHandle<StopReason>>,
}

impl AsciiServer {
    /// Create a server with no ports registered.
    pub fn new() -> Self {
        let (requests, receiver) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        Self {
            requests,
            receiver: Some(receiver),
            shutdown: CancellationToken::new(),
            listeners: Vec::new(),
        }
    }

    /// Take the receiving end of the request channel.
    ///
    /// There is exactly one receiver; subsequent calls return `None`.
    pub fn take_requests(&mut self) -> Option<mpsc::Receiver<Request>> {
        self.receiver.take()
    }

    /// Open the serial device described by `config` and start listening
    /// on it.
    pub fn listen(&mut self, config: &SerialConfig) -> ServerResult<()> {
        let stream = open_serial(config)?;
        info!("listening on {}", config.path);
        self.attach(stream);
        Ok(())
    }

    /// Register an already-open bidirectional channel as a port.
    ///
    /// The channel is split: the spawned ingestion loop owns the read
    /// half, and the write half travels with each request so responses
    /// go back out on the same line.
    pub fn attach<S>(&mut self, stream: S)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let handle: PortHandle = Arc::new(Mutex::new(writer));

        let task = tokio::spawn(ingest_loop(
            reader,
            handle,
            self.requests.clone(),
            self.shutdown.clone(),
        ));
        self.listeners.push(task);
    }

    /// Number of ports registered since startup, including any whose
    /// loops have already stopped.
    pub fn port_count(&self) -> usize {
        self.listeners.len()
    }

    /// Token cancelled when the server stops; clone it to tie other
    /// tasks to the server's lifetime.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Cancel every ingestion loop and wait for all of them to finish.
    pub async fn stop(&mut self) {
        self.shutdown.cancel();
        for task in self.listeners.drain(..) {
            match task.await {
                Ok(StopReason::ReadFailed(err)) => {
                    warn!("listener had already stopped on read error: {err}");
                }
                Ok(_) => {}
                Err(err) => warn!("listener task panicked: {err}"),
            }
        }
        info!("server stopped");
    }
}

impl Default for AsciiServer {
    fn default() -> Self {
        Self::new()
    }
}
