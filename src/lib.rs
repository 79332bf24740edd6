//! # mbserver
//!
//! Modbus ASCII server transport: the LRC frame codec and a resilient
//! serial ingestion layer for building Modbus slave devices.
//!
//! ## Wire format
//!
//! ```text
//! ':' hex(address) hex(function) hex(data)... hex(lrc) CR LF
//! ```
//!
//! Every binary byte is spelled as two ASCII hex digits; transmitted
//! frames use upper-case digits, received frames may use either case.
//! The trailing LRC is the two's complement of the 8-bit sum of the
//! binary payload.
//!
//! ## Quick start
//!
//! ```no_run
//! use mbserver::{AsciiServer, SerialConfig};
//!
//! #[tokio::main]
//! async fn main() -> mbserver::ServerResult<()> {
//!     let mut server = AsciiServer::new();
//!     let mut requests = server.take_requests().unwrap();
//!
//!     server.listen(&SerialConfig::new("/dev/ttyUSB0"))?;
//!
//!     while let Some(request) = requests.recv().await {
//!         let mut response = request.frame.clone();
//!         // ... apply function semantics here ...
//!         request.respond(&response).await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! A malformed packet never stops a listener: it is logged, discarded
//! and the line keeps being read. Only shutdown or a failed read
//! terminates a port's loop.

/// Error types for frame decoding and the server lifecycle.
pub mod error;
/// Modbus ASCII frame encoding and decoding.
pub mod frame;
/// Per-port ingestion loop and the request type it produces.
pub mod listener;
/// LRC checksum computation.
pub mod lrc;
/// Serial port configuration and write-back handles.
pub mod port;
/// Port registry and server lifecycle.
pub mod server;

pub use error::{DecodeError, ServerError, ServerResult};
pub use frame::{AsciiFrame, Exception};
pub use listener::{IngestStep, Request, StopReason};
pub use port::{PortHandle, PortSink, SerialConfig};
pub use server::AsciiServer;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shortest packet that can carry a frame: delimiter, one hex pair and
/// the line ending.
pub const MIN_ASCII_PACKET_SIZE: usize = 5;

/// Maximum function-specific payload carried by one frame, bounded by
/// the 256-byte Modbus serial PDU limit.
pub const MAX_ASCII_DATA_SIZE: usize = 250;
