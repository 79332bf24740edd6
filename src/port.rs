//! Serial port configuration and write-back handles.
//!
//! Each registered port is split in two: the ingestion loop owns the
//! read half outright, while the write half travels with every
//! [`Request`](crate::listener::Request) behind a [`PortHandle`] so the
//! downstream consumer can answer on the originating channel.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{ServerError, ServerResult};

/// Write side of a registered port.
#[async_trait]
pub trait PortSink: Send {
    /// Write the full byte sequence and flush it to the device.
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;
}

#[async_trait]
impl<T> PortSink for T
where
    T: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, bytes).await?;
        self.flush().await
    }
}

/// Shared handle to a port's write half.
pub type PortHandle = Arc<Mutex<dyn PortSink>>;

/// Connection settings for a Modbus ASCII serial line.
///
/// Defaults follow the ASCII transport convention: 9600 baud, 7 data
/// bits, even parity, one stop bit.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`.
    pub path: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    /// Read timeout applied by the serial driver.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Settings for `path` with ASCII-conventional line parameters.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: 9600,
            data_bits: tokio_serial::DataBits::Seven,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::Even,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Open the serial device described by `config`.
pub(crate) fn open_serial(config: &SerialConfig) -> ServerResult<tokio_serial::SerialStream> {
    let builder = tokio_serial::new(&config.path, config.baud_rate)
        .data_bits(config.data_bits)
        .stop_bits(config.stop_bits)
        .parity(config.parity)
        .timeout(config.timeout);

    tokio_serial::SerialStream::open(&builder).map_err(|source| ServerError::Open {
        path: config.path.clone(),
        source,
    })
}
