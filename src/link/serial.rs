//! # Serial Channel
//!
//! This module owns the connection to the microcontroller: opening the port,
//! best-effort writes, the pending-byte query and line reads bounded by the
//! read timeout. A port that fails to open yields an unavailable `Channel`
//! rather than an error, and every operation on it degrades to a no-op.

use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_OPEN_SETTLE_MS, DEFAULT_PORT, DEFAULT_READ_TIMEOUT_MS,
    DEFAULT_REPLY_SETTLE_MS, LINE_TERMINATOR,
};
use crate::error::BridgeError;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{sleep, timeout_at, Instant};
use tokio_serial::SerialPortBuilderExt;

/// Configuration for the serial connection.
///
/// Durations are kept in milliseconds so the struct maps one-to-one onto a
/// JSON config file; missing fields fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    pub open_settle_ms: u64,
    pub reply_settle_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            open_settle_ms: DEFAULT_OPEN_SETTLE_MS,
            reply_settle_ms: DEFAULT_REPLY_SETTLE_MS,
        }
    }
}

impl SerialConfig {
    /// Loads a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn open_settle(&self) -> Duration {
        Duration::from_millis(self.open_settle_ms)
    }

    pub fn reply_settle(&self) -> Duration {
        Duration::from_millis(self.reply_settle_ms)
    }
}

/// Byte-level access to the device.
///
/// Implemented for `tokio_serial::SerialStream` and for the in-memory
/// `MockSerialPort`, so the channel and everything above it can be driven
/// without hardware.
#[async_trait::async_trait]
pub trait SerialLink: AsyncRead + AsyncWrite + Unpin + Send {
    /// Number of bytes received and not yet read.
    fn bytes_pending(&self) -> io::Result<usize>;

    /// Drops everything in the receive buffer.
    fn discard_input(&self) -> io::Result<()>;

    /// Writes all of `data` and flushes.
    async fn send(&mut self, data: &[u8]) -> io::Result<()> {
        self.write_all(data).await?;
        AsyncWriteExt::flush(self).await
    }
}

#[async_trait::async_trait]
impl SerialLink for tokio_serial::SerialStream {
    fn bytes_pending(&self) -> io::Result<usize> {
        tokio_serial::SerialPort::bytes_to_read(self)
            .map(|n| n as usize)
            .map_err(io::Error::from)
    }

    fn discard_input(&self) -> io::Result<()> {
        tokio_serial::SerialPort::clear(self, tokio_serial::ClearBuffer::Input)
            .map_err(io::Error::from)
    }
}

/// Outcome of a single line read.
#[derive(Debug)]
pub enum LineRead {
    /// A decoded line, terminator included if one arrived. May be partial when
    /// the read timeout cut it short.
    Line(String),
    /// Bytes that were not valid UTF-8.
    Undecodable(Vec<u8>),
    /// Nothing arrived before the timeout (or the link is unavailable).
    Empty,
    /// The link reported an I/O error.
    Failed(io::Error),
}

/// Decodes the raw bytes of one line.
pub fn decode_line(bytes: Vec<u8>) -> LineRead {
    match String::from_utf8(bytes) {
        Ok(line) => LineRead::Line(line),
        Err(e) => LineRead::Undecodable(e.into_bytes()),
    }
}

/// The single connection to the device.
pub struct Channel<L: SerialLink = tokio_serial::SerialStream> {
    port_name: String,
    read_timeout: Duration,
    link: Option<L>,
}

impl Channel<tokio_serial::SerialStream> {
    /// Opens the configured port (8N1).
    ///
    /// On success this waits `open_settle` before returning, since opening the
    /// port resets most boards. On failure the cause is logged and an
    /// unavailable channel is returned; the open is never retried.
    pub async fn open(config: &SerialConfig) -> Self {
        let opened = tokio_serial::new(config.port.as_str(), config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .stop_bits(tokio_serial::StopBits::One)
            .parity(tokio_serial::Parity::None)
            .timeout(config.read_timeout())
            .open_native_async()
            .map_err(BridgeError::from);

        match opened {
            Ok(port) => {
                info!(
                    "Opened serial port '{}' at {} baud",
                    config.port, config.baud_rate
                );
                sleep(config.open_settle()).await;
                Self::with_link(port, config)
            }
            Err(e) => {
                error!("Could not open serial port '{}'. {}", config.port, e);
                Self::unavailable(config)
            }
        }
    }
}

impl<L: SerialLink> Channel<L> {
    /// Wraps an already open link.
    pub fn with_link(link: L, config: &SerialConfig) -> Self {
        Channel {
            port_name: config.port.clone(),
            read_timeout: config.read_timeout(),
            link: Some(link),
        }
    }

    /// A channel whose port could not be opened.
    pub fn unavailable(config: &SerialConfig) -> Self {
        Channel {
            port_name: config.port.clone(),
            read_timeout: config.read_timeout(),
            link: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.link.is_some()
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Best-effort write. Failures are logged and swallowed.
    pub async fn write(&mut self, bytes: &[u8]) {
        let Some(link) = self.link.as_mut() else {
            return;
        };
        if let Err(e) = link.send(bytes).await {
            warn!("Write to '{}' failed: {}", self.port_name, e);
        }
    }

    /// Bytes buffered for read; 0 when unavailable or when the query fails.
    pub fn bytes_pending(&self) -> usize {
        let Some(link) = self.link.as_ref() else {
            return 0;
        };
        link.bytes_pending().unwrap_or_else(|e| {
            warn!("Could not query pending bytes on '{}': {}", self.port_name, e);
            0
        })
    }

    /// Drops stale input. Best-effort.
    pub fn discard_input(&self) {
        if let Some(link) = self.link.as_ref() {
            if let Err(e) = link.discard_input() {
                warn!("Could not discard input on '{}': {}", self.port_name, e);
            }
        }
    }

    /// Reads until a line terminator, end of stream or the read timeout.
    ///
    /// Whatever arrived before the timeout is returned, as a partial line.
    pub async fn read_line(&mut self) -> LineRead {
        let Some(link) = self.link.as_mut() else {
            return LineRead::Empty;
        };

        let deadline = Instant::now() + self.read_timeout;
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match timeout_at(deadline, link.read(&mut byte)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(_)) => {
                    buf.push(byte[0]);
                    if byte[0] == LINE_TERMINATOR {
                        break;
                    }
                }
                Ok(Err(e)) => return LineRead::Failed(e),
                Err(_) => {
                    debug!(
                        "Read timeout on '{}' after {} byte(s)",
                        self.port_name,
                        buf.len()
                    );
                    break;
                }
            }
        }

        if buf.is_empty() {
            LineRead::Empty
        } else {
            decode_line(buf)
        }
    }
}
