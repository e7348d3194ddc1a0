//! # Command/Response Exchange
//!
//! One exchange is one write followed by one drain pass. The device has no
//! end-of-reply marker, so after writing the command the exchanger sleeps a
//! fixed settle interval and then reads lines for as long as bytes are
//! pending. Every failure is reported as a sentinel line; `exchange` always
//! returns at least one line.

use crate::constants::{
    LCD_COMMAND, LINE_TERMINATOR, SENSORS_COMMAND, SENTINEL_NO_RESPONSE,
    SENTINEL_PORT_UNAVAILABLE,
};
use crate::error::BridgeError;
use crate::link::serial::{Channel, LineRead, SerialConfig, SerialLink};
use crate::logging::log_line_hex;
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

/// A single command line, sent verbatim with a trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(String);

impl Command {
    /// Trims `text` and rejects blank commands and embedded line terminators.
    pub fn new(text: impl AsRef<str>) -> Result<Self, BridgeError> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(BridgeError::EmptyCommand);
        }
        if text.contains(['\n', '\r']) {
            return Err(BridgeError::EmbeddedNewline(text.to_string()));
        }
        Ok(Command(text.to_string()))
    }

    /// `lcd "<message>"`. The message is quoted as-is; embedded quotes are not escaped.
    pub fn lcd(message: &str) -> Result<Self, BridgeError> {
        Self::new(format!("{LCD_COMMAND} \"{message}\""))
    }

    /// The reserved command that reads every sensor.
    pub fn sensors() -> Self {
        Command(SENSORS_COMMAND.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bytes written to the device.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.0.len() + 1);
        bytes.extend_from_slice(self.0.as_bytes());
        bytes.push(LINE_TERMINATOR);
        bytes
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Command {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lines collected from one exchange, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ReplyBatch {
    lines: Vec<String>,
}

impl ReplyBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReplyBatch {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// `["Serial port is not available."]`
    pub fn unavailable() -> Self {
        Self::from_lines([SENTINEL_PORT_UNAVAILABLE])
    }

    /// `["No response from device."]`
    pub fn no_response() -> Self {
        Self::from_lines([SENTINEL_NO_RESPONSE])
    }

    pub fn is_unavailable(&self) -> bool {
        self.lines.len() == 1 && self.lines[0] == SENTINEL_PORT_UNAVAILABLE
    }

    pub fn is_no_response(&self) -> bool {
        self.lines.len() == 1 && self.lines[0] == SENTINEL_NO_RESPONSE
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    fn push(&mut self, line: String) {
        self.lines.push(line);
    }
}

/// Serializes access to the channel and runs exchanges over it.
///
/// The channel lock is held for the whole write/settle/drain cycle, so
/// concurrent callers never see each other's replies.
pub struct Exchanger<L: SerialLink = tokio_serial::SerialStream> {
    channel: Mutex<Channel<L>>,
    reply_settle: Duration,
}

impl Exchanger<tokio_serial::SerialStream> {
    /// Opens the configured port and wraps it.
    pub async fn open(config: &SerialConfig) -> Self {
        let channel = Channel::open(config).await;
        Self::new(channel, config.reply_settle())
    }
}

impl<L: SerialLink> Exchanger<L> {
    pub fn new(channel: Channel<L>, reply_settle: Duration) -> Self {
        Exchanger {
            channel: Mutex::new(channel),
            reply_settle,
        }
    }

    pub async fn is_available(&self) -> bool {
        self.channel.lock().await.is_available()
    }

    pub fn reply_settle(&self) -> Duration {
        self.reply_settle
    }

    /// Sends `command` and returns the reply lines.
    pub async fn exchange(&self, command: &Command) -> ReplyBatch {
        let mut channel = self.channel.lock().await;
        if !channel.is_available() {
            return ReplyBatch::unavailable();
        }
        exchange_on(&mut *channel, command, self.reply_settle).await
    }

    /// Like `exchange`, but drops stale input first. Returns `None` without
    /// touching the link when the channel is unavailable.
    pub async fn exchange_fresh(&self, command: &Command) -> Option<ReplyBatch> {
        let mut channel = self.channel.lock().await;
        if !channel.is_available() {
            return None;
        }
        channel.discard_input();
        Some(exchange_on(&mut *channel, command, self.reply_settle).await)
    }
}

async fn exchange_on<L: SerialLink>(
    channel: &mut Channel<L>,
    command: &Command,
    settle: Duration,
) -> ReplyBatch {
    info!("Sending command: {command}");
    channel.write(&command.to_wire()).await;

    sleep(settle).await;

    let batch = drain(channel).await;
    info!("Received response: {:?}", batch.lines());
    if batch.is_empty() {
        ReplyBatch::no_response()
    } else {
        batch
    }
}

/// Reads lines while bytes are pending. Undecodable lines are skipped; an
/// I/O failure ends the drain with whatever was collected.
async fn drain<L: SerialLink>(channel: &mut Channel<L>) -> ReplyBatch {
    let mut batch = ReplyBatch::new();
    while channel.bytes_pending() > 0 {
        match channel.read_line().await {
            LineRead::Line(line) => {
                let line = line.trim();
                if !line.is_empty() {
                    batch.push(line.to_string());
                }
            }
            LineRead::Undecodable(bytes) => log_line_hex("Skipping undecodable line", &bytes),
            LineRead::Empty => break,
            LineRead::Failed(e) => {
                warn!("Read from '{}' failed: {}", channel.port_name(), e);
                break;
            }
        }
    }
    batch
}
