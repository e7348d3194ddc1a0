//! # mcu-bridge - Text Commands to a Microcontroller over Serial
//!
//! The mcu-bridge crate forwards text commands to a microcontroller (an
//! Arduino running a line-based command sketch) and returns its replies.
//!
//! ## Features
//!
//! - Open the serial port once and keep it for the life of the process
//! - Send one command and collect every reply line that arrives within a settle window
//! - Tolerate corrupt bytes and silent devices without surfacing errors
//! - Parse `Result: <label>: <value>` sensor lines into a normalized mapping
//! - Produce JSON-ready response documents for a web or CLI front end
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mcu_bridge::{Bridge, SerialConfig};
//!
//! # async fn run() {
//! let bridge = Bridge::open(&SerialConfig::default()).await;
//! let reply = bridge.control(Some("led on"), None).await;
//! let sensors = bridge.sensors().await;
//! # }
//! ```
//!
//! A port that cannot be opened does not produce an error: every exchange
//! then answers `["Serial port is not available."]`, and a device that stays
//! silent answers `["No response from device."]`.

pub mod bridge;
pub mod constants;
pub mod error;
pub mod link;
pub mod logging;
pub mod payload;

pub use crate::error::BridgeError;
pub use crate::logging::init_logger;

pub use bridge::{Bridge, ControlResponse, ErrorResponse, Response, SensorResponse};
pub use link::{
    Channel, Command, Exchanger, LineRead, MockSerialPort, ReplyBatch, SerialConfig, SerialLink,
};
pub use payload::{parse_sensors, SensorReading};

/// Send a command and collect the reply lines.
///
/// # Arguments
/// * `exchanger` - Exchanger owning the channel
/// * `command` - Command text, trimmed before sending
///
/// # Returns
/// * `Ok(ReplyBatch)` - At least one line, possibly a sentinel
/// * `Err(BridgeError)` - The command text itself was invalid
pub async fn send_command<L: SerialLink>(
    exchanger: &Exchanger<L>,
    command: &str,
) -> Result<ReplyBatch, BridgeError> {
    let command = Command::new(command)?;
    Ok(exchanger.exchange(&command).await)
}
