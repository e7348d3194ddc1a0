//! # Bridge
//!
//! This module provides the Bridge struct, the request boundary in front of
//! the exchanger. It turns inbound request fields into a `Command`, routes the
//! reserved `sensors` command to the sensor parser and wraps every outcome in
//! a serializable response document.

use crate::constants::{LCD_COMMAND, SENSORS_COMMAND, SENSORS_UNAVAILABLE};
use crate::error::BridgeError;
use crate::link::exchange::{Command, Exchanger, ReplyBatch};
use crate::link::serial::{SerialConfig, SerialLink};
use crate::payload::sensors::{parse_sensors, SensorReading};
use log::info;
use serde::Serialize;

/// Reply to a generic command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlResponse {
    pub status: String,
    /// The command as it was sent to the device
    pub command: String,
    pub response: ReplyBatch,
}

/// Reply to the `sensors` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SensorResponse {
    Reading(SensorReading),
    Unavailable { error: String },
}

impl SensorResponse {
    pub fn unavailable() -> Self {
        SensorResponse::Unavailable {
            error: SENSORS_UNAVAILABLE.to_string(),
        }
    }
}

/// A rejected request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl From<BridgeError> for ErrorResponse {
    fn from(e: BridgeError) -> Self {
        ErrorResponse {
            status: "error".to_string(),
            message: e.to_string(),
        }
    }
}

/// Any response the bridge produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Control(ControlResponse),
    Sensors(SensorResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error(_))
    }
}

/// Builds the command to send from the request's `command` and `message`
/// fields. Commands starting with `lcd` carry the message instead.
pub fn command_from_request(
    command: Option<&str>,
    message: Option<&str>,
) -> Result<Command, BridgeError> {
    let command = command.map(str::trim).unwrap_or_default();
    if command.is_empty() {
        return Err(BridgeError::MissingCommand);
    }
    if command.starts_with(LCD_COMMAND) {
        return Command::lcd(message.unwrap_or_default());
    }
    Command::new(command)
}

/// Request boundary over one exchanger.
pub struct Bridge<L: SerialLink = tokio_serial::SerialStream> {
    exchanger: Exchanger<L>,
}

impl Bridge<tokio_serial::SerialStream> {
    /// Opens the configured port. Never fails; an unopenable port gives a
    /// bridge whose responses all report the port as unavailable.
    pub async fn open(config: &SerialConfig) -> Self {
        Self::new(Exchanger::open(config).await)
    }
}

impl<L: SerialLink> Bridge<L> {
    pub fn new(exchanger: Exchanger<L>) -> Self {
        Bridge { exchanger }
    }

    pub fn exchanger(&self) -> &Exchanger<L> {
        &self.exchanger
    }

    /// Generic passthrough. `sensors` is sent like any other command here.
    pub async fn control(
        &self,
        command: Option<&str>,
        message: Option<&str>,
    ) -> Result<ControlResponse, BridgeError> {
        let command = command_from_request(command, message)?;
        let response = self.exchanger.exchange(&command).await;
        Ok(ControlResponse {
            status: "success".to_string(),
            command: command.to_string(),
            response,
        })
    }

    /// Reads and parses every sensor.
    pub async fn sensors(&self) -> SensorResponse {
        let Some(batch) = self.exchanger.exchange_fresh(&Command::sensors()).await else {
            return SensorResponse::unavailable();
        };
        let reading = parse_sensors(&batch);
        info!("Parsed sensor data: {reading:?}");
        SensorResponse::Reading(reading)
    }

    /// Routes a request: `sensors` to the parser, everything else through
    /// `control`.
    pub async fn handle(&self, command: Option<&str>, message: Option<&str>) -> Response {
        if command.map(str::trim) == Some(SENSORS_COMMAND) {
            return Response::Sensors(self.sensors().await);
        }
        match self.control(command, message).await {
            Ok(response) => Response::Control(response),
            Err(e) => Response::Error(e.into()),
        }
    }

    /// Handles one line of interactive input. `lcd <text>` sends `<text>` to
    /// the display; any other line is a command.
    pub async fn handle_line(&self, line: &str) -> Response {
        let line = line.trim();
        match line.split_once(char::is_whitespace) {
            Some((command, message)) if command.starts_with(LCD_COMMAND) => {
                self.handle(Some(command), Some(message.trim_start())).await
            }
            _ if line.starts_with(LCD_COMMAND) => self.handle(Some(line), Some("")).await,
            _ => self.handle(Some(line), None).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_from_request_plain() {
        let command = command_from_request(Some(" servo 90 "), None).unwrap();
        assert_eq!(command.as_str(), "servo 90");
    }

    #[test]
    fn test_command_from_request_missing() {
        assert!(matches!(
            command_from_request(None, None),
            Err(BridgeError::MissingCommand)
        ));
        assert!(matches!(
            command_from_request(Some("  "), Some("x")),
            Err(BridgeError::MissingCommand)
        ));
    }

    #[test]
    fn test_command_from_request_lcd() {
        let command = command_from_request(Some("lcd"), Some("Hi there")).unwrap();
        assert_eq!(command.as_str(), r#"lcd "Hi there""#);

        let command = command_from_request(Some("lcd"), None).unwrap();
        assert_eq!(command.as_str(), r#"lcd """#);
    }

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse::from(BridgeError::MissingCommand);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "error", "message": "No command provided."})
        );
    }

    #[test]
    fn test_sensor_unavailable_shape() {
        let json = serde_json::to_value(SensorResponse::unavailable()).unwrap();
        assert_eq!(json, serde_json::json!({"error": "Serial port not available."}));
    }
}
