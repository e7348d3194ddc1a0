//! Unit tests for the `BridgeError` enum and its `Display` output.

use mcu_bridge::error::BridgeError;

/// Tests that the `SerialPortError` variant is correctly formatted.
#[test]
fn test_serial_port_error() {
    let err = BridgeError::SerialPortError("Test error".to_string());
    assert_eq!(err.to_string(), "Serial port error: Test error");
}

#[test]
fn test_missing_command_error() {
    assert_eq!(BridgeError::MissingCommand.to_string(), "No command provided.");
}

#[test]
fn test_empty_command_error() {
    assert_eq!(BridgeError::EmptyCommand.to_string(), "Command is empty");
}

#[test]
fn test_embedded_newline_error() {
    let err = BridgeError::EmbeddedNewline("a\nb".to_string());
    assert_eq!(err.to_string(), r#"Command contains a line terminator: "a\nb""#);
}

/// Tests that I/O errors convert through `?`.
#[test]
fn test_config_io_error_conversion() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let err: BridgeError = io.into();
    assert!(matches!(err, BridgeError::ConfigIo(_)));
    assert_eq!(err.to_string(), "Config file error: gone");
}
