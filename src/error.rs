//! # Bridge Error Handling
//!
//! This module defines the BridgeError enum. The protocol core never returns
//! these to its callers (device failures are reported as sentinel data); they
//! only surface at the request boundary, in configuration loading and in the
//! binary.

use thiserror::Error;

/// Represents the different error types that can occur outside the protocol core.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Indicates an error related to the serial port communication.
    #[error("Serial port error: {0}")]
    SerialPortError(String),

    /// A command was blank once trimmed.
    #[error("Command is empty")]
    EmptyCommand,

    /// A command contained a line terminator, which would split it on the wire.
    #[error("Command contains a line terminator: {0:?}")]
    EmbeddedNewline(String),

    /// The request carried no command at all.
    #[error("No command provided.")]
    MissingCommand,

    /// The configuration file could not be read.
    #[error("Config file error: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The configuration file was not valid JSON for a `SerialConfig`.
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl From<tokio_serial::Error> for BridgeError {
    fn from(e: tokio_serial::Error) -> Self {
        BridgeError::SerialPortError(e.to_string())
    }
}
