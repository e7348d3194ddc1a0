//! The link module contains the components responsible for talking to the
//! microcontroller: the serial channel itself and the command/response
//! exchange that runs over it.

pub mod exchange;
pub mod serial;
pub mod serial_mock;

pub use exchange::*;
pub use serial::*;

/// In-memory stand-in for the device.
pub use serial_mock::MockSerialPort;
