//! Bridge Protocol Constants
//!
//! Sentinel lines, markers and timing defaults shared by the serial link,
//! the exchanger and the sensor parser.

/// Sentinel returned instead of a reply when the channel never opened.
pub const SENTINEL_PORT_UNAVAILABLE: &str = "Serial port is not available.";

/// Sentinel returned when the device emitted nothing within the settle window.
pub const SENTINEL_NO_RESPONSE: &str = "No response from device.";

/// Error text of the sensor path when the channel is unavailable.
pub const SENSORS_UNAVAILABLE: &str = "Serial port not available.";

/// Line terminator appended to every command on the wire.
pub const LINE_TERMINATOR: u8 = b'\n';

/// Reserved command that asks the device for all sensor values.
pub const SENSORS_COMMAND: &str = "sensors";

/// Command prefix that is repackaged with a quoted message.
pub const LCD_COMMAND: &str = "lcd";

/// Marker carried by reply lines that hold sensor data.
pub const RESULT_MARKER: &str = "Result: ";

/// Separator between a sensor label and its value.
pub const LABEL_SEPARATOR: &str = ": ";

// ----------------------------------------------------------------------------
// Link defaults (aligned with the reference Arduino sketch)
// ----------------------------------------------------------------------------

/// Default serial device on a Raspberry Pi with an Arduino attached
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// Default baud rate
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-line read timeout
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;

/// Delay after opening the port while the board resets
pub const DEFAULT_OPEN_SETTLE_MS: u64 = 2000;

/// Delay between writing a command and draining its reply
pub const DEFAULT_REPLY_SETTLE_MS: u64 = 500;
