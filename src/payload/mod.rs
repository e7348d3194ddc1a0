//! The payload module contains the components responsible for turning device
//! reply lines into structured data.

pub mod sensors;

pub use sensors::*;

/// Normalized sensor values from one `sensors` exchange.
pub use sensors::SensorReading;
