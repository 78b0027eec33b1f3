//! Data types associated with the read commands
//!
//! The device encodes physical values as fixed point integers,
//! `physical = raw / scale` unless an offset is noted.

mod basic_info;
mod measured_values;
mod set_values;

pub use basic_info::*;
pub use measured_values::*;
pub use set_values::*;

/// Volts, for measurements and voltage thresholds
pub const VOLTAGE_SCALE: f32 = 100.0;
/// Amperes, for measurements and current thresholds
pub const CURRENT_SCALE: f32 = 100.0;
/// Watts, for the power threshold
pub const POWER_SCALE: f32 = 100.0;
/// Ampere-hours, for remaining and cumulative capacity
pub const CAPACITY_SCALE: f32 = 1000.0;
/// Ampere-hours, for the configured battery capacity
pub const BATTERY_CAPACITY_SCALE: f32 = 10.0;
/// Kilowatt-hours, for the accumulated energy
pub const ENERGY_SCALE: f32 = 100_000.0;
/// Ohms, for the internal resistance
pub const RESISTANCE_SCALE: f32 = 100.0;
/// Temperatures are sent as °C + 100
pub const TEMPERATURE_OFFSET: i32 = 100;
/// Calibration values are sent as offset + 100, `100` means no adjustment
pub const CALIBRATION_OFFSET: i32 = 100;
