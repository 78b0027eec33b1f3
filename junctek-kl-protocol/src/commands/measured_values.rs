use core::fmt::Display;

use super::{
    CAPACITY_SCALE, CURRENT_SCALE, ENERGY_SCALE, RESISTANCE_SCALE, TEMPERATURE_OFFSET,
    VOLTAGE_SCALE,
};
use crate::frame::Line;
use crate::types::{CurrentDirection, OutputState};

/// Response payload of a "_read measured values_" command (`r50`)
///
/// | Field | Content |
/// |---|---|
/// | 3 | voltage (0.01V) |
/// | 4 | current (0.01A) |
/// | 5 | remaining capacity (0.001Ah) |
/// | 6 | cumulative capacity (0.001Ah) |
/// | 7 | energy (0.00001kWh) |
/// | 8 | running time (s) |
/// | 9 | temperature (°C + 100) |
/// | 10 | reserved |
/// | 11 | output state |
/// | 12 | current direction |
/// | 13 | remaining battery life (min) |
/// | 14 | internal resistance (0.01) |
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasuredValues {
    pub device_address: u8,
    /// Battery voltage in V
    pub voltage: f32,
    /// Battery current in A, negative while discharging
    pub current: f32,
    /// Remaining capacity in Ah
    pub remaining_capacity: f32,
    /// Cumulative capacity in Ah
    pub cumulative_capacity: f32,
    /// Accumulated energy in kWh
    pub energy: f32,
    pub internal_resistance: f32,
    /// Running time in s
    pub uptime: u32,
    /// Remaining battery life in min
    pub battery_life_left: u32,
    /// Temperature in °C
    pub temperature: i32,
    pub output_state: OutputState,
    pub current_direction: CurrentDirection,
    /// [crate::Clock] time of the read
    pub last_read_ms: u32,
}

impl MeasuredValues {
    /// Parse the measured values from a response read at `now_ms`
    pub fn from_line(line: &Line, now_ms: u32) -> Self {
        let current_direction = CurrentDirection::from(line.field_int(12).clamp(0, 255) as u8);
        let current = line.field_scaled(4, CURRENT_SCALE);
        let current = match current_direction {
            CurrentDirection::Charging => current,
            CurrentDirection::Discharging => -current.abs(),
        };

        Self {
            device_address: line.field_int(1).clamp(0, u8::MAX as i32) as u8,
            voltage: line.field_scaled(3, VOLTAGE_SCALE),
            current,
            remaining_capacity: line.field_scaled(5, CAPACITY_SCALE),
            cumulative_capacity: line.field_scaled(6, CAPACITY_SCALE),
            energy: line.field_scaled(7, ENERGY_SCALE),
            internal_resistance: line.field_scaled(14, RESISTANCE_SCALE),
            uptime: line.field_int(8).max(0) as u32,
            battery_life_left: line.field_int(13).max(0) as u32,
            temperature: line.field_int(9) - TEMPERATURE_OFFSET,
            output_state: OutputState::from(line.field_int(11).clamp(0, 255) as u8),
            current_direction,
            last_read_ms: now_ms,
        }
    }
    /// Power in W, negative while discharging
    pub fn power(&self) -> f32 {
        self.voltage * self.current
    }
}

impl Display for MeasuredValues {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Voltage: {:.2}V", self.voltage)?;
        writeln!(f, "Current: {:.2}A ({})", self.current, self.current_direction)?;
        writeln!(f, "Remaining capacity: {:.3}Ah", self.remaining_capacity)?;
        writeln!(f, "Cumulative capacity: {:.3}Ah", self.cumulative_capacity)?;
        writeln!(f, "Energy: {:.5}kWh", self.energy)?;
        writeln!(f, "Internal resistance: {:.2}", self.internal_resistance)?;
        writeln!(f, "Running time: {}s", self.uptime)?;
        writeln!(f, "Battery life left: {}min", self.battery_life_left)?;
        writeln!(f, "Temperature: {}°C", self.temperature)?;
        writeln!(f, "Output: {}", self.output_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEASURED: &[u8] = b":r50=2,215,2056,200,5408,4592,9437,14353,134,0,0,0,162,30682,\r\n";

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.0001,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn parse_measured_values() {
        let line = Line::from_bytes(MEASURED).unwrap();
        let values = MeasuredValues::from_line(&line, 42);
        assert_eq!(values.device_address, 2);
        assert_close(values.voltage, 20.56);
        assert_close(values.current, 2.0);
        assert_close(values.remaining_capacity, 5.408);
        assert_close(values.cumulative_capacity, 4.592);
        assert_close(values.energy, 0.09437);
        assert_close(values.internal_resistance, 306.82);
        assert_eq!(values.uptime, 14353);
        assert_eq!(values.temperature, 34);
        assert_eq!(values.output_state, OutputState::On);
        assert_eq!(values.current_direction, CurrentDirection::Charging);
        assert_eq!(values.battery_life_left, 162);
        assert_eq!(values.last_read_ms, 42);
    }

    #[test]
    fn discharging_current_is_negative() {
        let line =
            Line::from_bytes(b":r50=1,1,1200,125,0,0,0,0,100,0,0,1,0,0,\r\n").unwrap();
        let values = MeasuredValues::from_line(&line, 0);
        assert_eq!(values.current_direction, CurrentDirection::Discharging);
        assert_close(values.current, -1.25);
        assert_close(values.power(), -15.0);
        assert_eq!(values.temperature, 0);
    }

    #[test]
    fn signed_current_field_is_kept() {
        let line = Line::from_bytes(b":r50=1,1,1200,-125,0,0,0,0,100,0,0,0,0,0,\r\n").unwrap();
        let values = MeasuredValues::from_line(&line, 0);
        assert_close(values.current, -1.25);
    }

    #[test]
    fn output_off_and_short_line() {
        let line = Line::from_bytes(b":r50=1,1,1200,0,0,0,0,0,90,0,255,\r\n").unwrap();
        let values = MeasuredValues::from_line(&line, 0);
        assert_eq!(values.output_state, OutputState::Off);
        assert_eq!(values.temperature, -10);
        // Missing fields read as zero
        assert_eq!(values.battery_life_left, 0);
        assert_close(values.internal_resistance, 0.0);
    }
}
