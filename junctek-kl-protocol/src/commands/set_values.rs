use core::fmt::Display;

use super::{
    BATTERY_CAPACITY_SCALE, CALIBRATION_OFFSET, CURRENT_SCALE, POWER_SCALE, TEMPERATURE_OFFSET,
    VOLTAGE_SCALE,
};
use crate::frame::Line;
use crate::types::RelayType;

/// Response payload of a "_read set values_" command (`r51`)
///
/// Protection thresholds and configuration, in field order:
/// OVP, UVP, forward OCP, reverse OCP, OPP, OTP, recovery time, delay time,
/// battery capacity, voltage / current / temperature calibration, reserved,
/// relay type, current multiplier, voltage scale, current scale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetValues {
    pub device_address: u8,
    /// Over voltage protection in V
    pub ovp_voltage: f32,
    /// Under voltage protection in V
    pub uvp_voltage: f32,
    /// Forward over current protection in A
    pub ocp_forward_current: f32,
    /// Reverse over current protection in A
    pub ocp_reverse_current: f32,
    /// Over power protection in W
    pub opp_power: f32,
    /// Over temperature protection in °C
    pub protection_temperature: i32,
    /// s
    pub protection_recovery_time: u32,
    /// s
    pub protection_delay_time: u32,
    /// Battery capacity in Ah
    pub preset_capacity: f32,
    /// Voltage fine tuning, `0` means no adjustment
    pub voltage_calibration: i32,
    /// Current fine tuning, `0` means no adjustment
    pub current_calibration: i32,
    /// Temperature fine tuning in °C
    pub temperature_calibration: i32,
    pub relay_type: RelayType,
    pub current_multiplier: u32,
    pub voltage_scale: u32,
    pub current_scale: u32,
}

impl SetValues {
    pub fn from_line(line: &Line) -> Self {
        let unsigned = |idx: usize| line.field_int(idx).max(0) as u32;
        Self {
            device_address: line.field_int(1).clamp(0, u8::MAX as i32) as u8,
            ovp_voltage: line.field_scaled(3, VOLTAGE_SCALE),
            uvp_voltage: line.field_scaled(4, VOLTAGE_SCALE),
            ocp_forward_current: line.field_scaled(5, CURRENT_SCALE),
            ocp_reverse_current: line.field_scaled(6, CURRENT_SCALE),
            opp_power: line.field_scaled(7, POWER_SCALE),
            protection_temperature: line.field_int(8) - TEMPERATURE_OFFSET,
            protection_recovery_time: unsigned(9),
            protection_delay_time: unsigned(10),
            preset_capacity: line.field_scaled(11, BATTERY_CAPACITY_SCALE),
            voltage_calibration: line.field_int(12) - CALIBRATION_OFFSET,
            current_calibration: line.field_int(13) - CALIBRATION_OFFSET,
            temperature_calibration: line.field_int(14) - CALIBRATION_OFFSET,
            relay_type: RelayType::from(line.field_int(16).clamp(0, 255) as u8),
            current_multiplier: unsigned(17),
            voltage_scale: unsigned(18),
            current_scale: unsigned(19),
        }
    }
}

impl Display for SetValues {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Over voltage protection: {:.2}V", self.ovp_voltage)?;
        writeln!(f, "Under voltage protection: {:.2}V", self.uvp_voltage)?;
        writeln!(
            f,
            "Forward over current protection: {:.2}A",
            self.ocp_forward_current
        )?;
        writeln!(
            f,
            "Reverse over current protection: {:.2}A",
            self.ocp_reverse_current
        )?;
        writeln!(f, "Over power protection: {:.2}W", self.opp_power)?;
        writeln!(
            f,
            "Over temperature protection: {}°C",
            self.protection_temperature
        )?;
        writeln!(f, "Recovery time: {}s", self.protection_recovery_time)?;
        writeln!(f, "Delay time: {}s", self.protection_delay_time)?;
        writeln!(f, "Battery capacity: {:.1}Ah", self.preset_capacity)?;
        writeln!(
            f,
            "Calibration: voltage {:+}, current {:+}, temperature {:+}°C",
            self.voltage_calibration, self.current_calibration, self.temperature_calibration
        )?;
        writeln!(f, "Relay: {}", self.relay_type)?;
        writeln!(f, "Current multiplier: {}", self.current_multiplier)?;
        writeln!(
            f,
            "Scale: {}V/div, {}A/div",
            self.voltage_scale, self.current_scale
        )
    }
}
