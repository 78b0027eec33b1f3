use core::fmt::Display;

use crate::frame::Line;
use crate::types::SensorType;
use crate::util::parse_int;

/// Response payload of a "_read basic information_" command (`r00`)
///
/// `:r00=<addr>,<checksum>,<sensor type><voltage range><current range>,<version>,<serial>,`
///
/// The first payload field packs a single digit sensor type, a single digit
/// voltage range in 100V and a two digit current range in 10A,
/// `1120` is a 100V / 200A hall sensor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicInfo {
    pub device_address: u8,
    pub sensor_type: SensorType,
    /// Maximum voltage in V
    pub max_voltage: f32,
    /// Maximum current in A
    pub max_current: f32,
    pub firmware_version: u32,
    pub serial_number: u32,
}

impl BasicInfo {
    pub fn from_line(line: &Line) -> Self {
        let ranges = line.field_bytes(3);
        let digit = |idx: usize| {
            ranges
                .get(idx)
                .filter(|c| c.is_ascii_digit())
                .map_or(0, |c| c - b'0')
        };
        let current_range = parse_int(ranges.get(2..).unwrap_or(&[])).max(0);

        Self {
            device_address: line.field_int(1).clamp(0, u8::MAX as i32) as u8,
            sensor_type: SensorType::from(digit(0)),
            max_voltage: digit(1) as f32 * 100.0,
            max_current: current_range as f32 * 10.0,
            firmware_version: line.field_int(4).max(0) as u32,
            serial_number: line.field_int(5).max(0) as u32,
        }
    }
}

impl Display for BasicInfo {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Address: {}", self.device_address)?;
        writeln!(f, "Sensor type: {}", self.sensor_type)?;
        writeln!(f, "Maximum voltage: {}V", self.max_voltage)?;
        writeln!(f, "Maximum current: {}A", self.max_current)?;
        writeln!(f, "Firmware version: {}", self.firmware_version)?;
        writeln!(f, "Serial number: {}", self.serial_number)
    }
}
