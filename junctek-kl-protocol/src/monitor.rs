use embedded_io::{Read, ReadReady, Write};
use log::{debug, warn};

use crate::cache::{CacheState, MeasurementCache};
use crate::clock::Clock;
use crate::commands::{
    BATTERY_CAPACITY_SCALE, BasicInfo, CALIBRATION_OFFSET, CURRENT_SCALE, MeasuredValues,
    POWER_SCALE, SetValues, TEMPERATURE_OFFSET, VOLTAGE_SCALE,
};
use crate::frame::{Command, FunctionCode, Line, Operation};
use crate::reader::{discard_pending, read_line};
use crate::types::{CurrentDirection, OutputState, RelayType};
use crate::util::to_raw;
use crate::{DEFAULT_CACHE_TIME_MS, DEFAULT_TIMEOUT_MS, Error};

/// Settings of a [BatteryMonitor]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Device address (`1..=99`)
    pub address: u8,
    /// How long measured values are served from the cache
    pub cache_time_ms: u32,
    /// How long to wait for the first byte of a response
    pub timeout_ms: u32,
}
impl Config {
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }
    pub fn with_cache_time(mut self, cache_time_ms: u32) -> Self {
        self.cache_time_ms = cache_time_ms;
        self
    }
    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
impl Default for Config {
    fn default() -> Self {
        Self {
            address: 1,
            cache_time_ms: DEFAULT_CACHE_TIME_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// JuncTek KL-F battery monitor
///
/// Owns the last read [BasicInfo], [MeasuredValues] and [SetValues].
/// Pass the transport by `&mut` to keep ownership with the caller,
/// e.g. when several monitors share a bus. Only one exchange may be
/// in flight on a transport at any time.
///
/// Getters never fail: measured values are re-read once the cache time
/// elapsed, a failed read leaves the previous values in place.
/// Setters return whether the device acknowledged the write.
///
/// # Example
/// ```rust, no_run
/// # use junctek_kl_protocol::{BatteryMonitor, Clock, Config};
/// # fn example<U, C>(uart: U, clock: C)
/// # where U: embedded_io::Read + embedded_io::ReadReady + embedded_io::Write, C: Clock {
/// let mut monitor = BatteryMonitor::new(uart, clock, Config::new(1));
/// if monitor.attach().is_err() {
///     // no answer, values stay at zero until the device responds
/// }
/// let voltage = monitor.voltage();
/// let current = monitor.current();
/// if !monitor.set_over_voltage_protection(14.4) {
///     // not acknowledged
/// }
/// # }
/// ```
pub struct BatteryMonitor<U: Read + ReadReady + Write, C: Clock> {
    uart: U,
    clock: C,
    address: u8,
    timeout_ms: u32,
    cache: MeasurementCache,
    basic_info: BasicInfo,
    measured_values: MeasuredValues,
    set_values: SetValues,
}

impl<U: Read + ReadReady + Write, C: Clock> BatteryMonitor<U, C> {
    /// Construct a monitor, no communication takes place
    pub fn new(uart: U, clock: C, config: Config) -> Self {
        BatteryMonitor {
            uart,
            clock,
            address: config.address,
            timeout_ms: config.timeout_ms,
            cache: MeasurementCache::new(config.cache_time_ms),
            basic_info: BasicInfo::default(),
            measured_values: MeasuredValues::default(),
            set_values: SetValues::default(),
        }
    }

    /// Read basic information, settings and a first set of measured values
    pub fn attach(&mut self) -> Result<(), Error<U::Error>> {
        self.read_basic_info()?;
        self.read_set_values()?;
        self.refresh_measured_values()?;
        Ok(())
    }

    pub fn address(&self) -> u8 {
        self.address
    }
    pub fn transport(&self) -> &U {
        &self.uart
    }
    pub fn transport_mut(&mut self) -> &mut U {
        &mut self.uart
    }
    /// Give the transport back
    pub fn release(self) -> U {
        self.uart
    }

    /// Send `command` and wait for the answer
    fn exchange(&mut self, command: &Command) -> Result<Line, Error<U::Error>> {
        discard_pending(&mut self.uart)?;
        command.encode(&mut self.uart)?;
        self.uart.flush()?;
        read_line(&mut self.uart, &self.clock, self.timeout_ms)
    }

    /// Send a read command and validate the response
    fn query(&mut self, function: FunctionCode) -> Result<Line, Error<U::Error>> {
        let line = self.exchange(&Command::read(self.address, function))?;
        if line.operation() != Some(Operation::Read)
            || line.function_code() != Some(function.code())
        {
            warn!("Unexpected response to {function:?}: {line}");
            return Err(Error::InvalidInput);
        }
        if !line.checksum_ok() {
            warn!(
                "Checksum mismatch, declared {} calculated {}: {line}",
                line.declared_checksum(),
                line.payload_checksum()
            );
            return Err(Error::Checksum);
        }
        Ok(line)
    }

    /// Read the basic information from the device
    pub fn read_basic_info(&mut self) -> Result<&BasicInfo, Error<U::Error>> {
        let line = self.query(FunctionCode::ReadBasicInfo)?;
        self.basic_info = BasicInfo::from_line(&line);
        debug!("Read basic info {:?}", self.basic_info);
        Ok(&self.basic_info)
    }

    /// Read protection thresholds and configuration from the device
    pub fn read_set_values(&mut self) -> Result<&SetValues, Error<U::Error>> {
        let line = self.query(FunctionCode::ReadSetValues)?;
        self.set_values = SetValues::from_line(&line);
        debug!("Read set values {:?}", self.set_values);
        Ok(&self.set_values)
    }

    /// Read the measured values, regardless of the cache
    ///
    /// On failure the previous values are kept and the cache is marked
    /// [CacheState::Invalid].
    pub fn refresh_measured_values(&mut self) -> Result<&MeasuredValues, Error<U::Error>> {
        match self.query(FunctionCode::ReadMeasuredValues) {
            Ok(line) => {
                let now = self.clock.now_ms();
                self.measured_values = MeasuredValues::from_line(&line, now);
                self.cache.mark_valid(now);
                Ok(&self.measured_values)
            }
            Err(e) => {
                self.cache.mark_invalid();
                Err(e)
            }
        }
    }

    /// Measured values, re-read if the cache time elapsed
    pub fn measured_values(&mut self) -> &MeasuredValues {
        let now = self.clock.now_ms();
        if self.cache.should_poll(now) {
            if let Err(e) = self.refresh_measured_values() {
                warn!("Keeping measured values from {}ms: {e}", self.measured_values.last_read_ms);
            }
        }
        &self.measured_values
    }

    /// Send a write command and check the acknowledgement
    ///
    /// Neither reads back the settings nor touches the cache.
    /// Returns [Error::Rejected] if the device doesn't acknowledge the command.
    pub fn write_command(
        &mut self,
        function: FunctionCode,
        parameter: u32,
    ) -> Result<(), Error<U::Error>> {
        let line = self.exchange(&Command::new(self.address, function, parameter))?;
        if !line.acknowledges(function, self.address) {
            warn!("{function:?} {parameter} not acknowledged: {line}");
            return Err(Error::Rejected);
        }
        debug!("{function:?} {parameter} acknowledged");
        Ok(())
    }

    /// Write a setting and read the settings back
    fn write_setting(&mut self, function: FunctionCode, parameter: u32) -> bool {
        if let Err(e) = self.write_command(function, parameter) {
            warn!("Writing {function:?} failed: {e}");
            return false;
        }
        if function == FunctionCode::SetAddress {
            self.address = parameter as u8;
        }
        if function.affects_measurements() {
            self.cache.invalidate();
        }
        if let Err(e) = self.read_set_values() {
            warn!("Reading back settings after {function:?} failed: {e}");
        }
        true
    }

    /// Scale a physical value and write it
    ///
    /// Values the device can't represent are rejected without sending anything.
    fn write_physical(
        &mut self,
        function: FunctionCode,
        value: f32,
        scale: f32,
        offset: f32,
    ) -> bool {
        let Some(raw) = to_raw(value, scale, offset) else {
            warn!("{value} out of range for {function:?}");
            return false;
        };
        self.write_setting(function, raw)
    }

    /// Change the communication address of the device
    ///
    /// On success the monitor talks to the new address from then on.
    pub fn set_new_address(&mut self, address: u8) -> bool {
        if !(1..=99).contains(&address) {
            warn!("Address {address} out of range");
            return false;
        }
        self.write_setting(FunctionCode::SetAddress, address as u32)
    }
    pub fn set_output(&mut self, on: bool) -> bool {
        self.write_setting(FunctionCode::SetOutput, on as u32)
    }
    /// Over voltage protection in V
    pub fn set_over_voltage_protection(&mut self, voltage: f32) -> bool {
        self.write_physical(FunctionCode::SetOverVoltageProtection, voltage, VOLTAGE_SCALE, 0.0)
    }
    /// Under voltage protection in V
    pub fn set_under_voltage_protection(&mut self, voltage: f32) -> bool {
        self.write_physical(FunctionCode::SetUnderVoltageProtection, voltage, VOLTAGE_SCALE, 0.0)
    }
    /// Forward (charging) over current protection in A
    pub fn set_positive_over_current_protection(&mut self, current: f32) -> bool {
        self.write_physical(
            FunctionCode::SetPositiveOverCurrentProtection,
            current,
            CURRENT_SCALE,
            0.0,
        )
    }
    /// Reverse (discharging) over current protection in A
    pub fn set_negative_over_current_protection(&mut self, current: f32) -> bool {
        self.write_physical(
            FunctionCode::SetNegativeOverCurrentProtection,
            current,
            CURRENT_SCALE,
            0.0,
        )
    }
    /// Over power protection in W
    pub fn set_over_power_protection(&mut self, power: f32) -> bool {
        self.write_physical(FunctionCode::SetOverPowerProtection, power, POWER_SCALE, 0.0)
    }
    /// Over temperature protection in °C
    pub fn set_over_temperature_protection(&mut self, temperature: f32) -> bool {
        self.write_physical(
            FunctionCode::SetOverTemperatureProtection,
            temperature,
            1.0,
            TEMPERATURE_OFFSET as f32,
        )
    }
    /// Battery capacity in Ah
    pub fn set_battery_capacity(&mut self, capacity: f32) -> bool {
        self.write_physical(FunctionCode::SetBatteryCapacity, capacity, BATTERY_CAPACITY_SCALE, 0.0)
    }
    /// Voltage fine tuning, `0` for no adjustment
    pub fn set_voltage_calibration(&mut self, calibration: f32) -> bool {
        self.write_physical(
            FunctionCode::SetVoltageCalibration,
            calibration,
            1.0,
            CALIBRATION_OFFSET as f32,
        )
    }
    /// Current fine tuning, `0` for no adjustment
    pub fn set_current_calibration(&mut self, calibration: f32) -> bool {
        self.write_physical(
            FunctionCode::SetCurrentCalibration,
            calibration,
            1.0,
            CALIBRATION_OFFSET as f32,
        )
    }
    /// Temperature fine tuning in °C, `0` for no adjustment
    pub fn set_temperature_calibration(&mut self, calibration: f32) -> bool {
        self.write_physical(
            FunctionCode::SetTemperatureCalibration,
            calibration,
            1.0,
            CALIBRATION_OFFSET as f32,
        )
    }
    pub fn set_relay_type(&mut self, relay_type: RelayType) -> bool {
        self.write_setting(FunctionCode::SetRelayType, relay_type.code() as u32)
    }
    pub fn reset_factory_settings(&mut self) -> bool {
        self.write_setting(FunctionCode::ResetFactorySettings, 1)
    }
    pub fn set_current_multiplier(&mut self, multiplier: u8) -> bool {
        self.write_setting(FunctionCode::SetCurrentMultiplier, multiplier as u32)
    }
    /// Set the remaining capacity to `percent` of the battery capacity
    pub fn set_battery_percent(&mut self, percent: u8) -> bool {
        if percent > 100 {
            warn!("Battery percentage {percent} out of range");
            return false;
        }
        self.write_setting(FunctionCode::SetBatteryPercent, percent as u32)
    }
    pub fn zero_current(&mut self) -> bool {
        self.write_setting(FunctionCode::ZeroCurrent, 1)
    }
    /// Reset cumulative capacity and energy
    pub fn clear_accounting_data(&mut self) -> bool {
        self.write_setting(FunctionCode::ClearAccountingData, 1)
    }

    /// Battery voltage in V
    pub fn voltage(&mut self) -> f32 {
        self.measured_values().voltage
    }
    /// Battery current in A, negative while discharging
    pub fn current(&mut self) -> f32 {
        self.measured_values().current
    }
    pub fn internal_resistance(&mut self) -> f32 {
        self.measured_values().internal_resistance
    }
    /// Remaining capacity in Ah
    pub fn remaining_capacity(&mut self) -> f32 {
        self.measured_values().remaining_capacity
    }
    /// Cumulative capacity in Ah
    pub fn cumulative_capacity(&mut self) -> f32 {
        self.measured_values().cumulative_capacity
    }
    /// Accumulated energy in kWh
    pub fn energy(&mut self) -> f32 {
        self.measured_values().energy
    }
    /// Running time in s
    pub fn uptime(&mut self) -> u32 {
        self.measured_values().uptime
    }
    /// Remaining battery life in min
    pub fn battery_life_left(&mut self) -> u32 {
        self.measured_values().battery_life_left
    }
    /// Temperature in °C
    pub fn temperature(&mut self) -> i32 {
        self.measured_values().temperature
    }
    pub fn output_state(&mut self) -> OutputState {
        self.measured_values().output_state
    }
    pub fn current_direction(&mut self) -> CurrentDirection {
        self.measured_values().current_direction
    }

    pub fn basic_info(&self) -> &BasicInfo {
        &self.basic_info
    }
    pub fn set_values(&self) -> &SetValues {
        &self.set_values
    }
    pub fn ovp_voltage(&self) -> f32 {
        self.set_values.ovp_voltage
    }
    pub fn uvp_voltage(&self) -> f32 {
        self.set_values.uvp_voltage
    }
    pub fn ocp_forward_current(&self) -> f32 {
        self.set_values.ocp_forward_current
    }
    pub fn ocp_reverse_current(&self) -> f32 {
        self.set_values.ocp_reverse_current
    }
    pub fn opp_power(&self) -> f32 {
        self.set_values.opp_power
    }
    pub fn protection_temperature(&self) -> i32 {
        self.set_values.protection_temperature
    }
    pub fn protection_recovery_time(&self) -> u32 {
        self.set_values.protection_recovery_time
    }
    pub fn protection_delay_time(&self) -> u32 {
        self.set_values.protection_delay_time
    }
    /// Configured battery capacity in Ah
    pub fn preset_capacity(&self) -> f32 {
        self.set_values.preset_capacity
    }
    pub fn voltage_calibration(&self) -> i32 {
        self.set_values.voltage_calibration
    }
    pub fn current_calibration(&self) -> i32 {
        self.set_values.current_calibration
    }
    pub fn temperature_calibration(&self) -> i32 {
        self.set_values.temperature_calibration
    }
    pub fn relay_type(&self) -> RelayType {
        self.set_values.relay_type
    }
    pub fn current_multiplier(&self) -> u32 {
        self.set_values.current_multiplier
    }
    pub fn voltage_scale(&self) -> u32 {
        self.set_values.voltage_scale
    }
    pub fn current_scale(&self) -> u32 {
        self.set_values.current_scale
    }

    /// Set how long measured values are served from the cache
    pub fn set_cache_time(&mut self, cache_time_ms: u32) {
        self.cache.set_ttl(cache_time_ms);
    }
    pub fn cache_time(&self) -> u32 {
        self.cache.ttl()
    }
    /// Force the next measurement getter to read from the device
    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }
    /// State of the measurement cache as of now
    pub fn cache_state(&mut self) -> CacheState {
        let now = self.clock.now_ms();
        self.cache.should_poll(now);
        self.cache.state()
    }
}
