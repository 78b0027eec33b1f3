//! Simulated battery monitor and clock for tests

use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::sync::Once;

use embedded_io::{ErrorType, Read, ReadReady, Write};

use crate::clock::Clock;

static INIT: Once = Once::new();

/// Install a logger once for the whole test binary
pub fn init_logging() {
    INIT.call_once(|| {
        simple_logger::init_with_level(log::Level::Debug).unwrap();
    });
}

/// Clock that only moves when told to
///
/// With a step set, every reading advances the clock by that step,
/// which lets busy waiting code observe time passing.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
    step: Cell<u32>,
}
impl ManualClock {
    pub fn new(start: u32) -> Self {
        Self {
            now: Cell::new(start),
            step: Cell::new(0),
        }
    }
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
    pub fn set_step(&self, ms: u32) {
        self.step.set(ms);
    }
}
impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step.get()));
        now
    }
}

/// Raw register values of the simulated device
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub address: u8,
    // r00
    pub sensor_type: i64,
    pub voltage_range: i64,
    pub current_range: i64,
    pub version: i64,
    pub serial: i64,
    // r50
    pub voltage: i64,
    pub current: i64,
    pub remaining_capacity: i64,
    pub cumulative_capacity: i64,
    pub energy: i64,
    pub runtime: i64,
    pub temperature: i64,
    pub output_state: i64,
    pub current_direction: i64,
    pub battery_life: i64,
    pub internal_resistance: i64,
    // r51
    pub ovp: i64,
    pub uvp: i64,
    pub ocp_forward: i64,
    pub ocp_reverse: i64,
    pub opp: i64,
    pub otp: i64,
    pub recovery_time: i64,
    pub delay_time: i64,
    pub battery_capacity: i64,
    pub voltage_calibration: i64,
    pub current_calibration: i64,
    pub temperature_calibration: i64,
    pub relay_type: i64,
    pub current_multiplier: i64,
    pub voltage_scale: i64,
    pub current_scale: i64,
}
impl DeviceState {
    fn new(address: u8) -> Self {
        Self {
            address,
            sensor_type: 1,
            voltage_range: 1,
            current_range: 20,
            version: 100,
            serial: 101,
            voltage: 2056,
            current: 200,
            remaining_capacity: 5408,
            cumulative_capacity: 4592,
            energy: 9437,
            runtime: 14353,
            temperature: 134,
            output_state: 0,
            current_direction: 0,
            battery_life: 162,
            internal_resistance: 30682,
            ovp: 3000,
            uvp: 100,
            ocp_forward: 2000,
            ocp_reverse: 2000,
            opp: 10000,
            otp: 151,
            recovery_time: 10,
            delay_time: 7,
            battery_capacity: 200,
            voltage_calibration: 120,
            current_calibration: 90,
            temperature_calibration: 101,
            relay_type: 0,
            current_multiplier: 2,
            voltage_scale: 12,
            current_scale: 13,
        }
    }
}

/// A battery monitor on the other end of the wire
///
/// Answers commands addressed to it as soon as the terminating CR LF is written.
#[derive(Debug)]
pub struct SimDevice {
    pub state: DeviceState,
    /// Every command received, without CR LF
    pub commands: Vec<String>,
    /// Don't answer at all
    pub silent: bool,
    /// Send a wrong checksum with every read response
    pub corrupt_checksum: bool,
    /// Answer writes with a non zero return code
    pub reject_writes: bool,
    rx: VecDeque<u8>,
    incoming: Vec<u8>,
    replies: VecDeque<Vec<u8>>,
}
impl SimDevice {
    pub fn new(address: u8) -> Self {
        Self {
            state: DeviceState::new(address),
            commands: Vec::new(),
            silent: false,
            corrupt_checksum: false,
            reject_writes: false,
            rx: VecDeque::new(),
            incoming: Vec::new(),
            replies: VecDeque::new(),
        }
    }
    /// Put bytes on the wire towards the host
    pub fn push_rx(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes);
    }
    pub fn rx_len(&self) -> usize {
        self.rx.len()
    }
    /// Answer the next command with `reply` instead of the simulated response
    pub fn queue_reply(&mut self, reply: &[u8]) {
        self.replies.push_back(reply.to_vec());
    }
    pub fn last_command(&self) -> Option<&str> {
        self.commands.last().map(String::as_str)
    }

    fn receive(&mut self, byte: u8) {
        self.incoming.push(byte);
        if self.incoming.ends_with(b"\r\n") {
            let raw = std::mem::take(&mut self.incoming);
            let command = String::from_utf8_lossy(&raw[..raw.len() - 2]).into_owned();
            self.commands.push(command.clone());
            self.process(&command);
        }
    }

    fn process(&mut self, command: &str) {
        if self.silent {
            return;
        }
        if let Some(reply) = self.replies.pop_front() {
            self.push_rx(&reply);
            return;
        }
        let Some((operation, function, address, parameter)) = parse_command(command) else {
            return;
        };
        if address != self.state.address {
            return;
        }
        match operation {
            'R' => self.respond_read(function),
            'W' => self.respond_write(function, address, parameter),
            _ => {}
        }
    }

    fn respond_read(&mut self, function: u8) {
        let s = &self.state;
        let payload = match function {
            0 => vec![
                s.sensor_type * 1000 + s.voltage_range * 100 + s.current_range,
                s.version,
                s.serial,
            ],
            50 => vec![
                s.voltage,
                s.current,
                s.remaining_capacity,
                s.cumulative_capacity,
                s.energy,
                s.runtime,
                s.temperature,
                0,
                s.output_state,
                s.current_direction,
                s.battery_life,
                s.internal_resistance,
            ],
            51 => vec![
                s.ovp,
                s.uvp,
                s.ocp_forward,
                s.ocp_reverse,
                s.opp,
                s.otp,
                s.recovery_time,
                s.delay_time,
                s.battery_capacity,
                s.voltage_calibration,
                s.current_calibration,
                s.temperature_calibration,
                0,
                s.relay_type,
                s.current_multiplier,
                s.voltage_scale,
                s.current_scale,
            ],
            _ => return,
        };
        let mut checksum = payload.iter().sum::<i64>().rem_euclid(255) + 1;
        if self.corrupt_checksum {
            checksum += 1;
        }
        let mut reply = format!(":r{function:02}={},{checksum},", self.state.address);
        for value in payload {
            reply.push_str(&format!("{value},"));
        }
        reply.push_str("\r\n");
        self.push_rx(reply.as_bytes());
    }

    fn respond_write(&mut self, function: u8, address: u8, parameter: i64) {
        let known = !self.reject_writes && self.apply_write(function, parameter);
        let return_code = if known { 0 } else { 1 };
        let reply = format!(
            ":w{function:02}={address},{},{return_code},\r\n",
            return_code + 1
        );
        self.push_rx(reply.as_bytes());
    }

    fn apply_write(&mut self, function: u8, parameter: i64) -> bool {
        let s = &mut self.state;
        match function {
            1 => s.address = parameter as u8,
            10 => s.output_state = if parameter == 1 { 0 } else { 255 },
            20 => s.ovp = parameter,
            21 => s.uvp = parameter,
            22 => s.ocp_forward = parameter,
            23 => s.ocp_reverse = parameter,
            24 => s.opp = parameter,
            25 => s.otp = parameter,
            28 => s.battery_capacity = parameter,
            29 => s.voltage_calibration = parameter,
            30 => s.current_calibration = parameter,
            31 => s.temperature_calibration = parameter,
            34 => s.relay_type = parameter,
            36 => s.current_multiplier = parameter,
            60 => s.remaining_capacity = s.battery_capacity * parameter,
            61 => s.current = 0,
            62 => {
                s.cumulative_capacity = 0;
                s.energy = 0;
            }
            _ => return false,
        }
        true
    }
}

/// Split `:Rff=addr,chk,param,` into its parts, `None` on a bad checksum
fn parse_command(command: &str) -> Option<(char, u8, u8, i64)> {
    let rest = command.strip_prefix(':')?;
    let operation = rest.chars().next()?;
    let function = rest.get(1..3)?.parse().ok()?;
    let (_, fields) = rest.split_once('=')?;
    let mut fields = fields.split(',');
    let address = fields.next()?.parse().ok()?;
    let checksum: i64 = fields.next()?.parse().ok()?;
    let parameter: i64 = fields.next()?.parse().ok()?;
    if checksum != parameter.rem_euclid(255) + 1 {
        return None;
    }
    Some((operation, function, address, parameter))
}

impl ErrorType for SimDevice {
    type Error = Infallible;
}
impl Read for SimDevice {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        let mut count = 0;
        for slot in buf.iter_mut() {
            let Some(byte) = self.rx.pop_front() else {
                break;
            };
            *slot = byte;
            count += 1;
        }
        Ok(count)
    }
}
impl ReadReady for SimDevice {
    fn read_ready(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.rx.is_empty())
    }
}
impl Write for SimDevice {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        for byte in buf {
            self.receive(*byte);
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(device: &mut SimDevice, command: &[u8]) -> String {
        device.write_all(command).unwrap();
        let mut buf = vec![0u8; device.rx_len()];
        let n = device.read(&mut buf).unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn answers_basic_info() {
        let mut device = SimDevice::new(1);
        assert_eq!(exchange(&mut device, b":R00=1,2,1,\r\n"), ":r00=1,47,1120,100,101,\r\n");
        assert_eq!(device.last_command(), Some(":R00=1,2,1,"));
    }

    #[test]
    fn ignores_other_addresses_and_bad_checksums() {
        let mut device = SimDevice::new(1);
        assert_eq!(exchange(&mut device, b":R50=2,2,1,\r\n"), "");
        assert_eq!(exchange(&mut device, b":R50=1,3,1,\r\n"), "");
        assert_eq!(device.commands.len(), 2);
    }

    #[test]
    fn acknowledges_writes() {
        let mut device = SimDevice::new(1);
        assert_eq!(exchange(&mut device, b":W20=1,166,1440,\r\n"), ":w20=1,1,0,\r\n");
        assert_eq!(device.state.ovp, 1440);
        assert_eq!(exchange(&mut device, b":W99=1,100,99,\r\n"), ":w99=1,2,1,\r\n");
    }
}
