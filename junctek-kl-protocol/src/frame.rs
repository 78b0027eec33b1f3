use embedded_io::Write;

use crate::Error;
use crate::util::{checksum, checksum_of_sum, from_raw, parse_int};
use core::fmt::{Debug, Display};
use log::trace;

/// The maximum length of a received line in bytes, sentinel and CR LF included
pub const MAX_LINE_LEN: usize = 160;

/// The Start of Message flag (`:`)
const SOM: u8 = b':';
/// Separates the function number from the address (`=`)
const CONNECTOR: u8 = b'=';
/// Field separator (`,`)
const SPACER: u8 = b',';

/// Read or write operation of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}
impl Operation {
    /// The letter sent in a command (`R` or `W`)
    pub fn letter(&self) -> char {
        match self {
            Operation::Read => 'R',
            Operation::Write => 'W',
        }
    }
    /// Decode the letter of a request (`R`, `W`) or a response (`r`, `w`)
    pub fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'R' | b'r' => Some(Operation::Read),
            b'W' | b'w' => Some(Operation::Write),
            _ => None,
        }
    }
}

/// Function numbers understood by the battery monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FunctionCode {
    /// Read basic information (sensor type, ranges, firmware, serial number)
    ReadBasicInfo,
    /// Set communication address
    SetAddress,
    /// Turn the output on or off
    SetOutput,
    /// Over voltage protection
    SetOverVoltageProtection,
    /// Under voltage protection
    SetUnderVoltageProtection,
    /// Forward (charging) over current protection
    SetPositiveOverCurrentProtection,
    /// Reverse (discharging) over current protection
    SetNegativeOverCurrentProtection,
    /// Over power protection
    SetOverPowerProtection,
    /// Over temperature protection
    SetOverTemperatureProtection,
    /// Battery capacity
    SetBatteryCapacity,
    SetVoltageCalibration,
    SetCurrentCalibration,
    SetTemperatureCalibration,
    /// Relay type (normally open / normally closed)
    SetRelayType,
    /// Restore factory settings
    ResetFactorySettings,
    /// Current multiplier, shares its function number with [FunctionCode::ResetFactorySettings]
    SetCurrentMultiplier,
    /// Read live measurements
    ReadMeasuredValues,
    /// Read protection and configuration settings
    ReadSetValues,
    /// Set the remaining battery percentage
    SetBatteryPercent,
    /// Zero the current reading
    ZeroCurrent,
    /// Clear accumulated capacity and energy data
    ClearAccountingData,
}
impl FunctionCode {
    /// The two digit function number
    pub fn code(&self) -> u8 {
        match self {
            FunctionCode::ReadBasicInfo => 0,
            FunctionCode::SetAddress => 1,
            FunctionCode::SetOutput => 10,
            FunctionCode::SetOverVoltageProtection => 20,
            FunctionCode::SetUnderVoltageProtection => 21,
            FunctionCode::SetPositiveOverCurrentProtection => 22,
            FunctionCode::SetNegativeOverCurrentProtection => 23,
            FunctionCode::SetOverPowerProtection => 24,
            FunctionCode::SetOverTemperatureProtection => 25,
            FunctionCode::SetBatteryCapacity => 28,
            FunctionCode::SetVoltageCalibration => 29,
            FunctionCode::SetCurrentCalibration => 30,
            FunctionCode::SetTemperatureCalibration => 31,
            FunctionCode::SetRelayType => 34,
            FunctionCode::ResetFactorySettings => 36,
            FunctionCode::SetCurrentMultiplier => 36,
            FunctionCode::ReadMeasuredValues => 50,
            FunctionCode::ReadSetValues => 51,
            FunctionCode::SetBatteryPercent => 60,
            FunctionCode::ZeroCurrent => 61,
            FunctionCode::ClearAccountingData => 62,
        }
    }
    /// Reads use `R`, everything else is sent as `W`
    pub fn operation(&self) -> Operation {
        match self {
            FunctionCode::ReadBasicInfo
            | FunctionCode::ReadMeasuredValues
            | FunctionCode::ReadSetValues => Operation::Read,
            _ => Operation::Write,
        }
    }
    /// Whether a successful write changes what the device measures
    pub fn affects_measurements(&self) -> bool {
        matches!(
            self,
            FunctionCode::SetOutput
                | FunctionCode::SetVoltageCalibration
                | FunctionCode::SetCurrentCalibration
                | FunctionCode::SetTemperatureCalibration
                | FunctionCode::ResetFactorySettings
                | FunctionCode::SetBatteryPercent
                | FunctionCode::ZeroCurrent
                | FunctionCode::ClearAccountingData
        )
    }
}

/// A command sent to the battery monitor
///
/// `:R50=1,2,1,\r\n` reads the measured values of the device with address `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    /// Device address (`1..=99`)
    pub address: u8,
    pub function: FunctionCode,
    /// Command parameter, protected by the checksum
    pub parameter: u32,
}
impl Command {
    /// Parameter sent with every read command
    const READ_PARAMETER: u32 = 1;

    pub fn new(address: u8, function: FunctionCode, parameter: u32) -> Self {
        Self {
            address,
            function,
            parameter,
        }
    }
    /// Construct a read command for `function`
    pub fn read(address: u8, function: FunctionCode) -> Self {
        Self::new(address, function, Self::READ_PARAMETER)
    }
    /// Write the ASCII encoded command to `out`
    ///
    /// Returns [Error::InvalidInput] when the address is outside of `1..=99`.
    pub fn encode<W: Write>(&self, out: &mut W) -> Result<(), Error<W::Error>> {
        if !(1..=99).contains(&self.address) {
            return Err(Error::InvalidInput);
        }
        out.write_fmt(format_args!(
            "{}{}{:02}{}{},{},{},\r\n",
            SOM as char,
            self.function.operation().letter(),
            self.function.code(),
            CONNECTOR as char,
            self.address,
            checksum(self.parameter),
            self.parameter
        ))?;
        trace!("Encoded {self:?}");
        Ok(())
    }
}

/// A line received from the battery monitor
///
/// `:r50=1,215,2056,200,...,\r\n`
///
/// Fields are counted starting at `1` after the `=`:
/// field 1 is the echoed address, field 2 the checksum and
/// fields 3 and up hold the payload of the requested function.
/// Only `,` terminated segments count as fields.
#[derive(Clone)]
pub struct Line {
    buf: [u8; MAX_LINE_LEN],
    len: usize,
}
impl Line {
    /// Construct an empty line
    pub fn new() -> Self {
        Self {
            buf: [0; MAX_LINE_LEN],
            len: 0,
        }
    }
    /// Construct a line from received bytes
    ///
    /// Returns `None` if `bytes` is longer than [MAX_LINE_LEN].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let mut line = Self::new();
        for byte in bytes {
            line.push(*byte).ok()?;
        }
        Some(line)
    }
    /// Append a byte, fails if the line is full
    pub(crate) fn push(&mut self, byte: u8) -> Result<(), ()> {
        let slot = self.buf.get_mut(self.len).ok_or(())?;
        *slot = byte;
        self.len += 1;
        Ok(())
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// The operation letter and function number after the `:` sentinel
    fn header(&self) -> Option<(u8, &[u8])> {
        let bytes = self.as_bytes();
        let som = bytes.iter().position(|&c| c == SOM)?;
        let header = bytes.get(som + 1..som + 4)?;
        Some((header[0], &header[1..]))
    }
    /// The operation echoed by the device
    pub fn operation(&self) -> Option<Operation> {
        self.header()
            .and_then(|(letter, _)| Operation::from_letter(letter))
    }
    /// The function number echoed by the device
    pub fn function_code(&self) -> Option<u8> {
        let (_, digits) = self.header()?;
        if !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        Some((digits[0] - b'0') * 10 + (digits[1] - b'0'))
    }
    /// Raw bytes of field `idx` (1-indexed)
    ///
    /// Never fails, a field that doesn't exist is empty.
    pub fn field_bytes(&self, idx: usize) -> &[u8] {
        if idx == 0 {
            return &[];
        }
        let bytes = self.as_bytes();
        // Fields start at the first `=` after the sentinel
        let som = bytes.iter().position(|&c| c == SOM).unwrap_or(0);
        let Some(connector) = bytes[som..].iter().position(|&c| c == CONNECTOR) else {
            return &[];
        };
        let fields = &bytes[som + connector + 1..];
        let count = fields.iter().filter(|&&c| c == SPACER).count();
        if idx > count {
            return &[];
        }
        fields.split(|&c| c == SPACER).nth(idx - 1).unwrap_or(&[])
    }
    /// Field `idx` (1-indexed) as text
    ///
    /// Empty if the field doesn't exist or isn't valid ASCII.
    pub fn field(&self, idx: usize) -> &str {
        core::str::from_utf8(self.field_bytes(idx)).unwrap_or("")
    }
    /// Field `idx` as integer, `0` if missing or unparsable
    pub fn field_int(&self, idx: usize) -> i32 {
        parse_int(self.field_bytes(idx))
    }
    /// Field `idx` divided by `scale`
    pub fn field_scaled(&self, idx: usize, scale: f32) -> f32 {
        from_raw(self.field_int(idx), scale)
    }
    /// The checksum the device sent (field 2)
    pub fn declared_checksum(&self) -> i32 {
        self.field_int(2)
    }
    /// The checksum over the payload
    ///
    /// Sums fields 3 and up until the first empty field.
    pub fn payload_checksum(&self) -> u32 {
        let sum = (3..)
            .map(|idx| self.field_bytes(idx))
            .take_while(|field| !field.is_empty())
            .map(|field| parse_int(field) as i64)
            .sum();
        checksum_of_sum(sum)
    }
    /// Check the declared checksum against the payload
    pub fn checksum_ok(&self) -> bool {
        self.declared_checksum() as i64 == self.payload_checksum() as i64
    }
    /// Check whether this line acknowledges a write of `function` to `address`
    ///
    /// The echoed operation and function number and the address have to match,
    /// the return code (field 3) has to be present and `0`.
    pub fn acknowledges(&self, function: FunctionCode, address: u8) -> bool {
        self.operation() == Some(Operation::Write)
            && self.function_code() == Some(function.code())
            && self.field_int(1) == address as i32
            && !self.field_bytes(3).is_empty()
            && self.field_int(3) == 0
    }
}
impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}
impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
impl Eq for Line {}
impl Display for Line {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{}", core::ascii::escape_default(*byte))?;
        }
        Ok(())
    }
}
impl Debug for Line {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Line(\"{self}\")")
    }
}
