//! Enumerations reported by the battery monitor

use core::fmt::Display;

/// Type of current sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SensorType {
    #[default]
    Unknown,
    /// Hall effect sensor
    HallSensor,
    /// Shunt sampler
    Sampler,
}
impl From<u8> for SensorType {
    fn from(value: u8) -> Self {
        match value {
            1 => SensorType::HallSensor,
            2 => SensorType::Sampler,
            _ => SensorType::Unknown,
        }
    }
}
impl Display for SensorType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SensorType::Unknown => write!(f, "unknown"),
            SensorType::HallSensor => write!(f, "hall sensor"),
            SensorType::Sampler => write!(f, "sampler"),
        }
    }
}

/// State of the output (relay)
///
/// Any state other than [OutputState::On] and [OutputState::Off] names the
/// protection that tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputState {
    On,
    /// Over voltage protection
    Ovp,
    /// Over current protection
    Ocp,
    /// Low voltage protection
    Lvp,
    /// Negative (reverse) over current protection
    Ncp,
    /// Over power protection
    Opp,
    /// Over temperature protection
    Otp,
    #[default]
    Off,
    Unknown(u8),
}
impl From<u8> for OutputState {
    fn from(value: u8) -> Self {
        match value {
            0 => OutputState::On,
            1 => OutputState::Ovp,
            2 => OutputState::Ocp,
            3 => OutputState::Lvp,
            4 => OutputState::Ncp,
            5 => OutputState::Opp,
            6 => OutputState::Otp,
            255 => OutputState::Off,
            other => OutputState::Unknown(other),
        }
    }
}
impl OutputState {
    /// Whether a protection switched the output off
    pub fn is_protection(&self) -> bool {
        !matches!(
            self,
            OutputState::On | OutputState::Off | OutputState::Unknown(_)
        )
    }
}
impl Display for OutputState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            OutputState::On => write!(f, "on"),
            OutputState::Ovp => write!(f, "over voltage protection"),
            OutputState::Ocp => write!(f, "over current protection"),
            OutputState::Lvp => write!(f, "low voltage protection"),
            OutputState::Ncp => write!(f, "negative current protection"),
            OutputState::Opp => write!(f, "over power protection"),
            OutputState::Otp => write!(f, "over temperature protection"),
            OutputState::Off => write!(f, "off"),
            OutputState::Unknown(value) => write!(f, "unknown ({value})"),
        }
    }
}

/// Direction of the battery current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrentDirection {
    /// Current flows into the battery, reported as positive current
    #[default]
    Charging,
    /// Current flows out of the battery, reported as negative current
    Discharging,
}
impl From<u8> for CurrentDirection {
    fn from(value: u8) -> Self {
        if value == 1 {
            CurrentDirection::Discharging
        } else {
            CurrentDirection::Charging
        }
    }
}
impl Display for CurrentDirection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CurrentDirection::Charging => write!(f, "charging"),
            CurrentDirection::Discharging => write!(f, "discharging"),
        }
    }
}

/// Relay contact type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayType {
    #[default]
    NormallyOpen,
    NormallyClosed,
}
impl RelayType {
    pub fn code(&self) -> u8 {
        match self {
            RelayType::NormallyOpen => 0,
            RelayType::NormallyClosed => 1,
        }
    }
}
impl From<u8> for RelayType {
    fn from(value: u8) -> Self {
        if value == 1 {
            RelayType::NormallyClosed
        } else {
            RelayType::NormallyOpen
        }
    }
}
impl Display for RelayType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            RelayType::NormallyOpen => write!(f, "normally open"),
            RelayType::NormallyClosed => write!(f, "normally closed"),
        }
    }
}
