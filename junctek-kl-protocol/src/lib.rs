//! Driver for JuncTek KL-F series battery monitors
//!
//! The monitor talks an ASCII protocol over a UART.
//! Every frame is a single line of comma separated fields protected by a checksum:
//!
//! ```text
//! :R50=1,2,1,\r\n                       read measured values of device 1
//! :r50=1,215,2056,200,5408,...,\r\n     response
//! ```
//!
//! [BatteryMonitor] wraps any transport implementing the [embedded_io] traits
//! [Read](embedded_io::Read), [ReadReady](embedded_io::ReadReady) and
//! [Write](embedded_io::Write) and caches the measured values, see [cache].
#![cfg_attr(not(any(test, feature = "std")), no_std)]
use core::fmt::Display;

pub mod cache;
pub mod clock;
pub mod commands;
mod frame;
mod monitor;
pub mod reader;
#[cfg(test)]
mod sim;
pub mod types;
mod util;

pub use cache::CacheState;
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use clock::Clock;
pub use frame::{Command, FunctionCode, Line, MAX_LINE_LEN, Operation};
pub use monitor::{BatteryMonitor, Config};
pub use util::checksum;

/// Default cache time for measured values in milliseconds
pub const DEFAULT_CACHE_TIME_MS: u32 = 100;
/// Default time to wait for a response in milliseconds
pub const DEFAULT_TIMEOUT_MS: u32 = 1000;

#[derive(Debug)]
#[non_exhaustive]
pub enum Error<T: embedded_io::Error> {
    /// Transport layer error
    Transport(T),
    /// No response within the timeout
    Timeout,
    /// Bad checksum for received line
    Checksum,
    /// Invalid line received or invalid command parameters
    InvalidInput,
    /// Write not acknowledged
    ///
    /// The device answered with a different function number,
    /// a different address or a non zero return code.
    Rejected,
    /// Internal error
    ///
    /// Encountered a error while formatting a command.
    Internal,
}

impl<T: embedded_io::Error> Display for Error<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "Transport error: {e}"),
            Error::Timeout => write!(f, "Timeout"),
            Error::Checksum => write!(f, "Checksum error"),
            Error::InvalidInput => write!(f, "Invalid input"),
            Error::Rejected => write!(f, "Command rejected"),
            Error::Internal => write!(f, "Internal error"),
        }
    }
}
impl<T: embedded_io::Error + 'static> core::error::Error for Error<T> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}
impl<T: embedded_io::Error> From<T> for Error<T> {
    fn from(value: T) -> Self {
        Self::Transport(value)
    }
}
impl<T: embedded_io::Error> From<embedded_io::WriteFmtError<T>> for Error<T> {
    fn from(value: embedded_io::WriteFmtError<T>) -> Self {
        match value {
            embedded_io::WriteFmtError::FmtError => Error::Internal,
            embedded_io::WriteFmtError::Other(e) => Error::Transport(e),
        }
    }
}
