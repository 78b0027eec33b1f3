//! Time source used for the response timeout and the measurement cache

/// Monotonic millisecond clock
///
/// The counter is allowed to wrap around, all comparisons use wrapping arithmetic.
pub trait Clock {
    /// Milliseconds since an arbitrary, fixed point in time
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since`
    fn elapsed_ms(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// [Clock] backed by [std::time::Instant]
#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: std::time::Instant,
}

#[cfg(feature = "std")]
impl StdClock {
    pub fn new() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for StdClock {
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
