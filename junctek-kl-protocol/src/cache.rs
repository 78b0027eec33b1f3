//! Measurement cache
//!
//! Reading all measured values takes the device roughly 50ms, so polling
//! faster than every [crate::DEFAULT_CACHE_TIME_MS] is wasted work. A longer
//! cache time keeps values consistent when accessors are called further apart.

use core::fmt::Display;

/// Validity of the cached measurements
///
/// Only informational, whether a read goes to the device is decided by
/// elapsed time alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheState {
    /// Never read, last poll failed or explicitly invalidated
    #[default]
    Invalid,
    /// Freshly read and checksum verified
    Valid,
    /// Cache time elapsed since the last successful read
    Stale,
}
impl Display for CacheState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CacheState::Invalid => write!(f, "invalid"),
            CacheState::Valid => write!(f, "valid"),
            CacheState::Stale => write!(f, "stale"),
        }
    }
}

/// Decides when measurements have to be re-read from the device
#[derive(Debug, Clone)]
pub struct MeasurementCache {
    /// Time of the last successful read, `None` forces a read
    last_read_ms: Option<u32>,
    ttl_ms: u32,
    state: CacheState,
}
impl MeasurementCache {
    pub fn new(ttl_ms: u32) -> Self {
        Self {
            last_read_ms: None,
            ttl_ms,
            state: CacheState::Invalid,
        }
    }
    pub fn ttl(&self) -> u32 {
        self.ttl_ms
    }
    pub fn set_ttl(&mut self, ttl_ms: u32) {
        self.ttl_ms = ttl_ms;
    }
    pub fn state(&self) -> CacheState {
        self.state
    }
    pub fn last_read(&self) -> Option<u32> {
        self.last_read_ms
    }
    /// Whether the cache time elapsed at `now_ms`
    ///
    /// Downgrades a [CacheState::Valid] cache to [CacheState::Stale] once expired.
    pub fn should_poll(&mut self, now_ms: u32) -> bool {
        let expired = match self.last_read_ms {
            Some(last) => now_ms.wrapping_sub(last) >= self.ttl_ms,
            None => true,
        };
        if expired && self.state == CacheState::Valid {
            self.state = CacheState::Stale;
        }
        expired
    }
    /// Record a successful, checksum verified read at `now_ms`
    pub fn mark_valid(&mut self, now_ms: u32) {
        self.last_read_ms = Some(now_ms);
        self.state = CacheState::Valid;
    }
    /// Record a failed read, the timestamp is left alone
    pub fn mark_invalid(&mut self) {
        self.state = CacheState::Invalid;
    }
    /// Force the next [MeasurementCache::should_poll] to return `true`
    pub fn invalidate(&mut self) {
        self.last_read_ms = None;
        self.state = CacheState::Invalid;
    }
}
