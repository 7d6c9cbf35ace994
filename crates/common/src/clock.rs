//! Timing utilities for the sample pipeline.
//!
//! Every sample carries a monotonic timestamp in nanoseconds supplied by the
//! producer. Rate limiting, stillness timeouts and click cooldowns are all
//! measured on that timeline, never on the wall clock of the consumer.

/// Monotonic timestamp in nanoseconds.
pub type TimestampNs = u64;

/// Convert a nanosecond value to seconds.
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

/// Convert seconds to nanoseconds. Negative or non-finite input maps to 0.
pub fn secs_to_ns(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1_000_000_000.0).round() as u64
    } else {
        0
    }
}

/// Seconds elapsed from `earlier` to `later`; zero if time went backwards.
pub fn elapsed_secs(earlier: TimestampNs, later: TimestampNs) -> f64 {
    ns_to_secs(later.saturating_sub(earlier))
}

/// Enforces a minimum interval between accepted updates.
///
/// Packets arriving too early are dropped, not queued.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval_ns: u64,
    last_accepted_ns: Option<TimestampNs>,
}

impl RateLimiter {
    /// Create a limiter with the given minimum interval in nanoseconds.
    pub fn new(interval_ns: u64) -> Self {
        Self {
            interval_ns,
            last_accepted_ns: None,
        }
    }

    /// Create a limiter from an interval in seconds.
    pub fn from_secs(interval_secs: f64) -> Self {
        Self::new(secs_to_ns(interval_secs))
    }

    /// Admit an update at `now_ns` if the interval has elapsed.
    ///
    /// The first call always admits. A rejected call leaves the limiter
    /// untouched, as does a timestamp older than the last accepted one.
    pub fn try_acquire(&mut self, now_ns: TimestampNs) -> bool {
        match self.last_accepted_ns {
            None => {
                self.last_accepted_ns = Some(now_ns);
                true
            }
            Some(last) if now_ns >= last && now_ns - last >= self.interval_ns => {
                self.last_accepted_ns = Some(now_ns);
                true
            }
            _ => false,
        }
    }

    /// Minimum interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.interval_ns
    }

    /// Timestamp of the last admitted update.
    pub fn last_accepted_ns(&self) -> Option<TimestampNs> {
        self.last_accepted_ns
    }
}
