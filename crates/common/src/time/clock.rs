//! Clock abstraction for testability
//!
//! Provides a trait-based approach to wall-clock reads that allows for
//! deterministic testing without relying on actual time passage.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::Mutex;

/// Trait for time operations to enable testing
///
/// Implementations must be cheap to call; services read the clock once per
/// operation and use that instant for every timestamp they write.
pub trait Clock: Send + Sync {
    /// Current wall-clock time in UTC
    fn now(&self) -> DateTime<Utc>;

    /// Milliseconds since the UNIX epoch
    fn millis_since_epoch(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// Real system clock implementation
///
/// Use this in production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Mock clock for deterministic testing
///
/// Cloned clocks share the same current instant, so a test can hand one copy
/// to a service and keep another to move time forward (or backward, to
/// simulate clock skew).
///
/// # Examples
///
/// ```
/// use chrono::Duration;
///
/// use caseledger_common::time::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// let handle = clock.clone();
/// let before = clock.now();
///
/// handle.advance(Duration::seconds(90));
/// assert_eq!(clock.now() - before, Duration::seconds(90));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl MockClock {
    /// Create a mock clock pinned to 2024-01-01T09:00:00Z
    pub fn new() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).single().unwrap_or_default();
        Self::starting_at(start)
    }

    /// Create a mock clock pinned to an explicit instant
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self { current: Arc::new(Mutex::new(start)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        let mut current = self.current.lock();
        *current += duration;
    }

    /// Move the mock clock backwards, simulating a skewed wall clock
    pub fn rewind(&self, duration: Duration) {
        let mut current = self.current.lock();
        *current -= duration;
    }

    /// Set the mock clock to an absolute instant
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.current.lock() = instant;
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}
