//! Time utilities and abstractions
//!
//! Wall-clock access goes through the [`Clock`] trait so that timer and
//! archival logic can be driven deterministically in tests.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Duration;
//!
//! use caseledger_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let start = clock.now();
//! clock.advance(Duration::minutes(5));
//! assert_eq!(clock.now() - start, Duration::minutes(5));
//! ```

pub mod clock;

// Re-export commonly used items
pub use clock::{Clock, MockClock, SystemClock};
