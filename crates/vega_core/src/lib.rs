//! Core infrastructure for Vega.
//!
//! - [`TracingConfig`] installs the process-wide `tracing` subscriber.
//! - [`Clock`] is the time source used for elapsed-time measurements, mockable in tests.

mod time;
mod tracing_setup;

pub use time::{Clock, ClockProvider, SystemClock};
pub use tracing_setup::{TracingConfig, TracingFormat};

#[cfg(any(test, feature = "test-utils"))]
pub use time::MockClock;
