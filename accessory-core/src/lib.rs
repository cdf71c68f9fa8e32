#![cfg_attr(not(feature = "std"), no_std)]

//! # Accessory Core
//!
//! Low-level primitives for a button-driven accessory: a polled
//! Single/Double/Long press classifier and a repeat transmitter for timed
//! pulse trains on a single-wire output.

pub mod types;
pub mod hal;
pub mod button;
pub mod pulse;
pub mod transmitter;
pub mod touch;
pub mod util;

#[cfg(feature = "test-utils")]
pub mod test_utils;


pub use types::*;
pub use button::*;
pub use pulse::*;
pub use transmitter::*;
pub use touch::{set_touch_threshold, touch_threshold, TouchProbe, TouchSense};
pub use hal::{*, Instant, Duration};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Thresholds for a status button: single and long presses, no doubles
pub fn default_timing() -> GestureTiming {
    GestureTiming::default()
}
