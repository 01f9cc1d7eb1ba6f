#![cfg_attr(not(any(feature = "std", test)), no_std)]

//! # Morse Core
//!
//! Turns a text phrase into precisely timed ON/OFF pulses of International
//! Morse code. Emission is a state machine advanced by re-armed single-shot
//! ticks, looping over the phrase until stopped.

pub mod types;
pub mod code;
pub mod phrase;
pub mod timing;
pub mod scheduler;
pub mod hal;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use types::*;
pub use code::{lookup, pattern, CODE_TABLE};
pub use phrase::{sanitize, Phrase, PHRASE_CAPACITY};
pub use timing::{loop_delay, parse_scale, unit_period, LiveTiming, TimingConfig, TimingSource};
pub use scheduler::*;
pub use hal::{Actuator, ActuatorError, PinActuator, Duration, Instant};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default timing: 100 ms unit period, 1000 ms loop delay
pub fn default_timing() -> TimingConfig {
    TimingConfig::default()
}
