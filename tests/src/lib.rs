//! Host-based tests for the Morse beacon
//!
//! Emission timing runs on a virtual clock, the session driver on tokio's
//! paused clock and the embassy driver on the std time driver.

#[cfg(test)]
mod actuator_tests;
#[cfg(test)]
mod embassy_tests;
#[cfg(test)]
mod emission_tests;
