//! Hardware abstraction for the signal actuator

// Re-export time types based on feature
#[cfg(feature = "embassy-time")]
pub use embassy_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
pub use self::mock_time::{Duration, Instant};

#[cfg(not(feature = "embassy-time"))]
mod mock_time {
    /// Millisecond instant used when embassy-time is not linked in
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Instant(u64);

    impl Instant {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub fn duration_since(&self, earlier: Instant) -> Duration {
            Duration::from_millis(self.0.saturating_sub(earlier.0))
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add<Duration> for Instant {
        type Output = Instant;

        fn add(self, rhs: Duration) -> Instant {
            Instant(self.0 + rhs.as_millis())
        }
    }

    impl core::ops::Sub<Instant> for Instant {
        type Output = Duration;

        fn sub(self, rhs: Instant) -> Duration {
            self.duration_since(rhs)
        }
    }

    /// Millisecond duration used when embassy-time is not linked in
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Duration(u64);

    impl Duration {
        pub const fn from_millis(ms: u64) -> Self {
            Self(ms)
        }

        pub const fn as_millis(&self) -> u64 {
            self.0
        }
    }

    impl core::ops::Add for Duration {
        type Output = Duration;

        fn add(self, rhs: Duration) -> Duration {
            Duration(self.0 + rhs.0)
        }
    }

    impl core::ops::AddAssign for Duration {
        fn add_assign(&mut self, rhs: Duration) {
            self.0 += rhs.0;
        }
    }

    impl core::ops::Div<u32> for Duration {
        type Output = Duration;

        fn div(self, rhs: u32) -> Duration {
            Duration(self.0 / rhs as u64)
        }
    }

    impl core::ops::Mul<u32> for Duration {
        type Output = Duration;

        fn mul(self, rhs: u32) -> Duration {
            Duration(self.0 * rhs as u64)
        }
    }
}

use embedded_hal::digital::OutputPin;

/// Error types for actuator operations
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorError {
    /// No signalling device is present
    Unavailable,
    /// Device exists but access was refused
    PermissionDenied,
    /// Device was used before being acquired
    NotAcquired,
    /// Device rejected a state change
    Io,
}

#[cfg(feature = "std")]
impl core::fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ActuatorError::Unavailable => write!(f, "No signalling device available"),
            ActuatorError::PermissionDenied => write!(f, "Access to signalling device denied"),
            ActuatorError::NotAcquired => write!(f, "Signalling device not acquired"),
            ActuatorError::Io => write!(f, "Signalling device rejected state change"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ActuatorError {}

/// Device that renders the ON/OFF signal (torch, LED, key line).
///
/// The scheduler never inspects the result beyond counting failures:
/// a device error must not stall or reorder the timing.
pub trait Actuator {
    type Error: core::fmt::Debug;

    /// Turn the signal on
    fn activate(&mut self) -> Result<(), Self::Error>;

    /// Turn the signal off
    fn deactivate(&mut self) -> Result<(), Self::Error>;

    /// Set signal state (true = on, false = off)
    fn set(&mut self, on: bool) -> Result<(), Self::Error> {
        if on {
            self.activate()
        } else {
            self.deactivate()
        }
    }
}

impl<A: Actuator + ?Sized> Actuator for &mut A {
    type Error = A::Error;

    fn activate(&mut self) -> Result<(), Self::Error> {
        (**self).activate()
    }

    fn deactivate(&mut self) -> Result<(), Self::Error> {
        (**self).deactivate()
    }
}

/// Actuator driving an embedded-hal output pin (LED or torch driver)
pub struct PinActuator<P> {
    pin: P,
    inverted: bool,
}

impl<P> PinActuator<P>
where
    P: OutputPin,
{
    pub fn new(pin: P, inverted: bool) -> Self {
        Self { pin, inverted }
    }

    /// Release the underlying pin
    pub fn into_inner(self) -> P {
        self.pin
    }

    fn drive(&mut self, on: bool) -> Result<(), ActuatorError> {
        let level = if self.inverted { !on } else { on };
        if level {
            self.pin.set_high().map_err(|_| ActuatorError::Io)
        } else {
            self.pin.set_low().map_err(|_| ActuatorError::Io)
        }
    }
}

impl<P> Actuator for PinActuator<P>
where
    P: OutputPin,
{
    type Error = ActuatorError;

    fn activate(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }

    fn deactivate(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! Mock implementations for testing

    use super::*;
    use core::cell::Cell;

    /// In-memory torch with call counters
    #[derive(Default)]
    pub struct MockTorch {
        on: Cell<bool>,
        activations: Cell<u32>,
        deactivations: Cell<u32>,
        failing: Cell<bool>,
    }

    impl MockTorch {
        pub fn new() -> Self {
            Self::default()
        }

        /// Torch whose every call reports a device error
        pub fn failing() -> Self {
            let torch = Self::default();
            torch.failing.set(true);
            torch
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.set(failing);
        }

        pub fn is_on(&self) -> bool {
            self.on.get()
        }

        pub fn activations(&self) -> u32 {
            self.activations.get()
        }

        pub fn deactivations(&self) -> u32 {
            self.deactivations.get()
        }

        /// Total number of activate/deactivate calls
        pub fn toggles(&self) -> u32 {
            self.activations() + self.deactivations()
        }

        pub fn reset_counters(&self) {
            self.activations.set(0);
            self.deactivations.set(0);
        }
    }

    impl Actuator for MockTorch {
        type Error = ActuatorError;

        fn activate(&mut self) -> Result<(), Self::Error> {
            self.activations.set(self.activations.get() + 1);
            if self.failing.get() {
                return Err(ActuatorError::Io);
            }
            self.on.set(true);
            Ok(())
        }

        fn deactivate(&mut self) -> Result<(), Self::Error> {
            self.deactivations.set(self.deactivations.get() + 1);
            if self.failing.get() {
                return Err(ActuatorError::Io);
            }
            self.on.set(false);
            Ok(())
        }
    }
}
