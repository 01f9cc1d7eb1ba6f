//! Timing parameters: speed and loop scales to absolute durations

use portable_atomic::{AtomicU32, Ordering};

use crate::hal::Duration;

/// Smallest operator scale
pub const MIN_SCALE: u32 = 1;
/// Largest operator scale
pub const MAX_SCALE: u32 = 10;
/// Unit period per speed step
pub const UNIT_STEP_MS: u64 = 100;
/// Loop delay per loop step
pub const LOOP_STEP_MS: u64 = 1000;

/// Parse an operator-entered scale.
///
/// Accepts decimal numbers and unsigned `0x`/`0o`/`0b` integer literals.
/// Unparseable input counts as 1, the value is clamped to
/// [`MIN_SCALE`]..=[`MAX_SCALE`] and rounded half up.
pub fn parse_scale(raw: &str) -> u32 {
    scale_from_f64(parse_number(raw.trim()))
}

/// Number from operator text, NaN when it is not one
fn parse_number(text: &str) -> f64 {
    let radix = match text.get(..2) {
        Some("0x") | Some("0X") => 16,
        Some("0o") | Some("0O") => 8,
        Some("0b") | Some("0B") => 2,
        _ => return text.parse::<f64>().unwrap_or(f64::NAN),
    };
    let digits = &text[2..];
    if digits.is_empty() {
        return f64::NAN;
    }
    // folded as f64 so oversized literals saturate instead of overflowing
    digits
        .chars()
        .try_fold(0.0, |acc, ch| {
            ch.to_digit(radix).map(|digit| acc * radix as f64 + digit as f64)
        })
        .unwrap_or(f64::NAN)
}

/// Clamp and round an arbitrary number to a scale
pub fn scale_from_f64(value: f64) -> u32 {
    if value.is_nan() {
        return MIN_SCALE;
    }
    let clamped = value.clamp(MIN_SCALE as f64, MAX_SCALE as f64);
    // positive after clamping, so truncation of +0.5 rounds half up
    (clamped + 0.5) as u32
}

/// Clamp an integer scale into range
pub const fn clamp_scale(scale: u32) -> u32 {
    if scale < MIN_SCALE {
        MIN_SCALE
    } else if scale > MAX_SCALE {
        MAX_SCALE
    } else {
        scale
    }
}

/// Unit period (one dot) for a raw speed input, 100..=1000 ms
pub fn unit_period(raw_speed: &str) -> Duration {
    unit_period_for_scale(parse_scale(raw_speed))
}

/// Loop delay for a raw loop input, 1000..=10000 ms
pub fn loop_delay(raw_loop: &str) -> Duration {
    loop_delay_for_scale(parse_scale(raw_loop))
}

pub fn unit_period_for_scale(scale: u32) -> Duration {
    Duration::from_millis(UNIT_STEP_MS * clamp_scale(scale) as u64)
}

pub fn loop_delay_for_scale(scale: u32) -> Duration {
    Duration::from_millis(LOOP_STEP_MS * clamp_scale(scale) as u64)
}

/// Source of timing values, consulted on every tick
pub trait TimingSource {
    /// Duration of one dot
    fn unit_period(&self) -> Duration;

    /// Pause after the full phrase before it repeats
    fn loop_delay(&self) -> Duration;
}

impl<T: TimingSource + ?Sized> TimingSource for &T {
    fn unit_period(&self) -> Duration {
        (**self).unit_period()
    }

    fn loop_delay(&self) -> Duration {
        (**self).loop_delay()
    }
}

#[cfg(feature = "std")]
impl<T: TimingSource + ?Sized> TimingSource for std::sync::Arc<T> {
    fn unit_period(&self) -> Duration {
        (**self).unit_period()
    }

    fn loop_delay(&self) -> Duration {
        (**self).loop_delay()
    }
}

/// Fixed timing configuration
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// Speed scale, 1..=10
    pub speed_scale: u32,
    /// Loop scale, 1..=10
    pub loop_scale: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            speed_scale: MIN_SCALE,
            loop_scale: MIN_SCALE,
        }
    }
}

impl TimingConfig {
    /// Create a configuration, clamping both scales
    pub const fn new(speed_scale: u32, loop_scale: u32) -> Self {
        Self {
            speed_scale: clamp_scale(speed_scale),
            loop_scale: clamp_scale(loop_scale),
        }
    }

    /// Build from raw operator input
    pub fn from_inputs(raw_speed: &str, raw_loop: &str) -> Self {
        Self::new(parse_scale(raw_speed), parse_scale(raw_loop))
    }

    /// Build from stored millisecond values (unit period, loop delay)
    pub fn from_millis(speed_ms: f64, loop_ms: f64) -> Self {
        Self::new(
            scale_from_f64(speed_ms / UNIT_STEP_MS as f64),
            scale_from_f64(loop_ms / LOOP_STEP_MS as f64),
        )
    }

    /// Unit period in milliseconds
    pub fn speed_ms(&self) -> u64 {
        self.unit_period().as_millis()
    }

    /// Loop delay in milliseconds
    pub fn loop_ms(&self) -> u64 {
        self.loop_delay().as_millis()
    }
}

impl TimingSource for TimingConfig {
    fn unit_period(&self) -> Duration {
        unit_period_for_scale(self.speed_scale)
    }

    fn loop_delay(&self) -> Duration {
        loop_delay_for_scale(self.loop_scale)
    }
}

/// Timing shared with the operator, adjustable while emitting.
///
/// Changes are picked up by the next tick; a delay already armed is
/// never altered.
pub struct LiveTiming {
    speed_scale: AtomicU32,
    loop_scale: AtomicU32,
}

impl LiveTiming {
    pub const fn new(config: TimingConfig) -> Self {
        Self {
            speed_scale: AtomicU32::new(config.speed_scale),
            loop_scale: AtomicU32::new(config.loop_scale),
        }
    }

    /// Apply raw speed input
    pub fn set_speed(&self, raw: &str) {
        self.set_speed_scale(parse_scale(raw));
    }

    /// Apply raw loop input
    pub fn set_loop(&self, raw: &str) {
        self.set_loop_scale(parse_scale(raw));
    }

    pub fn set_speed_scale(&self, scale: u32) {
        self.speed_scale.store(clamp_scale(scale), Ordering::Relaxed);
    }

    pub fn set_loop_scale(&self, scale: u32) {
        self.loop_scale.store(clamp_scale(scale), Ordering::Relaxed);
    }

    pub fn speed_scale(&self) -> u32 {
        self.speed_scale.load(Ordering::Relaxed)
    }

    pub fn loop_scale(&self) -> u32 {
        self.loop_scale.load(Ordering::Relaxed)
    }

    /// Current values as a fixed configuration
    pub fn snapshot(&self) -> TimingConfig {
        TimingConfig::new(self.speed_scale(), self.loop_scale())
    }
}

impl Default for LiveTiming {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}

impl TimingSource for LiveTiming {
    fn unit_period(&self) -> Duration {
        unit_period_for_scale(self.speed_scale())
    }

    fn loop_delay(&self) -> Duration {
        loop_delay_for_scale(self.loop_scale())
    }
}
