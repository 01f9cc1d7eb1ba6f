//! Tick-driven emission scheduler
//!
//! The emitter is a state machine advanced by single-shot ticks. After every
//! step it arms exactly one new tick through a [`TickScheduler`]; whoever owns
//! the clock (an async task, a test) waits for the armed delay and hands the
//! handle back to [`Emitter::tick`].

use crate::code;
use crate::hal::{Actuator, Duration};
use crate::phrase::{self, Phrase};
use crate::timing::TimingSource;
use crate::types::{Cursor, EmissionError, EmitterState, PulseSymbol, TickHandle, TickOutcome};

/// Inter-letter gap in units
const LETTER_GAP_UNITS: u32 = 3;

/// Single-shot deferred callback provider
pub trait TickScheduler {
    /// Arm a tick to fire once after `delay`
    fn arm(&mut self, delay: Duration) -> TickHandle;

    /// Cancel a previously armed tick; unknown handles are ignored
    fn cancel(&mut self, handle: TickHandle);
}

impl<S: TickScheduler + ?Sized> TickScheduler for &mut S {
    fn arm(&mut self, delay: Duration) -> TickHandle {
        (**self).arm(delay)
    }

    fn cancel(&mut self, handle: TickHandle) {
        (**self).cancel(handle)
    }
}

/// One-slot tick scheduler for drivers that poll for the armed tick
#[derive(Debug, Default)]
pub struct SingleShot {
    armed: Option<(TickHandle, Duration)>,
    next_id: u32,
}

impl SingleShot {
    pub const fn new() -> Self {
        Self {
            armed: None,
            next_id: 0,
        }
    }

    /// Take the armed tick, leaving the slot empty
    pub fn take(&mut self) -> Option<(TickHandle, Duration)> {
        self.armed.take()
    }

    /// Armed tick without consuming it
    pub fn peek(&self) -> Option<(TickHandle, Duration)> {
        self.armed
    }
}

impl TickScheduler for SingleShot {
    fn arm(&mut self, delay: Duration) -> TickHandle {
        self.next_id = self.next_id.wrapping_add(1);
        let handle = TickHandle::new(self.next_id);
        self.armed = Some((handle, delay));
        handle
    }

    fn cancel(&mut self, handle: TickHandle) {
        if matches!(self.armed, Some((armed, _)) if armed == handle) {
            self.armed = None;
        }
    }
}

/// Morse emission state machine
pub struct Emitter<A, T, S> {
    actuator: A,
    timing: T,
    ticks: S,
    phrase: Phrase,
    cursor: Cursor,
    state: EmitterState,
    pending: Option<TickHandle>,
    actuator_faults: u32,
}

impl<A, T, S> Emitter<A, T, S>
where
    A: Actuator,
    T: TimingSource,
    S: TickScheduler,
{
    /// Create an idle emitter; the actuator must already be usable
    pub fn new(actuator: A, timing: T, ticks: S) -> Self {
        Self {
            actuator,
            timing,
            ticks,
            phrase: Phrase::default(),
            cursor: Cursor::default(),
            state: EmitterState::Idle,
            pending: None,
            actuator_faults: 0,
        }
    }

    /// Begin emitting `phrase` in a loop.
    ///
    /// Any running emission is stopped first. An empty phrase only stops
    /// and arms nothing, returning `None`.
    pub fn start(&mut self, phrase: Phrase) -> Option<TickHandle> {
        self.stop();
        if phrase.is_empty() {
            return None;
        }

        #[cfg(feature = "defmt")]
        defmt::debug!("emission start: {} letters", phrase.len());

        self.phrase = phrase;
        self.cursor = Cursor::default();
        self.state = EmitterState::Armed;
        Some(self.arm(Duration::from_millis(0)))
    }

    /// Sanitize `raw` and start emitting it
    pub fn start_raw(&mut self, raw: &str) -> Option<TickHandle> {
        self.start(phrase::sanitize(raw))
    }

    /// Cancel the pending tick and switch the actuator off
    pub fn stop(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.ticks.cancel(handle);
        }
        self.switch(false);
        self.phrase.clear();
        self.cursor = Cursor::default();
        self.state = EmitterState::Idle;
    }

    /// Advance the state machine by one step.
    ///
    /// Only the currently pending handle is honoured; anything else yields
    /// [`TickOutcome::Stale`] without side effects.
    pub fn tick(&mut self, handle: TickHandle) -> Result<TickOutcome, EmissionError> {
        if self.pending != Some(handle) {
            return Ok(TickOutcome::Stale);
        }
        self.pending = None;

        let delay = if self.cursor.letter < self.phrase.len() {
            match self.step_letter() {
                Ok(delay) => delay,
                Err(err) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("emission halted: {}", err);
                    self.stop();
                    return Err(err);
                }
            }
        } else {
            self.restart_phrase()
        };

        let handle = self.arm(delay);

        #[cfg(feature = "defmt")]
        defmt::trace!("tick -> {} after {} ms", self.state, delay.as_millis());

        Ok(TickOutcome::Rearmed {
            handle,
            delay,
            state: self.state,
        })
    }

    /// One step inside the current letter
    fn step_letter(&mut self) -> Result<Duration, EmissionError> {
        let index = self.cursor.letter;
        let character = self.phrase.get(index).unwrap_or('\0');
        let symbols = code::lookup(character)
            .ok_or(EmissionError::UnknownCharacter { index, character })?;
        let unit = self.timing.unit_period();

        if self.cursor.signal {
            // mark finished
            self.switch(false);
            return Ok(self.finish_symbol(symbols.len(), unit));
        }

        let symbol = symbols
            .get(self.cursor.symbol)
            .copied()
            .ok_or(EmissionError::SymbolOutOfRange {
                letter: index,
                symbol: self.cursor.symbol,
            })?;
        let hold = unit * symbol.units();

        if symbol.is_keyed() {
            self.switch(true);
            self.state = EmitterState::Emitting { symbol, active: true };
        } else {
            self.state = EmitterState::Emitting { symbol, active: false };
            // a gap is its own pause, no separate spacing follows it
            self.advance_cursor(symbols.len());
        }
        Ok(hold)
    }

    /// Spacing after a mark: inter-symbol or inter-letter gap
    fn finish_symbol(&mut self, symbol_count: usize, unit: Duration) -> Duration {
        if self.advance_cursor(symbol_count) {
            self.state = EmitterState::InterLetterGap;
            unit * LETTER_GAP_UNITS
        } else {
            self.state = EmitterState::InterSymbolGap;
            unit * PulseSymbol::Short.units()
        }
    }

    /// Move to the next symbol; returns true when the letter completed
    fn advance_cursor(&mut self, symbol_count: usize) -> bool {
        if self.cursor.symbol + 1 < symbol_count {
            self.cursor.symbol += 1;
            false
        } else {
            self.cursor.symbol = 0;
            self.cursor.letter += 1;
            true
        }
    }

    /// Phrase exhausted: rewind and wait out the loop delay
    fn restart_phrase(&mut self) -> Duration {
        self.cursor.letter = 0;
        self.cursor.symbol = 0;
        if self.cursor.signal {
            self.switch(false);
        }
        self.state = EmitterState::LoopGap;
        self.timing.loop_delay()
    }

    fn arm(&mut self, delay: Duration) -> TickHandle {
        let handle = self.ticks.arm(delay);
        self.pending = Some(handle);
        handle
    }

    /// Drive the actuator; failures are counted, never propagated
    fn switch(&mut self, on: bool) {
        if let Err(_err) = self.actuator.set(on) {
            self.actuator_faults = self.actuator_faults.saturating_add(1);
            #[cfg(feature = "defmt")]
            defmt::warn!("actuator {} failed", if on { "on" } else { "off" });
        }
        self.cursor.signal = on;
    }

    pub fn state(&self) -> EmitterState {
        self.state
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn phrase(&self) -> &Phrase {
        &self.phrase
    }

    /// Handle of the tick that will be honoured next, if any
    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.pending
    }

    pub fn is_emitting(&self) -> bool {
        self.pending.is_some()
    }

    /// Number of actuator calls that reported an error
    pub fn actuator_faults(&self) -> u32 {
        self.actuator_faults
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut A {
        &mut self.actuator
    }

    pub fn timing(&self) -> &T {
        &self.timing
    }

    pub fn ticks(&self) -> &S {
        &self.ticks
    }

    pub fn ticks_mut(&mut self) -> &mut S {
        &mut self.ticks
    }

    /// Stop and hand back the actuator
    pub fn into_actuator(mut self) -> A {
        self.stop();
        self.actuator
    }
}

/// Async driver for embedded targets.
///
/// Sleeps between ticks with `embassy_time::Timer`, checking `stop` at
/// least every [`STOP_POLL_INTERVAL_MS`]. Returns once stopped (actuator
/// off) or when the emitter has nothing armed.
#[cfg(feature = "embassy-time")]
pub async fn emission_task<A, T>(
    emitter: &mut Emitter<A, T, SingleShot>,
    stop: &portable_atomic::AtomicBool,
) -> Result<(), EmissionError>
where
    A: Actuator,
    T: TimingSource,
{
    use embassy_time::{Instant, Timer};
    use portable_atomic::Ordering;

    let poll = Duration::from_millis(STOP_POLL_INTERVAL_MS);

    while let Some((handle, delay)) = emitter.ticks_mut().take() {
        let deadline = Instant::now() + delay;
        loop {
            if stop.load(Ordering::Relaxed) {
                emitter.stop();
                return Ok(());
            }
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            Timer::after(core::cmp::min(deadline - now, poll)).await;
        }
        emitter.tick(handle)?;
    }
    Ok(())
}

/// Upper bound on stop latency of [`emission_task`]
#[cfg(feature = "embassy-time")]
pub const STOP_POLL_INTERVAL_MS: u64 = 20;
