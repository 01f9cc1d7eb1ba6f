//! Test utilities for the emission core

#[cfg(any(test, feature = "test-utils"))]
pub mod virtual_time {
    //! Virtual time simulation for deterministic testing

    use std::cell::Cell;
    use std::rc::Rc;
    use std::vec::Vec;

    use crate::hal::{Actuator, Duration, Instant};
    use crate::scheduler::{Emitter, TickScheduler};
    use crate::timing::TimingSource;
    use crate::types::{EmissionError, TickHandle, TickOutcome};

    /// Shared virtual clock, milliseconds since start
    #[derive(Clone, Debug, Default)]
    pub struct VirtualClock {
        now_ms: Rc<Cell<u64>>,
    }

    impl VirtualClock {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn now(&self) -> Instant {
            Instant::from_millis(self.now_ms.get())
        }

        pub fn advance(&self, duration: Duration) {
            self.now_ms.set(self.now_ms.get() + duration.as_millis());
        }

        /// Move forward to `instant`; never goes backwards
        pub fn advance_to(&self, instant: Instant) {
            let target = instant.as_millis();
            if target > self.now_ms.get() {
                self.now_ms.set(target);
            }
        }
    }

    /// Fake tick scheduler on top of [`VirtualClock`].
    ///
    /// Keeps every armed tick so tests can see if more than one chain exists.
    #[derive(Debug)]
    pub struct VirtualScheduler {
        clock: VirtualClock,
        armed: Vec<(TickHandle, Instant)>,
        next_id: u32,
        armed_total: u32,
        cancelled_total: u32,
    }

    impl VirtualScheduler {
        pub fn new(clock: VirtualClock) -> Self {
            Self {
                clock,
                armed: Vec::new(),
                next_id: 0,
                armed_total: 0,
                cancelled_total: 0,
            }
        }

        pub fn clock(&self) -> &VirtualClock {
            &self.clock
        }

        /// Number of ticks currently waiting
        pub fn pending(&self) -> usize {
            self.armed.len()
        }

        pub fn armed_total(&self) -> u32 {
            self.armed_total
        }

        pub fn cancelled_total(&self) -> u32 {
            self.cancelled_total
        }

        /// Due time of the earliest armed tick
        pub fn next_due(&self) -> Option<Instant> {
            self.armed.iter().map(|(_, due)| *due).min()
        }

        /// Remove the earliest tick and move the clock to its due time
        pub fn advance_to_next(&mut self) -> Option<TickHandle> {
            let index = self
                .armed
                .iter()
                .enumerate()
                .min_by_key(|(_, (handle, due))| (*due, handle.id()))
                .map(|(index, _)| index)?;
            let (handle, due) = self.armed.remove(index);
            self.clock.advance_to(due);
            Some(handle)
        }
    }

    impl TickScheduler for VirtualScheduler {
        fn arm(&mut self, delay: Duration) -> TickHandle {
            self.next_id = self.next_id.wrapping_add(1);
            self.armed_total += 1;
            let handle = TickHandle::new(self.next_id);
            self.armed.push((handle, self.clock.now() + delay));
            handle
        }

        fn cancel(&mut self, handle: TickHandle) {
            let before = self.armed.len();
            self.armed.retain(|(armed, _)| *armed != handle);
            if self.armed.len() != before {
                self.cancelled_total += 1;
            }
        }
    }

    /// Fire the earliest armed tick
    pub fn step<A, T>(
        emitter: &mut Emitter<A, T, VirtualScheduler>,
    ) -> Option<Result<TickOutcome, EmissionError>>
    where
        A: Actuator,
        T: TimingSource,
    {
        let handle = emitter.ticks_mut().advance_to_next()?;
        Some(emitter.tick(handle))
    }

    /// Fire every tick due up to `elapsed` from now, then move the clock there.
    ///
    /// Returns the number of ticks fired.
    pub fn run_for<A, T>(
        emitter: &mut Emitter<A, T, VirtualScheduler>,
        elapsed: Duration,
    ) -> Result<usize, EmissionError>
    where
        A: Actuator,
        T: TimingSource,
    {
        let until = emitter.ticks().clock().now() + elapsed;
        let mut fired = 0;
        while let Some(due) = emitter.ticks().next_due() {
            if due > until {
                break;
            }
            if let Some(result) = step(emitter) {
                result?;
                fired += 1;
            }
        }
        emitter.ticks().clock().advance_to(until);
        Ok(fired)
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod output_capture {
    //! Output capture and analysis for testing

    use std::cell::RefCell;
    use std::rc::Rc;
    use std::string::String;
    use std::vec::Vec;

    use super::virtual_time::VirtualClock;
    use crate::hal::{Actuator, ActuatorError, Duration, Instant};

    /// One actuator call
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SignalEvent {
        pub at: Instant,
        pub on: bool,
    }

    /// One lit interval
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Pulse {
        pub start: Instant,
        pub duration: Duration,
    }

    /// Actuator recording timestamped calls against a virtual clock.
    ///
    /// Clones share the same log, so a test can keep one while the emitter
    /// owns the other.
    #[derive(Clone, Debug)]
    pub struct CapturingActuator {
        clock: VirtualClock,
        events: Rc<RefCell<Vec<SignalEvent>>>,
    }

    impl CapturingActuator {
        pub fn new(clock: VirtualClock) -> Self {
            Self {
                clock,
                events: Rc::new(RefCell::new(Vec::new())),
            }
        }

        pub fn events(&self) -> Vec<SignalEvent> {
            self.events.borrow().clone()
        }

        pub fn clear(&self) {
            self.events.borrow_mut().clear();
        }

        pub fn activations(&self) -> usize {
            self.events.borrow().iter().filter(|e| e.on).count()
        }

        pub fn deactivations(&self) -> usize {
            self.events.borrow().iter().filter(|e| !e.on).count()
        }

        /// State after the last recorded call
        pub fn is_on(&self) -> bool {
            self.events.borrow().last().map(|e| e.on).unwrap_or(false)
        }

        /// Completed on→off intervals
        pub fn pulses(&self) -> Vec<Pulse> {
            let mut pulses = Vec::new();
            let mut lit_since: Option<Instant> = None;
            for event in self.events.borrow().iter() {
                match (event.on, lit_since) {
                    (true, None) => lit_since = Some(event.at),
                    (false, Some(start)) => {
                        pulses.push(Pulse {
                            start,
                            duration: event.at.duration_since(start),
                        });
                        lit_since = None;
                    }
                    _ => {}
                }
            }
            pulses
        }

        /// Dark intervals between consecutive pulses
        pub fn gaps(&self) -> Vec<Duration> {
            self.pulses()
                .windows(2)
                .map(|pair| pair[1].start.duration_since(pair[0].start + pair[0].duration))
                .collect()
        }

        /// Decode pulses to dots and dashes, letters split by spaces
        pub fn to_morse_string(&self, unit: Duration) -> String {
            let pulses = self.pulses();
            let gaps = self.gaps();
            let letter_gap = unit * 3;
            let mut out = String::new();
            for (i, pulse) in pulses.iter().enumerate() {
                if i > 0 && gaps[i - 1] >= letter_gap {
                    out.push(' ');
                }
                out.push(if pulse.duration > unit { '-' } else { '.' });
            }
            out
        }

        pub fn analyze_timing(&self, expected_unit: Duration) -> TimingAnalysis {
            let mut dot_durations = Vec::new();
            let mut dash_durations = Vec::new();
            for pulse in self.pulses() {
                if pulse.duration > expected_unit {
                    dash_durations.push(pulse.duration);
                } else {
                    dot_durations.push(pulse.duration);
                }
            }
            TimingAnalysis {
                expected_unit,
                dot_durations,
                dash_durations,
                gaps: self.gaps(),
            }
        }
    }

    impl Actuator for CapturingActuator {
        type Error = ActuatorError;

        fn activate(&mut self) -> Result<(), Self::Error> {
            self.events.borrow_mut().push(SignalEvent {
                at: self.clock.now(),
                on: true,
            });
            Ok(())
        }

        fn deactivate(&mut self) -> Result<(), Self::Error> {
            self.events.borrow_mut().push(SignalEvent {
                at: self.clock.now(),
                on: false,
            });
            Ok(())
        }
    }

    /// Timing analysis results
    #[derive(Debug)]
    pub struct TimingAnalysis {
        pub expected_unit: Duration,
        pub dot_durations: Vec<Duration>,
        pub dash_durations: Vec<Duration>,
        pub gaps: Vec<Duration>,
    }

    impl TimingAnalysis {
        /// True when every dot is one unit and every dash three
        pub fn marks_exact(&self) -> bool {
            self.dot_durations.iter().all(|d| *d == self.expected_unit)
                && self.dash_durations.iter().all(|d| *d == self.expected_unit * 3)
        }

        /// True when every gap is a whole number of units
        pub fn gaps_aligned(&self) -> bool {
            let unit = self.expected_unit.as_millis();
            unit > 0 && self.gaps.iter().all(|g| g.as_millis() % unit == 0)
        }
    }
}
