//! Operator session and the tokio tick driver

use std::sync::Arc;

use morse_core::{
    sanitize, Duration, EmissionError, Emitter, LiveTiming, Phrase, SingleShot, TickHandle,
    TickOutcome, PHRASE_CAPACITY,
};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use crate::torch::{Torch, TorchError};

/// Operator requests, applied between ticks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Emit button: stop when emitting, otherwise start this text
    Toggle(String),
    Stop,
    /// Raw speed scale input
    Speed(String),
    /// Raw loop scale input
    Loop(String),
    Shutdown,
}

/// Turns input lines into commands.
///
/// `:speed N`, `:loop N`, `:stop` and `:quit` are commands; any other line
/// presses the emit button for that text, an empty line for the last text.
#[derive(Debug, Default)]
pub struct LineParser {
    last: String,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text an empty line will toggle
    pub fn remember(&mut self, text: &str) {
        self.last = text.to_string();
    }

    pub fn parse(&mut self, line: &str) -> Command {
        let line = line.trim_end_matches(['\r', '\n']);
        let trimmed = line.trim();

        if let Some(rest) = trimmed.strip_prefix(':') {
            let (name, arg) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            let arg = arg.trim().to_string();
            match name {
                "speed" | "s" => return Command::Speed(arg),
                "loop" | "l" => return Command::Loop(arg),
                "stop" => return Command::Stop,
                "quit" | "q" => return Command::Shutdown,
                _ => {}
            }
        }

        if trimmed.is_empty() {
            return Command::Toggle(self.last.clone());
        }
        self.last = line.to_string();
        Command::Toggle(self.last.clone())
    }
}

fn std_duration(delay: Duration) -> std::time::Duration {
    std::time::Duration::from_millis(delay.as_millis())
}

/// Emitter bound to a torch, live timing and a tokio clock
pub struct Session<T: Torch> {
    emitter: Emitter<T, Arc<LiveTiming>, SingleShot>,
    timing: Arc<LiveTiming>,
    deadline: Option<(TickHandle, Instant)>,
    faults_seen: u32,
}

impl<T: Torch> Session<T> {
    pub fn new(torch: T, timing: Arc<LiveTiming>) -> Self {
        Self {
            emitter: Emitter::new(torch, timing.clone(), SingleShot::new()),
            timing,
            deadline: None,
            faults_seen: 0,
        }
    }

    pub fn timing(&self) -> &Arc<LiveTiming> {
        &self.timing
    }

    pub fn is_emitting(&self) -> bool {
        self.emitter.is_emitting()
    }

    pub fn phrase(&self) -> &Phrase {
        self.emitter.phrase()
    }

    pub fn torch(&self) -> &T {
        self.emitter.actuator()
    }

    /// Torch calls that reported an error so far
    pub fn torch_faults(&self) -> u32 {
        self.emitter.actuator_faults()
    }

    /// Emit button semantics.
    ///
    /// Returns whether an emission is running afterwards. The torch is
    /// acquired before the first start; if that fails nothing is started.
    pub fn toggle(&mut self, raw: &str) -> Result<bool, TorchError> {
        if self.emitter.is_emitting() {
            info!("emission stopped");
            self.stop();
            return Ok(false);
        }

        let phrase = sanitize(raw);
        if phrase.is_empty() {
            debug!("nothing to emit");
            return Ok(false);
        }
        if phrase.is_truncated() {
            warn!(
                kept = phrase.len(),
                "phrase too long, emitting the first {} characters",
                PHRASE_CAPACITY
            );
        }

        self.emitter.actuator_mut().acquire()?;
        info!(phrase = %phrase, "emitting");
        self.emitter.start(phrase);
        self.sync_deadline();
        Ok(true)
    }

    pub fn stop(&mut self) {
        self.emitter.stop();
        self.sync_deadline();
    }

    /// Apply one command; returns false on shutdown
    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::Toggle(text) => {
                if let Err(err) = self.toggle(&text) {
                    error!(%err, "torch unavailable, not emitting");
                }
            }
            Command::Stop => {
                if self.is_emitting() {
                    info!("emission stopped");
                    self.stop();
                }
            }
            Command::Speed(raw) => {
                self.timing.set_speed(&raw);
                info!(
                    scale = self.timing.speed_scale(),
                    unit_ms = self.timing.snapshot().speed_ms(),
                    "speed changed"
                );
            }
            Command::Loop(raw) => {
                self.timing.set_loop(&raw);
                info!(
                    scale = self.timing.loop_scale(),
                    loop_ms = self.timing.snapshot().loop_ms(),
                    "loop delay changed"
                );
            }
            Command::Shutdown => return false,
        }
        true
    }

    /// Deliver the armed tick
    pub fn fire(&mut self, handle: TickHandle) -> Result<(), EmissionError> {
        let outcome = self.emitter.tick(handle);
        self.sync_deadline();

        match outcome? {
            TickOutcome::Rearmed { delay, state, .. } => {
                debug!(?state, delay_ms = delay.as_millis(), "tick");
            }
            TickOutcome::Stale => debug!(handle = handle.id(), "stale tick ignored"),
        }

        let faults = self.emitter.actuator_faults();
        if faults != self.faults_seen {
            warn!(faults, "torch reported errors, timing continues");
            self.faults_seen = faults;
        }
        Ok(())
    }

    /// Drive ticks and commands until shutdown or the channel closes.
    ///
    /// The torch is switched off and handed back on return. An emission
    /// consistency error stops the emission and ends the session.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<T, EmissionError> {
        loop {
            let deadline = self.deadline;
            let wake_at = deadline.map(|(_, at)| at).unwrap_or_else(Instant::now);

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.apply(command) {
                            break;
                        }
                    }
                    None => break,
                },
                _ = sleep_until(wake_at), if deadline.is_some() => {
                    if let Some((handle, _)) = deadline {
                        if let Err(err) = self.fire(handle) {
                            error!(%err, "emission halted");
                            return Err(err);
                        }
                    }
                }
            }
        }

        info!("session closed");
        Ok(self.emitter.into_actuator())
    }

    /// Pick up a newly armed tick or forget a cancelled one
    fn sync_deadline(&mut self) {
        if let Some((handle, delay)) = self.emitter.ticks_mut().take() {
            self.deadline = Some((handle, Instant::now() + std_duration(delay)));
        } else if self.emitter.pending_tick().is_none() {
            self.deadline = None;
        }
    }
}
