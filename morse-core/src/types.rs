//! Core data types for Morse emission

use crate::hal::Duration;

/// Morse code pulse symbols
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseSymbol {
    /// Short mark (dot)
    Short,
    /// Long mark (dash)
    Long,
    /// Word space, signal stays off
    Gap,
}

impl PulseSymbol {
    /// Returns the duration of this symbol in units
    pub const fn units(&self) -> u32 {
        match self {
            PulseSymbol::Short => 1,
            PulseSymbol::Long => 3,
            PulseSymbol::Gap => 1,
        }
    }

    /// Returns true if this symbol turns the actuator on
    pub const fn is_keyed(&self) -> bool {
        match self {
            PulseSymbol::Short | PulseSymbol::Long => true,
            PulseSymbol::Gap => false,
        }
    }

    /// Dot/dash rendering of this symbol
    pub const fn glyph(&self) -> char {
        match self {
            PulseSymbol::Short => '.',
            PulseSymbol::Long => '-',
            PulseSymbol::Gap => ' ',
        }
    }
}

/// Scheduler phase entered by the most recent start/stop/tick
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmitterState {
    /// Nothing pending
    Idle,
    /// Started, first tick pending with zero delay
    Armed,
    /// Holding a symbol; `active` is false for a word gap
    Emitting { symbol: PulseSymbol, active: bool },
    /// Signal off between two symbols of one letter
    InterSymbolGap,
    /// Signal off after the last symbol of a letter
    InterLetterGap,
    /// Pause after the whole phrase before repeating
    LoopGap,
}

impl EmitterState {
    /// Returns true while the actuator is held on
    pub const fn is_active(&self) -> bool {
        matches!(self, EmitterState::Emitting { active: true, .. })
    }
}

/// Position of the scheduler within the phrase
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Cursor {
    /// Index into the phrase
    pub letter: usize,
    /// Index into the current letter's symbols
    pub symbol: usize,
    /// Actuator currently switched on
    pub signal: bool,
}

/// Cancellation token for the one pending tick
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickHandle(u32);

impl TickHandle {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// Result of delivering a tick to the emitter
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TickOutcome {
    /// Tick processed and the next one armed after `delay`
    Rearmed {
        handle: TickHandle,
        delay: Duration,
        state: EmitterState,
    },
    /// Tick was cancelled or superseded; nothing happened
    Stale,
}

/// Internal consistency violations detected while ticking.
///
/// Both are unreachable through `sanitize`; when hit, the emission is stopped.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmissionError {
    /// Phrase character has no code table entry
    UnknownCharacter { index: usize, character: char },
    /// Cursor points past the end of the letter's symbols
    SymbolOutOfRange { letter: usize, symbol: usize },
}

#[cfg(feature = "std")]
impl core::fmt::Display for EmissionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EmissionError::UnknownCharacter { index, character } => {
                write!(f, "phrase[{}] = {:?} is out of Morse code", index, character)
            }
            EmissionError::SymbolOutOfRange { letter, symbol } => {
                write!(f, "symbol {} of letter {} is out of range", symbol, letter)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EmissionError {}
