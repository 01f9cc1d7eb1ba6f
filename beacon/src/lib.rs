//! Morse beacon host application
//!
//! Binds the emission core to a torch (console or LED class device),
//! persisted preferences and a tokio driven operator session.

pub mod prefs;
pub mod session;
pub mod torch;

pub use morse_core::*;

pub use crate::prefs::{Preferences, PrefsError};
pub use crate::session::{Command, LineParser, Session};
pub use crate::torch::{AnyTorch, ConsoleTorch, LedTorch, Torch, TorchError};
