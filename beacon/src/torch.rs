//! Torch bindings: console feedback and Linux LED class devices

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use morse_core::{Actuator, ActuatorError};
use thiserror::Error;

/// Root of the Linux LED class
pub const LED_CLASS_ROOT: &str = "/sys/class/leds";

#[derive(Debug, Error)]
pub enum TorchError {
    #[error("no torch available at {0}")]
    Unavailable(PathBuf),

    #[error("access to torch at {0} denied")]
    PermissionDenied(PathBuf),

    #[error("torch used before it was acquired")]
    NotAcquired,

    #[error("torch I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TorchError {
    /// Map to the core actuator taxonomy
    pub fn kind(&self) -> ActuatorError {
        match self {
            TorchError::Unavailable(_) => ActuatorError::Unavailable,
            TorchError::PermissionDenied(_) => ActuatorError::PermissionDenied,
            TorchError::NotAcquired => ActuatorError::NotAcquired,
            TorchError::Io(_) => ActuatorError::Io,
        }
    }
}

/// An actuator that has to be acquired before the first emission.
///
/// Acquisition is idempotent: once it succeeded, later calls return `Ok`.
pub trait Torch: Actuator<Error = TorchError> {
    fn acquire(&mut self) -> Result<(), TorchError>;

    fn is_acquired(&self) -> bool;
}

/// Prints the signal state, one line per change
pub struct ConsoleTorch<W> {
    out: W,
    acquired: bool,
}

impl ConsoleTorch<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleTorch<W> {
    pub fn new(out: W) -> Self {
        Self { out, acquired: false }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn show(&mut self, on: bool) -> Result<(), TorchError> {
        if !self.acquired {
            return Err(TorchError::NotAcquired);
        }
        let line = if on { "\u{2588}\u{2588} ON" } else { "   off" };
        writeln!(self.out, "{}", line)?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> Actuator for ConsoleTorch<W> {
    type Error = TorchError;

    fn activate(&mut self) -> Result<(), Self::Error> {
        self.show(true)
    }

    fn deactivate(&mut self) -> Result<(), Self::Error> {
        self.show(false)
    }
}

impl<W: Write> Torch for ConsoleTorch<W> {
    fn acquire(&mut self) -> Result<(), TorchError> {
        self.acquired = true;
        Ok(())
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }
}

/// LED class device driven through its `brightness` attribute
pub struct LedTorch {
    brightness: PathBuf,
    on_value: String,
    acquired: bool,
}

impl LedTorch {
    /// `device` is either an LED name under [`LED_CLASS_ROOT`], an LED
    /// directory, or the path of a brightness file.
    pub fn new(device: &str) -> Self {
        let path = if device.contains('/') {
            PathBuf::from(device)
        } else {
            Path::new(LED_CLASS_ROOT).join(device)
        };
        let brightness = if path.is_dir() {
            path.join("brightness")
        } else {
            path
        };
        Self {
            brightness,
            on_value: "1".to_string(),
            acquired: false,
        }
    }

    pub fn brightness_path(&self) -> &Path {
        &self.brightness
    }

    fn write(&self, value: &str) -> Result<(), TorchError> {
        if !self.acquired {
            return Err(TorchError::NotAcquired);
        }
        fs::write(&self.brightness, value)?;
        Ok(())
    }
}

impl Actuator for LedTorch {
    type Error = TorchError;

    fn activate(&mut self) -> Result<(), Self::Error> {
        self.write(&self.on_value)
    }

    fn deactivate(&mut self) -> Result<(), Self::Error> {
        self.write("0")
    }
}

impl Torch for LedTorch {
    fn acquire(&mut self) -> Result<(), TorchError> {
        if self.acquired {
            return Ok(());
        }

        OpenOptions::new()
            .write(true)
            .open(&self.brightness)
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => TorchError::Unavailable(self.brightness.clone()),
                io::ErrorKind::PermissionDenied => {
                    TorchError::PermissionDenied(self.brightness.clone())
                }
                _ => TorchError::Io(err),
            })?;

        // full brightness when the device reports its range
        if let Some(max) = self
            .brightness
            .parent()
            .map(|dir| dir.join("max_brightness"))
            .and_then(|path| fs::read_to_string(path).ok())
        {
            let max = max.trim();
            if !max.is_empty() {
                self.on_value = max.to_string();
            }
        }

        tracing::info!(device = %self.brightness.display(), "torch acquired");
        self.acquired = true;
        Ok(())
    }

    fn is_acquired(&self) -> bool {
        self.acquired
    }
}

/// Torch selected on the command line
pub enum AnyTorch {
    Console(ConsoleTorch<io::Stdout>),
    Led(LedTorch),
}

impl Actuator for AnyTorch {
    type Error = TorchError;

    fn activate(&mut self) -> Result<(), Self::Error> {
        match self {
            AnyTorch::Console(torch) => torch.activate(),
            AnyTorch::Led(torch) => torch.activate(),
        }
    }

    fn deactivate(&mut self) -> Result<(), Self::Error> {
        match self {
            AnyTorch::Console(torch) => torch.deactivate(),
            AnyTorch::Led(torch) => torch.deactivate(),
        }
    }
}

impl Torch for AnyTorch {
    fn acquire(&mut self) -> Result<(), TorchError> {
        match self {
            AnyTorch::Console(torch) => torch.acquire(),
            AnyTorch::Led(torch) => torch.acquire(),
        }
    }

    fn is_acquired(&self) -> bool {
        match self {
            AnyTorch::Console(torch) => torch.is_acquired(),
            AnyTorch::Led(torch) => torch.is_acquired(),
        }
    }
}
