//! Unified error types for the edge pipeline.
//!
//! A single `Error` enum that construction paths convert into, plus the
//! non-fatal conditions the urgent and deferred contexts record instead of
//! returning. All variants are `Copy` so they can be stored inside the
//! pipeline state without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible pipeline construction step funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Resource acquisition during pipeline initialisation failed.
    Init(InitError),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "init: {e}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Initialisation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    /// Another live pipeline already owns this source id.
    SourceBusy(u32),
    /// The source registry has no free slots.
    RegistryFull,
    /// The initial level of the input line could not be sampled.
    LevelReadFailed,
    /// A pipeline thread could not be spawned.
    TaskSpawnFailed(&'static str),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceBusy(id) => write!(f, "source {id} already in use"),
            Self::RegistryFull => write!(f, "source registry full"),
            Self::LevelReadFailed => write!(f, "initial level read failed"),
            Self::TaskSpawnFailed(name) => write!(f, "could not spawn task '{name}'"),
        }
    }
}

impl From<InitError> for Error {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

// ---------------------------------------------------------------------------
// Timer arming
// ---------------------------------------------------------------------------

/// Arming the debounce deadline failed. The edge is still counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmError {
    /// The timer service thread is not running.
    TimerOffline,
}

impl fmt::Display for ArmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimerOffline => write!(f, "timer service offline"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline faults
// ---------------------------------------------------------------------------

/// Non-fatal faults accumulated in a bitmask and surfaced through the
/// query interface. Any set bit makes the pipeline report unhealthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineFault {
    /// A debounce window could not be armed; delivery is degraded.
    TimerUnavailable = 0b0000_0001,
    /// The deferred processor could not read the settled level.
    LevelReadFailed = 0b0000_0010,
    /// The downstream event handler returned an error or panicked.
    HandlerFailed = 0b0000_0100,
}

impl PipelineFault {
    pub const ALL: [Self; 3] = [
        Self::TimerUnavailable,
        Self::LevelReadFailed,
        Self::HandlerFailed,
    ];

    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PipelineFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimerUnavailable => write!(f, "timer unavailable"),
            Self::LevelReadFailed => write!(f, "level read failed"),
            Self::HandlerFailed => write!(f, "event handler failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
