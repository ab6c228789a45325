//! Element timing derived from keying speed.
//!
//! PARIS timing: one dit unit is `1200 / WPM` milliseconds, a dah is three
//! units, the gap between elements is one unit. All three values travel
//! together in one immutable [`ElementTiming`] snapshot so a scheduling
//! decision never reads a half-updated set.

use std::time::Duration;

use crate::error::KeyerError;

/// Lowest speed callers are expected to offer (clamping is their job).
pub const MIN_WPM: u32 = 5;

/// Highest speed callers are expected to offer.
pub const MAX_WPM: u32 = 60;

/// Iambic keyer mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IambicMode {
    /// Mode A: stop as soon as both paddles are released.
    A,
    /// Mode B: one trailing opposite element after a squeeze release.
    B,
}

impl Default for IambicMode {
    fn default() -> Self {
        IambicMode::B
    }
}

/// Keying configuration pushed into the engine by the host application.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyingConfig {
    /// Speed in words per minute (PARIS timing). Must be greater than zero.
    pub wpm: u32,

    /// Iambic mode (A or B).
    pub mode: IambicMode,
}

impl Default for KeyingConfig {
    fn default() -> Self {
        Self {
            wpm: 20,
            mode: IambicMode::B,
        }
    }
}

impl KeyingConfig {
    /// Create a config for the given WPM with default mode.
    pub fn with_wpm(wpm: u32) -> Self {
        Self {
            wpm,
            ..Default::default()
        }
    }

    /// Derive element durations, validating the speed.
    pub fn timing(&self) -> Result<ElementTiming, KeyerError> {
        ElementTiming::from_wpm(self.wpm)
    }
}

/// Immutable snapshot of the three element durations, in milliseconds.
///
/// Recomputed when WPM changes; the keyer reads it only at the instant an
/// element or space is scheduled, so an in-flight element keeps the duration
/// it was scheduled with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementTiming {
    pub dit_ms: u32,
    pub dah_ms: u32,
    pub space_ms: u32,
}

impl ElementTiming {
    /// Derive timing from a speed in words per minute.
    ///
    /// `dit = round(1200 / wpm)` ms, `dah = 3 * dit`, `space = dit`.
    /// Fails with [`KeyerError::InvalidConfiguration`] for `wpm == 0`.
    pub fn from_wpm(wpm: u32) -> Result<Self, KeyerError> {
        if wpm == 0 {
            return Err(KeyerError::InvalidConfiguration { wpm });
        }
        let dit_ms = (1200 + wpm / 2) / wpm;
        Ok(Self {
            dit_ms,
            dah_ms: dit_ms * 3,
            space_ms: dit_ms,
        })
    }

    #[inline]
    pub fn dit(&self) -> Duration {
        Duration::from_millis(self.dit_ms as u64)
    }

    #[inline]
    pub fn dah(&self) -> Duration {
        Duration::from_millis(self.dah_ms as u64)
    }

    #[inline]
    pub fn space(&self) -> Duration {
        Duration::from_millis(self.space_ms as u64)
    }
}
