//! Paddle input normalization.
//!
//! Translates hardware-specific raw events (serial control-line edges, MIDI
//! note on/off) into a canonical [`PaddleSnapshot`]. Applies the paddle swap
//! and serial polarity configuration; contains no timing logic.
//!
//! The normalizer is level-tracking: each raw event updates the level of one
//! logical input and emits a full snapshot, even if nothing changed. A release
//! for an input never seen before simply establishes the released level — at
//! least one known MIDI source reports key-up without a preceding key-down,
//! and that must not be an error.

/// Canonical per-update contact state, emitted once per raw event.
///
/// Paddle swap has already been applied: `dit` is whichever physical paddle
/// is currently mapped to the dit side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaddleSnapshot {
    pub dit: bool,
    pub dah: bool,
    pub straight: bool,
    pub ptt: bool,
}

impl PaddleSnapshot {
    /// No contacts closed.
    pub const RELEASED: Self = Self {
        dit: false,
        dah: false,
        straight: false,
        ptt: false,
    };

    /// Either paddle pressed.
    #[inline]
    pub fn any_paddle(&self) -> bool {
        self.dit || self.dah
    }

    /// Both paddles pressed (squeeze).
    #[inline]
    pub fn squeeze(&self) -> bool {
        self.dit && self.dah
    }
}

/// Serial control lines used as key contacts.
///
/// Wiring convention: CTS carries the left paddle, DCD the right paddle,
/// DSR a straight key, RI a PTT footswitch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerialLine {
    Cts,
    Dcd,
    Dsr,
    Ri,
}

/// A raw hardware event, before normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RawKeyEvent {
    /// A serial pin-change interrupt: the line is now asserted or deasserted.
    SerialEdge { line: SerialLine, asserted: bool },

    /// A MIDI note-on (`on = true`) or note-off message.
    MidiNote { note: u8, on: bool },
}

/// MIDI note assignments for the four logical inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiNoteMap {
    pub left: u8,
    pub right: u8,
    pub straight: u8,
    pub ptt: u8,
}

impl Default for MidiNoteMap {
    fn default() -> Self {
        Self {
            left: 0,
            right: 1,
            straight: 2,
            ptt: 3,
        }
    }
}

/// Normalizer configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct NormalizerConfig {
    /// Exchange left and right paddles before emission.
    pub swap_paddles: bool,

    /// Serial interfaces that key with deasserted lines (active-low wiring).
    pub invert_serial: bool,

    /// Which MIDI notes map to which inputs.
    pub midi: MidiNoteMap,
}

/// Maps raw hardware events to canonical paddle snapshots.
#[derive(Debug)]
pub struct PaddleNormalizer {
    config: NormalizerConfig,
    left: bool,
    right: bool,
    straight: bool,
    ptt: bool,
}

impl PaddleNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            left: false,
            right: false,
            straight: false,
            ptt: false,
        }
    }

    /// Apply one raw event and emit the resulting snapshot.
    ///
    /// Deterministic: the same event sequence always yields the same
    /// snapshots. Emits even when the snapshot is unchanged; downstream
    /// dedupes where it matters.
    pub fn apply(&mut self, event: RawKeyEvent) -> PaddleSnapshot {
        match event {
            RawKeyEvent::SerialEdge { line, asserted } => {
                let pressed = asserted != self.config.invert_serial;
                match line {
                    SerialLine::Cts => self.left = pressed,
                    SerialLine::Dcd => self.right = pressed,
                    SerialLine::Dsr => self.straight = pressed,
                    SerialLine::Ri => self.ptt = pressed,
                }
            }
            RawKeyEvent::MidiNote { note, on } => {
                let m = self.config.midi;
                if note == m.left {
                    self.left = on;
                } else if note == m.right {
                    self.right = on;
                } else if note == m.straight {
                    self.straight = on;
                } else if note == m.ptt {
                    self.ptt = on;
                }
                // Unmapped notes are ignored.
            }
        }
        self.snapshot()
    }

    /// Current snapshot, with paddle swap applied.
    pub fn snapshot(&self) -> PaddleSnapshot {
        let (dit, dah) = if self.config.swap_paddles {
            (self.right, self.left)
        } else {
            (self.left, self.right)
        };
        PaddleSnapshot {
            dit,
            dah,
            straight: self.straight,
            ptt: self.ptt,
        }
    }

    /// Forget all tracked levels (e.g. when the input device is closed).
    pub fn reset(&mut self) {
        self.left = false;
        self.right = false;
        self.straight = false;
        self.ptt = false;
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Update the swap flag without losing tracked levels.
    pub fn set_swap_paddles(&mut self, swap: bool) {
        self.config.swap_paddles = swap;
    }
}
