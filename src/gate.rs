//! Transmit mode gate.
//!
//! Decides, per paddle snapshot, whether the iambic keyer drives CW keying,
//! a straight key passes through directly, or (outside CW mode) the contacts
//! collapse to a single PTT boolean. Any mode or keyer-kind change observed
//! mid-keying must force a `stop()` on the keyer — a stuck transmitter is the
//! failure this module exists to prevent.

use crate::paddle::PaddleSnapshot;

/// Which CW sub-path is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyerKind {
    /// Paddle snapshots feed the iambic state machine.
    Iambic,
    /// Direct key-down/key-up on contact change, no element timing.
    Straight,
}

/// Where one snapshot goes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    /// CW mode, iambic: forward to the keyer FSM.
    Keyer(PaddleSnapshot),
    /// CW mode, straight key: the new direct key state.
    StraightKey(bool),
    /// Non-CW mode: the new PTT state.
    Ptt(bool),
}

/// What the caller must do after a mode or kind change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ModeChange {
    /// The iambic keyer must be stopped (forces key-up if mid-element).
    pub stop_keyer: bool,
    /// A straight key left down must be released.
    pub release_straight: bool,
    /// A held PTT must be dropped.
    pub release_ptt: bool,
}

impl ModeChange {
    const NONE: Self = Self {
        stop_keyer: false,
        release_straight: false,
        release_ptt: false,
    };
}

/// Routes paddle snapshots according to the radio's operating mode.
#[derive(Debug)]
pub struct TxModeGate {
    cw_mode: bool,
    kind: KeyerKind,
    // Last values emitted on the direct paths, for change-only delivery.
    straight_down: bool,
    ptt_active: bool,
}

impl TxModeGate {
    pub fn new(kind: KeyerKind) -> Self {
        Self {
            cw_mode: true,
            kind,
            straight_down: false,
            ptt_active: false,
        }
    }

    #[inline]
    pub fn is_cw_mode(&self) -> bool {
        self.cw_mode
    }

    #[inline]
    pub fn kind(&self) -> KeyerKind {
        self.kind
    }

    /// Route one snapshot.
    ///
    /// The iambic path forwards every snapshot (the FSM dedupes where it
    /// matters); the direct paths emit only on change, `None` otherwise.
    pub fn route(&mut self, snapshot: PaddleSnapshot) -> Option<Route> {
        if !self.cw_mode {
            // Collapse everything to one PTT boolean.
            let active = snapshot.any_paddle() || snapshot.ptt;
            if active != self.ptt_active {
                self.ptt_active = active;
                return Some(Route::Ptt(active));
            }
            return None;
        }

        match self.kind {
            KeyerKind::Iambic => Some(Route::Keyer(snapshot)),
            KeyerKind::Straight => {
                let down = snapshot.dit || snapshot.straight;
                if down != self.straight_down {
                    self.straight_down = down;
                    Some(Route::StraightKey(down))
                } else {
                    None
                }
            }
        }
    }

    /// Apply an externally-reported operating mode change.
    ///
    /// Returns the cleanup the caller must perform so nothing stays keyed
    /// across the switch.
    pub fn set_cw_mode(&mut self, cw_mode: bool) -> ModeChange {
        if cw_mode == self.cw_mode {
            return ModeChange::NONE;
        }
        self.cw_mode = cw_mode;
        self.leave_path()
    }

    /// Switch between iambic and straight keying.
    pub fn set_kind(&mut self, kind: KeyerKind) -> ModeChange {
        if kind == self.kind {
            return ModeChange::NONE;
        }
        self.kind = kind;
        self.leave_path()
    }

    /// Cleanup required when leaving the currently keyed path.
    fn leave_path(&mut self) -> ModeChange {
        let change = ModeChange {
            // The gate cannot see the FSM's state; stopping an idle keyer
            // is a no-op, so always request it.
            stop_keyer: true,
            release_straight: self.straight_down,
            release_ptt: self.ptt_active,
        };
        self.straight_down = false;
        self.ptt_active = false;
        change
    }
}
