//! Iambic keyer finite state machine.
//!
//! Pure logic, no threads, no clocks. Consumes paddle snapshots and timer
//! expiries, produces key transitions and timer commands. Fully testable on
//! host; the concurrency wrapper in [`crate::engine`] owns the lock and the
//! real one-shot timer.
//!
//! # Iambic modes
//!
//! - **Mode A**: stops when both paddles are released.
//! - **Mode B**: sends one trailing opposite element when the squeeze is
//!   released near an element boundary.
//!
//! # Invariant
//!
//! Exactly one timer is scheduled whenever the state is not `Idle`, and none
//! in `Idle`. Every [`Output`] this module emits preserves that: a transition
//! out of `Idle` schedules, a transition into `Idle` cancels or leaves none.

use std::time::Duration;

use crate::error::KeyerError;
use crate::paddle::PaddleSnapshot;
use crate::timing::{ElementTiming, IambicMode, KeyingConfig};

/// Keying element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Element {
    Dit,
    Dah,
}

impl Element {
    /// Get the opposite element.
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Element::Dit => Element::Dah,
            Element::Dah => Element::Dit,
        }
    }
}

/// FSM state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyerState {
    /// Key up, no timer scheduled.
    Idle,
    /// Key down for one dit unit.
    SendingDit,
    /// Key down for three dit units.
    SendingDah,
    /// Inter-element space after a dit.
    SpaceAfterDit,
    /// Inter-element space after a dah.
    SpaceAfterDah,
}

impl KeyerState {
    /// True while the key is down.
    #[inline]
    pub fn is_sending(self) -> bool {
        matches!(self, KeyerState::SendingDit | KeyerState::SendingDah)
    }
}

/// Timer command attached to an FSM output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerOp {
    /// Leave the timer as it is.
    None,
    /// Arm the one-shot timer, superseding any pending deadline.
    Schedule(Duration),
    /// Cancel any pending deadline.
    Cancel,
}

/// Side effects requested by one FSM entry point.
///
/// At most one key transition and one timer command per call — the wrapper
/// executes the key transition first, then the timer command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Output {
    /// `Some(true)` = key down, `Some(false)` = key up, `None` = no change.
    pub key: Option<bool>,
    pub timer: TimerOp,
}

impl Output {
    /// No side effects.
    pub const NONE: Self = Self {
        key: None,
        timer: TimerOp::None,
    };
}

/// Paddle state captured at the instant an element starts.
///
/// Valid until the next element starts, then overwritten. Drives both the
/// latch rule (a paddle already held at start never latches) and the Mode B
/// trailing-element decision.
#[derive(Clone, Copy, Debug, Default)]
struct ElementStart {
    dit_held: bool,
    dah_held: bool,
}

/// The iambic keyer state machine.
///
/// Owns the only mutable keying state: the [`KeyerState`], the latches and
/// the element-start snapshot. All entry points are synchronous and complete
/// in microseconds; the caller serializes them through one lock.
#[derive(Debug)]
pub struct KeyerFsm {
    config: KeyingConfig,
    timing: ElementTiming,

    state: KeyerState,
    start: ElementStart,

    // Current paddle levels, updated on every snapshot.
    dit_held: bool,
    dah_held: bool,

    // Set while state != Idle for a paddle pressed after the element started
    // that was not held at element start. Cleared at every element start.
    dit_latched: bool,
    dah_latched: bool,
}

impl KeyerFsm {
    /// Create an idle keyer. Fails on invalid configuration.
    pub fn new(config: KeyingConfig) -> Result<Self, KeyerError> {
        let timing = config.timing()?;
        Ok(Self {
            config,
            timing,
            state: KeyerState::Idle,
            start: ElementStart::default(),
            dit_held: false,
            dah_held: false,
            dit_latched: false,
            dah_latched: false,
        })
    }

    #[inline]
    pub fn state(&self) -> KeyerState {
        self.state
    }

    #[inline]
    pub fn config(&self) -> KeyingConfig {
        self.config
    }

    /// Element timing currently used for newly scheduled elements.
    #[inline]
    pub fn timing(&self) -> ElementTiming {
        self.timing
    }

    /// Update speed and mode.
    ///
    /// Validated before any state change; on error the previous configuration
    /// stays in force. The new WPM applies to elements scheduled after this
    /// call — an in-flight element keeps its already-computed duration.
    pub fn set_config(&mut self, config: KeyingConfig) -> Result<(), KeyerError> {
        let timing = config.timing()?;
        self.config = config;
        self.timing = timing;
        Ok(())
    }

    /// Apply a new paddle snapshot.
    ///
    /// From `Idle`, a pressed paddle starts an element (both pressed or dit
    /// only starts a dit; dah only starts a dah). In any other state this
    /// only updates levels and latches; the running element is never cut
    /// short.
    pub fn update_paddles(&mut self, snapshot: PaddleSnapshot) -> Output {
        self.dit_held = snapshot.dit;
        self.dah_held = snapshot.dah;

        match self.state {
            KeyerState::Idle => {
                debug_assert!(
                    !self.dit_latched && !self.dah_latched,
                    "latches must be clear in Idle"
                );
                if self.dit_held {
                    self.start_element(Element::Dit)
                } else if self.dah_held {
                    self.start_element(Element::Dah)
                } else {
                    Output::NONE
                }
            }
            _ => {
                if self.dit_held && !self.start.dit_held {
                    self.dit_latched = true;
                }
                if self.dah_held && !self.start.dah_held {
                    self.dah_latched = true;
                }
                Output::NONE
            }
        }
    }

    /// Handle expiry of the one-shot timer.
    ///
    /// End of an element keys up and schedules the inter-element space; end
    /// of a space decides the next element in strict priority order:
    ///
    /// 1. opposite paddle held or latched → opposite element (squeeze
    ///    alternation),
    /// 2. same paddle still held → repeat the same element,
    /// 3. Mode B only: opposite paddle was held when the just-finished
    ///    element started and has since been released → one trailing
    ///    opposite element,
    /// 4. otherwise → `Idle`, key stays up, no timer.
    pub fn timer_expired(&mut self) -> Output {
        match self.state {
            KeyerState::SendingDit => self.finish_element(KeyerState::SpaceAfterDit),
            KeyerState::SendingDah => self.finish_element(KeyerState::SpaceAfterDah),
            KeyerState::SpaceAfterDit => self.next_element(Element::Dit),
            KeyerState::SpaceAfterDah => self.next_element(Element::Dah),
            KeyerState::Idle => {
                // Stale fires are filtered by the wrapper's generation check;
                // reaching this is a defect.
                debug_assert!(false, "timer expiry in Idle");
                Output::NONE
            }
        }
    }

    /// Force the keyer back to `Idle`.
    ///
    /// Keys up if an element is in flight, cancels the timer, clears latches
    /// and tracked paddle levels. Idempotent.
    pub fn stop(&mut self) -> Output {
        let key = if self.state.is_sending() {
            Some(false)
        } else {
            None
        };
        self.state = KeyerState::Idle;
        self.start = ElementStart::default();
        self.dit_held = false;
        self.dah_held = false;
        self.dit_latched = false;
        self.dah_latched = false;
        Output {
            key,
            timer: TimerOp::Cancel,
        }
    }

    // --- Private ---

    /// Start sending an element: capture the start snapshot, clear latches,
    /// key down, schedule the element duration.
    fn start_element(&mut self, element: Element) -> Output {
        self.start = ElementStart {
            dit_held: self.dit_held,
            dah_held: self.dah_held,
        };
        self.dit_latched = false;
        self.dah_latched = false;

        let (state, duration) = match element {
            Element::Dit => (KeyerState::SendingDit, self.timing.dit()),
            Element::Dah => (KeyerState::SendingDah, self.timing.dah()),
        };
        self.state = state;

        Output {
            key: Some(true),
            timer: TimerOp::Schedule(duration),
        }
    }

    /// Element duration elapsed: key up and enter the inter-element space.
    fn finish_element(&mut self, space: KeyerState) -> Output {
        self.state = space;
        Output {
            key: Some(false),
            timer: TimerOp::Schedule(self.timing.space()),
        }
    }

    /// Space elapsed after `sent`: decide what comes next.
    fn next_element(&mut self, sent: Element) -> Output {
        let (opp_held, opp_latched, same_held, opp_held_at_start) = match sent {
            Element::Dit => (
                self.dah_held,
                self.dah_latched,
                self.dit_held,
                self.start.dah_held,
            ),
            Element::Dah => (
                self.dit_held,
                self.dit_latched,
                self.dah_held,
                self.start.dit_held,
            ),
        };

        if opp_held || opp_latched {
            self.start_element(sent.opposite())
        } else if same_held {
            self.start_element(sent)
        } else if self.config.mode == IambicMode::B && opp_held_at_start {
            // Opposite was part of the squeeze when this element started and
            // has since been released: Mode B sends one trailing element.
            self.start_element(sent.opposite())
        } else {
            self.state = KeyerState::Idle;
            self.dit_latched = false;
            self.dah_latched = false;
            Output {
                key: None,
                timer: TimerOp::None,
            }
        }
    }
}
