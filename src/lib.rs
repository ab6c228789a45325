//! # netkeyer-engine
//!
//! Real-time iambic Morse keyer engine for remote CW operation.
//!
//! Converts raw paddle contact states into precisely-timed key-down/key-up
//! transitions, synchronized with local sidetone feedback and an outbound
//! keying command carrying a wrap-around timestamp and session handle.
//!
//! ## Architecture
//!
//! The core is a pure, host-testable state machine ([`keyer::KeyerFsm`])
//! that never touches a clock or a thread. Around it:
//!
//! - [`paddle::PaddleNormalizer`] maps serial/MIDI hardware events to
//!   canonical snapshots,
//! - [`gate::TxModeGate`] routes snapshots to the iambic FSM, a straight-key
//!   passthrough, or the PTT path depending on the operating mode,
//! - [`engine::KeyerEngine`] owns the single lock and the one-shot element
//!   timer, and keys through the [`sink::KeySink`] boundary,
//! - [`audio::SidetoneGen`] renders the operator's sidetone samples.
//!
//! Radio discovery, transport, audio devices, sessions and UI are external
//! collaborators; their whole contract is [`paddle::RawKeyEvent`] in and
//! [`sink::KeySink`] out.
//!
//! ```
//! use netkeyer_engine::paddle::PaddleSnapshot;
//! use netkeyer_engine::keyer::{KeyerFsm, KeyerState};
//! use netkeyer_engine::timing::KeyingConfig;
//!
//! let mut fsm = KeyerFsm::new(KeyingConfig::with_wpm(25)).unwrap();
//! let out = fsm.update_paddles(PaddleSnapshot {
//!     dit: true,
//!     ..PaddleSnapshot::RELEASED
//! });
//! assert_eq!(out.key, Some(true)); // key down
//! assert_eq!(fsm.state(), KeyerState::SendingDit);
//! ```

pub mod audio;
pub mod engine;
pub mod error;
pub mod fault;
pub mod gate;
pub mod keyer;
pub mod paddle;
pub mod sink;
pub mod timer;
pub mod timing;

pub use engine::{KeyerEngine, KeyingPipeline};
pub use error::{EngineError, KeyerError, SinkError};
pub use fault::{FaultCode, FaultSnapshot, FaultState};
pub use gate::{KeyerKind, Route, TxModeGate};
pub use keyer::{Element, KeyerFsm, KeyerState};
pub use paddle::{PaddleNormalizer, PaddleSnapshot, RawKeyEvent};
pub use sink::{KeySink, KeyTimestamp, SessionHandle};
pub use timing::{ElementTiming, IambicMode, KeyingConfig};
