//! Error taxonomy for the keyer engine.
//!
//! Only configuration errors are recoverable and surface to the caller.
//! Everything else is either an internal invariant (prevented by construction,
//! asserted in test builds) or a sink-boundary failure that is counted and
//! dropped so it can never perturb element timing.

use thiserror::Error;

/// Errors reported synchronously by the engine's configuration surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum KeyerError {
    /// Non-positive WPM. Callers should clamp to a sane operating range,
    /// see [`crate::timing::MIN_WPM`] / [`crate::timing::MAX_WPM`].
    #[error("invalid keyer configuration: wpm must be greater than zero")]
    InvalidConfiguration { wpm: u32 },
}

/// Failures at the output-sink boundary.
///
/// The engine swallows these: a failed key command is recorded in the fault
/// state and dropped. Retry/backoff belongs to the transport collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum SinkError {
    /// The transport to the remote transmitter is not reachable right now.
    #[error("keying transport unavailable")]
    TransportUnavailable,

    /// The local sidetone path could not accept the transition.
    #[error("sidetone output unavailable")]
    SidetoneUnavailable,
}

/// Errors creating an engine instance.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] KeyerError),

    /// The element timer thread could not be spawned.
    #[error("failed to start keyer timer thread: {0}")]
    TimerSpawn(#[from] std::io::Error),
}
