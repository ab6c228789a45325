//! Keying output boundary.
//!
//! Two independent effects hang off every key transition: local sidetone
//! (the operator's real-time feedback, effectively synchronous) and the
//! outbound key command to the remote transmitter, stamped with a wrap-around
//! millisecond counter and the current session handle. Both live behind the
//! [`KeySink`] trait; the engine calls it synchronously from transition
//! points and drops failures without retrying.

use std::fmt;

use crate::error::SinkError;

/// Opaque session/client handle forwarded with every key command.
///
/// The radio protocol correlates commands to a bound client; the engine only
/// carries the value, it never interprets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionHandle(pub u32);

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08X}", self.0)
    }
}

/// Wrap-around millisecond timestamp attached to key commands.
///
/// 16 bits wide, rendered as a fixed four-digit uppercase hex token — the
/// form the downstream keying-command protocol uses for duplicate
/// suppression and ordering. Monotonic within one wrap period (~65.5 s).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyTimestamp(u16);

impl KeyTimestamp {
    /// Wrap an absolute millisecond count.
    #[inline]
    pub fn from_millis(ms: u64) -> Self {
        Self(ms as u16)
    }

    #[inline]
    pub fn value(self) -> u16 {
        self.0
    }

    /// Fixed-width hex token, e.g. `03C1`.
    pub fn hex_token(self) -> String {
        format!("{:04X}", self.0)
    }

    /// Milliseconds from `earlier` to `self`, modulo the wrap period.
    #[inline]
    pub fn wrapping_since(self, earlier: KeyTimestamp) -> u16 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl fmt::Display for KeyTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// Side-effecting boundary the engine keys through.
///
/// Implementations drive the sidetone path and forward the command to the
/// transport collaborator. Calls must return quickly and must not re-enter
/// the engine; an `Err` is counted in the engine's fault state and dropped.
pub trait KeySink: Send + Sync {
    /// Key-down (`down = true`) or key-up transition.
    fn key_transition(
        &self,
        down: bool,
        timestamp: KeyTimestamp,
        session: SessionHandle,
    ) -> Result<(), SinkError>;

    /// PTT on/off, used by the non-CW path of the transmit mode gate.
    fn ptt(&self, active: bool, session: SessionHandle) -> Result<(), SinkError>;
}

impl<T: KeySink + ?Sized> KeySink for std::sync::Arc<T> {
    fn key_transition(
        &self,
        down: bool,
        timestamp: KeyTimestamp,
        session: SessionHandle,
    ) -> Result<(), SinkError> {
        (**self).key_transition(down, timestamp, session)
    }

    fn ptt(&self, active: bool, session: SessionHandle) -> Result<(), SinkError> {
        (**self).ptt(active, session)
    }
}
