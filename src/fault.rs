//! Fault accounting for dropped output commands.
//!
//! Corrupted CW timing is worse than a lost command: when the sink boundary
//! fails, the engine records the drop here and keeps its element timing
//! intact. The host polls the snapshot to surface the condition; there is no
//! retry inside the engine.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

/// Why an output command was dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultCode {
    /// No fault recorded.
    None = 0,

    /// A key-down/key-up command failed at the sink and was dropped.
    KeyCommandDropped = 1,

    /// A PTT command failed at the sink and was dropped.
    PttCommandDropped = 2,
}

impl FaultCode {
    /// Convert from raw u8 value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => FaultCode::KeyCommandDropped,
            2 => FaultCode::PttCommandDropped,
            _ => FaultCode::None,
        }
    }
}

/// Thread-safe fault state, written from the engine's transition points.
///
/// Lock-free: set from the timer and input threads without touching the
/// engine lock ordering.
#[derive(Debug)]
pub struct FaultState {
    /// True if a fault is active (set and not yet cleared).
    active: AtomicBool,

    /// Most recent fault code.
    code: AtomicU8,

    /// Additional data (e.g. the key state of the dropped command).
    data: AtomicU32,

    /// Total drops since creation (never cleared).
    count: AtomicU32,
}

impl FaultState {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            code: AtomicU8::new(0),
            data: AtomicU32::new(0),
            count: AtomicU32::new(0),
        }
    }

    /// Record a fault. Increments the cumulative counter.
    #[inline]
    pub fn set(&self, code: FaultCode, data: u32) {
        self.code.store(code as u8, Ordering::Release);
        self.data.store(data, Ordering::Release);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Most recent code (meaningful while `is_active()`).
    #[inline]
    pub fn code(&self) -> FaultCode {
        FaultCode::from_u8(self.code.load(Ordering::Acquire))
    }

    #[inline]
    pub fn data(&self) -> u32 {
        self.data.load(Ordering::Acquire)
    }

    /// Total drops since creation.
    #[inline]
    pub fn count(&self) -> u32 {
        self.count.load(Ordering::Relaxed)
    }

    /// Clear the active flag. The counter is preserved for diagnostics.
    #[inline]
    pub fn clear(&self) {
        self.active.store(false, Ordering::Release);
    }

    /// Consistent-enough view for reporting.
    pub fn snapshot(&self) -> FaultSnapshot {
        FaultSnapshot {
            active: self.is_active(),
            code: self.code(),
            data: self.data(),
            count: self.count(),
        }
    }
}

impl Default for FaultState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the fault state.
#[derive(Clone, Copy, Debug)]
pub struct FaultSnapshot {
    pub active: bool,
    pub code: FaultCode,
    pub data: u32,
    pub count: u32,
}
