//! Concurrency wrapper around the keyer FSM, plus the input pipeline.
//!
//! Two mutation sources exist per keyer instance: input-callback threads
//! delivering paddle snapshots and the one-shot timer thread. Both serialize
//! through a single mutex around the FSM, so a paddle update and a timer
//! expiry can never interleave against the same state.
//!
//! The engine is long-lived: one instance survives reconnects, with
//! [`KeyerEngine::stop`] and [`KeyerEngine::rebind_session`] instead of
//! per-connection reconstruction. That avoids losing an in-flight timer
//! across a reconnect race.
//!
//! ```text
//! input threads ──▶ PaddleNormalizer ──▶ TxModeGate ──┬─▶ KeyerFsm ──▶ KeySink
//!                                                     ├─▶ straight key ─▶ KeySink
//! timer thread ───────────────────────────────────────┴─▶ PTT ─────────▶ KeySink
//! ```

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::error::{EngineError, KeyerError};
use crate::fault::{FaultCode, FaultSnapshot, FaultState};
use crate::gate::{KeyerKind, ModeChange, Route, TxModeGate};
use crate::keyer::{KeyerFsm, KeyerState, Output, TimerOp};
use crate::paddle::{NormalizerConfig, PaddleNormalizer, PaddleSnapshot, RawKeyEvent};
use crate::sink::{KeySink, KeyTimestamp, SessionHandle};
use crate::timer::{OneShotTimer, TimerHandle};
use crate::timing::KeyingConfig;

/// State behind the engine's single mutual-exclusion region.
struct Locked {
    fsm: KeyerFsm,
    /// Generation of the currently armed deadline, if any. A fire whose
    /// generation does not match is stale (raced with a cancel) and is
    /// discarded without touching the FSM.
    pending: Option<u64>,
    session: SessionHandle,
}

struct EngineShared<S> {
    locked: Mutex<Locked>,
    sink: S,
    fault: FaultState,
    /// Monotonic epoch for the wrap-around command timestamps.
    epoch: Instant,
}

impl<S: KeySink> EngineShared<S> {
    /// Timer-thread entry point.
    fn on_timer(&self, generation: u64, timer: &TimerHandle) {
        let mut locked = self.locked.lock();
        if locked.pending != Some(generation) {
            trace!(generation, "discarding stale timer fire");
            return;
        }
        locked.pending = None;
        let out = locked.fsm.timer_expired();
        self.perform(&mut locked, out, timer);
    }

    /// Execute one FSM output under the lock: key transition first, then the
    /// timer command.
    fn perform(&self, locked: &mut Locked, out: Output, timer: &TimerHandle) {
        if let Some(down) = out.key {
            self.emit_key(down, locked.session);
        }
        match out.timer {
            TimerOp::Schedule(after) => {
                locked.pending = Some(timer.schedule(after));
            }
            TimerOp::Cancel => {
                timer.cancel();
                locked.pending = None;
            }
            TimerOp::None => {}
        }
    }

    /// Send a key transition to the sink. Failures are fault-counted and
    /// dropped; element timing never waits on the transport.
    fn emit_key(&self, down: bool, session: SessionHandle) {
        let timestamp = self.now();
        trace!(down, %timestamp, %session, "key transition");
        if let Err(err) = self.sink.key_transition(down, timestamp, session) {
            warn!(%err, down, "key command dropped");
            self.fault.set(FaultCode::KeyCommandDropped, down as u32);
        }
    }

    fn emit_ptt(&self, active: bool, session: SessionHandle) {
        trace!(active, %session, "ptt");
        if let Err(err) = self.sink.ptt(active, session) {
            warn!(%err, active, "ptt command dropped");
            self.fault.set(FaultCode::PttCommandDropped, active as u32);
        }
    }

    fn now(&self) -> KeyTimestamp {
        KeyTimestamp::from_millis(self.epoch.elapsed().as_millis() as u64)
    }
}

/// The iambic keyer engine: FSM + lock + element timer + output sink.
///
/// `update_paddles` is safe to call from any thread; the timer thread and
/// input threads serialize through the engine lock. Sink calls happen
/// synchronously at transition points and must not re-enter the engine.
pub struct KeyerEngine<S: KeySink + 'static> {
    shared: Arc<EngineShared<S>>,
    timer_handle: TimerHandle,
    // Owns the timer thread; dropped (and joined) with the engine.
    _timer: OneShotTimer,
}

impl<S: KeySink + 'static> KeyerEngine<S> {
    /// Create an idle engine and start its timer thread.
    pub fn new(
        config: KeyingConfig,
        session: SessionHandle,
        sink: S,
    ) -> Result<Self, EngineError> {
        let fsm = KeyerFsm::new(config)?;
        let shared = Arc::new(EngineShared {
            locked: Mutex::new(Locked {
                fsm,
                pending: None,
                session,
            }),
            sink,
            fault: FaultState::new(),
            epoch: Instant::now(),
        });

        let worker = Arc::clone(&shared);
        let timer = OneShotTimer::spawn("keyer-element-timer", move |generation, handle| {
            worker.on_timer(generation, handle);
        })?;
        let timer_handle = timer.handle();

        Ok(Self {
            shared,
            timer_handle,
            _timer: timer,
        })
    }

    /// Apply a new paddle snapshot from the normalizer.
    pub fn update_paddles(&self, snapshot: PaddleSnapshot) {
        let mut locked = self.shared.locked.lock();
        let out = locked.fsm.update_paddles(snapshot);
        self.shared.perform(&mut locked, out, &self.timer_handle);
    }

    /// Force immediate key-up, cancel the timer, reset to idle. Idempotent.
    ///
    /// No scheduled callback survives this: the pending generation is
    /// invalidated under the lock, so a fire already in flight is discarded.
    pub fn stop(&self) {
        let mut locked = self.shared.locked.lock();
        let out = locked.fsm.stop();
        self.shared.perform(&mut locked, out, &self.timer_handle);
        debug!("keyer stopped");
    }

    /// Update speed and mode. The change applies from the next scheduled
    /// element; an in-flight element keeps its duration.
    pub fn set_config(&self, config: KeyingConfig) -> Result<(), KeyerError> {
        let mut locked = self.shared.locked.lock();
        locked.fsm.set_config(config)?;
        debug!(wpm = config.wpm, mode = ?config.mode, "keyer reconfigured");
        Ok(())
    }

    pub fn config(&self) -> KeyingConfig {
        self.shared.locked.lock().fsm.config()
    }

    /// Stop keying and bind a new session handle (connect/reconnect).
    pub fn rebind_session(&self, session: SessionHandle) {
        let mut locked = self.shared.locked.lock();
        let out = locked.fsm.stop();
        self.shared.perform(&mut locked, out, &self.timer_handle);
        locked.session = session;
        info!(%session, "keyer session rebound");
    }

    pub fn session(&self) -> SessionHandle {
        self.shared.locked.lock().session
    }

    /// Current FSM state.
    pub fn state(&self) -> KeyerState {
        self.shared.locked.lock().fsm.state()
    }

    /// Straight-key passthrough: direct key transition, no element timing.
    pub fn send_straight(&self, down: bool) {
        let session = self.session();
        self.shared.emit_key(down, session);
    }

    /// PTT passthrough for the non-CW path.
    pub fn send_ptt(&self, active: bool) {
        let session = self.session();
        self.shared.emit_ptt(active, session);
    }

    /// Fault accounting for dropped output commands.
    pub fn fault(&self) -> FaultSnapshot {
        self.shared.fault.snapshot()
    }

    /// Clear an active fault after the host has surfaced it.
    pub fn clear_fault(&self) {
        self.shared.fault.clear();
    }
}

/// Normalizer → gate → engine wiring.
///
/// The host feeds raw hardware events and mode changes; the pipeline routes
/// them to the iambic FSM, the straight-key passthrough, or the PTT path.
pub struct KeyingPipeline<S: KeySink + 'static> {
    normalizer: PaddleNormalizer,
    gate: TxModeGate,
    engine: KeyerEngine<S>,
}

impl<S: KeySink + 'static> KeyingPipeline<S> {
    pub fn new(
        config: KeyingConfig,
        normalizer: NormalizerConfig,
        kind: KeyerKind,
        session: SessionHandle,
        sink: S,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            normalizer: PaddleNormalizer::new(normalizer),
            gate: TxModeGate::new(kind),
            engine: KeyerEngine::new(config, session, sink)?,
        })
    }

    /// Normalize and route one raw hardware event.
    pub fn handle_raw(&mut self, event: RawKeyEvent) {
        let snapshot = self.normalizer.apply(event);
        self.dispatch(snapshot);
    }

    /// Route an already-normalized snapshot.
    pub fn update_paddles(&mut self, snapshot: PaddleSnapshot) {
        self.dispatch(snapshot);
    }

    fn dispatch(&mut self, snapshot: PaddleSnapshot) {
        match self.gate.route(snapshot) {
            Some(Route::Keyer(snap)) => self.engine.update_paddles(snap),
            Some(Route::StraightKey(down)) => self.engine.send_straight(down),
            Some(Route::Ptt(active)) => self.engine.send_ptt(active),
            None => {}
        }
    }

    /// Apply an operating-mode change reported by the radio-mode monitor.
    pub fn set_cw_mode(&mut self, cw_mode: bool) {
        let change = self.gate.set_cw_mode(cw_mode);
        self.apply_change(change);
        debug!(cw_mode, "operating mode changed");
    }

    /// Switch between iambic and straight keying.
    pub fn set_keyer_kind(&mut self, kind: KeyerKind) {
        let change = self.gate.set_kind(kind);
        self.apply_change(change);
    }

    fn apply_change(&mut self, change: ModeChange) {
        // Keyer first: forcing the key up beats releasing PTT in urgency.
        if change.stop_keyer {
            self.engine.stop();
        }
        if change.release_straight {
            self.engine.send_straight(false);
        }
        if change.release_ptt {
            self.engine.send_ptt(false);
        }
    }

    pub fn set_config(&mut self, config: KeyingConfig) -> Result<(), KeyerError> {
        self.engine.set_config(config)
    }

    pub fn set_swap_paddles(&mut self, swap: bool) {
        self.normalizer.set_swap_paddles(swap);
    }

    /// Stop keying and forget tracked input levels (disconnect, app exit).
    pub fn stop(&mut self) {
        self.engine.stop();
        self.normalizer.reset();
    }

    pub fn engine(&self) -> &KeyerEngine<S> {
        &self.engine
    }

    pub fn is_cw_mode(&self) -> bool {
        self.gate.is_cw_mode()
    }
}
