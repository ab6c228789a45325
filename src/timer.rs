//! One-shot element timer.
//!
//! The keyer needs exactly one outstanding deadline at a time, with a cancel
//! that leaves no dangling callback. A dedicated worker thread parks on a
//! condvar; `schedule` supersedes any pending deadline and `cancel` clears
//! it. Every armed deadline carries a generation number, delivered to the
//! fire callback so the owner can discard a fire that raced with a cancel.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

#[derive(Debug)]
struct TimerState {
    /// Pending deadline and its generation, if armed.
    deadline: Option<(Instant, u64)>,
    /// Bumped on every schedule and cancel.
    generation: u64,
    shutdown: bool,
}

#[derive(Debug)]
struct TimerShared {
    state: Mutex<TimerState>,
    cond: Condvar,
}

/// Cloneable handle for arming and cancelling the timer.
///
/// The fire callback receives one of these so an expiry can chain the next
/// deadline (element → space → element) without reaching back to the owner.
#[derive(Clone, Debug)]
pub struct TimerHandle {
    shared: Arc<TimerShared>,
}

impl TimerHandle {
    /// Arm the timer to fire once after `after`, superseding any pending
    /// deadline. Returns the generation the fire callback will see.
    pub fn schedule(&self, after: Duration) -> u64 {
        let mut state = self.shared.state.lock();
        state.generation = state.generation.wrapping_add(1);
        let generation = state.generation;
        state.deadline = Some((Instant::now() + after, generation));
        drop(state);
        self.shared.cond.notify_one();
        trace!(generation, ?after, "timer armed");
        generation
    }

    /// Clear any pending deadline. A fire already in flight will carry a
    /// stale generation.
    pub fn cancel(&self) {
        let mut state = self.shared.state.lock();
        state.generation = state.generation.wrapping_add(1);
        state.deadline = None;
        drop(state);
        self.shared.cond.notify_one();
    }

    /// Whether a deadline is currently pending.
    pub fn is_armed(&self) -> bool {
        self.shared.state.lock().deadline.is_some()
    }
}

/// A one-shot timer backed by a named worker thread.
///
/// Dropping the timer shuts the thread down and joins it.
pub struct OneShotTimer {
    handle: TimerHandle,
    worker: Option<JoinHandle<()>>,
}

impl OneShotTimer {
    /// Spawn the timer thread.
    ///
    /// `on_fire(generation, handle)` runs on the timer thread each time a
    /// deadline elapses, with no timer lock held, so it may re-arm through
    /// the provided handle.
    pub fn spawn<F>(name: &str, on_fire: F) -> io::Result<Self>
    where
        F: FnMut(u64, &TimerHandle) + Send + 'static,
    {
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                deadline: None,
                generation: 0,
                shutdown: false,
            }),
            cond: Condvar::new(),
        });
        let handle = TimerHandle {
            shared: Arc::clone(&shared),
        };
        let worker_handle = handle.clone();
        let worker = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || run(shared, worker_handle, on_fire))?;
        Ok(Self {
            handle,
            worker: Some(worker),
        })
    }

    /// Get a cloneable control handle.
    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }
}

impl Drop for OneShotTimer {
    fn drop(&mut self) {
        {
            let mut state = self.handle.shared.state.lock();
            state.shutdown = true;
            state.deadline = None;
        }
        self.handle.shared.cond.notify_one();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run<F>(shared: Arc<TimerShared>, handle: TimerHandle, mut on_fire: F)
where
    F: FnMut(u64, &TimerHandle),
{
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            return;
        }
        match state.deadline {
            None => {
                shared.cond.wait(&mut state);
            }
            Some((at, generation)) => {
                if Instant::now() >= at {
                    state.deadline = None;
                    // Fire with the lock released; the callback may re-arm.
                    drop(state);
                    trace!(generation, "timer fired");
                    on_fire(generation, &handle);
                    state = shared.state.lock();
                } else {
                    shared.cond.wait_until(&mut state, at);
                }
            }
        }
    }
}
