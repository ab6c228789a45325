//! Deterministic timeline tests for the iambic FSM.
//!
//! A small simulated clock drives the pure state machine: paddle events are
//! applied at their scheduled instants and the one-shot timer fires exactly
//! at its deadline. Key transitions are recorded as (time_ms, down) pairs.

use netkeyer_engine::keyer::{KeyerFsm, KeyerState, Output, TimerOp};
use netkeyer_engine::paddle::PaddleSnapshot;
use netkeyer_engine::timing::{IambicMode, KeyingConfig};

fn paddles(dit: bool, dah: bool) -> PaddleSnapshot {
    PaddleSnapshot {
        dit,
        dah,
        ..PaddleSnapshot::RELEASED
    }
}

/// Simulated timeline around a `KeyerFsm`.
struct Timeline {
    fsm: KeyerFsm,
    now_ms: u64,
    deadline_ms: Option<u64>,
    /// Recorded (time_ms, key_down) transitions.
    transitions: Vec<(u64, bool)>,
}

impl Timeline {
    fn new(wpm: u32, mode: IambicMode) -> Self {
        Self {
            fsm: KeyerFsm::new(KeyingConfig { wpm, mode }).unwrap(),
            now_ms: 0,
            deadline_ms: None,
            transitions: Vec::new(),
        }
    }

    fn record(&mut self, out: Output) {
        if let Some(down) = out.key {
            self.transitions.push((self.now_ms, down));
        }
        match out.timer {
            TimerOp::Schedule(d) => {
                self.deadline_ms = Some(self.now_ms + d.as_millis() as u64);
            }
            TimerOp::Cancel => self.deadline_ms = None,
            TimerOp::None => {}
        }
    }

    /// Apply a paddle snapshot at an absolute time, firing any timer
    /// deadlines that come first.
    fn paddles_at(&mut self, at_ms: u64, snapshot: PaddleSnapshot) {
        self.run_until(at_ms);
        self.now_ms = at_ms;
        let out = self.fsm.update_paddles(snapshot);
        self.record(out);
    }

    /// Fire all timer deadlines up to (and including) `until_ms`.
    fn run_until(&mut self, until_ms: u64) {
        while let Some(deadline) = self.deadline_ms {
            if deadline > until_ms {
                break;
            }
            self.now_ms = deadline;
            self.deadline_ms = None;
            let out = self.fsm.timer_expired();
            self.record(out);
        }
        self.now_ms = until_ms;
    }

    /// Run until the machine goes idle (or the safety bound trips).
    fn run_to_idle(&mut self) {
        for _ in 0..64 {
            if self.fsm.state() == KeyerState::Idle {
                return;
            }
            let deadline = self.deadline_ms.expect("non-idle state must have a timer");
            self.run_until(deadline);
        }
        panic!("keyer did not settle");
    }
}

#[test]
fn single_dit_press_and_hold() {
    // WPM=20 -> dit unit 60ms. Press left paddle only, hold 200ms, release:
    // key-down at t=0, key-up at t=60, then Idle with nothing latched.
    let mut tl = Timeline::new(20, IambicMode::B);

    tl.paddles_at(0, paddles(true, false));
    tl.paddles_at(200, paddles(false, false));
    tl.run_to_idle();

    assert_eq!(tl.transitions, vec![(0, true), (60, false)]);
    assert_eq!(tl.fsm.state(), KeyerState::Idle);
}

#[test]
fn mode_a_squeeze_500ms_trace() {
    // WPM=20, Mode A, hold both paddles 500ms then release:
    // Dit(0-60) gap Dah(120-300) gap Dit(360-420) gap Dah(480-660).
    // The release at 500ms lands mid-dah and must not truncate it.
    let mut tl = Timeline::new(20, IambicMode::A);

    tl.paddles_at(0, paddles(true, true));
    tl.paddles_at(500, paddles(false, false));
    tl.run_to_idle();

    assert_eq!(
        tl.transitions,
        vec![
            (0, true),
            (60, false),
            (120, true),
            (300, false),
            (360, true),
            (420, false),
            (480, true),
            (660, false),
        ]
    );
    assert_eq!(tl.fsm.state(), KeyerState::Idle);
}

#[test]
fn mode_a_continuous_squeeze_strictly_alternates() {
    let mut tl = Timeline::new(20, IambicMode::A);
    tl.paddles_at(0, paddles(true, true));

    // Walk through 8 elements while both paddles stay held.
    let mut durations = Vec::new();
    for _ in 0..8 {
        let start = tl.transitions.last().copied();
        let deadline = tl.deadline_ms.unwrap();
        tl.run_until(deadline); // element ends
        let end = tl.transitions.last().copied().unwrap();
        if let Some((t0, true)) = start {
            durations.push(end.0 - t0);
        }
        let deadline = tl.deadline_ms.unwrap();
        tl.run_until(deadline); // space ends, next element starts
    }

    // Strict dit/dah alternation: 60, 180, 60, 180, ...
    for (i, d) in durations.iter().enumerate() {
        let expected = if i % 2 == 0 { 60 } else { 180 };
        assert_eq!(*d, expected, "element {} duration", i);
    }
}

#[test]
fn mode_b_release_at_element_end_sends_one_trailing() {
    // Squeeze from idle (dit first); release exactly at the dit's end.
    // Mode B still owes one trailing dah, then Idle at the next expiry.
    let mut tl = Timeline::new(20, IambicMode::B);

    tl.paddles_at(0, paddles(true, true));
    tl.paddles_at(60, paddles(false, false));
    tl.run_to_idle();

    assert_eq!(
        tl.transitions,
        vec![(0, true), (60, false), (120, true), (300, false)]
    );
    assert_eq!(tl.fsm.state(), KeyerState::Idle);
}

#[test]
fn mode_a_release_at_element_end_sends_nothing() {
    let mut tl = Timeline::new(20, IambicMode::A);

    tl.paddles_at(0, paddles(true, true));
    tl.paddles_at(60, paddles(false, false));
    tl.run_to_idle();

    assert_eq!(tl.transitions, vec![(0, true), (60, false)]);
}

#[test]
fn release_mid_element_does_not_shorten_it() {
    let mut tl = Timeline::new(20, IambicMode::A);

    tl.paddles_at(0, paddles(false, true)); // dah: 180ms
    tl.paddles_at(50, paddles(false, false));
    tl.run_to_idle();

    assert_eq!(tl.transitions, vec![(0, true), (180, false)]);
}

#[test]
fn latched_tap_fires_after_current_element() {
    // Hold dah; tap dit briefly during the dah. The dit latch must produce
    // exactly one dit after the dah's space, then the held dah resumes.
    let mut tl = Timeline::new(20, IambicMode::A);

    tl.paddles_at(0, paddles(false, true));
    tl.paddles_at(40, paddles(true, true));
    tl.paddles_at(80, paddles(false, true));
    tl.run_until(700);

    assert_eq!(
        tl.transitions,
        vec![
            (0, true),
            (180, false),  // dah
            (240, true),
            (300, false),  // latched dit
            (360, true),
            (540, false),  // held dah again
            (600, true),   // and it keeps repeating
        ]
    );
}

#[test]
fn wpm_change_mid_element_keeps_current_duration() {
    let mut tl = Timeline::new(20, IambicMode::A);

    tl.paddles_at(0, paddles(false, true)); // dah scheduled for 180ms
    tl.run_until(50);
    tl.fsm
        .set_config(KeyingConfig::with_wpm(40))
        .unwrap(); // new dit unit: 30ms

    // Element in flight keeps its 180ms schedule.
    let deadline = tl.deadline_ms.unwrap();
    tl.run_until(deadline);
    assert_eq!(tl.transitions, vec![(0, true), (180, false)]);

    // The space and the repeated dah use the new 30ms unit. Keep dah held
    // through one more element so the new speed is observable.
    tl.paddles_at(185, paddles(false, true));
    let deadline = tl.deadline_ms.unwrap();
    tl.run_until(deadline); // space ends at 180 + 30
    assert_eq!(tl.transitions.last(), Some(&(210, true)));
    let deadline = tl.deadline_ms.unwrap();
    tl.run_until(deadline); // dah now 90ms
    assert_eq!(tl.transitions.last(), Some(&(300, false)));
}

#[test]
fn stop_mid_dah_keys_up_immediately() {
    let mut tl = Timeline::new(20, IambicMode::B);

    tl.paddles_at(0, paddles(false, true));
    tl.run_until(90);
    let out = tl.fsm.stop();
    tl.record(out);

    assert_eq!(tl.transitions, vec![(0, true), (90, false)]);
    assert_eq!(tl.fsm.state(), KeyerState::Idle);
    assert_eq!(tl.deadline_ms, None);
}
