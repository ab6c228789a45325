//! End-to-end pipeline tests: raw hardware events through the normalizer,
//! the transmit mode gate and the engine to a recording sink.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use netkeyer_engine::engine::KeyingPipeline;
use netkeyer_engine::error::SinkError;
use netkeyer_engine::gate::KeyerKind;
use netkeyer_engine::keyer::KeyerState;
use netkeyer_engine::paddle::{NormalizerConfig, RawKeyEvent, SerialLine};
use netkeyer_engine::sink::{KeySink, KeyTimestamp, SessionHandle};
use netkeyer_engine::timing::KeyingConfig;

const SESSION: SessionHandle = SessionHandle(0x0A11_0042);

#[derive(Default)]
struct RecordingSink {
    keys: Mutex<Vec<bool>>,
    ptts: Mutex<Vec<bool>>,
}

impl KeySink for RecordingSink {
    fn key_transition(
        &self,
        down: bool,
        _timestamp: KeyTimestamp,
        _session: SessionHandle,
    ) -> Result<(), SinkError> {
        self.keys.lock().push(down);
        Ok(())
    }

    fn ptt(&self, active: bool, _session: SessionHandle) -> Result<(), SinkError> {
        self.ptts.lock().push(active);
        Ok(())
    }
}

fn pipeline(kind: KeyerKind) -> (KeyingPipeline<Arc<RecordingSink>>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let pipeline = KeyingPipeline::new(
        KeyingConfig::with_wpm(20),
        NormalizerConfig::default(),
        kind,
        SESSION,
        Arc::clone(&sink),
    )
    .unwrap();
    (pipeline, sink)
}

#[test]
fn midi_tap_keys_one_element() {
    let (mut p, sink) = pipeline(KeyerKind::Iambic);

    p.handle_raw(RawKeyEvent::MidiNote { note: 0, on: true });
    thread::sleep(Duration::from_millis(30));
    p.handle_raw(RawKeyEvent::MidiNote { note: 0, on: false });
    thread::sleep(Duration::from_millis(300));

    assert_eq!(*sink.keys.lock(), vec![true, false]);
    assert!(sink.ptts.lock().is_empty());
}

#[test]
fn serial_edges_key_the_iambic_path() {
    let (mut p, sink) = pipeline(KeyerKind::Iambic);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Cts,
        asserted: true,
    });
    thread::sleep(Duration::from_millis(30));
    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Cts,
        asserted: false,
    });
    thread::sleep(Duration::from_millis(300));

    assert_eq!(*sink.keys.lock(), vec![true, false]);
}

#[test]
fn straight_key_is_direct_with_no_timing() {
    let (mut p, sink) = pipeline(KeyerKind::Straight);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Dsr,
        asserted: true,
    });
    // No timer involved: the transition is already there.
    assert_eq!(*sink.keys.lock(), vec![true]);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Dsr,
        asserted: false,
    });
    assert_eq!(*sink.keys.lock(), vec![true, false]);

    // The iambic FSM never ran.
    assert_eq!(p.engine().state(), KeyerState::Idle);
}

#[test]
fn non_cw_mode_collapses_paddles_to_ptt() {
    let (mut p, sink) = pipeline(KeyerKind::Iambic);
    p.set_cw_mode(false);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Cts,
        asserted: true,
    });
    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Dcd,
        asserted: true,
    });
    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Cts,
        asserted: false,
    });
    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Dcd,
        asserted: false,
    });

    // One on, one off; intermediate changes keep PTT held.
    assert_eq!(*sink.ptts.lock(), vec![true, false]);
    assert!(sink.keys.lock().is_empty());
}

#[test]
fn leaving_cw_mode_mid_element_forces_key_up() {
    let (mut p, sink) = pipeline(KeyerKind::Iambic);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Dcd,
        asserted: true,
    }); // dah, 180ms
    thread::sleep(Duration::from_millis(40));

    p.set_cw_mode(false);
    assert_eq!(p.engine().state(), KeyerState::Idle);
    {
        let keys = sink.keys.lock();
        assert_eq!(*keys, vec![true, false], "forced key-up on mode switch");
    }

    // No stale timer fires afterwards.
    thread::sleep(Duration::from_millis(400));
    assert_eq!(*sink.keys.lock(), vec![true, false]);
}

#[test]
fn returning_to_cw_mode_releases_held_ptt() {
    let (mut p, sink) = pipeline(KeyerKind::Iambic);
    p.set_cw_mode(false);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Ri,
        asserted: true,
    });
    assert_eq!(*sink.ptts.lock(), vec![true]);

    p.set_cw_mode(true);
    assert_eq!(*sink.ptts.lock(), vec![true, false]);
}

#[test]
fn swap_paddles_applies_at_the_normalizer() {
    let (mut p, sink) = pipeline(KeyerKind::Iambic);
    p.set_swap_paddles(true);

    // CTS is the left contact; swapped it keys dah (180ms), not dit (60ms).
    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Cts,
        asserted: true,
    });
    assert_eq!(p.engine().state(), KeyerState::SendingDah);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Cts,
        asserted: false,
    });
    thread::sleep(Duration::from_millis(450));
    assert_eq!(*sink.keys.lock(), vec![true, false]);
}

#[test]
fn pipeline_stop_resets_everything() {
    let (mut p, sink) = pipeline(KeyerKind::Iambic);

    p.handle_raw(RawKeyEvent::SerialEdge {
        line: SerialLine::Cts,
        asserted: true,
    });
    thread::sleep(Duration::from_millis(20));
    p.stop();

    assert_eq!(p.engine().state(), KeyerState::Idle);
    assert_eq!(*sink.keys.lock(), vec![true, false]);
}
