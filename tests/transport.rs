use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tactus::prelude::*;
use tactus::sequence::{Event, Track};

/// Shared handles into a [`TestSink`], kept by the test after the sink
/// itself moves into a track.
#[derive(Clone, Default)]
struct SinkLog {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    notes_off: Arc<AtomicUsize>,
}

struct TestSink(SinkLog);

impl OutputSink for TestSink {
    fn send_message(&mut self, bytes: &[u8]) {
        self.0.sent.lock().unwrap().push(bytes.to_vec());
    }

    fn all_notes_off(&mut self) {
        self.0.notes_off.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
struct ViewLog {
    dispatched: Arc<Mutex<Vec<(usize, Message)>>>,
    finished: Arc<AtomicUsize>,
}

struct TestView(ViewLog);

impl MidiView for TestView {
    fn message_dispatched(&mut self, track_number: usize, message: &Message) {
        self.0
            .dispatched
            .lock()
            .unwrap()
            .push((track_number, message.clone()));
    }

    fn sequence_finished(&mut self) {
        self.0.finished.fetch_add(1, Ordering::SeqCst);
    }
}

fn voice(status: u8, d1: u8, d2: u8) -> ChannelVoiceMessage {
    ChannelVoiceMessage::from_status(status, d1, d2)
}

/// Division 100 at 500,000 µs/quarter: a tick is exactly 5 ms, dropping to
/// 2.5 ms when the tempo halves at tick 50.
///
/// Track 1 carries three patch changes around the seek target used below.
fn fixture() -> Sequence {
    let mut seq = Sequence::new(100);

    let mut meta = Track::new(0);
    meta.push_event(Event::new(0, MetaMessage::Tempo(500_000)));
    meta.push_event(Event::new(50, MetaMessage::Tempo(250_000)));
    meta.push_event(Event::new(100, MetaMessage::EndOfTrack));
    seq.push_track(meta);

    let mut piano = Track::new(1);
    piano.push_event(Event::new(0, voice(0xC0, 0x10, 0)));
    piano.push_event(Event::new(10, voice(0x90, 60, 100)));
    piano.push_event(Event::new(20, voice(0x80, 60, 0)));
    piano.push_event(Event::new(50, voice(0xC0, 0x20, 0)));
    piano.push_event(Event::new(70, voice(0xC0, 0x30, 0)));
    piano.push_event(Event::new(100, MetaMessage::EndOfTrack));
    seq.push_track(piano);

    let mut bass = Track::new(2);
    bass.push_event(Event::new(5, voice(0x91, 36, 90)));
    bass.push_event(Event::new(95, voice(0x81, 36, 0)));
    bass.push_event(Event::new(100, MetaMessage::EndOfTrack));
    seq.push_track(bass);

    seq.finalize_load();
    seq
}

struct Rig {
    transport: Transport,
    clock: ManualClock,
    view: ViewLog,
    sinks: Vec<SinkLog>,
}

fn rig() -> Rig {
    let clock = ManualClock::new();
    let view = ViewLog::default();
    let mut transport = Transport::with_clock(
        Box::new(TestView(view.clone())),
        Box::new(clock.clone()),
    );
    transport.load(fixture());

    let mut sinks = Vec::new();
    let seq = transport.sequence_mut().unwrap();
    for track in seq.tracks_mut().iter_mut().skip(1) {
        let log = SinkLog::default();
        track.set_output(Box::new(TestSink(log.clone())));
        sinks.push(log);
    }

    Rig {
        transport,
        clock,
        view,
        sinks,
    }
}

#[test]
fn catch_up_loop_processes_every_elapsed_tick() {
    let mut rig = rig();
    rig.transport.play();

    // 5.5 tick-durations elapse before the first pulse arrives
    rig.clock.advance(Micros::new(27_500));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 5);

    // the sixth tick fires only once its own threshold is crossed
    rig.clock.advance(Micros::new(2_000));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 5);
    rig.clock.advance(Micros::new(1_000));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 6);

    // events up to tick 5 were dispatched along the way, in order
    let dispatched = rig.view.dispatched.lock().unwrap();
    assert_eq!(dispatched.len(), 2);
    assert_eq!(dispatched[0].0, 1); // patch change at tick 0
    assert_eq!(dispatched[1].0, 2); // bass note at tick 5
}

#[test]
fn tempo_change_is_applied_when_crossed() {
    let mut rig = rig();
    rig.transport.play();
    assert_eq!(rig.transport.tempo(), 500_000);

    // ticks 1..=50 take 5 ms each; cross the change with room to spare
    rig.clock.advance(Micros::new(251_000));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 50);
    assert_eq!(rig.transport.tempo(), 250_000);

    // from here a tick is 2.5 ms
    rig.clock.advance(Micros::new(27_000));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 60);
}

#[test]
fn seek_reconstructs_tempo_and_elapsed_time() {
    let mut rig = rig();
    rig.transport.seek(60);

    assert_eq!(rig.transport.position(), 60);
    assert_eq!(rig.transport.tempo(), 250_000);
    // 50 ticks at 5 ms plus 10 at 2.5 ms
    assert_eq!(rig.transport.elapsed(), Micros::new(275_000));
}

#[test]
fn seek_resends_exactly_the_last_patch_at_or_before_the_target() {
    let mut rig = rig();
    rig.transport.seek(60);

    let sent = rig.sinks[0].sent.lock().unwrap();
    assert_eq!(*sent, vec![vec![0xC0, 0x20]]);
    // the patch at tick 70 lies past the target and must not be sent
}

#[test]
fn seek_to_a_patch_changes_own_tick_includes_it() {
    let mut rig = rig();
    rig.transport.seek(50);
    let sent = rig.sinks[0].sent.lock().unwrap();
    assert_eq!(*sent, vec![vec![0xC0, 0x20]]);
}

#[test]
fn resuming_after_a_seek_continues_from_the_target() {
    let mut rig = rig();
    rig.clock.advance(Micros::new(40_000)); // arbitrary wall time before play
    rig.transport.seek(60);
    rig.transport.play();

    // the first tick past the seek point fires as soon as its anchor time
    // is exceeded
    rig.clock.advance(Micros::new(2_000));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 61);

    // the note-off at tick 95 arrives 34 boundaries later
    rig.clock.advance(Micros::new(85_000));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 95);
    let dispatched = rig.view.dispatched.lock().unwrap();
    assert!(dispatched
        .iter()
        .any(|(track, message)| *track == 2 && message.as_channel_voice().is_some()));
}

#[test]
fn sequence_finishes_exactly_once() {
    let mut rig = rig();
    rig.transport.play();

    rig.clock.advance(Micros::new(1_000_000));
    rig.transport.pulse();
    assert!(!rig.transport.is_playing());
    assert_eq!(rig.view.finished.load(Ordering::SeqCst), 1);

    // further pulses and stops must not re-notify
    rig.clock.advance(Micros::new(1_000_000));
    rig.transport.pulse();
    rig.transport.stop();
    assert_eq!(rig.view.finished.load(Ordering::SeqCst), 1);
}

#[test]
fn finishing_flushes_notes_on_every_playable_track() {
    let mut rig = rig();
    rig.transport.play();
    rig.clock.advance(Micros::new(1_000_000));
    rig.transport.pulse();

    for sink in &rig.sinks {
        assert!(sink.notes_off.load(Ordering::SeqCst) >= 1);
    }
}

#[test]
fn stop_flushes_and_keeps_position_for_resume() {
    let mut rig = rig();
    rig.transport.play();
    rig.clock.advance(Micros::new(52_000)); // 10 ticks and a bit
    rig.transport.pulse();
    rig.transport.stop();

    assert_eq!(rig.transport.position(), 10);
    assert!(rig.sinks.iter().all(|s| s.notes_off.load(Ordering::SeqCst) >= 1));

    // a long pause must not fast-forward playback
    rig.clock.advance(Micros::new(10_000_000));
    rig.transport.play();
    rig.clock.advance(Micros::new(5_100));
    rig.transport.pulse();
    assert_eq!(rig.transport.position(), 11);
}

#[test]
fn muted_track_reaches_the_view_but_not_the_sink() {
    let mut rig = rig();
    rig.transport
        .sequence_mut()
        .unwrap()
        .tracks_mut()[2]
        .set_muted(true);
    rig.transport.play();
    rig.clock.advance(Micros::new(100_000));
    rig.transport.pulse();

    // the bass note at tick 5 was swallowed by the mute
    assert!(rig.sinks[1].sent.lock().unwrap().is_empty());
    // but the view still follows the track
    let dispatched = rig.view.dispatched.lock().unwrap();
    assert!(dispatched.iter().any(|(track, _)| *track == 2));
}

#[test]
fn events_at_one_tick_follow_the_tempo_change_at_that_tick() {
    // tempo change and patch change share tick 50; the dispatched patch
    // must see the post-change tempo
    let mut rig = rig();
    rig.transport.play();
    rig.clock.advance(Micros::new(250_500));
    rig.transport.pulse();

    assert_eq!(rig.transport.position(), 50);
    assert_eq!(rig.transport.tempo(), 250_000);
    let sent = rig.sinks[0].sent.lock().unwrap();
    assert!(sent.contains(&vec![0xC0, 0x20]));
}
