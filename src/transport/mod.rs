#![doc = r#"
The playback transport: a real-time scheduler that converts a logical tick
clock into wall-clock time under a piecewise-variable tempo.

The transport is driven, not driving: an external loop (or [`Transport::run`])
calls [`pulse`](Transport::pulse) at a short fixed interval, and each pulse
catches up on however many ticks have elapsed since the last one. Tempo
changes crossed along the way re-derive the tick duration immediately, so
time-to-tick conversion is never stale, even for events simultaneous with
the change.

All operations take `&mut self`: one logical owner drives the transport, as
the borrow checker enforces.
"#]

mod clock;
pub use clock::*;

use crate::message::Message;
use crate::micros::Micros;
use crate::sequence::Sequence;
use crate::sink::MidiView;
use crate::{DEFAULT_DIVISION, DEFAULT_TEMPO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Stopped,
    Playing,
}

/// The playback scheduler.
///
/// Owns the loaded [`Sequence`] and its own transient playback state: the
/// tick counter, the active tempo, and one event cursor per track. Track 0
/// is metadata-only and never dispatched.
pub struct Transport {
    view: Box<dyn MidiView>,
    clock: Box<dyn Clock>,
    sequence: Option<Sequence>,

    division: u16,
    speed: f64,
    /// Active tempo in microseconds per quarter note.
    tempo: u32,
    /// Duration of one tick in microseconds, derived from the active tempo.
    tick_len: f64,

    /// Current tick number.
    tick_count: u32,
    /// Cumulative time of the next tick boundary, in microseconds.
    tick_time: f64,
    /// Next tempo-map entry to apply.
    tempo_pos: usize,
    /// Next-event cursor per track.
    track_pos: Vec<usize>,

    /// Wall-clock anchor: `now - start_time` is elapsed playback time.
    /// Signed, because seeking can anchor before the clock's origin.
    start_time: i64,
    /// Elapsed playback time accumulated across pauses.
    start_offset: Micros,
    state: State,
}

impl Transport {
    /// Create a transport against the real monotonic clock.
    pub fn new(view: Box<dyn MidiView>) -> Self {
        Self::with_clock(view, Box::new(SystemClock::new()))
    }

    /// Create a transport with an injected clock.
    pub fn with_clock(view: Box<dyn MidiView>, clock: Box<dyn Clock>) -> Self {
        let mut transport = Self {
            view,
            clock,
            sequence: None,
            division: DEFAULT_DIVISION,
            speed: 1.0,
            tempo: DEFAULT_TEMPO,
            tick_len: 0.0,
            tick_count: 0,
            tick_time: 0.0,
            tempo_pos: 0,
            track_pos: Vec::new(),
            start_time: 0,
            start_offset: Micros::ZERO,
            state: State::Stopped,
        };
        transport.set_tempo(DEFAULT_TEMPO);
        transport
    }

    /// Bind the sequence to play and rewind to its start.
    pub fn load(&mut self, sequence: Sequence) {
        debug_assert!(
            !sequence.tracks().is_empty(),
            "a loaded sequence must have at least its meta track"
        );
        self.division = sequence.division().max(1);
        self.track_pos = vec![0; sequence.tracks().len()];
        log::debug!(
            "transport loaded: {} tracks, division {}, length {} ticks",
            sequence.tracks().len(),
            self.division,
            sequence.length()
        );
        self.sequence = Some(sequence);
        self.rewind();
    }

    /// Unbind and return the loaded sequence.
    pub fn take_sequence(&mut self) -> Option<Sequence> {
        self.stop();
        self.sequence.take()
    }

    /// The loaded sequence.
    pub fn sequence(&self) -> Option<&Sequence> {
        self.sequence.as_ref()
    }

    /// Mutable access to the loaded sequence, for routing and mute control.
    pub fn sequence_mut(&mut self) -> Option<&mut Sequence> {
        self.sequence.as_mut()
    }

    /// Back to tick 0 with cleared cursors and tempo cache.
    ///
    /// The first tick's scheduled time is one tick duration, not zero:
    /// tick 0 is the state *before* the first tick fires.
    pub fn rewind(&mut self) {
        let initial_tempo = self
            .sequence
            .as_ref()
            .map(|seq| seq.tempo_map().tempo_at(0))
            .unwrap_or(DEFAULT_TEMPO);
        self.set_tempo(initial_tempo);
        self.tick_count = 0;
        self.tick_time = self.tick_len;
        self.tempo_pos = 0;
        for pos in &mut self.track_pos {
            *pos = 0;
        }
        self.start_offset = Micros::ZERO;
    }

    /// Start (or resume) playback from the current position.
    pub fn play(&mut self) {
        self.start_time = self.clock.now().us() as i64 - self.start_offset.us() as i64;
        self.state = State::Playing;
    }

    /// Halt playback, keeping the position for resumption, and flush
    /// hanging notes.
    pub fn stop(&mut self) {
        if self.state == State::Playing {
            let now = self.clock.now().us() as i64;
            self.start_offset = Micros::new((now - self.start_time).max(0) as u64);
            self.state = State::Stopped;
        }
        if let Some(seq) = self.sequence.as_mut() {
            seq.all_notes_off();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state == State::Playing
    }

    /// The current tick number.
    pub fn position(&self) -> u32 {
        self.tick_count
    }

    /// Elapsed sequence time at the current position.
    pub fn elapsed(&self) -> Micros {
        Micros::new(self.tick_time as u64)
    }

    /// The active tempo in microseconds per quarter note.
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Rescale the tick duration by `1 / multiplier` at the active tempo.
    /// Does not move the playback position.
    pub fn set_speed(&mut self, multiplier: f64) {
        debug_assert!(multiplier > 0.0, "speed multiplier must be positive");
        self.speed = multiplier;
        self.set_tempo(self.tempo);
    }

    /// Half-speed toggle.
    pub fn half_speed(&mut self, on: bool) {
        self.set_speed(if on { 0.5 } else { 1.0 });
    }

    fn set_tempo(&mut self, tempo: u32) {
        self.tempo = tempo;
        self.tick_len = tempo as f64 / (self.division as f64 * self.speed);
    }

    /// Jump to `target_tick` without advancing wall-clock time.
    ///
    /// Reconstructs the transient state a linear playback would have at the
    /// target: the active tempo from the tempo map (the last tempo entry at
    /// or before the target, never one past it), the elapsed-time anchor,
    /// each track's cursor, and the instrument state, by resending the last
    /// patch change at or before the target on each playable track. Other
    /// controller state crossed by the jump is not replayed.
    pub fn seek(&mut self, target_tick: u32) {
        let Some(mut seq) = self.sequence.take() else {
            return;
        };
        self.tick_count = target_tick;
        self.set_tempo(DEFAULT_TEMPO);

        let entries = seq.tempo_map().entries();
        let anchor = *seq.tempo_map().tempo_entry_at(target_tick);
        self.tempo_pos = entries
            .iter()
            .position(|entry| entry.tick > target_tick)
            .unwrap_or(entries.len());
        self.set_tempo(anchor.tempo.unwrap_or(DEFAULT_TEMPO));
        // prior cumulative time plus the partial span at the new tempo
        self.tick_time =
            anchor.micros.us() as f64 + (target_tick - anchor.tick) as f64 * self.tick_len;

        for (number, track) in seq.tracks_mut().iter_mut().enumerate().skip(1) {
            let mut pos = 0;
            let mut patch: Option<Message> = None;
            for event in track.events() {
                if event.tick > target_tick {
                    break;
                }
                if event.message.is_patch_change() {
                    patch = Some(event.message.clone());
                }
                pos += 1;
            }
            self.track_pos[number] = pos;
            if let Some(patch) = patch {
                track.send_message(&patch);
            }
        }

        // re-anchor so resuming continues from the target
        self.start_offset = Micros::new(self.tick_time as u64);
        self.start_time = self.clock.now().us() as i64 - self.start_offset.us() as i64;
        self.sequence = Some(seq);
    }

    /// Process all ticks that have elapsed since the last pulse.
    ///
    /// Called by the external periodic timer (about every millisecond).
    /// This is a catch-up loop, not one-tick-per-pulse: a coarse or jittery
    /// pulse source delays events but never loses them. Within one tick,
    /// tempo-map entries are applied before that tick's track events are
    /// dispatched.
    pub fn pulse(&mut self) {
        if self.state != State::Playing {
            return;
        }
        let Some(mut seq) = self.sequence.take() else {
            return;
        };
        let now = self.clock.now().us() as i64;
        let elapsed = (now - self.start_time) as f64;

        let mut finished = false;
        while elapsed > self.tick_time {
            self.tick_count += 1;
            self.tick_time += self.tick_len;

            let entries = seq.tempo_map().entries();
            while self.tempo_pos < entries.len()
                && entries[self.tempo_pos].tick <= self.tick_count
            {
                if let Some(tempo) = entries[self.tempo_pos].tempo {
                    self.tempo = tempo;
                    self.tick_len = tempo as f64 / (self.division as f64 * self.speed);
                }
                self.tempo_pos += 1;
            }

            let mut all_done = true;
            for (number, track) in seq.tracks_mut().iter_mut().enumerate().skip(1) {
                while self.track_pos[number] < track.events().len()
                    && track.events()[self.track_pos[number]].tick <= self.tick_count
                {
                    let message = track.events()[self.track_pos[number]].message.clone();
                    track.send_message(&message);
                    self.view.message_dispatched(number, &message);
                    self.track_pos[number] += 1;
                }
                all_done &= self.track_pos[number] >= track.events().len();
            }
            if all_done {
                finished = true;
                break;
            }
        }

        self.sequence = Some(seq);
        if finished {
            self.finish();
        }
    }

    /// Blocking drive loop: play, then pulse at a 1 ms cadence until the
    /// sequence completes or something stops the transport.
    pub fn run(&mut self) {
        self.play();
        while self.is_playing() {
            self.pulse();
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    fn finish(&mut self) {
        log::debug!("sequence finished at tick {}", self.tick_count);
        self.state = State::Stopped;
        self.start_offset = Micros::new(self.tick_time as u64);
        if let Some(seq) = self.sequence.as_mut() {
            seq.all_notes_off();
        }
        self.view.sequence_finished();
    }
}
