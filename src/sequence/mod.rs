#![doc = r#"
The in-memory sequence model: the shared contract between the
[`codec`](crate::codec) and the [`transport`](crate::transport).
"#]

mod track;
pub use track::*;

mod timing;
pub use timing::*;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::message::{KeySignature, Message, MetaMessage, MetaText};

/// How the file's tracks relate to each other, from the header chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u16)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Format {
    /// Format 0: one track carrying every channel
    SingleMultiChannel = 0,
    /// Format 1: simultaneous tracks of one song
    Simultaneous = 1,
    /// Format 2: independent single-track patterns
    SequentiallyIndependent = 2,
}

/// A decoded MIDI sequence.
///
/// Owns its tracks and timing maps. Track 0 by convention carries the
/// global meta information (tempo, meter, markers) and is never routed to
/// an output device.
#[derive(Debug)]
pub struct Sequence {
    format: Format,
    division: u16,
    tracks: Vec<Track>,
    tempo_map: TempoMap,
    markers: Vec<(u32, MetaText)>,
    key_signatures: Vec<(u32, KeySignature)>,
    length: u32,
}

impl Sequence {
    /// Create an empty sequence with the given ticks-per-quarter division.
    pub fn new(division: u16) -> Self {
        Self::with_format(Format::Simultaneous, division)
    }

    /// Create an empty sequence with an explicit header format.
    pub fn with_format(format: Format, division: u16) -> Self {
        Self {
            format,
            division,
            tracks: Vec::new(),
            tempo_map: TempoMap::new(division),
            markers: Vec::new(),
            key_signatures: Vec::new(),
            length: 0,
        }
    }

    /// The header format, re-emitted on encode.
    pub fn format(&self) -> Format {
        self.format
    }

    /// Ticks per quarter note. Constant for the sequence's lifetime.
    pub fn division(&self) -> u16 {
        self.division
    }

    /// All tracks, including the meta track 0.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Mutable track access, for routing and mute control.
    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// One track by number.
    pub fn track(&self, number: usize) -> Option<&Track> {
        self.tracks.get(number)
    }

    /// The tick→time conversion table.
    pub fn tempo_map(&self) -> &TempoMap {
        &self.tempo_map
    }

    /// Rehearsal markers from the meta track, in time order.
    pub fn markers(&self) -> &[(u32, MetaText)] {
        &self.markers
    }

    /// Key signatures from the meta track, in time order.
    pub fn key_signatures(&self) -> &[(u32, KeySignature)] {
        &self.key_signatures
    }

    /// Tick time of the last event over all tracks.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// Append a track.
    pub fn push_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Finish loading: cache per-track names and durations, fold the meta
    /// track into the tempo/meter/marker maps, and integrate the tempo
    /// map's elapsed times.
    pub fn finalize_load(&mut self) {
        self.length = 0;
        for track in &mut self.tracks {
            track.finalize_load();
            self.length = self.length.max(track.duration());
        }

        self.tempo_map = TempoMap::new(self.division);
        self.markers.clear();
        self.key_signatures.clear();
        if let Some(meta_track) = self.tracks.first() {
            for event in meta_track.events() {
                let Message::Meta(meta) = &event.message else {
                    continue;
                };
                match meta {
                    MetaMessage::Tempo(tempo) => {
                        self.tempo_map.record_tempo(event.tick, *tempo);
                    }
                    MetaMessage::TimeSignature(sig) => {
                        self.tempo_map.record_meter(event.tick, *sig);
                    }
                    MetaMessage::KeySignature(sig) => {
                        self.key_signatures.push((event.tick, *sig));
                    }
                    MetaMessage::Marker(text) => {
                        self.markers.push((event.tick, text.clone()));
                    }
                    _ => {}
                }
            }
        }
        self.tempo_map.finalize();

        log::debug!(
            "sequence finalized: {} tracks, length {} ticks, {} timing entries",
            self.tracks.len(),
            self.length,
            self.tempo_map.entries().len()
        );
    }

    /// Flush hanging notes on every playable track.
    pub fn all_notes_off(&mut self) {
        for track in self.tracks.iter_mut().skip(1) {
            track.all_notes_off();
        }
    }
}
