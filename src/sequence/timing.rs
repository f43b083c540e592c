use crate::message::TimeSignature;
use crate::micros::Micros;
use crate::DEFAULT_TEMPO;

/// One tick→time correspondence in a [`TempoMap`].
///
/// An entry is recorded wherever the global meta track changes tempo or
/// meter. Same-tick changes merge into a single entry, so ticks are
/// strictly increasing across the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimingEntry {
    /// The tick the change occurs at
    pub tick: u32,
    /// Elapsed time from sequence start at that tick
    pub micros: Micros,
    /// Quarter-note count at that tick
    pub beat: u32,
    /// New tempo in microseconds per quarter note, if this entry changes it
    pub tempo: Option<u32>,
    /// New meter, if this entry changes it
    pub meter: Option<TimeSignature>,
}

/// The tick→elapsed-time conversion table for one sequence.
///
/// Built once at load time by scanning the global meta track in time order
/// and integrating: a tempo of `t` µs/quarter active over `delta` ticks at
/// division `d` contributes `delta * t / d` microseconds. The first entry
/// always covers tick 0, with the 120 BPM default when the file does not
/// set a tempo there.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TempoMap {
    division: u16,
    entries: Vec<TimingEntry>,
}

impl TempoMap {
    pub(crate) fn new(division: u16) -> Self {
        Self {
            division,
            entries: Vec::new(),
        }
    }

    /// Ticks per quarter note.
    pub fn division(&self) -> u16 {
        self.division
    }

    /// The recorded changes, strictly increasing in tick.
    pub fn entries(&self) -> &[TimingEntry] {
        &self.entries
    }

    pub(crate) fn record_tempo(&mut self, tick: u32, tempo: u32) {
        self.entry_at_mut(tick).tempo = Some(tempo);
    }

    pub(crate) fn record_meter(&mut self, tick: u32, meter: TimeSignature) {
        self.entry_at_mut(tick).meter = Some(meter);
    }

    /// Changes arrive in time order from a single scan, so a change either
    /// merges into the trailing entry or appends past it.
    fn entry_at_mut(&mut self, tick: u32) -> &mut TimingEntry {
        if self.entries.last().is_none_or(|last| last.tick != tick) {
            self.entries.push(TimingEntry {
                tick,
                micros: Micros::ZERO,
                beat: 0,
                tempo: None,
                meter: None,
            });
        }
        self.entries.last_mut().expect("just ensured non-empty")
    }

    /// Integrate elapsed times for every entry and guarantee coverage of
    /// tick 0.
    pub(crate) fn finalize(&mut self) {
        if self.entries.first().is_none_or(|first| first.tick != 0) {
            self.entries.insert(
                0,
                TimingEntry {
                    tick: 0,
                    micros: Micros::ZERO,
                    beat: 0,
                    tempo: None,
                    meter: None,
                },
            );
        }
        if let Some(first) = self.entries.first_mut() {
            if first.tempo.is_none() {
                first.tempo = Some(DEFAULT_TEMPO);
            }
        }

        let division = self.division.max(1) as u64;
        let mut active_tempo = DEFAULT_TEMPO as u64;
        let mut time = 0u64;
        let mut previous_tick = 0u64;
        for entry in &mut self.entries {
            let delta = entry.tick as u64 - previous_tick;
            time += delta * active_tempo / division;
            entry.micros = Micros::new(time);
            entry.beat = entry.tick / self.division.max(1) as u32;
            previous_tick = entry.tick as u64;
            if let Some(tempo) = entry.tempo {
                active_tempo = tempo as u64;
            }
        }
    }

    /// The last entry that sets a tempo at or before `tick` — never one
    /// past it. After [`finalize`](Self::finalize) this always exists.
    pub fn tempo_entry_at(&self, tick: u32) -> &TimingEntry {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.tick <= tick && entry.tempo.is_some())
            .unwrap_or_else(|| &self.entries[0])
    }

    /// The tempo in effect at `tick`, in microseconds per quarter note.
    pub fn tempo_at(&self, tick: u32) -> u32 {
        self.tempo_entry_at(tick).tempo.unwrap_or(DEFAULT_TEMPO)
    }

    /// Elapsed time at `tick`: the anchor entry's cumulative time plus the
    /// remaining span at the anchor's tempo.
    pub fn time_at(&self, tick: u32) -> Micros {
        let anchor = self.tempo_entry_at(tick);
        let tempo = anchor.tempo.unwrap_or(DEFAULT_TEMPO) as u64;
        let delta = (tick - anchor.tick) as u64;
        anchor.micros + Micros::new(delta * tempo / self.division.max(1) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn integration_at_default_tempo() {
        // 120 BPM at division 96: tick 96 lands exactly at 500ms.
        let mut map = TempoMap::new(96);
        map.record_tempo(0, 500_000);
        map.finalize();
        assert_eq!(map.time_at(96), Micros::new(500_000));
        assert_eq!(map.time_at(48), Micros::new(250_000));
    }

    #[test]
    fn integration_across_a_tempo_change() {
        let mut map = TempoMap::new(96);
        map.record_tempo(0, 500_000);
        map.record_tempo(96, 250_000);
        map.finalize();
        assert_eq!(map.time_at(192), Micros::new(750_000));
        assert_eq!(map.entries()[1].micros, Micros::new(500_000));
    }

    #[test]
    fn missing_initial_tempo_falls_back_to_default() {
        let mut map = TempoMap::new(96);
        map.record_tempo(96, 250_000);
        map.finalize();
        // default covers the span before the first real change
        assert_eq!(map.entries()[0].tempo, Some(crate::DEFAULT_TEMPO));
        assert_eq!(map.time_at(96), Micros::new(500_000));
        assert_eq!(map.time_at(192), Micros::new(750_000));
    }

    #[test]
    fn same_tick_changes_merge() {
        let mut map = TempoMap::new(96);
        map.record_tempo(0, 500_000);
        map.record_meter(0, TimeSignature::default());
        map.record_tempo(0, 400_000);
        map.finalize();
        assert_eq!(map.entries().len(), 1);
        assert_eq!(map.entries()[0].tempo, Some(400_000));
        assert!(map.entries()[0].meter.is_some());
    }

    #[test]
    fn anchor_never_passes_the_target() {
        let mut map = TempoMap::new(96);
        map.record_tempo(0, 500_000);
        map.record_tempo(100, 250_000);
        map.finalize();
        assert_eq!(map.tempo_at(99), 500_000);
        assert_eq!(map.tempo_at(100), 250_000);
        assert_eq!(map.tempo_at(101), 250_000);
    }

    #[test]
    fn beats_follow_the_division() {
        let mut map = TempoMap::new(96);
        map.record_tempo(0, 500_000);
        map.record_tempo(480, 250_000);
        map.finalize();
        assert_eq!(map.entries()[1].beat, 5);
    }
}
