#![doc = r#"
A MIDI sequence engine.

`tactus` decodes and encodes the Standard MIDI File (SMF) binary format and
drives time-accurate playback of the decoded sequence under a
piecewise-variable tempo.

# Overview

Raw bytes go through the [`codec`] into a [`Sequence`](sequence::Sequence):
a set of [`Track`](sequence::Track)s holding time-ordered
[`Event`](sequence::Event)s, plus the tempo map distilled from the global
meta track. The [`Transport`](transport::Transport) consumes a sequence and
periodic wall-clock pulses, converting its logical tick clock into elapsed
time under the currently active tempo and dispatching due events to each
track's output sink.

```no_run
use tactus::prelude::*;

let bytes = std::fs::read("song.mid").unwrap();
let sequence = tactus::codec::decode(&bytes).unwrap();

let mut transport = Transport::new(Box::new(()));
transport.load(sequence);
transport.run();
```

Device I/O and UI layers stay outside the crate: the transport talks to them
only through the [`OutputSink`](sink::OutputSink) and
[`MidiView`](sink::MidiView) contracts, and takes its notion of "now" from
an injected [`Clock`](transport::Clock) so playback is testable without a
real timer.
"#]

pub mod codec;
pub mod message;
pub mod sequence;
pub mod sink;
pub mod transport;

mod micros;
pub use micros::*;

/// Re-exports of the types most users need.
pub mod prelude {
    pub use crate::codec::{DecodeError, DecodeErrorKind, DecodeResult};
    pub use crate::message::{
        Channel, ChannelVoiceMessage, KeySignature, Message, MetaMessage, MetaText, SmpteOffset,
        SysExMessage, SystemCommonMessage, TimeSignature, VoiceEvent,
    };
    pub use crate::micros::Micros;
    pub use crate::sequence::{Event, Format, Sequence, TempoMap, TimingEntry, Track};
    pub use crate::sink::{MidiView, OutputSink};
    pub use crate::transport::{Clock, ManualClock, SystemClock, Transport};
}

/// Default tempo in microseconds per quarter note (120 BPM), assumed until a
/// file supplies its own.
pub const DEFAULT_TEMPO: u32 = 500_000;

/// Default ticks-per-quarter-note division for sequences built from scratch.
pub const DEFAULT_DIVISION: u16 = 120;
