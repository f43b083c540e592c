use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::codec::Writer;

/// The text payload of a meta event.
///
/// SMF text is not guaranteed to be UTF-8 (plenty of files in the wild
/// carry Latin-1 or Shift-JIS), so the raw bytes are kept verbatim and the
/// string view is lossy. Re-encoding always reproduces the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetaText(Vec<u8>);

impl MetaText {
    /// The raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// A lossy string view of the payload.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for MetaText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for MetaText {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for MetaText {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

/// A time signature meta event (`FF 58`).
///
/// The denominator is stored as the power-of-two exponent written in the
/// file, so `6/8` keeps `denominator_exp == 3` and re-encodes exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSignature {
    /// Beats per bar
    pub numerator: u8,
    /// Denominator as a power-of-two exponent (2 = quarter, 3 = eighth)
    pub denominator_exp: u8,
    /// MIDI clocks per metronome click
    pub clocks_per_click: u8,
    /// Notated 32nd notes per MIDI quarter note (almost always 8)
    pub thirty_seconds_per_quarter: u8,
}

impl TimeSignature {
    /// The actual denominator, `2^denominator_exp`.
    pub const fn denominator(&self) -> u16 {
        1 << self.denominator_exp
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        // common time
        Self {
            numerator: 4,
            denominator_exp: 2,
            clocks_per_click: 24,
            thirty_seconds_per_quarter: 8,
        }
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator())
    }
}

/// A key signature meta event (`FF 59`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeySignature {
    /// Number of sharps (positive) or flats (negative), `-7..=7`
    pub accidentals: i8,
    /// True for a minor key
    pub minor: bool,
}

/// An SMPTE offset meta event (`FF 54`): where in absolute time the track
/// is meant to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmpteOffset {
    /// Hour, including the frame-rate bits as written
    pub hour: u8,
    /// Minute (0-59)
    pub minute: u8,
    /// Second (0-59)
    pub second: u8,
    /// Frame within the second
    pub frame: u8,
    /// Hundredths of a frame
    pub subframe: u8,
}

/// The meta event types this crate interprets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
enum MetaKind {
    SequenceNumber = 0x00,
    Text = 0x01,
    Copyright = 0x02,
    TrackName = 0x03,
    Instrument = 0x04,
    Lyric = 0x05,
    Marker = 0x06,
    CuePoint = 0x07,
    PatchName = 0x08,
    DeviceName = 0x09,
    MidiChannel = 0x20,
    MidiPort = 0x21,
    EndOfTrack = 0x2F,
    Tempo = 0x51,
    SmpteOffset = 0x54,
    TimeSignature = 0x58,
    KeySignature = 0x59,
    Proprietary = 0x7F,
}

/// An SMF meta event.
///
/// Unrecognized types never fail decoding; they are carried as
/// [`MetaMessage::Unknown`] with the raw payload and re-encoded untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetaMessage {
    /// `FF 00`: sequence number. A zero-length payload takes the number of
    /// the track it occurs in.
    SequenceNumber(u16),
    /// `FF 01`: free text
    Text(MetaText),
    /// `FF 02`: copyright notice
    Copyright(MetaText),
    /// `FF 03`: track display name
    TrackName(MetaText),
    /// `FF 04`: instrument name
    Instrument(MetaText),
    /// `FF 05`: lyric syllable
    Lyric(MetaText),
    /// `FF 06`: rehearsal/section marker
    Marker(MetaText),
    /// `FF 07`: cue point
    CuePoint(MetaText),
    /// `FF 08`: patch name
    PatchName(MetaText),
    /// `FF 09`: device name
    DeviceName(MetaText),
    /// `FF 20`: channel prefix (obsolete)
    MidiChannel(u8),
    /// `FF 21`: port prefix (obsolete)
    MidiPort(u8),
    /// `FF 2F`: end of track
    EndOfTrack,
    /// `FF 51`: tempo in microseconds per quarter note
    Tempo(u32),
    /// `FF 54`: SMPTE start offset
    SmpteOffset(SmpteOffset),
    /// `FF 58`: time signature
    TimeSignature(TimeSignature),
    /// `FF 59`: key signature
    KeySignature(KeySignature),
    /// `FF 7F`: sequencer-proprietary payload
    Proprietary(Vec<u8>),
    /// Any type this crate does not interpret, kept raw
    Unknown {
        /// The meta type byte
        kind: u8,
        /// The raw payload
        data: Vec<u8>,
    },
}

impl MetaMessage {
    /// Interpret a meta event from its type byte and payload.
    ///
    /// `track_number` supplies the default for a zero-length sequence
    /// number. Payloads that do not match the expected shape for their type
    /// are preserved raw rather than rejected.
    pub fn parse(kind: u8, payload: &[u8], track_number: u16) -> Self {
        let keep_raw = |reason: &str| {
            log::warn!("meta type {kind:#04x}: {reason}, keeping raw payload");
            MetaMessage::Unknown {
                kind,
                data: payload.to_vec(),
            }
        };

        let Ok(known) = MetaKind::try_from(kind) else {
            log::debug!("unrecognized meta type {kind:#04x} ({} bytes)", payload.len());
            return MetaMessage::Unknown {
                kind,
                data: payload.to_vec(),
            };
        };

        match known {
            MetaKind::SequenceNumber => match payload {
                [] => Self::SequenceNumber(track_number),
                [hi, lo, ..] => Self::SequenceNumber(((*hi as u16) << 8) | *lo as u16),
                _ => keep_raw("sequence number shorter than two bytes"),
            },
            MetaKind::Text => Self::Text(payload.to_vec().into()),
            MetaKind::Copyright => Self::Copyright(payload.to_vec().into()),
            MetaKind::TrackName => Self::TrackName(payload.to_vec().into()),
            MetaKind::Instrument => Self::Instrument(payload.to_vec().into()),
            MetaKind::Lyric => Self::Lyric(payload.to_vec().into()),
            MetaKind::Marker => Self::Marker(payload.to_vec().into()),
            MetaKind::CuePoint => Self::CuePoint(payload.to_vec().into()),
            MetaKind::PatchName => Self::PatchName(payload.to_vec().into()),
            MetaKind::DeviceName => Self::DeviceName(payload.to_vec().into()),
            MetaKind::MidiChannel => match payload {
                [channel] => Self::MidiChannel(*channel),
                _ => keep_raw("channel prefix is not one byte"),
            },
            MetaKind::MidiPort => match payload {
                [port] => Self::MidiPort(*port),
                _ => keep_raw("port prefix is not one byte"),
            },
            MetaKind::EndOfTrack => Self::EndOfTrack,
            MetaKind::Tempo => match payload {
                [b1, b2, b3] => {
                    Self::Tempo(((*b1 as u32) << 16) | ((*b2 as u32) << 8) | *b3 as u32)
                }
                _ => keep_raw("tempo is not three bytes"),
            },
            MetaKind::SmpteOffset => match payload {
                [hour, minute, second, frame, subframe] => Self::SmpteOffset(SmpteOffset {
                    hour: *hour,
                    minute: *minute,
                    second: *second,
                    frame: *frame,
                    subframe: *subframe,
                }),
                _ => keep_raw("smpte offset is not five bytes"),
            },
            MetaKind::TimeSignature => match payload {
                [nn, dd, cc, bb] => Self::TimeSignature(TimeSignature {
                    numerator: *nn,
                    denominator_exp: *dd,
                    clocks_per_click: *cc,
                    thirty_seconds_per_quarter: *bb,
                }),
                _ => keep_raw("time signature is not four bytes"),
            },
            MetaKind::KeySignature => match payload {
                [sf, mi] => Self::KeySignature(KeySignature {
                    accidentals: *sf as i8,
                    minor: *mi == 1,
                }),
                _ => keep_raw("key signature is not two bytes"),
            },
            MetaKind::Proprietary => Self::Proprietary(payload.to_vec()),
        }
    }

    /// The meta type byte.
    pub fn kind(&self) -> u8 {
        match self {
            Self::SequenceNumber(_) => MetaKind::SequenceNumber.into(),
            Self::Text(_) => MetaKind::Text.into(),
            Self::Copyright(_) => MetaKind::Copyright.into(),
            Self::TrackName(_) => MetaKind::TrackName.into(),
            Self::Instrument(_) => MetaKind::Instrument.into(),
            Self::Lyric(_) => MetaKind::Lyric.into(),
            Self::Marker(_) => MetaKind::Marker.into(),
            Self::CuePoint(_) => MetaKind::CuePoint.into(),
            Self::PatchName(_) => MetaKind::PatchName.into(),
            Self::DeviceName(_) => MetaKind::DeviceName.into(),
            Self::MidiChannel(_) => MetaKind::MidiChannel.into(),
            Self::MidiPort(_) => MetaKind::MidiPort.into(),
            Self::EndOfTrack => MetaKind::EndOfTrack.into(),
            Self::Tempo(_) => MetaKind::Tempo.into(),
            Self::SmpteOffset(_) => MetaKind::SmpteOffset.into(),
            Self::TimeSignature(_) => MetaKind::TimeSignature.into(),
            Self::KeySignature(_) => MetaKind::KeySignature.into(),
            Self::Proprietary(_) => MetaKind::Proprietary.into(),
            Self::Unknown { kind, .. } => *kind,
        }
    }

    pub(crate) fn write_bytes(&self, out: &mut Vec<u8>) {
        let payload: Vec<u8> = match self {
            Self::SequenceNumber(number) => vec![(number >> 8) as u8, (number & 0xFF) as u8],
            Self::Text(text)
            | Self::Copyright(text)
            | Self::TrackName(text)
            | Self::Instrument(text)
            | Self::Lyric(text)
            | Self::Marker(text)
            | Self::CuePoint(text)
            | Self::PatchName(text)
            | Self::DeviceName(text) => text.as_bytes().to_vec(),
            Self::MidiChannel(channel) => vec![*channel],
            Self::MidiPort(port) => vec![*port],
            Self::EndOfTrack => vec![],
            Self::Tempo(tempo) => {
                vec![(tempo >> 16) as u8, (tempo >> 8) as u8, *tempo as u8]
            }
            Self::SmpteOffset(offset) => vec![
                offset.hour,
                offset.minute,
                offset.second,
                offset.frame,
                offset.subframe,
            ],
            Self::TimeSignature(sig) => vec![
                sig.numerator,
                sig.denominator_exp,
                sig.clocks_per_click,
                sig.thirty_seconds_per_quarter,
            ],
            Self::KeySignature(sig) => vec![sig.accidentals as u8, sig.minor as u8],
            Self::Proprietary(data) => data.clone(),
            Self::Unknown { data, .. } => data.clone(),
        };
        out.push(0xFF);
        out.push(self.kind());
        Writer::push_vlq(out, payload.len() as u32);
        out.extend_from_slice(&payload);
    }
}
