#![doc = r#"
The Standard MIDI File codec.

[`decode`] turns raw SMF bytes into a [`Sequence`]; [`encode`] is the
inverse. Decoding reconstructs delta-timed, running-status-compressed,
variable-length-encoded event streams, including system-exclusive payloads
split across continuation packets. Both directions are synchronous and keep
no state between calls, so independent buffers decode concurrently without
interference.
"#]

mod error;
pub use error::*;

mod reader;
pub use reader::Reader;

mod writer;
pub use writer::Writer;

use crate::message::{ChannelVoiceMessage, MetaMessage, SysExMessage, SystemCommonMessage};
use crate::sequence::{Event, Format, Sequence, Track};

/// Decode an SMF byte buffer into a sequence.
///
/// Fails with a [`FormatError`] kind on a bad header or track signature,
/// with `Truncated` when a read would pass a chunk boundary or the end of
/// the buffer, and with a [`ProtocolError`] kind when the event grammar is
/// violated. Every error carries the byte offset where it was detected.
pub fn decode(bytes: &[u8]) -> DecodeResult<Sequence> {
    let mut reader = Reader::new(bytes);

    let sig_offset = reader.position();
    let signature: [u8; 4] = reader.read_array()?;
    if &signature != b"MThd" {
        return Err(format_err(sig_offset, FormatError::HeaderSignature(signature)));
    }
    let len_offset = reader.position();
    let header_len = reader.read_u32()?;
    if header_len != 6 {
        return Err(format_err(len_offset, FormatError::HeaderLength(header_len)));
    }
    let format_offset = reader.position();
    let format_word = reader.read_u16()?;
    let format = Format::try_from(format_word)
        .map_err(|_| format_err(format_offset, FormatError::UnknownFormat(format_word)))?;
    let track_count = reader.read_u16()?;
    let division_offset = reader.position();
    let division = reader.read_u16()?;
    if division & 0x8000 != 0 {
        return Err(format_err(division_offset, FormatError::SmpteDivision));
    }

    log::debug!("decoding {format:?} file: {track_count} tracks, division {division}");

    let mut sequence = Sequence::with_format(format, division);
    for number in 0..track_count as usize {
        let track = decode_track(&mut reader, number)?;
        sequence.push_track(track);
    }
    sequence.finalize_load();
    Ok(sequence)
}

fn decode_track(reader: &mut Reader<'_>, number: usize) -> DecodeResult<Track> {
    let sig_offset = reader.position();
    let signature: [u8; 4] = reader.read_array()?;
    if &signature != b"MTrk" {
        return Err(format_err(sig_offset, FormatError::TrackSignature(signature)));
    }
    let chunk_len = reader.read_u32()? as usize;
    let chunk_base = reader.position();
    let chunk = reader.read_bytes(chunk_len)?;

    let mut chunk_reader = Reader::with_base(chunk, chunk_base);
    let mut decoder = TrackDecoder::new(number);
    let mut track = Track::new(number);
    while !chunk_reader.is_empty() {
        decoder.decode_event(&mut chunk_reader, &mut track)?;
    }
    decoder.finish(&mut track);
    Ok(track)
}

/// Per-chunk decoder state, threaded explicitly through the parse so that
/// concurrent decodes of independent byte streams cannot interfere.
struct TrackDecoder {
    /// Index of the track being decoded; defaults a zero-length sequence
    /// number event.
    number: usize,
    /// Absolute tick time, accumulated from delta times.
    current_time: u32,
    /// Last seen channel status byte, substituted when a data byte arrives
    /// in status position.
    running_status: Option<u8>,
    /// An exclusive payload whose packet did not end in `0xF7`, waiting for
    /// continuation packets. Holds the tick of the opening packet.
    open_sysex: Option<(u32, Vec<u8>)>,
}

impl TrackDecoder {
    fn new(number: usize) -> Self {
        Self {
            number,
            current_time: 0,
            running_status: None,
            open_sysex: None,
        }
    }

    fn decode_event(&mut self, reader: &mut Reader<'_>, track: &mut Track) -> DecodeResult<()> {
        let delta = reader.read_vlq()?;
        self.current_time = self.current_time.wrapping_add(delta);

        let status_offset = reader.position();
        let mut status = reader.read_u8()?;
        if status < 0x80 {
            // not a status byte: put it back and reuse the running status
            let data_byte = status;
            reader.push_back(1);
            status = self.running_status.ok_or_else(|| {
                protocol_err(status_offset, ProtocolError::RunningStatusUnset(data_byte))
            })?;
        }

        match status {
            0x80..=0xEF => {
                let data1 = reader.read_u8()?;
                let data2 = if ChannelVoiceMessage::data_len(status) == 2 {
                    reader.read_u8()?
                } else {
                    0
                };
                self.running_status = Some(status);
                track.push_event(Event::new(
                    self.current_time,
                    ChannelVoiceMessage::from_status(status, data1, data2),
                ));
            }
            0xF0 => {
                self.running_status = None;
                if let Some((tick, payload)) = self.open_sysex.take() {
                    log::warn!("new sysex at tick {} while one is still open", self.current_time);
                    track.push_event(Event::new(tick, SysExMessage::Complete(payload)));
                }
                let len = reader.read_vlq()? as usize;
                let data = reader.read_bytes(len)?;
                match data.split_last() {
                    Some((&0xF7, payload)) => {
                        track.push_event(Event::new(
                            self.current_time,
                            SysExMessage::Complete(payload.to_vec()),
                        ));
                    }
                    _ => {
                        // continuation pending until a packet ends in 0xF7
                        self.open_sysex = Some((self.current_time, data.to_vec()));
                    }
                }
            }
            0xF7 => {
                self.running_status = None;
                let len = reader.read_vlq()? as usize;
                let data = reader.read_bytes(len)?;
                match self.open_sysex.take() {
                    Some((tick, mut payload)) => match data.split_last() {
                        Some((&0xF7, rest)) => {
                            payload.extend_from_slice(rest);
                            track.push_event(Event::new(tick, SysExMessage::Complete(payload)));
                        }
                        _ => {
                            payload.extend_from_slice(data);
                            self.open_sysex = Some((tick, payload));
                        }
                    },
                    None => {
                        // an escape: raw bytes passed through verbatim
                        track.push_event(Event::new(
                            self.current_time,
                            SysExMessage::Escape(data.to_vec()),
                        ));
                    }
                }
            }
            0xFF => {
                self.running_status = None;
                let kind = reader.read_u8()?;
                let len = reader.read_vlq()? as usize;
                let payload = reader.read_bytes(len)?;
                track.push_event(Event::new(
                    self.current_time,
                    MetaMessage::parse(kind, payload, self.number as u16),
                ));
            }
            _ => {
                // 0xF1..=0xF6, 0xF8..=0xFE: fixed data count per status
                let data_len = SystemCommonMessage::data_len(status);
                let data1 = if data_len >= 1 { reader.read_u8()? } else { 0 };
                let data2 = if data_len >= 2 { reader.read_u8()? } else { 0 };
                track.push_event(Event::new(
                    self.current_time,
                    SystemCommonMessage::from_status(status, data1, data2),
                ));
            }
        }
        Ok(())
    }

    /// A chunk ending with an open exclusive payload is forgiven: the
    /// partial data is kept rather than re-synchronized or rejected.
    fn finish(self, track: &mut Track) {
        if let Some((tick, payload)) = self.open_sysex {
            log::warn!(
                "track {}: unterminated sysex at tick {tick}, keeping {} bytes",
                self.number,
                payload.len()
            );
            track.push_event(Event::new(tick, SysExMessage::Complete(payload)));
        }
    }
}

/// Encode a sequence back to SMF bytes.
///
/// Every event is emitted with an explicit status byte (running-status
/// compression is never applied), so the output of an unmodified decoded
/// sequence reproduces the source's message content exactly.
pub fn encode(sequence: &Sequence) -> Vec<u8> {
    let mut writer = Writer::new();
    writer.push_slice(b"MThd");
    writer.push_u32(6);
    writer.push_u16(sequence.format().into());
    writer.push_u16(sequence.tracks().len() as u16);
    writer.push_u16(sequence.division());

    for track in sequence.tracks() {
        let mut body = Vec::new();
        let mut previous_time = 0u32;
        for event in track.events() {
            Writer::push_vlq(&mut body, event.tick.saturating_sub(previous_time));
            previous_time = event.tick;
            event.message.write_bytes(&mut body);
        }
        writer.push_slice(b"MTrk");
        writer.push_u32(body.len() as u32);
        writer.push_slice(&body);
    }
    writer.into_bytes()
}
