use pretty_assertions::assert_eq;
use tactus::prelude::*;

/// Assemble a track chunk around the given event bytes.
fn track_chunk(body: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MTrk");
    bytes.extend_from_slice(&(body.len() as u32).to_be_bytes());
    bytes.extend_from_slice(body);
    bytes
}

/// A three-track format-1 file at division 96 exercising the interesting
/// corners: running status, a NoteOn with velocity 0, a two-byte delta, a
/// split system-exclusive payload and an unknown meta type.
fn fixture() -> Vec<u8> {
    let mut bytes = Vec::new();

    // MThd
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes()); // format 1
    bytes.extend_from_slice(&3u16.to_be_bytes());
    bytes.extend_from_slice(&96u16.to_be_bytes());

    // track 0: the conductor track
    bytes.extend_from_slice(&track_chunk(&[
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, // tempo 500,000 µs/quarter
        0x00, 0xFF, 0x58, 0x04, 0x04, 0x02, 0x18, 0x08, // 4/4
        0x60, 0xFF, 0x06, 0x05, b'v', b'e', b'r', b's', b'e', // marker at tick 96
        0x00, 0xFF, 0x51, 0x03, 0x03, 0xD0, 0x90, // tempo 250,000
        0x81, 0x40, 0xFF, 0x2F, 0x00, // end of track at tick 288
    ]));

    // track 1: piano, running status and a velocity-0 note-off
    bytes.extend_from_slice(&track_chunk(&[
        0x00, 0xFF, 0x03, 0x05, b'P', b'i', b'a', b'n', b'o', //
        0x00, 0xC1, 0x05, // patch 5 on channel 1
        0x00, 0x91, 0x3C, 0x64, // note on C4
        0x60, 0x3C, 0x00, // running status, velocity 0: a note off
        0x00, 0x3E, 0x50, // running status note on D4
        0x60, 0x81, 0x3E, 0x40, // explicit note off
        0x00, 0xE1, 0x00, 0x40, // pitch wheel centered
        0x00, 0xFF, 0x2F, 0x00,
    ]));

    // track 2: a sysex split across a continuation packet
    bytes.extend_from_slice(&track_chunk(&[
        0x00, 0xF0, 0x03, 0x43, 0x12, 0x00, // opening packet, unterminated
        0x10, 0xF7, 0x02, 0x34, 0xF7, // continuation, terminated
        0x00, 0xFF, 0x60, 0x02, 0xAA, 0xBB, // unknown meta type, skipped intact
        0x20, 0x92, 0x24, 0x40, //
        0x40, 0x82, 0x24, 0x00, //
        0x00, 0xFF, 0x2F, 0x00,
    ]));

    bytes
}

#[test]
fn decode_reads_the_whole_fixture() {
    let seq = tactus::codec::decode(&fixture()).unwrap();

    assert_eq!(seq.format(), Format::Simultaneous);
    assert_eq!(seq.division(), 96);
    assert_eq!(seq.tracks().len(), 3);
    assert_eq!(seq.tracks()[1].name(), "Piano");
    assert_eq!(seq.length(), 288);

    // conductor-track metas landed in the sequence maps
    assert_eq!(seq.markers().len(), 1);
    assert_eq!(seq.markers()[0].0, 96);
    let entries = seq.tempo_map().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].tempo, Some(500_000));
    assert_eq!(entries[1].tick, 96);
    assert_eq!(entries[1].tempo, Some(250_000));
    assert_eq!(entries[1].micros, Micros::new(500_000));
}

#[test]
fn velocity_zero_note_on_decodes_as_note_off() {
    let seq = tactus::codec::decode(&fixture()).unwrap();
    let events = seq.tracks()[1].events();
    let Message::ChannelVoice(msg) = &events[3].message else {
        panic!("expected a channel voice event");
    };
    assert_eq!(
        msg.event,
        VoiceEvent::NoteOff {
            key: 0x3C,
            velocity: 0
        }
    );
    assert_eq!(events[3].tick, 96);
}

#[test]
fn split_sysex_joins_into_one_message() {
    let seq = tactus::codec::decode(&fixture()).unwrap();
    let events = seq.tracks()[2].events();
    assert_eq!(
        events[0].message,
        Message::SysEx(SysExMessage::Complete(vec![0x43, 0x12, 0x00, 0x34]))
    );
    assert_eq!(events[0].tick, 0);
}

#[test]
fn decode_encode_decode_preserves_the_event_lists() {
    let first = tactus::codec::decode(&fixture()).unwrap();
    let encoded = tactus::codec::encode(&first);
    let second = tactus::codec::decode(&encoded).unwrap();

    assert_eq!(second.format(), first.format());
    assert_eq!(second.division(), first.division());
    assert_eq!(second.tracks().len(), first.tracks().len());
    for (a, b) in first.tracks().iter().zip(second.tracks()) {
        assert_eq!(a.events(), b.events(), "track {}", a.number());
    }
    assert_eq!(second.tempo_map(), first.tempo_map());
}

#[test]
fn track_settings_scan_captures_routing_state() {
    let seq = tactus::codec::decode(&fixture()).unwrap();
    let piano = &seq.tracks()[1];
    assert_eq!(piano.output_channel(), Channel::new(1));
    assert_eq!(piano.patch(), 5);
    let bass = &seq.tracks()[2];
    assert_eq!(bass.output_channel(), Channel::new(2));
}

#[test]
fn re_encoding_an_explicit_status_file_is_byte_exact() {
    // no running status and no velocity-0 note-ons in the source, so the
    // encoder's explicit-status output reproduces the input bytes
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"MThd");
    bytes.extend_from_slice(&6u32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&1u16.to_be_bytes());
    bytes.extend_from_slice(&120u16.to_be_bytes());
    bytes.extend_from_slice(&track_chunk(&[
        0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, //
        0x00, 0x90, 0x3C, 0x64, //
        0x78, 0x80, 0x3C, 0x40, //
        0x83, 0x60, 0xFF, 0x2F, 0x00, // delta 480
    ]));

    let seq = tactus::codec::decode(&bytes).unwrap();
    assert_eq!(tactus::codec::encode(&seq), bytes);
}
