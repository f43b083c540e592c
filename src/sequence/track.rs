use crate::message::{Channel, Message, MetaMessage, VoiceEvent};
use crate::sink::OutputSink;

/// A [`Message`] pinned to an absolute tick time.
///
/// Events are ordered primarily by tick; ties keep original file order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Event {
    /// Absolute time in ticks from the start of the sequence
    pub tick: u32,
    /// The message
    pub message: Message,
}

impl Event {
    /// Pair a message with its absolute tick time.
    pub fn new(tick: u32, message: impl Into<Message>) -> Self {
        Self {
            tick,
            message: message.into(),
        }
    }
}

/// One track of a sequence: an ordered event list plus playback routing.
///
/// A track is mutable while loading (events appended in file order) and
/// read-mostly afterwards; the transport only reads events and advances its
/// own cursor.
pub struct Track {
    number: usize,
    name: String,
    events: Vec<Event>,
    duration: u32,

    output: Option<Box<dyn OutputSink>>,
    output_channel: Channel,
    muted: bool,
    recording: bool,

    patch: u8,
    volume: u8,
}

impl std::fmt::Debug for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Track")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("events", &self.events)
            .field("duration", &self.duration)
            .field("output", &self.output.as_ref().map(|_| "<sink>"))
            .field("output_channel", &self.output_channel)
            .field("muted", &self.muted)
            .field("recording", &self.recording)
            .field("patch", &self.patch)
            .field("volume", &self.volume)
            .finish()
    }
}

impl Track {
    /// Create an empty track.
    pub fn new(number: usize) -> Self {
        Self {
            number,
            name: format!("Track {number}"),
            events: Vec::new(),
            duration: 0,
            output: None,
            output_channel: Channel::new(0),
            muted: false,
            recording: false,
            patch: 0,
            volume: 127,
        }
    }

    /// The track's index within its sequence.
    pub fn number(&self) -> usize {
        self.number
    }

    /// The display name: the first TrackName meta event, or `"Track N"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The events, in time order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Tick time of the last event.
    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Append an event. Callers keep event times non-decreasing.
    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Cache the duration and scan for initial settings.
    ///
    /// The scan captures the first track name, the first NoteOn's channel
    /// as the output channel, the first patch change, and the first
    /// volume controller (CC 7) value.
    pub fn finalize_load(&mut self) {
        self.duration = self.events.last().map(|event| event.tick).unwrap_or(0);

        let mut have_name = false;
        let mut have_channel = false;
        let mut have_patch = false;
        let mut have_volume = false;
        for event in &self.events {
            match &event.message {
                Message::Meta(MetaMessage::TrackName(name)) if !have_name => {
                    self.name = name.as_str().into_owned();
                    have_name = true;
                }
                Message::ChannelVoice(voice) => match voice.event {
                    VoiceEvent::NoteOn { .. } if !have_channel => {
                        self.output_channel = voice.channel();
                        have_channel = true;
                    }
                    VoiceEvent::PatchChange { patch } if !have_patch => {
                        self.patch = patch;
                        have_patch = true;
                    }
                    VoiceEvent::Controller {
                        controller: 7,
                        value,
                    } if !have_volume => {
                        self.volume = value;
                        have_volume = true;
                    }
                    _ => {}
                },
                _ => {}
            }
            if have_name && have_channel && have_patch && have_volume {
                break;
            }
        }
    }

    /// Bind the output sink, opening it. Any previous sink is closed.
    pub fn set_output(&mut self, mut sink: Box<dyn OutputSink>) {
        if let Some(mut old) = self.output.take() {
            old.close();
        }
        sink.open();
        self.output = Some(sink);
    }

    /// The channel this track plays on.
    pub fn output_channel(&self) -> Channel {
        self.output_channel
    }

    /// Initial patch number from the settings scan.
    pub fn patch(&self) -> u8 {
        self.patch
    }

    /// Initial volume from the settings scan.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Mute or unmute. Muting flushes hanging notes.
    pub fn set_muted(&mut self, on: bool) {
        self.muted = on;
        if on {
            self.all_notes_off();
        }
    }

    /// Soloing a track unmutes it; the driver mutes the others.
    pub fn set_solo(&mut self, on: bool) {
        if on {
            self.muted = false;
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn set_recording(&mut self, on: bool) {
        self.recording = on;
    }

    /// Send a message to the output sink, unless muted or unbound.
    pub fn send_message(&mut self, message: &Message) {
        if self.muted {
            return;
        }
        if let Some(sink) = self.output.as_mut() {
            sink.send_message(&message.to_bytes());
        }
    }

    /// Idempotent, safe with no sink bound.
    pub fn all_notes_off(&mut self) {
        if let Some(sink) = self.output.as_mut() {
            sink.all_notes_off();
        }
    }
}
