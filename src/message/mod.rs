#![doc = r#"
The MIDI message model.

# Hierarchy

```text
                    |---------|
                    | Message |
                    |---------|
                   /    |    \      \
   |---------------| |--------| |-------| |------|
   | Channel Voice | | System | | SysEx | | Meta |
   |---------------| |--------| |-------| |------|
```

Every message is immutable once constructed and knows how to serialize
itself back to the raw bytes it was decoded from: see
[`Message::to_bytes`]. Meta messages exist only inside Standard MIDI Files
and are never sent over a live wire.
"#]

mod voice;
pub use voice::*;

mod system;
pub use system::*;

mod meta;
pub use meta::*;

/// The closed set of MIDI message variants.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    /// A channel voice message (note, controller, patch, wheel...)
    ChannelVoice(ChannelVoiceMessage),
    /// A system common or system real-time message
    SystemCommon(SystemCommonMessage),
    /// A system-exclusive payload, possibly joined from several packets
    SysEx(SysExMessage),
    /// An SMF meta event
    Meta(MetaMessage),
}

impl Message {
    /// Serializes the message back to its raw byte encoding.
    ///
    /// For an unmutated decoded message this reproduces the bytes it was
    /// read from, including the status byte (running-status compression is
    /// never applied on output).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_bytes(&mut out);
        out
    }

    pub(crate) fn write_bytes(&self, out: &mut Vec<u8>) {
        match self {
            Message::ChannelVoice(msg) => msg.write_bytes(out),
            Message::SystemCommon(msg) => msg.write_bytes(out),
            Message::SysEx(msg) => msg.write_bytes(out),
            Message::Meta(msg) => msg.write_bytes(out),
        }
    }

    /// Returns the channel voice message, if that is what this is.
    pub fn as_channel_voice(&self) -> Option<&ChannelVoiceMessage> {
        match self {
            Message::ChannelVoice(msg) => Some(msg),
            _ => None,
        }
    }

    /// Returns the meta message, if that is what this is.
    pub fn as_meta(&self) -> Option<&MetaMessage> {
        match self {
            Message::Meta(msg) => Some(msg),
            _ => None,
        }
    }

    /// True for the patch-change voice message.
    ///
    /// The transport resends the last patch change crossed by a seek, so
    /// this one message kind gets a dedicated probe.
    pub fn is_patch_change(&self) -> bool {
        matches!(
            self,
            Message::ChannelVoice(ChannelVoiceMessage {
                event: VoiceEvent::PatchChange { .. },
                ..
            })
        )
    }
}

impl From<ChannelVoiceMessage> for Message {
    fn from(value: ChannelVoiceMessage) -> Self {
        Self::ChannelVoice(value)
    }
}

impl From<SystemCommonMessage> for Message {
    fn from(value: SystemCommonMessage) -> Self {
        Self::SystemCommon(value)
    }
}

impl From<SysExMessage> for Message {
    fn from(value: SysExMessage) -> Self {
        Self::SysEx(value)
    }
}

impl From<MetaMessage> for Message {
    fn from(value: MetaMessage) -> Self {
        Self::Meta(value)
    }
}
