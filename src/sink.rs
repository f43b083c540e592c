#![doc = r#"
Contracts for the engine's external collaborators.

The device I/O layer and the UI live outside this crate; the transport and
tracks talk to them only through these traits, without knowing whether a
sink is a hardware port, a virtual port, or a software synthesizer.
"#]

use crate::message::Message;

/// Where a track's messages go.
pub trait OutputSink {
    /// Open the underlying port or device.
    fn open(&mut self) {}

    /// Close it.
    fn close(&mut self) {}

    /// Deliver one message as raw wire bytes.
    fn send_message(&mut self, bytes: &[u8]);

    /// Silence everything still sounding. Must be idempotent.
    fn all_notes_off(&mut self) {}
}

/// Receives playback notifications, typically a UI.
///
/// Both callbacks run synchronously inside the pulse handler; they must
/// return promptly or playback timing suffers.
pub trait MidiView {
    /// An event was just dispatched on a track.
    fn message_dispatched(&mut self, track_number: usize, message: &Message) {
        let _ = (track_number, message);
    }

    /// Every track has played to its end. Sent exactly once per run.
    fn sequence_finished(&mut self) {}
}

/// A view that ignores everything, for headless playback.
impl MidiView for () {}
