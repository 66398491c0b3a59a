use tokio::sync::mpsc;

/// Completion and failure notices posted by the audio backends.
///
/// Backends may post from audio threads; the host drains the channel on the
/// UI thread so every event is serialised with ticks and gestures.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioEvent {
    PlaybackFinished { success: bool },
    DecodeError(String),
    RecordingFinished { success: bool },
    EncodeError(String),
}

pub type EventSender = mpsc::UnboundedSender<AudioEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AudioEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
