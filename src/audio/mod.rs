pub mod capture;
pub mod format;
pub mod level;
pub mod playback;
pub mod service;
pub mod sink;
pub mod wav_sink;

pub use capture::CpalRecording;
pub use format::AudioFormat;
pub use playback::RodioPlayback;
pub use service::{PlaybackService, Player, Recorder, RecordingService};
