use super::format::AudioFormat;
use crate::error::{LoadError, RecordError, SessionError};
use std::path::Path;

/// A bound playable asset.
///
/// Positions and durations are in seconds. Levels are RMS decibels with
/// 0 dB at full scale.
pub trait Player {
    fn play(&mut self);
    fn pause(&mut self);
    fn is_playing(&self) -> bool;
    fn current_position(&self) -> f64;
    fn set_position(&mut self, seconds: f64);
    fn duration(&self) -> f64;
    fn current_level(&self, channel: usize) -> f32;
}

/// An opened recorder writing to one target file.
///
/// `stop` is asynchronous from the caller's point of view: completion is
/// reported later as `AudioEvent::RecordingFinished`.
pub trait Recorder {
    fn record(&mut self) -> Result<(), RecordError>;
    fn stop(&mut self);
    fn is_recording(&self) -> bool;
    fn current_time(&self) -> f64;
    fn current_level(&self, channel: usize) -> f32;
}

pub trait PlaybackService {
    /// Prepare the output session. Callers may continue on failure.
    fn activate(&mut self) -> Result<(), SessionError>;

    fn open(&mut self, locator: &Path) -> Result<Box<dyn Player>, LoadError>;
}

pub trait RecordingService {
    fn open(&mut self, target: &Path, format: AudioFormat) -> Result<Box<dyn Recorder>, RecordError>;
}
