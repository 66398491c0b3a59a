use std::path::PathBuf;
use thiserror::Error;

/// Failure to bind a playable asset. The previously loaded asset stays active.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no audio output is active")]
    NoOutput,

    #[error("failed to open {}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {reason}", .path.display())]
    Decode { path: PathBuf, reason: String },
}

/// Failure to construct or start a recorder. No recorder is installed afterwards.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("recording is unavailable: {0}")]
    Unavailable(&'static str),

    #[error("failed to prepare recording target")]
    Target(#[source] std::io::Error),

    #[error("failed to create {}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("no input audio device available")]
    NoDevice,

    #[error("input stream failed: {0}")]
    Stream(String),
}

/// Audio session could not be activated (device busy, no output device).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("audio output unavailable: {0}")]
    Output(String),
}
