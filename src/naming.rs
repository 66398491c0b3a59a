use crate::audio::AudioFormat;
use chrono::Local;
use std::path::PathBuf;

/// A recording file produced at record start and promoted to playback when
/// the recorder finishes successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingTarget {
    pub path: PathBuf,
}

pub trait FileNamer {
    /// Fresh, never before returned path for a new recording
    fn new_recording_path(&mut self) -> std::io::Result<PathBuf>;
}

/// Names recordings after the local time they started, e.g.
/// `2026-10-18T09-41-07.512.wav`.
pub struct TimestampNamer {
    dir: PathBuf,
    last_stamp: String,
    repeat: u32,
}

impl TimestampNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            last_stamp: String::new(),
            repeat: 0,
        }
    }

    fn candidate(&self, stamp: &str) -> PathBuf {
        let name = if self.repeat == 0 {
            format!("{}.{}", stamp, AudioFormat::EXTENSION)
        } else {
            format!("{}-{}.{}", stamp, self.repeat, AudioFormat::EXTENSION)
        };
        self.dir.join(name)
    }
}

impl FileNamer for TimestampNamer {
    fn new_recording_path(&mut self) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;

        let stamp = Local::now().format("%Y-%m-%dT%H-%M-%S%.3f").to_string();
        if stamp == self.last_stamp {
            self.repeat += 1;
        } else {
            self.last_stamp = stamp;
            self.repeat = 0;
        }

        let mut path = self.candidate(&self.last_stamp);
        while path.exists() {
            self.repeat += 1;
            path = self.candidate(&self.last_stamp);
        }
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_paths_are_unique_and_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut namer = TimestampNamer::new(dir.path().join("recordings"));

        let paths: Vec<PathBuf> = (0..50).map(|_| namer.new_recording_path().unwrap()).collect();
        let unique: HashSet<&PathBuf> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());

        for path in &paths {
            assert_eq!(path.parent().unwrap(), dir.path().join("recordings"));
            assert_eq!(path.extension().unwrap(), "wav");
        }
        assert!(dir.path().join("recordings").is_dir());
    }

    #[test]
    fn test_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut namer = TimestampNamer::new(dir.path());

        let first = namer.new_recording_path().unwrap();
        std::fs::write(&first, b"").unwrap();
        // Force the same stamp to be considered again
        namer.last_stamp.clear();
        namer.repeat = 0;
        let second = namer.new_recording_path().unwrap();
        assert_ne!(first, second);
        assert!(!second.exists());
    }
}
