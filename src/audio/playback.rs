//! Playback through rodio with per-channel RMS metering.

use super::level::{LevelCell, to_db};
use super::service::{PlaybackService, Player};
use crate::error::{LoadError, SessionError};
use crate::messages::{AudioEvent, EventSender};
use rodio::source::SeekError;
use rodio::{ChannelCount, Decoder, OutputStream, OutputStreamBuilder, Sample, SampleRate, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Length of one metering window
const METER_WINDOW: Duration = Duration::from_millis(50);

pub struct RodioPlayback {
    stream: Option<OutputStream>,
    events: EventSender,
}

impl RodioPlayback {
    pub fn new(events: EventSender) -> Self {
        Self {
            stream: None,
            events,
        }
    }
}

impl PlaybackService for RodioPlayback {
    fn activate(&mut self) -> Result<(), SessionError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| SessionError::Output(e.to_string()))?;
        self.stream = Some(stream);
        tracing::debug!("Audio output session active");
        Ok(())
    }

    fn open(&mut self, locator: &Path) -> Result<Box<dyn Player>, LoadError> {
        let stream = self.stream.as_ref().ok_or(LoadError::NoOutput)?;

        let source = MeteredSource::open(locator, self.events.clone())?;
        let duration = source.total_duration().map(|d| d.as_secs_f64()).unwrap_or(0.0);
        let levels = source.levels.clone();

        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        sink.append(source);

        tracing::info!("Loaded {:?} ({:.1}s)", locator, duration);

        Ok(Box::new(RodioPlayer {
            path: locator.to_path_buf(),
            sink,
            duration,
            levels,
            events: self.events.clone(),
        }))
    }
}

pub struct RodioPlayer {
    path: PathBuf,
    sink: Sink,
    duration: f64,
    levels: Arc<Vec<LevelCell>>,
    events: EventSender,
}

impl RodioPlayer {
    /// Re-queue the asset after it played to the end
    fn ensure_queued(&mut self) -> bool {
        if !self.sink.empty() {
            return true;
        }
        match MeteredSource::open(&self.path, self.events.clone()) {
            Ok(source) => {
                self.levels = source.levels.clone();
                self.sink.append(source);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to re-open {:?}: {}", self.path, e);
                let _ = self.events.send(AudioEvent::DecodeError(e.to_string()));
                false
            }
        }
    }
}

impl Player for RodioPlayer {
    fn play(&mut self) {
        if self.ensure_queued() {
            self.sink.play();
        }
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_playing(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn current_position(&self) -> f64 {
        if self.sink.empty() {
            0.0
        } else {
            self.sink.get_pos().as_secs_f64()
        }
    }

    fn set_position(&mut self, seconds: f64) {
        let was_playing = self.is_playing();
        if !self.ensure_queued() {
            return;
        }
        if !was_playing {
            self.sink.pause();
        }
        if let Err(e) = self.sink.try_seek(Duration::from_secs_f64(seconds.max(0.0))) {
            tracing::warn!("Seek to {:.2}s failed: {}", seconds, e);
        }
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn current_level(&self, channel: usize) -> f32 {
        self.levels
            .get(channel)
            .or_else(|| self.levels.first())
            .map(LevelCell::load)
            .unwrap_or(super::level::SILENCE_DB)
    }
}

/// Decoded source that publishes a level per channel every metering window
/// and reports completion when it runs dry.
struct MeteredSource {
    inner: Decoder<BufReader<File>>,
    levels: Arc<Vec<LevelCell>>,
    sums: Vec<f32>,
    window_frames: usize,
    frame_count: usize,
    channel: usize,
    events: EventSender,
    finished: bool,
}

impl MeteredSource {
    fn open(path: &Path, events: EventSender) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let inner = Decoder::new(BufReader::new(file)).map_err(|e| LoadError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let channels = inner.channels().max(1) as usize;
        let window_frames =
            ((inner.sample_rate() as f64 * METER_WINDOW.as_secs_f64()) as usize).max(1);

        Ok(Self {
            inner,
            levels: Arc::new((0..channels).map(|_| LevelCell::new()).collect()),
            sums: vec![0.0; channels],
            window_frames,
            frame_count: 0,
            channel: 0,
            events,
            finished: false,
        })
    }

    fn accumulate(&mut self, sample: Sample) {
        let channels = self.sums.len();
        self.sums[self.channel] += sample * sample;
        self.channel += 1;
        if self.channel < channels {
            return;
        }
        self.channel = 0;
        self.frame_count += 1;
        if self.frame_count < self.window_frames {
            return;
        }
        for (cell, sum) in self.levels.iter().zip(self.sums.iter_mut()) {
            cell.store(to_db(*sum / self.frame_count as f32));
            *sum = 0.0;
        }
        self.frame_count = 0;
    }
}

impl Iterator for MeteredSource {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        match self.inner.next() {
            Some(sample) => {
                self.accumulate(sample);
                Some(sample)
            }
            None => {
                if !self.finished {
                    self.finished = true;
                    for cell in self.levels.iter() {
                        cell.store(super::level::SILENCE_DB);
                    }
                    let _ = self.events.send(AudioEvent::PlaybackFinished { success: true });
                }
                None
            }
        }
    }
}

impl Source for MeteredSource {
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> ChannelCount {
        self.inner.channels()
    }

    fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.channel = 0;
        self.frame_count = 0;
        self.sums.iter_mut().for_each(|s| *s = 0.0);
        self.inner.try_seek(pos)
    }
}
