use super::format::AudioFormat;
use super::sink::AudioSink;
use crate::error::RecordError;
use anyhow::Result;
use async_trait::async_trait;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::{Path, PathBuf};
use tokio::sync::{mpsc, oneshot};

enum WavCommand {
    Write(Vec<f32>),
    Finalize { reply: oneshot::Sender<Result<()>> },
}

/// WAV encoder backed by a dedicated writer thread
///
/// The capture bridge never touches the file directly. A failed sample write
/// is remembered and reported by `finalize`.
pub struct WavSink {
    path: PathBuf,
    tx: mpsc::UnboundedSender<WavCommand>,
}

impl WavSink {
    pub fn create(path: &Path, format: AudioFormat) -> Result<Self, RecordError> {
        let spec = WavSpec {
            channels: format.channels,
            sample_rate: format.sample_rate,
            bits_per_sample: AudioFormat::BITS_PER_SAMPLE,
            sample_format: SampleFormat::Int,
        };

        let mut writer = WavWriter::create(path, spec).map_err(|source| RecordError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let target = path.to_path_buf();

        std::thread::spawn(move || {
            let mut write_error: Option<hound::Error> = None;

            while let Some(cmd) = rx.blocking_recv() {
                match cmd {
                    WavCommand::Write(samples) => {
                        if write_error.is_some() {
                            continue;
                        }
                        for sample in samples {
                            let amplitude = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                            if let Err(e) = writer.write_sample(amplitude) {
                                tracing::error!("Failed to write sample to {:?}: {}", target, e);
                                write_error = Some(e);
                                break;
                            }
                        }
                    }
                    WavCommand::Finalize { reply } => {
                        let result = match write_error.take() {
                            Some(e) => Err(anyhow::anyhow!("WAV write failed earlier: {}", e)),
                            None => writer
                                .finalize()
                                .map_err(|e| anyhow::anyhow!("Failed to finalize WAV: {}", e)),
                        };
                        let _ = reply.send(result);
                        return;
                    }
                }
            }
            tracing::debug!("WAV writer for {:?} dropped without finalize", target);
        });

        Ok(Self {
            path: path.to_path_buf(),
            tx,
        })
    }
}

#[async_trait(?Send)]
impl AudioSink for WavSink {
    fn path(&self) -> &Path {
        &self.path
    }

    fn write_chunk(&mut self, samples: Vec<f32>) -> Result<()> {
        self.tx
            .send(WavCommand::Write(samples))
            .map_err(|e| anyhow::anyhow!("Failed to send write command: {}", e))
    }

    async fn finalize(&mut self) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(WavCommand::Finalize { reply })
            .map_err(|e| anyhow::anyhow!("Failed to send finalize command: {}", e))?;

        rx.await
            .map_err(|e| anyhow::anyhow!("Failed to receive finalize response: {}", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_writes_mono_pcm16() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.wav");
        let format = AudioFormat::default();

        let mut sink = WavSink::create(&path, format).unwrap();
        sink.write_chunk(vec![0.0, 0.5, -0.5, 1.0]).unwrap();
        sink.write_chunk(vec![2.0, -2.0]).unwrap();
        sink.finalize().await.unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 6);
        assert_eq!(samples[0], 0);
        assert_eq!(samples[3], i16::MAX);
        // out-of-range input is clipped
        assert_eq!(samples[4], i16::MAX);
        assert_eq!(samples[5], -i16::MAX);
    }

    #[test]
    fn test_create_in_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("take.wav");
        let err = WavSink::create(&path, AudioFormat::default()).err().unwrap();
        assert!(matches!(err, RecordError::Create { .. }));
    }
}
