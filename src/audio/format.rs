// Recordings are written as 16-bit signed integer PCM. Capture and metering
// work on f32 samples and convert only at the WAV writer.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;
    pub const EXTENSION: &'static str = "wav";

    /// Number of interleaved samples covering `seconds` of audio
    pub fn samples_for_duration(&self, seconds: f32) -> usize {
        (self.sample_rate as f32 * self.channels as f32 * seconds) as usize
    }

    /// Seconds represented by `samples` interleaved samples
    pub fn duration_of(&self, samples: u64) -> f64 {
        let per_second = self.sample_rate as u64 * self.channels.max(1) as u64;
        if per_second == 0 {
            return 0.0;
        }
        samples as f64 / per_second as f64
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
        }
    }
}
