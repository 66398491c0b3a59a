use std::sync::atomic::{AtomicU32, Ordering};

/// Reading reported for silence or an empty buffer
pub const SILENCE_DB: f32 = -160.0;

/// RMS level of a buffer in decibels relative to full scale
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return SILENCE_DB;
    }
    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    to_db(sum_squares / samples.len() as f32)
}

/// Convert a mean square power to decibels, floored at `SILENCE_DB`
pub fn to_db(mean_square: f32) -> f32 {
    let rms = mean_square.sqrt();
    if rms <= 0.0 || !rms.is_finite() {
        SILENCE_DB
    } else {
        (20.0 * rms.log10()).max(SILENCE_DB)
    }
}

/// Latest level shared between an audio thread and the UI thread
#[derive(Debug)]
pub struct LevelCell(AtomicU32);

impl LevelCell {
    pub fn new() -> Self {
        Self(AtomicU32::new(SILENCE_DB.to_bits()))
    }

    pub fn store(&self, db: f32) {
        self.0.store(db.to_bits(), Ordering::Relaxed);
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl Default for LevelCell {
    fn default() -> Self {
        Self::new()
    }
}
