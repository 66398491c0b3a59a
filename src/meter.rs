use ringbuf::{HeapRb, traits::*};

/// Rolling window of normalized level readings for the visualizer.
///
/// Readings are decibels with 0 dB at full scale. Anything at or below
/// `floor_db` renders as 0, full scale renders as 1.
pub struct LevelMeter {
    samples: HeapRb<f32>,
    floor_db: f32,
}

impl LevelMeter {
    pub const DEFAULT_CAPACITY: usize = 96;
    pub const DEFAULT_FLOOR_DB: f32 = -60.0;

    pub fn new(capacity: usize, floor_db: f32) -> Self {
        Self {
            samples: HeapRb::new(capacity.max(1)),
            floor_db,
        }
    }

    pub fn normalize(&self, decibel: f32) -> f32 {
        if decibel.is_nan() {
            return 0.0;
        }
        (1.0 - decibel / self.floor_db).clamp(0.0, 1.0)
    }

    /// Append one reading, evicting the oldest at capacity
    pub fn add_value(&mut self, decibel: f32) {
        let value = self.normalize(decibel);
        self.samples.push_overwrite(value);
    }

    /// Oldest-first view of the window. Call again to restart.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.samples.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.occupied_len()
    }

    pub fn capacity(&self) -> usize {
        self.samples.capacity().get()
    }

    pub fn reset(&mut self) {
        Consumer::clear(&mut self.samples);
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_FLOOR_DB)
    }
}
