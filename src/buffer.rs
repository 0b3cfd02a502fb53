use crate::config::BufferConfig;
use crate::features::{CountThresholds, FeatureSet};
use crate::sample::{AccelSample, GRAVITY};
use spdlog::warn;
use std::collections::VecDeque;

/// Outcome of offering a sample to a [`SampleBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingest {
    Accepted,
    /// Arrived sooner than the sample interval after the last accepted sample.
    RateLimited,
    /// NaN, infinite or negative values; never enters the window.
    Dropped,
}

/// Fixed-capacity sliding window over the most recent accelerometer samples.
///
/// Ingestion is rate limited by timestamp so the window always spans roughly the same
/// duration regardless of how often the driver calls in.
pub struct SampleBuffer {
    samples: VecDeque<AccelSample>,
    capacity: usize,
    sample_interval_ms: i64,
    full_len: usize,
    min_feature_samples: usize,
    thresholds: CountThresholds,
    last_sample_time: i64,
}

impl SampleBuffer {
    /// Creates a buffer from an already validated configuration.
    pub fn new(config: &BufferConfig) -> Self {
        let capacity = config.capacity();
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sample_interval_ms: config.sample_interval_ms,
            full_len: config.full_len(),
            min_feature_samples: config.min_feature_samples,
            thresholds: config.thresholds,
            last_sample_time: 0,
        }
    }

    /// Appends a sample unless it is malformed or arrives too early.
    /// Returns `true` only when the sample entered the window.
    pub fn add_sample(&mut self, x: f32, y: f32, z: f32, magnitude: f32, timestamp_ms: i64) -> bool {
        self.ingest(AccelSample::new(x, y, z, magnitude, timestamp_ms)) == Ingest::Accepted
    }

    pub fn ingest(&mut self, sample: AccelSample) -> Ingest {
        if !sample.is_well_formed() {
            warn!(
                "[Buffer] Dropping malformed sample at {}ms: x={} y={} z={} magnitude={}",
                sample.timestamp_ms, sample.x, sample.y, sample.z, sample.magnitude
            );
            return Ingest::Dropped;
        }
        // Saturating: corrupt timestamps must not overflow, only fail the spacing check.
        if sample.timestamp_ms.saturating_sub(self.last_sample_time) < self.sample_interval_ms {
            return Ingest::RateLimited;
        }
        self.last_sample_time = sample.timestamp_ms;

        // Evict before pushing so the deque never grows past its preallocated storage.
        while self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        Ingest::Accepted
    }

    /// True once the window holds enough samples to be worth classifying (80% by default).
    pub fn is_full(&self) -> bool {
        self.samples.len() >= self.full_len
    }

    /// Features of the current window, or `None` when there are too few samples.
    pub fn features(&self) -> Option<FeatureSet> {
        if self.samples.len() < self.min_feature_samples {
            return None;
        }
        Some(FeatureSet::compute(self.samples.iter(), self.thresholds))
    }

    /// Mean magnitude of the last `n` samples, or gravity when the buffer is empty.
    pub fn recent_average(&self, n: usize) -> f32 {
        if self.samples.is_empty() || n == 0 {
            return GRAVITY;
        }
        let take = n.min(self.samples.len());
        let sum: f64 = self
            .samples
            .iter()
            .skip(self.samples.len() - take)
            .map(|s| f64::from(s.magnitude))
            .sum();
        (sum / take as f64) as f32
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.last_sample_time = 0;
    }

    /// Changes the free-fall/impact counting thresholds used by [`Self::features`].
    pub fn set_thresholds(&mut self, thresholds: CountThresholds) {
        self.thresholds = thresholds;
    }

    pub fn thresholds(&self) -> CountThresholds {
        self.thresholds
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn last_sample_time(&self) -> i64 {
        self.last_sample_time
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &AccelSample> + Clone {
        self.samples.iter()
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(&BufferConfig::default())
    }
}
