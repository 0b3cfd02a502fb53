use crate::features::CountThresholds;
use crate::sensitivity::Sensitivity;
use thiserror::Error;

/// Rejected configuration, reported at construction time and never mid-stream.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("window length must be positive, got {0}ms")]
    ZeroWindow(i64),
    #[error("sample interval must be positive, got {0}ms")]
    ZeroSampleInterval(i64),
    #[error("window of {window_ms}ms holds no samples at a {interval_ms}ms interval")]
    WindowShorterThanInterval { window_ms: i64, interval_ms: i64 },
    #[error("window capacity {capacity} is below the {required} samples needed for features")]
    WindowTooSmall { capacity: usize, required: usize },
    #[error("full ratio must be in (0, 1], got {0}")]
    FullRatioOutOfRange(f32),
    #[error("threshold `{name}` must be finite and non-negative, got {value}")]
    InvalidThreshold { name: &'static str, value: f32 },
    #[error("detection threshold must be in (0, 1], got {0}")]
    DetectionThresholdOutOfRange(f32),
    #[error("`{0}` must be positive")]
    ZeroDuration(&'static str),
    #[error("recent-average window must hold at least one sample")]
    ZeroRecentWindow,
}

fn check_threshold(name: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { name, value })
    }
}

/// Sliding-window geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferConfig {
    pub window_ms: i64,
    pub sample_interval_ms: i64,
    /// Fraction of capacity at which the window counts as full.
    pub full_ratio: f32,
    /// Fewer samples than this yield no features.
    pub min_feature_samples: usize,
    /// Free-fall/impact counting thresholds for a standalone [`crate::SampleBuffer`].
    /// A [`crate::FallDetectionEngine`] ignores this field and counts with its
    /// sensitivity profile's thresholds instead.
    pub thresholds: CountThresholds,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            window_ms: 2000,
            sample_interval_ms: 20,
            full_ratio: 0.8,
            min_feature_samples: 20,
            thresholds: CountThresholds::default(),
        }
    }
}

impl BufferConfig {
    pub fn capacity(&self) -> usize {
        if self.sample_interval_ms <= 0 || self.window_ms <= 0 {
            return 0;
        }
        (self.window_ms / self.sample_interval_ms) as usize
    }

    /// Length at which the buffer reports itself full.
    pub fn full_len(&self) -> usize {
        (self.capacity() as f32 * self.full_ratio).ceil() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_ms <= 0 {
            return Err(ConfigError::ZeroWindow(self.window_ms));
        }
        if self.sample_interval_ms <= 0 {
            return Err(ConfigError::ZeroSampleInterval(self.sample_interval_ms));
        }
        if self.capacity() == 0 {
            return Err(ConfigError::WindowShorterThanInterval {
                window_ms: self.window_ms,
                interval_ms: self.sample_interval_ms,
            });
        }
        if self.capacity() < self.min_feature_samples {
            return Err(ConfigError::WindowTooSmall {
                capacity: self.capacity(),
                required: self.min_feature_samples,
            });
        }
        if !(self.full_ratio > 0.0 && self.full_ratio <= 1.0) {
            return Err(ConfigError::FullRatioOutOfRange(self.full_ratio));
        }
        check_threshold("free_fall", self.thresholds.free_fall)?;
        check_threshold("impact", self.thresholds.impact)?;
        Ok(())
    }
}

/// Floors and ceilings of the additive scoring model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub range_floor: f32,
    pub impact_floor: f32,
    pub normal_std_ceiling: f32,
    pub prescreen_impact_floor: f32,
    pub prescreen_range_floor: f32,
    /// A recent magnitude below this marks the low phase of the typical pattern.
    pub pattern_low: f32,
    /// A later magnitude above this completes the pattern.
    pub pattern_high: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            range_floor: 8.0,
            impact_floor: 13.0,
            normal_std_ceiling: 2.0,
            prescreen_impact_floor: 11.0,
            prescreen_range_floor: 6.0,
            pattern_low: 6.0,
            pattern_high: 12.0,
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_threshold("range_floor", self.range_floor)?;
        check_threshold("impact_floor", self.impact_floor)?;
        check_threshold("normal_std_ceiling", self.normal_std_ceiling)?;
        check_threshold("prescreen_impact_floor", self.prescreen_impact_floor)?;
        check_threshold("prescreen_range_floor", self.prescreen_range_floor)?;
        check_threshold("pattern_low", self.pattern_low)?;
        check_threshold("pattern_high", self.pattern_high)?;
        Ok(())
    }
}

/// Timing and gating parameters of the confirmation state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
    /// Minimum fall probability that opens a confirmation window.
    pub detection_threshold: f32,
    /// A single sample above this skips classification entirely.
    pub extreme_impact_threshold: f32,
    /// A sample above this while confirming proves the subject is moving.
    pub cancel_activity_threshold: f32,
    pub confirmation_duration_ms: i64,
    pub cooldown_duration_ms: i64,
    /// Time after entering confirmation during which strong samples still belong to the
    /// triggering impact and cannot cancel it.
    pub impact_grace_ms: i64,
    /// Added to the profile's stillness threshold when testing for near-stillness.
    pub stillness_slack: f32,
    /// Number of trailing samples averaged for the stillness test.
    pub stillness_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.40,
            extreme_impact_threshold: 40.0,
            cancel_activity_threshold: 25.0,
            confirmation_duration_ms: 1000,
            cooldown_duration_ms: 5000,
            impact_grace_ms: 300,
            stillness_slack: 1.0,
            stillness_window: 10,
        }
    }
}

impl DetectorConfig {
    /// Time after which an unconfirmed suspicion is abandoned.
    pub fn confirmation_timeout_ms(&self) -> i64 {
        self.confirmation_duration_ms * 3
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.detection_threshold > 0.0 && self.detection_threshold <= 1.0) {
            return Err(ConfigError::DetectionThresholdOutOfRange(
                self.detection_threshold,
            ));
        }
        check_threshold("extreme_impact_threshold", self.extreme_impact_threshold)?;
        check_threshold("cancel_activity_threshold", self.cancel_activity_threshold)?;
        check_threshold("stillness_slack", self.stillness_slack)?;
        if self.confirmation_duration_ms <= 0 {
            return Err(ConfigError::ZeroDuration("confirmation_duration_ms"));
        }
        if self.cooldown_duration_ms <= 0 {
            return Err(ConfigError::ZeroDuration("cooldown_duration_ms"));
        }
        if self.impact_grace_ms < 0 {
            return Err(ConfigError::ZeroDuration("impact_grace_ms"));
        }
        if self.stillness_window == 0 {
            return Err(ConfigError::ZeroRecentWindow);
        }
        Ok(())
    }
}

/// Everything needed to build a [`crate::FallDetectionEngine`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EngineConfig {
    pub buffer: BufferConfig,
    pub classifier: ClassifierConfig,
    pub detector: DetectorConfig,
    pub sensitivity: Sensitivity,
}

impl EngineConfig {
    pub fn with_sensitivity(sensitivity: Sensitivity) -> Self {
        Self {
            sensitivity,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.buffer.validate()?;
        self.classifier.validate()?;
        self.detector.validate()?;
        let profile = self.sensitivity.profile();
        check_threshold("stillness_threshold", profile.stillness_threshold)?;
        Ok(())
    }
}
