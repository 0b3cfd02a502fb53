use crate::features::CountThresholds;
use std::fmt::{Display, Formatter};

/// Named sensitivity presets, trading false positives against missed falls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Sensitivity {
    High,
    #[default]
    Medium,
    Low,
}

impl Sensitivity {
    pub fn profile(self) -> SensitivityProfile {
        SensitivityProfile::preset(self)
    }
}

impl Display for Sensitivity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Sensitivity::High => "high",
            Sensitivity::Medium => "medium",
            Sensitivity::Low => "low",
        };
        f.write_str(name)
    }
}

/// Threshold bundle shared by the feature extractor and the confirmation state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensitivityProfile {
    pub free_fall_threshold: f32,
    pub impact_threshold: f32,
    pub stillness_threshold: f32,
}

impl SensitivityProfile {
    pub const HIGH: SensitivityProfile = SensitivityProfile {
        free_fall_threshold: 3.5,
        impact_threshold: 25.0,
        stillness_threshold: 2.0,
    };

    pub const MEDIUM: SensitivityProfile = SensitivityProfile {
        free_fall_threshold: 1.5,
        impact_threshold: 38.0,
        stillness_threshold: 1.5,
    };

    pub const LOW: SensitivityProfile = SensitivityProfile {
        free_fall_threshold: 1.0,
        impact_threshold: 45.0,
        stillness_threshold: 1.0,
    };

    pub const fn preset(level: Sensitivity) -> Self {
        match level {
            Sensitivity::High => Self::HIGH,
            Sensitivity::Medium => Self::MEDIUM,
            Sensitivity::Low => Self::LOW,
        }
    }

    /// Free-fall and impact counting thresholds for the feature window.
    pub fn count_thresholds(&self) -> CountThresholds {
        CountThresholds {
            free_fall: self.free_fall_threshold,
            impact: self.impact_threshold,
        }
    }
}

impl Default for SensitivityProfile {
    fn default() -> Self {
        Self::MEDIUM
    }
}
