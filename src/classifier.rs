use crate::config::ClassifierConfig;
use crate::features::FeatureSet;
use spdlog::debug;

const RANGE_POINTS: f32 = 25.0;
const IMPACT_POINTS: f32 = 30.0;
const FREE_FALL_POINTS: f32 = 20.0;
const STD_POINTS: f32 = 15.0;
const PATTERN_POINTS: f32 = 10.0;
const MAX_SCORE: f32 = RANGE_POINTS + IMPACT_POINTS + FREE_FALL_POINTS + STD_POINTS + PATTERN_POINTS;

/// Points awarded per free-fall sample, up to [`FREE_FALL_POINTS`].
const POINTS_PER_FREE_FALL_SAMPLE: f32 = 3.0;
/// The typical-pattern scan needs at least this many recent magnitudes.
const MIN_PATTERN_SAMPLES: usize = 5;

/// Result of scoring one feature snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    /// Normalized score in `[0, 1]`.
    pub fall_probability: f32,
    /// How much the probability can be trusted, in `[0, 1]`.
    pub confidence: f32,
    /// One tag per feature that contributed to the score. Diagnostics only.
    pub detected_patterns: Vec<String>,
}

/// Stateless rule-based fall scorer.
///
/// Five independent features each contribute a capped number of points; the sum over
/// the total possible score is the fall probability.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallClassifier {
    config: ClassifierConfig,
}

impl FallClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Cheap gate that rejects obviously benign windows before full scoring.
    /// Only values strictly below a floor are rejected; a value on the floor passes.
    #[inline(always)]
    pub fn quick_prescreen(&self, features: &FeatureSet) -> bool {
        features.mag_max >= self.config.prescreen_impact_floor
            && features.mag_range >= self.config.prescreen_range_floor
    }

    pub fn classify(&self, features: &FeatureSet) -> ClassificationResult {
        let cfg = &self.config;
        let mut patterns = Vec::new();
        let mut score = 0.0f32;

        if features.mag_range > cfg.range_floor {
            let points = RANGE_POINTS.min((features.mag_range - cfg.range_floor) / 2.0);
            score += points;
            patterns.push(format!("magnitude range {:.1}", features.mag_range));
        }

        if features.mag_max > cfg.impact_floor {
            let points = IMPACT_POINTS.min((features.mag_max - cfg.impact_floor) / 1.5);
            score += points;
            patterns.push(format!("impact {:.1}m/s²", features.mag_max));
        }

        if features.free_fall_count >= 1 {
            let points =
                FREE_FALL_POINTS.min(features.free_fall_count as f32 * POINTS_PER_FREE_FALL_SAMPLE);
            score += points;
            patterns.push(format!("free-fall samples {}", features.free_fall_count));
        }

        if features.mag_std > cfg.normal_std_ceiling {
            let points = STD_POINTS.min((features.mag_std - cfg.normal_std_ceiling) * 2.0);
            score += points;
            patterns.push(format!("volatile std {:.2}", features.mag_std));
        }

        if self.has_typical_fall_pattern(features) {
            score += PATTERN_POINTS;
            patterns.push("low-then-high pattern".to_string());
        }

        let fall_probability = (score / MAX_SCORE).clamp(0.0, 1.0);
        let confidence = Self::confidence(features);

        debug!(
            "[Classifier] score={:.1}/{} probability={:.3} confidence={:.2} patterns={:?}",
            score, MAX_SCORE, fall_probability, confidence, patterns
        );

        ClassificationResult {
            fall_probability,
            confidence,
            detected_patterns: patterns,
        }
    }

    /// A low (free-fall) magnitude followed later by a high (impact) one. The newest
    /// magnitude is not scanned: the impact must already have been observed once.
    fn has_typical_fall_pattern(&self, features: &FeatureSet) -> bool {
        let recent = features.recent_magnitudes();
        if recent.len() < MIN_PATTERN_SAMPLES {
            return false;
        }

        let mut seen_low = false;
        for &m in &recent[..recent.len() - 1] {
            if m < self.config.pattern_low {
                seen_low = true;
            }
            if seen_low && m > self.config.pattern_high {
                return true;
            }
        }
        false
    }

    fn confidence(features: &FeatureSet) -> f32 {
        let mut confidence = 0.5f32;

        if features.sample_count >= 80 {
            confidence += 0.2;
        } else if features.sample_count >= 50 {
            confidence += 0.1;
        }

        if features.mag_range > 30.0 {
            confidence += 0.15;
        }
        if features.impact_count >= 2 {
            confidence += 0.1;
        }

        confidence.min(1.0)
    }
}
