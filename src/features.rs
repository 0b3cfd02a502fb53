use crate::sample::AccelSample;

/// Number of trailing magnitudes kept in a [`FeatureSet`].
pub const RECENT_MAGNITUDES: usize = 10;

/// Magnitude thresholds used to count free-fall and impact samples in a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountThresholds {
    /// Samples strictly below this magnitude count as free-fall.
    pub free_fall: f32,
    /// Samples strictly above this magnitude count as impact.
    pub impact: f32,
}

impl Default for CountThresholds {
    fn default() -> Self {
        Self {
            free_fall: 3.0,
            impact: 20.0,
        }
    }
}

/// Statistical snapshot of the sliding window.
///
/// Computed on demand from the buffer contents and never retained by it. The snapshot is
/// fixed-size so that computing it never touches the heap.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FeatureSet {
    pub mag_mean: f32,
    pub mag_max: f32,
    pub mag_min: f32,
    pub mag_std: f32,
    /// `mag_max - mag_min`.
    pub mag_range: f32,

    pub x_mean: f32,
    pub y_mean: f32,
    pub z_mean: f32,
    pub x_std: f32,
    pub y_std: f32,
    pub z_std: f32,

    /// Mean absolute difference between consecutive magnitudes.
    pub mag_change_rate: f32,

    pub free_fall_count: usize,
    pub impact_count: usize,

    /// Trailing magnitudes, oldest first; only the first `recent_len` (at most
    /// [`RECENT_MAGNITUDES`]) are meaningful.
    pub recent: [f32; RECENT_MAGNITUDES],
    pub recent_len: usize,

    pub sample_count: usize,
}

impl FeatureSet {
    /// Computes the features of `samples`, oldest first.
    ///
    /// `samples` is walked several times, so it must be cheap to clone (a slice or
    /// `VecDeque` iterator).
    pub fn compute<'a, I>(samples: I, thresholds: CountThresholds) -> Self
    where
        I: ExactSizeIterator<Item = &'a AccelSample> + Clone,
    {
        let count = samples.len();
        if count == 0 {
            return Self::default();
        }

        let mag = samples.clone().map(|s| s.magnitude);
        let (mag_min, mag_max) = mag
            .clone()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), m| {
                (lo.min(m), hi.max(m))
            });

        let mut recent = [0.0; RECENT_MAGNITUDES];
        let recent_len = count.min(RECENT_MAGNITUDES);
        for (slot, m) in recent.iter_mut().zip(mag.clone().skip(count - recent_len)) {
            *slot = m;
        }

        Self {
            mag_mean: mean(mag.clone()) as f32,
            mag_max,
            mag_min,
            mag_std: std_dev(mag.clone()),
            mag_range: mag_max - mag_min,
            x_mean: mean(samples.clone().map(|s| s.x)) as f32,
            y_mean: mean(samples.clone().map(|s| s.y)) as f32,
            z_mean: mean(samples.clone().map(|s| s.z)) as f32,
            x_std: std_dev(samples.clone().map(|s| s.x)),
            y_std: std_dev(samples.clone().map(|s| s.y)),
            z_std: std_dev(samples.clone().map(|s| s.z)),
            mag_change_rate: change_rate(mag.clone()),
            free_fall_count: mag.clone().filter(|&m| m < thresholds.free_fall).count(),
            impact_count: mag.filter(|&m| m > thresholds.impact).count(),
            recent,
            recent_len,
            sample_count: count,
        }
    }

    /// The trailing magnitudes of the window, oldest first, at most [`RECENT_MAGNITUDES`].
    pub fn recent_magnitudes(&self) -> &[f32] {
        &self.recent[..self.recent_len.min(RECENT_MAGNITUDES)]
    }

    /// Replaces the trailing magnitudes; extra values beyond [`RECENT_MAGNITUDES`] are
    /// ignored, keeping the newest ones.
    pub fn with_recent_magnitudes(mut self, values: &[f32]) -> Self {
        let keep = values.len().min(RECENT_MAGNITUDES);
        self.recent = [0.0; RECENT_MAGNITUDES];
        self.recent[..keep].copy_from_slice(&values[values.len() - keep..]);
        self.recent_len = keep;
        self
    }
}

fn mean(values: impl ExactSizeIterator<Item = f32>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.map(f64::from).sum::<f64>() / n as f64
}

/// Population standard deviation; zero for fewer than two values.
fn std_dev(values: impl ExactSizeIterator<Item = f32> + Clone) -> f32 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = mean(values.clone());
    let variance = values
        .map(|v| {
            let d = f64::from(v) - mean;
            d * d
        })
        .sum::<f64>()
        / n as f64;
    variance.sqrt() as f32
}

fn change_rate(values: impl ExactSizeIterator<Item = f32> + Clone) -> f32 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let total: f32 = values
        .clone()
        .zip(values.skip(1))
        .map(|(prev, curr)| (curr - prev).abs())
        .sum();
    total / (n - 1) as f32
}

#[cfg(test)]
mod features_tests {
    use super::*;

    fn samples(magnitudes: &[f32]) -> Vec<AccelSample> {
        magnitudes
            .iter()
            .enumerate()
            .map(|(i, &m)| AccelSample::vertical(m, i as i64 * 20))
            .collect()
    }

    #[test]
    fn test_basic_statistics() {
        let window = samples(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let f = FeatureSet::compute(window.iter(), CountThresholds::default());

        assert_eq!(f.sample_count, 8);
        assert_eq!(f.mag_mean, 5.0);
        assert_eq!(f.mag_std, 2.0);
        assert_eq!(f.mag_min, 2.0);
        assert_eq!(f.mag_max, 9.0);
        assert_eq!(f.mag_range, 7.0);
        assert_eq!(f.z_mean, 5.0);
        assert_eq!(f.x_mean, 0.0);
        assert_eq!(f.x_std, 0.0);
        assert_eq!(f.free_fall_count, 1);
        assert_eq!(f.impact_count, 0);
        // |2|+0+0+|1|+0+|2|+|2| over 7 steps
        assert!((f.mag_change_rate - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_recent_magnitudes_keeps_last_ten() {
        let mags: Vec<f32> = (0..25).map(|i| i as f32).collect();
        let window = samples(&mags);
        let f = FeatureSet::compute(window.iter(), CountThresholds::default());

        let expected: Vec<f32> = (15..25).map(|i| i as f32).collect();
        assert_eq!(f.recent_magnitudes(), expected.as_slice());
    }

    #[test]
    fn test_counts_follow_thresholds() {
        let window = samples(&[1.0, 2.0, 3.0, 9.8, 21.0, 30.0, 40.0]);
        let strict = CountThresholds {
            free_fall: 1.5,
            impact: 38.0,
        };

        let default = FeatureSet::compute(window.iter(), CountThresholds::default());
        let tuned = FeatureSet::compute(window.iter(), strict);

        assert_eq!(default.free_fall_count, 2);
        assert_eq!(default.impact_count, 3);
        assert_eq!(tuned.free_fall_count, 1);
        assert_eq!(tuned.impact_count, 1);
    }

    #[test]
    fn test_single_sample_has_zero_spread() {
        let window = samples(&[9.8]);
        let f = FeatureSet::compute(window.iter(), CountThresholds::default());
        assert_eq!(f.mag_std, 0.0);
        assert_eq!(f.mag_change_rate, 0.0);
        assert_eq!(f.mag_range, 0.0);
        assert_eq!(f.recent_magnitudes(), &[9.8]);
    }

    #[test]
    fn test_with_recent_magnitudes_truncates_to_newest() {
        let values: Vec<f32> = (0..12).map(|i| i as f32).collect();
        let f = FeatureSet::default().with_recent_magnitudes(&values);
        assert_eq!(f.recent_magnitudes().len(), RECENT_MAGNITUDES);
        assert_eq!(f.recent_magnitudes()[0], 2.0);
    }

    #[test]
    fn test_recent_len_beyond_capacity_is_clamped() {
        let f = FeatureSet {
            recent: [9.8; RECENT_MAGNITUDES],
            recent_len: RECENT_MAGNITUDES + 1,
            ..Default::default()
        };
        assert_eq!(f.recent_magnitudes().len(), RECENT_MAGNITUDES);
    }
}
