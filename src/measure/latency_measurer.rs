use hdrhistogram::Histogram;
use std::time::{Duration, Instant};

/// Highest latency the histogram can hold: 10 seconds.
const MAX_TRACKABLE_NANOS: u64 = 10_000_000_000;

/// Statistics for latency measurements, all in nanoseconds.
#[derive(Debug, Clone, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
}

pub struct LatencyMeasurerGuard<'a> {
    measurer: &'a mut LatencyMeasurer,
    start: Option<Instant>,
}

impl Drop for LatencyMeasurerGuard<'_> {
    fn drop(&mut self) {
        if let Some(start) = self.start {
            self.measurer.record(start.elapsed());
        }
    }
}

/// Per-sample processing latency recorder backed by an HdrHistogram.
///
/// Only every `sample_rate`-th call is timed so that measuring stays cheap next to
/// the work being measured.
pub struct LatencyMeasurer {
    histogram: Histogram<u64>,
    sample_rate: u64,
    step: u64,
}

impl LatencyMeasurer {
    pub fn new(sample_rate: u64) -> Self {
        assert!(sample_rate > 0, "sample_rate must be positive");
        // 1ns to 10s with 3 significant figures; bounds are constant and valid.
        let histogram = Histogram::<u64>::new_with_bounds(1, MAX_TRACKABLE_NANOS, 3)
            .expect("static histogram bounds are valid");
        Self {
            histogram,
            sample_rate,
            step: 0,
        }
    }

    /// Records `duration` if this call falls on the sampling stride.
    pub fn measure(&mut self, duration: Duration) {
        self.step += 1;
        if !self.step.is_multiple_of(self.sample_rate) {
            return;
        }
        self.record(duration);
    }

    fn record(&mut self, duration: Duration) {
        let nanos = (duration.as_nanos() as u64).clamp(1, MAX_TRACKABLE_NANOS);
        // Clamped into the histogram's range, so recording cannot fail.
        let _ = self.histogram.record(nanos);
    }

    /// Times the scope the returned guard lives in.
    pub fn measure_with_guard(&mut self) -> LatencyMeasurerGuard<'_> {
        self.step += 1;
        let start = self
            .step
            .is_multiple_of(self.sample_rate)
            .then(Instant::now);
        LatencyMeasurerGuard {
            measurer: self,
            start,
        }
    }

    pub fn reset(&mut self) {
        self.histogram.reset();
        self.step = 0;
    }

    pub fn get_stats(&self) -> LatencyStats {
        let count = self.histogram.len();
        if count == 0 {
            return LatencyStats::default();
        }

        LatencyStats {
            count,
            min: self.histogram.min(),
            max: self.histogram.max(),
            mean: self.histogram.mean(),
            p50: self.histogram.value_at_quantile(0.5),
            p90: self.histogram.value_at_quantile(0.9),
            p99: self.histogram.value_at_quantile(0.99),
            p999: self.histogram.value_at_quantile(0.999),
        }
    }

    /// True when the 99th percentile stays below `budget`, e.g. one sample period.
    pub fn within_budget(&self, budget: Duration) -> bool {
        let stats = self.get_stats();
        stats.count == 0 || u128::from(stats.p99) < budget.as_nanos()
    }

    pub fn format_stats(&self) -> String {
        let stats = self.get_stats();
        if stats.count == 0 {
            return "No stats collected yet".into();
        }

        format!(
            "\tmin={},\tmax={},\tmean={},\tp50={},\tp90={},\tp99={},\tp999={}",
            Self::format_duration(stats.min as f64),
            Self::format_duration(stats.max as f64),
            Self::format_duration(stats.mean),
            Self::format_duration(stats.p50 as f64),
            Self::format_duration(stats.p90 as f64),
            Self::format_duration(stats.p99 as f64),
            Self::format_duration(stats.p999 as f64),
        )
    }

    fn format_duration(nanos: f64) -> String {
        if nanos < 1000.0 {
            format!("{:.1}ns", nanos)
        } else if nanos < 1_000_000.0 {
            format!("{:.1}us", nanos / 1000.0)
        } else if nanos < 1_000_000_000.0 {
            format!("{:.1}ms", nanos / 1_000_000.0)
        } else {
            format!("{:.2}s", nanos / 1_000_000_000.0)
        }
    }
}
