use crate::stage::{OutputCollector, Stage};
use spdlog::info;
use std::marker::PhantomData;
use std::time::Instant;

/// Logs how many samples went through and at what rate.
///
/// A sensor delivering far below its nominal rate shows up here long before it shows
/// up as missed detections.
pub struct Progress<T> {
    name: String,
    interval: usize,
    count: usize,
    last_instant: Instant,
    start_instant: Instant,
    _phantom: PhantomData<T>,
}

impl<T> Progress<T> {
    pub fn new(name: impl Into<String>, interval: usize) -> Self {
        assert!(interval > 0, "interval must be greater than 0");
        let now = Instant::now();
        Self {
            name: name.into(),
            interval,
            count: 0,
            last_instant: now,
            start_instant: now,
            _phantom: PhantomData,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl<T: Clone> Stage<T, T> for Progress<T> {
    #[inline(always)]
    fn process<C>(&mut self, data: &T, collector: &mut C)
    where
        C: OutputCollector<T>,
    {
        self.count += 1;
        if self.count.is_multiple_of(self.interval) {
            let now = Instant::now();
            let elapsed = now.duration_since(self.last_instant);
            let total_elapsed = now.duration_since(self.start_instant);

            let rate = self.interval as f64 / elapsed.as_secs_f64();
            let total_rate = self.count as f64 / total_elapsed.as_secs_f64();

            info!(
                "[{}] Processed {} samples, Rate: {} samples/s, Avg: {} samples/s",
                self.name,
                format_count(self.count as f64),
                format_count(rate),
                format_count(total_rate)
            );
            self.last_instant = now;
        }
        collector.push(data.clone());
    }
}

pub fn progress<T: Clone>(name: impl Into<String>, interval: usize) -> Progress<T> {
    Progress::new(name, interval)
}

fn format_count(val: f64) -> String {
    if !val.is_finite() {
        return "-".into();
    }
    if val < 1000.0 {
        if val == val.floor() {
            format!("{:.0}", val)
        } else {
            format!("{:.2}", val)
        }
    } else if val < 1_000_000.0 {
        format!("{:.2}k", val / 1000.0)
    } else {
        format!("{:.2}m", val / 1_000_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::RawSample;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_progress_passes_samples_through() {
        let mut pipe = progress::<RawSample>("test", 2);
        let mut out = Vec::new();

        for t in [20, 40, 60] {
            thread::sleep(Duration::from_millis(1));
            pipe.process(&RawSample::new(0.0, 0.0, 9.8, t), &mut |s: RawSample| {
                out.push(s.timestamp_ms)
            });
        }

        assert_eq!(out, vec![20, 40, 60]);
        assert_eq!(pipe.count(), 3);
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(50.0), "50");
        assert_eq!(format_count(49.5), "49.50");
        assert_eq!(format_count(2500.0), "2.50k");
        assert_eq!(format_count(3_000_000.0), "3.00m");
        assert_eq!(format_count(f64::INFINITY), "-");
    }
}
