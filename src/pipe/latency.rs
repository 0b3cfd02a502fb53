use crate::measure::LatencyMeasurer;
use crate::stage::{OutputCollector, Stage};
use spdlog::info;
use std::marker::PhantomData;

/// Measures how long an inner stage takes per input.
///
/// Detection must finish well inside one sample period; wrapping the engine in this
/// stage makes the margin visible.
pub struct Latency<In, Out, S> {
    name: String,
    report_interval: usize,
    stage: S,
    measurer: LatencyMeasurer,
    count: usize,
    _phantom: PhantomData<(In, Out)>,
}

impl<In, Out, S> Latency<In, Out, S>
where
    S: Stage<In, Out>,
{
    pub fn new(name: impl Into<String>, report_interval: usize, sample_rate: u64, stage: S) -> Self {
        assert!(report_interval > 0, "report_interval must be greater than 0");
        Latency {
            name: name.into(),
            report_interval,
            stage,
            measurer: LatencyMeasurer::new(sample_rate),
            count: 0,
            _phantom: PhantomData,
        }
    }

    pub fn measurer(&self) -> &LatencyMeasurer {
        &self.measurer
    }

    pub fn inner(&self) -> &S {
        &self.stage
    }

    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.stage
    }
}

impl<In, Out, S> Stage<In, Out> for Latency<In, Out, S>
where
    S: Stage<In, Out>,
{
    #[inline(always)]
    fn process<C>(&mut self, data: &In, collector: &mut C)
    where
        C: OutputCollector<Out>,
    {
        {
            let _guard = self.measurer.measure_with_guard();
            self.stage.process(data, collector);
        }
        self.count += 1;
        if self.count.is_multiple_of(self.report_interval) {
            info!("[{}] Latency: {}", self.name, self.measurer.format_stats());
        }
    }
}

pub fn latency<In, Out, S>(
    name: impl Into<String>,
    interval: usize,
    sample_rate: usize,
    stage: S,
) -> Latency<In, Out, S>
where
    S: Stage<In, Out>,
{
    Latency::new(name, interval, sample_rate as u64, stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::RawSample;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_latency_logic() {
        let mut pipe = latency("test", 2, 1, |s: &RawSample| {
            thread::sleep(Duration::from_millis(10));
            Some(s.magnitude())
        });

        let mut out = Vec::new();

        {
            let mut collector = |m: f32| out.push(m);
            pipe.process(&RawSample::new(3.0, 4.0, 0.0, 20), &mut collector);
        }
        assert_eq!(out, vec![5.0]);

        {
            let mut collector = |m: f32| out.push(m);
            pipe.process(&RawSample::new(0.0, 0.0, 9.8, 40), &mut collector);
        }
        assert_eq!(out.len(), 2);

        let stats = pipe.measurer().get_stats();
        assert_eq!(stats.count, 2);
        assert!(stats.min >= 10_000_000); // at least 10ms in nanos
    }
}
