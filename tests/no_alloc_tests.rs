use assert_no_alloc::*;
use fallwatch::{
    AccelSample, CountThresholds, EngineConfig, FallDetectionEngine, FeatureSet, RawSample,
    SampleBuffer,
};

#[cfg(debug_assertions)]
#[global_allocator]
static ALLOC: AllocDisabler = AllocDisabler;

fn resting_engine() -> FallDetectionEngine {
    let mut engine = FallDetectionEngine::new(1, EngineConfig::default()).unwrap();
    for i in 1..=150 {
        engine.push(&RawSample::new(0.0, 0.0, 9.8, i * 20));
    }
    engine
}

#[test]
fn test_resting_push_no_alloc() {
    let mut engine = resting_engine();
    let mut t = 150 * 20;

    assert_no_alloc(|| {
        for i in 0..200 {
            t += 20;
            let z = if i % 2 == 0 { 9.9 } else { 9.7 };
            engine.push(&RawSample::new(0.0, 0.0, z, t));
        }
    });
    assert_eq!(engine.buffer().len(), 100);
}

#[test]
fn test_rate_limited_push_no_alloc() {
    let mut engine = resting_engine();
    let t = engine.buffer().last_sample_time();

    assert_no_alloc(|| {
        engine.push(&RawSample::new(0.0, 0.0, 9.8, t + 5));
    });
    assert_eq!(engine.stats().rate_limited, 1);
}

#[test]
fn test_features_no_alloc() {
    let mut buffer = SampleBuffer::default();
    for i in 1..=100 {
        buffer.ingest(AccelSample::vertical(9.8, i * 20));
    }

    assert_no_alloc(|| {
        let features = buffer.features();
        assert!(features.is_some());
    });
}

#[test]
fn test_compute_from_slice_no_alloc() {
    let window: Vec<AccelSample> = (1..=50)
        .map(|i| AccelSample::vertical(if i == 25 { 30.0 } else { 9.8 }, i * 20))
        .collect();

    assert_no_alloc(|| {
        let f = FeatureSet::compute(window.iter(), CountThresholds::default());
        assert_eq!(f.impact_count, 1);
    });
}
