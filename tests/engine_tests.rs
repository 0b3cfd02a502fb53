use fallwatch::scenario::Scenario;
use fallwatch::{
    BufferConfig, ConfigError, DetectionState, EngineConfig, FallConfirmed, FallDetectionEngine,
    Ingest, OutputCollector, RawSample, SampleBuffer, Sensitivity, Stage, Trigger, filter, pipe,
};

struct Feeder {
    engine: FallDetectionEngine,
    now: i64,
    events: Vec<FallConfirmed>,
    states: Vec<DetectionState>,
}

impl Feeder {
    fn new(sensitivity: Sensitivity) -> Self {
        Self {
            engine: FallDetectionEngine::new(42, EngineConfig::with_sensitivity(sensitivity))
                .unwrap(),
            now: 0,
            events: Vec::new(),
            states: vec![DetectionState::Monitoring],
        }
    }

    fn feed(&mut self, magnitude: f32) -> Option<FallConfirmed> {
        self.now += 20;
        let event = self
            .engine
            .push(&RawSample::new(0.0, 0.0, magnitude, self.now));
        let state = self.engine.state();
        if self.states.last().map(std::mem::discriminant) != Some(std::mem::discriminant(&state)) {
            self.states.push(state);
        }
        if let Some(e) = &event {
            self.events.push(e.clone());
        }
        event
    }

    fn feed_many(&mut self, magnitude: f32, count: usize) {
        for _ in 0..count {
            self.feed(magnitude);
        }
    }

    fn fall(&mut self) {
        self.feed_many(9.8, 100);
        self.feed_many(2.0, 8);
        self.feed_many(35.0, 5);
        self.feed_many(9.8, 150);
    }
}

fn is_monitoring(s: &DetectionState) -> bool {
    matches!(s, DetectionState::Monitoring)
}

fn is_confirming(s: &DetectionState) -> bool {
    matches!(s, DetectionState::Confirming { .. })
}

fn is_cooldown(s: &DetectionState) -> bool {
    matches!(s, DetectionState::Cooldown { .. })
}

#[test]
fn test_rate_limiting() {
    let mut buffer = SampleBuffer::default();
    assert!(buffer.add_sample(0.0, 0.0, 9.8, 9.8, 1000));
    assert!(!buffer.add_sample(0.0, 0.0, 9.8, 9.8, 1010));
    assert!(buffer.add_sample(0.0, 0.0, 9.8, 9.8, 1020));
    assert_eq!(buffer.len(), 2);
    assert_eq!(buffer.last_sample_time(), 1020);
}

#[test]
fn test_capacity_bound() {
    let mut buffer = SampleBuffer::default();
    for i in 1..=250 {
        buffer.add_sample(0.0, 0.0, 9.8, 9.8, i * 20);
        assert!(buffer.len() <= 100);
    }
    assert_eq!(buffer.len(), 100);
    assert_eq!(buffer.iter().next().unwrap().timestamp_ms, 151 * 20);
}

#[test]
fn test_probability_stays_in_unit_range() {
    let classifier = fallwatch::FallClassifier::default();
    for scenario in Scenario::ALL {
        let mut buffer = SampleBuffer::default();
        for s in scenario.samples(20) {
            buffer.ingest(s.into());
            if let Some(features) = buffer.features() {
                let result = classifier.classify(&features);
                assert!((0.0..=1.0).contains(&result.fall_probability));
                assert!((0.0..=1.0).contains(&result.confidence));
            }
        }
    }
}

#[test]
fn test_resting_stability() {
    let mut feeder = Feeder::new(Sensitivity::Medium);
    for i in 0..100 {
        let jitter = if i % 2 == 0 { 0.1 } else { -0.1 };
        assert!(feeder.feed(9.8 + jitter).is_none());
        assert_eq!(feeder.engine.state(), DetectionState::Monitoring);
    }
}

#[test]
fn test_end_to_end_fall() {
    let mut feeder = Feeder::new(Sensitivity::Medium);
    feeder.fall();

    assert_eq!(feeder.events.len(), 1);
    assert_eq!(feeder.states.len(), 3);
    assert!(is_monitoring(&feeder.states[0]));
    assert!(is_confirming(&feeder.states[1]));
    assert!(is_cooldown(&feeder.states[2]));
    assert!(is_cooldown(&feeder.engine.state()));

    let event = &feeder.events[0];
    assert_eq!(event.session_id, 42);
    let waited = event.at_ms - event.confirming_since_ms;
    assert!(waited > 1000 && waited <= 1040, "waited {}ms", waited);
    match event.trigger {
        Trigger::Classifier { fall_probability } => assert!(fall_probability >= 0.40),
        other => panic!("unexpected trigger {:?}", other),
    }
    let classification = event.classification.as_ref().unwrap();
    assert!(!classification.detected_patterns.is_empty());
}

#[test]
fn test_end_to_end_fall_at_every_sensitivity() {
    for sensitivity in [Sensitivity::High, Sensitivity::Medium, Sensitivity::Low] {
        let mut feeder = Feeder::new(sensitivity);
        feeder.fall();
        assert_eq!(feeder.events.len(), 1, "{}", sensitivity);
    }
}

#[test]
fn test_fall_with_noisy_settle_at_every_sensitivity() {
    for sensitivity in [Sensitivity::High, Sensitivity::Medium, Sensitivity::Low] {
        let mut feeder = Feeder::new(sensitivity);
        feeder.feed_many(9.8, 100);
        feeder.feed_many(2.0, 10);
        feeder.feed_many(35.0, 5);
        for i in 0..60 {
            let noise = if i % 2 == 0 { 0.3 } else { -0.3 };
            feeder.feed(9.8 + noise);
        }

        assert_eq!(feeder.events.len(), 1, "{}", sensitivity);
        assert_eq!(feeder.states.len(), 3, "{}", sensitivity);
        assert!(is_confirming(&feeder.states[1]));
        assert!(is_cooldown(&feeder.engine.state()));
    }
}

#[test]
fn test_confirming_cancelled_by_activity() {
    let mut feeder = Feeder::new(Sensitivity::Medium);
    feeder.feed(45.0);
    assert!(is_confirming(&feeder.engine.state()));

    feeder.feed_many(9.8, 20);
    assert!(is_confirming(&feeder.engine.state()));
    assert!(feeder.feed(30.0).is_none());
    assert_eq!(feeder.engine.state(), DetectionState::Monitoring);
    assert!(feeder.engine.buffer().is_empty());

    feeder.feed_many(9.8, 100);
    assert!(feeder.events.is_empty());
}

#[test]
fn test_cooldown_suppression_and_resumption() {
    let mut feeder = Feeder::new(Sensitivity::Medium);
    feeder.feed(45.0);
    feeder.feed_many(9.8, 60);
    assert_eq!(feeder.events.len(), 1);
    let cooldown_start = feeder.events[0].at_ms;

    // A second fall inside the cooldown is ignored.
    feeder.feed(45.0);
    feeder.feed_many(9.8, 60);
    assert_eq!(feeder.events.len(), 1);
    assert!(is_cooldown(&feeder.engine.state()));

    while feeder.now - cooldown_start <= 5000 {
        feeder.feed(9.8);
    }
    assert_eq!(feeder.engine.state(), DetectionState::Monitoring);

    feeder.feed(45.0);
    feeder.feed_many(9.8, 60);
    assert_eq!(feeder.events.len(), 2);
}

#[test]
fn test_fast_path_from_empty_buffer() {
    let mut feeder = Feeder::new(Sensitivity::Low);
    assert!(feeder.engine.buffer().is_empty());
    feeder.feed(41.0);
    assert_eq!(
        feeder.engine.state(),
        DetectionState::Confirming {
            started_at_ms: 20,
            trigger: Trigger::FastPath { magnitude: 41.0 },
        }
    );
    assert_eq!(feeder.engine.buffer().len(), 1);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = EngineConfig {
        buffer: BufferConfig {
            sample_interval_ms: 0,
            ..Default::default()
        },
        ..Default::default()
    };
    assert_eq!(
        FallDetectionEngine::new(1, config).err(),
        Some(ConfigError::ZeroSampleInterval(0))
    );
}

#[test]
fn test_malformed_samples_are_dropped() {
    let mut feeder = Feeder::new(Sensitivity::Medium);
    feeder.feed_many(9.8, 10);

    let t = feeder.now + 20;
    for raw in [
        RawSample::new(f32::NAN, 0.0, 9.8, t),
        RawSample::new(0.0, f32::INFINITY, 9.8, t),
    ] {
        assert!(feeder.engine.push(&raw).is_none());
    }
    assert_eq!(feeder.engine.stats().dropped, 2);
    assert_eq!(feeder.engine.buffer().len(), 10);

    let mut buffer = SampleBuffer::default();
    let negative = fallwatch::AccelSample::new(0.0, 0.0, 9.8, -1.0, 20);
    assert_eq!(buffer.ingest(negative), Ingest::Dropped);
    assert!(buffer.is_empty());
}

#[test]
fn test_profile_swap_resets() {
    let mut feeder = Feeder::new(Sensitivity::High);
    feeder.feed_many(9.8, 50);
    feeder.feed(45.0);
    assert!(is_confirming(&feeder.engine.state()));

    feeder.engine.set_sensitivity(Sensitivity::Low);
    assert_eq!(feeder.engine.state(), DetectionState::Monitoring);
    assert!(feeder.engine.buffer().is_empty());
    assert_eq!(feeder.engine.sensitivity(), Sensitivity::Low);

    feeder.feed_many(9.8, 100);
    assert!(feeder.events.is_empty());
}

#[test]
fn test_scenarios_match_expectations() {
    for scenario in Scenario::ALL {
        for sensitivity in [Sensitivity::High, Sensitivity::Medium, Sensitivity::Low] {
            let mut engine =
                FallDetectionEngine::new(1, EngineConfig::with_sensitivity(sensitivity)).unwrap();
            let falls = scenario
                .samples(20)
                .iter()
                .filter_map(|s| engine.push(s))
                .count();
            assert_eq!(
                falls,
                scenario.expected_falls(),
                "{:?} at {}",
                scenario,
                sensitivity
            );
        }
    }
}

#[test]
fn test_engine_composes_as_stage() {
    struct Collect(Vec<FallConfirmed>);
    impl OutputCollector<FallConfirmed> for Collect {
        fn push(&mut self, item: FallConfirmed) {
            self.0.push(item);
        }
    }

    let engine = FallDetectionEngine::new(5, EngineConfig::default()).unwrap();
    let mut pipeline = pipe![
        filter(|s: &RawSample| s.timestamp_ms > 0),
        engine,
    ];

    let mut out = Collect(Vec::new());
    for s in Scenario::Fall.samples(20) {
        pipeline.process(&s, &mut out);
    }
    assert_eq!(out.0.len(), 1);
    assert_eq!(out.0[0].session_id, 5);
    assert_eq!(
        pipeline.second().stats().accepted as usize,
        Scenario::Fall.magnitudes().len()
    );
}
