use crate::buffer::{Ingest, SampleBuffer};
use crate::classifier::FallClassifier;
use crate::config::{ConfigError, EngineConfig};
use crate::detector::{DetectionState, DetectionStateMachine, FallConfirmed};
use crate::sample::{AccelSample, RawSample};
use crate::sensitivity::{Sensitivity, SensitivityProfile};
use crate::stage::{OutputCollector, Stage};
use spdlog::info;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Per-session counters, mostly for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub accepted: u64,
    pub rate_limited: u64,
    pub dropped: u64,
    pub confirmed: u64,
}

/// The fall-detection engine: one sliding window, one classifier and one state machine
/// for a single sensor session.
///
/// Feed it raw samples in timestamp order from a single producer. It performs no I/O;
/// confirmed falls go to whatever [`OutputCollector`] the caller supplies.
pub struct FallDetectionEngine {
    session_id: u64,
    config: EngineConfig,
    sensitivity: Sensitivity,
    profile: SensitivityProfile,
    buffer: SampleBuffer,
    classifier: FallClassifier,
    machine: DetectionStateMachine,
    stats: EngineStats,
}

impl FallDetectionEngine {
    /// Validates `config` and builds an engine in `Monitoring`.
    pub fn new(session_id: u64, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let profile = config.sensitivity.profile();

        let mut buffer_config = config.buffer;
        buffer_config.thresholds = profile.count_thresholds();

        info!(
            "[Engine:{}] Starting with {} sensitivity, window={}ms interval={}ms",
            session_id, config.sensitivity, config.buffer.window_ms, config.buffer.sample_interval_ms
        );

        Ok(Self {
            session_id,
            config,
            sensitivity: config.sensitivity,
            profile,
            buffer: SampleBuffer::new(&buffer_config),
            classifier: FallClassifier::new(config.classifier),
            machine: DetectionStateMachine::new(session_id, config.detector),
            stats: EngineStats::default(),
        })
    }

    /// Feeds one raw reading; returns the confirmed fall, if this reading completed one.
    pub fn push(&mut self, raw: &RawSample) -> Option<FallConfirmed> {
        self.push_sample(AccelSample::from_raw(raw))
    }

    /// Feeds a sample whose magnitude was computed upstream.
    pub fn push_sample(&mut self, sample: AccelSample) -> Option<FallConfirmed> {
        match self.buffer.ingest(sample) {
            Ingest::Accepted => self.stats.accepted += 1,
            Ingest::RateLimited => {
                self.stats.rate_limited += 1;
                return None;
            }
            Ingest::Dropped => {
                self.stats.dropped += 1;
                return None;
            }
        }

        let event = self.machine.on_sample(
            &sample,
            &mut self.buffer,
            &self.classifier,
            &self.profile,
            sample.timestamp_ms,
        );
        if event.is_some() {
            self.stats.confirmed += 1;
        }
        event
    }

    /// Switches the sensitivity preset. This is a reset point: any in-flight
    /// confirmation is abandoned and the window starts empty.
    pub fn set_sensitivity(&mut self, sensitivity: Sensitivity) {
        info!(
            "[Engine:{}] Sensitivity {} -> {}",
            self.session_id, self.sensitivity, sensitivity
        );
        self.sensitivity = sensitivity;
        self.profile = sensitivity.profile();
        self.buffer.set_thresholds(self.profile.count_thresholds());
        self.machine.reset(&mut self.buffer);
    }

    /// Abandons whatever the engine was doing and returns to `Monitoring`.
    pub fn reset(&mut self) {
        self.machine.reset(&mut self.buffer);
    }

    pub fn state(&self) -> DetectionState {
        self.machine.state()
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    pub fn profile(&self) -> &SensitivityProfile {
        &self.profile
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn classifier(&self) -> &FallClassifier {
        &self.classifier
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }
}

impl Stage<RawSample, FallConfirmed> for FallDetectionEngine {
    #[inline(always)]
    fn process<C>(&mut self, data: &RawSample, collector: &mut C)
    where
        C: OutputCollector<FallConfirmed>,
    {
        if let Some(event) = self.push(data) {
            collector.push(event);
        }
    }
}

/// An engine shared by several sensor producers.
///
/// Every ingestion goes through one lock, so samples are still processed one at a time
/// and in arrival order.
#[derive(Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<FallDetectionEngine>>,
}

impl SharedEngine {
    pub fn new(engine: FallDetectionEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn push(&self, raw: &RawSample) -> Option<FallConfirmed> {
        self.lock().push(raw)
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut FallDetectionEngine) -> R) -> R {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, FallDetectionEngine> {
        // A panicking producer leaves the engine in a consistent state between samples.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
