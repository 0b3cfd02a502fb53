use crate::buffer::SampleBuffer;
use crate::classifier::{ClassificationResult, FallClassifier};
use crate::config::DetectorConfig;
use crate::sample::{AccelSample, GRAVITY};
use crate::sensitivity::SensitivityProfile;
use spdlog::{debug, info};

/// Phase of the detection session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DetectionState {
    #[default]
    Monitoring,
    /// A fall is suspected; waiting for stillness to corroborate it.
    Confirming { started_at_ms: i64, trigger: Trigger },
    /// Quiet period after a confirmed fall.
    Cooldown { started_at_ms: i64 },
}

/// What opened the confirmation window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// A single sample above the extreme-impact threshold.
    FastPath { magnitude: f32 },
    /// The windowed classifier crossed the detection threshold.
    Classifier { fall_probability: f32 },
}

/// Emitted once per confirmed fall.
#[derive(Debug, Clone, PartialEq)]
pub struct FallConfirmed {
    pub session_id: u64,
    pub at_ms: i64,
    pub confirming_since_ms: i64,
    pub trigger: Trigger,
    /// The classification that opened the window; `None` for the fast path.
    pub classification: Option<ClassificationResult>,
}

/// A confirmation window that ended in a confirmed fall.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confirmation {
    pub started_at_ms: i64,
    pub trigger: Trigger,
}

/// Result of one pure transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub next: DetectionState,
    /// The classification that opened a new confirmation window, if one did.
    pub classification: Option<ClassificationResult>,
    /// Set when a fall is confirmed on this sample.
    pub confirmed: Option<Confirmation>,
    /// True when stale samples must be discarded before the next attempt.
    pub clear_buffer: bool,
}

impl Step {
    fn stay(state: DetectionState) -> Self {
        Self {
            next: state,
            classification: None,
            confirmed: None,
            clear_buffer: false,
        }
    }

    fn reset() -> Self {
        Self {
            next: DetectionState::Monitoring,
            classification: None,
            confirmed: None,
            clear_buffer: true,
        }
    }

    fn open(now: i64, trigger: Trigger, classification: Option<ClassificationResult>) -> Self {
        Self {
            next: DetectionState::Confirming {
                started_at_ms: now,
                trigger,
            },
            classification,
            confirmed: None,
            clear_buffer: false,
        }
    }
}

/// Pure transition function of the detector.
///
/// `buffer` must already contain `sample`. Nothing is mutated; the caller applies the
/// returned [`Step`].
pub fn transition(
    config: &DetectorConfig,
    state: DetectionState,
    sample: &AccelSample,
    buffer: &SampleBuffer,
    classifier: &FallClassifier,
    profile: &SensitivityProfile,
    now: i64,
) -> Step {
    match state {
        DetectionState::Monitoring => {
            if sample.magnitude > config.extreme_impact_threshold {
                return Step::open(
                    now,
                    Trigger::FastPath {
                        magnitude: sample.magnitude,
                    },
                    None,
                );
            }
            if !buffer.is_full() {
                return Step::stay(state);
            }
            let Some(features) = buffer.features() else {
                return Step::stay(state);
            };
            if !classifier.quick_prescreen(&features) {
                return Step::stay(state);
            }
            let result = classifier.classify(&features);
            if result.fall_probability >= config.detection_threshold {
                let trigger = Trigger::Classifier {
                    fall_probability: result.fall_probability,
                };
                return Step::open(now, trigger, Some(result));
            }
            Step::stay(state)
        }
        DetectionState::Confirming {
            started_at_ms,
            trigger,
        } => {
            // Saturating: a corrupt timestamp must not overflow.
            let elapsed = now.saturating_sub(started_at_ms);
            if sample.magnitude > config.cancel_activity_threshold
                && elapsed > config.impact_grace_ms
            {
                return Step::reset();
            }

            let deviation = (buffer.recent_average(config.stillness_window) - GRAVITY).abs();
            let still = deviation < profile.stillness_threshold + config.stillness_slack;
            if still && elapsed > config.confirmation_duration_ms {
                return Step {
                    next: DetectionState::Cooldown { started_at_ms: now },
                    classification: None,
                    confirmed: Some(Confirmation {
                        started_at_ms,
                        trigger,
                    }),
                    clear_buffer: false,
                };
            }
            if elapsed > config.confirmation_timeout_ms() {
                return Step::reset();
            }
            Step::stay(state)
        }
        DetectionState::Cooldown { started_at_ms } => {
            if now.saturating_sub(started_at_ms) > config.cooldown_duration_ms {
                Step::reset()
            } else {
                Step::stay(state)
            }
        }
    }
}

/// Owns the current [`DetectionState`] and applies transitions to it.
pub struct DetectionStateMachine {
    config: DetectorConfig,
    session_id: u64,
    state: DetectionState,
    /// Classification that opened the current confirmation window.
    pending: Option<ClassificationResult>,
}

impl DetectionStateMachine {
    pub fn new(session_id: u64, config: DetectorConfig) -> Self {
        Self {
            config,
            session_id,
            state: DetectionState::Monitoring,
            pending: None,
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Advances the machine for one accepted sample, clearing `buffer` when the
    /// transition asks for it.
    pub fn on_sample(
        &mut self,
        sample: &AccelSample,
        buffer: &mut SampleBuffer,
        classifier: &FallClassifier,
        profile: &SensitivityProfile,
        now: i64,
    ) -> Option<FallConfirmed> {
        let step = transition(
            &self.config,
            self.state,
            sample,
            buffer,
            classifier,
            profile,
            now,
        );
        self.apply(step, buffer, now)
    }

    fn apply(&mut self, step: Step, buffer: &mut SampleBuffer, now: i64) -> Option<FallConfirmed> {
        let previous = self.state;
        if step.next != previous {
            info!(
                "[Detector:{}] {:?} -> {:?} at {}ms",
                self.session_id, previous, step.next, now
            );
        }
        if step.clear_buffer {
            buffer.clear();
        }
        self.state = step.next;

        match self.state {
            DetectionState::Confirming { trigger, .. }
                if !matches!(previous, DetectionState::Confirming { .. }) =>
            {
                debug!("[Detector:{}] Confirmation opened by {:?}", self.session_id, trigger);
                self.pending = step.classification;
            }
            DetectionState::Monitoring => self.pending = None,
            _ => {}
        }

        let confirmation = step.confirmed?;
        info!(
            "[Detector:{}] Fall confirmed at {}ms after {}ms of stillness check",
            self.session_id,
            now,
            now.saturating_sub(confirmation.started_at_ms)
        );
        Some(FallConfirmed {
            session_id: self.session_id,
            at_ms: now,
            confirming_since_ms: confirmation.started_at_ms,
            trigger: confirmation.trigger,
            classification: self.pending.take(),
        })
    }

    /// Forces the machine back to monitoring, e.g. when the host aborts a session.
    pub fn reset(&mut self, buffer: &mut SampleBuffer) {
        if self.state != DetectionState::Monitoring {
            info!("[Detector:{}] Forced reset from {:?}", self.session_id, self.state);
        }
        self.state = DetectionState::Monitoring;
        self.pending = None;
        buffer.clear();
    }
}
