mod alert;
mod buffer;
mod classifier;
mod config;
mod detector;
mod engine;
mod features;
mod macros;
pub mod measure;
mod pipe;
mod sample;
pub mod scenario;
mod sensitivity;
mod stage;
pub mod trace;

pub use crate::alert::{AlertDispatcher, AlertSender};
pub use crate::buffer::{Ingest, SampleBuffer};
pub use crate::classifier::{ClassificationResult, FallClassifier};
pub use crate::config::{BufferConfig, ClassifierConfig, ConfigError, DetectorConfig, EngineConfig};
pub use crate::detector::{
    Confirmation, DetectionState, DetectionStateMachine, FallConfirmed, Step, Trigger, transition,
};
pub use crate::engine::{EngineStats, FallDetectionEngine, SharedEngine};
pub use crate::features::{CountThresholds, FeatureSet, RECENT_MAGNITUDES};
pub use crate::pipe::*;
pub use crate::sample::{AccelSample, GRAVITY, RawSample};
pub use crate::sensitivity::{Sensitivity, SensitivityProfile};
pub use crate::stage::{OutputCollector, Pipeline, Stage, StageExt};
