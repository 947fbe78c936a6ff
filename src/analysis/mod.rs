// Analysis module - knock detection and pressure estimation pipeline
//
// Pipeline: AmplitudeMonitor -> KnockDetector -> SpectrumAnalyzer -> PressureEstimator
//
// Every component is a pure computation over the buffers it is handed.
// Scheduling, clocks and buffer acquisition belong to the engine module.

pub mod amplitude;
pub mod knock;
pub mod pressure;
pub mod spectrum;

pub use amplitude::AmplitudeMonitor;
pub use knock::{DetectorState, DetectorStep, KnockDetector, KnockEvent};
pub use pressure::{PressureClassification, PressureEstimator, PressureResult, PsiEstimate};
pub use spectrum::{SpectrumAnalyzer, SpectrumResult};
