// MeasurementSession - one tire, one knock, one pressure estimate
//
// Owns the whole measurement context: detector state machine, spectrum
// analyzer, pressure estimator, the scratch buffers the sample source fills,
// and the event channel. Nothing is global; two sessions never share state.
//
// A cycle is driven by calling `tick(now_ms)` at display-refresh cadence:
//
//   Idle --start--> Calibrating --window closed--> Listening
//        <--------- Detected <--peak > threshold--
//
// The knock tick reads the frequency-domain buffer once, estimates the
// fundamental, classifies it, and returns the session to Idle in the same
// tick. Any error aborts the cycle and also returns to Idle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::analysis::{
    DetectorState, DetectorStep, KnockDetector, KnockEvent, PressureEstimator, PressureResult,
    SpectrumAnalyzer,
};
use crate::audio::SampleSource;
use crate::calibration::CalibrationStats;
use crate::config::AppConfig;
use crate::engine::events::{EventPublisher, SessionEvent};
use crate::error::{AnalysisError, ConfigurationError, MeasurementError};

/// Thread-safe cancellation request for a running cycle
///
/// The flag is consumed at the start of the next tick.
#[derive(Clone, Default)]
pub struct CancelHandle {
    requested: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

/// What a single tick accomplished
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No cycle running
    Idle,
    Calibrating {
        samples_collected: usize,
        ambient_estimate: Option<f32>,
    },
    Calibrated(CalibrationStats),
    Listening {
        peak: f32,
        amplitude_ratio: f32,
    },
    /// Knock heard and analysed; the cycle is over
    Measured {
        knock: KnockEvent,
        result: PressureResult,
    },
    /// A pending cancel request was honoured
    Cancelled,
}

pub struct MeasurementSession<S: SampleSource> {
    source: S,
    detector: KnockDetector,
    analyzer: SpectrumAnalyzer,
    estimator: PressureEstimator,
    time_domain: Vec<u8>,
    frequency_domain: Vec<u8>,
    events: EventPublisher,
    cancel: CancelHandle,
    last_result: Option<PressureResult>,
}

impl<S: SampleSource> MeasurementSession<S> {
    /// Build a session reading from `source`
    ///
    /// Sample rate and window size are taken from the source; the rest from
    /// `config`, which is validated first.
    pub fn new(config: &AppConfig, source: S) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let bin_count = source.frequency_bin_count();
        if bin_count == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "fft_size".to_string(),
                reason: format!("source reports fft size {}", source.fft_size()),
            });
        }

        let analyzer = SpectrumAnalyzer::new(source.sample_rate(), source.fft_size(), &config.spectrum);
        let estimator = PressureEstimator::from_config(&config.pressure)?;

        log::info!(
            "[MeasurementSession] Created: {} Hz, fft {}, {} table points",
            source.sample_rate(),
            source.fft_size(),
            estimator.table().points().len()
        );

        Ok(Self {
            source,
            detector: KnockDetector::new(config.detection.clone()),
            analyzer,
            estimator,
            time_domain: vec![128; bin_count],
            frequency_domain: vec![0; bin_count],
            events: EventPublisher::new(),
            cancel: CancelHandle::default(),
            last_result: None,
        })
    }

    pub fn state(&self) -> DetectorState {
        self.detector.state()
    }

    pub fn is_active(&self) -> bool {
        self.detector.state().is_active()
    }

    /// Threshold of the running cycle once calibration has finished
    pub fn threshold(&self) -> Option<f32> {
        self.detector.threshold()
    }

    pub fn last_result(&self) -> Option<PressureResult> {
        self.last_result
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Begin a cycle: ambient calibration starts at `now_ms`
    ///
    /// # Errors
    /// `CalibrationError::AlreadyInProgress` while another cycle is active.
    pub fn start(&mut self, now_ms: u64) -> Result<(), MeasurementError> {
        // a stale request must not kill the fresh cycle
        self.cancel.take();
        self.detector.start(now_ms)?;
        self.last_result = None;

        tracing::info!("[MeasurementSession] Cycle started at {}ms", now_ms);
        self.publish_transition(DetectorState::Idle, DetectorState::Calibrating, now_ms);
        Ok(())
    }

    /// Cancel whatever is running and start a fresh cycle
    pub fn restart(&mut self, now_ms: u64) -> Result<(), MeasurementError> {
        self.abort(now_ms);
        self.start(now_ms)
    }

    /// Abort the running cycle immediately
    ///
    /// Returns whether there was a cycle to cancel.
    pub fn cancel(&mut self, now_ms: u64) -> bool {
        self.cancel.take();
        self.abort(now_ms)
    }

    /// Advance the cycle by one tick at `now_ms`
    ///
    /// # Errors
    /// Any acquisition, calibration or configuration failure. The cycle is
    /// reset to Idle and a `SessionEvent::Failed` is published before the
    /// error is returned.
    pub fn tick(&mut self, now_ms: u64) -> Result<TickOutcome, MeasurementError> {
        if self.cancel.take() {
            tracing::info!("[MeasurementSession] Cancel requested");
            self.abort(now_ms);
            return Ok(TickOutcome::Cancelled);
        }

        if !self.is_active() {
            return Ok(TickOutcome::Idle);
        }

        let before = self.detector.state();
        match self.step(now_ms) {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                err.log("MeasurementSession::tick");
                // the detector resets itself on calibration failures
                let from = match self.detector.state() {
                    DetectorState::Idle => before,
                    current => current,
                };
                self.detector.cancel();
                self.events.publish(SessionEvent::failed(&err));
                self.publish_transition(from, DetectorState::Idle, now_ms);
                Err(err)
            }
        }
    }

    fn step(&mut self, now_ms: u64) -> Result<TickOutcome, MeasurementError> {
        self.source.read_time_domain(now_ms, &mut self.time_domain)?;

        match self.detector.tick(now_ms, &self.time_domain)? {
            DetectorStep::Idle | DetectorStep::Detected => Ok(TickOutcome::Idle),
            DetectorStep::Calibrating {
                samples_collected,
                ambient_estimate,
            } => Ok(TickOutcome::Calibrating {
                samples_collected,
                ambient_estimate,
            }),
            DetectorStep::Calibrated(stats) => {
                self.events.publish(SessionEvent::Calibrated(stats));
                self.publish_transition(DetectorState::Calibrating, DetectorState::Listening, now_ms);
                Ok(TickOutcome::Calibrated(stats))
            }
            DetectorStep::Listening {
                peak,
                amplitude_ratio,
            } => {
                self.events.publish(SessionEvent::Amplitude {
                    ratio: amplitude_ratio,
                    timestamp_ms: now_ms,
                });
                Ok(TickOutcome::Listening {
                    peak,
                    amplitude_ratio,
                })
            }
            DetectorStep::Knock(knock) => {
                tracing::info!(
                    "[MeasurementSession] Knock at {}ms, amplitude {:.0} (threshold {:.1})",
                    knock.timestamp_ms,
                    knock.amplitude,
                    self.detector.threshold().unwrap_or_default()
                );
                self.events.publish(SessionEvent::Knock(knock));
                self.publish_transition(DetectorState::Listening, DetectorState::Detected, now_ms);

                let result = self.analyse(now_ms)?;
                self.detector.complete()?;

                tracing::info!("[MeasurementSession] Result: {}", result);
                self.last_result = Some(result);
                self.events.publish(SessionEvent::Result(result));
                self.publish_transition(DetectorState::Detected, DetectorState::Idle, now_ms);

                Ok(TickOutcome::Measured { knock, result })
            }
        }
    }

    /// Pitch and classify the spectrum captured on the knock tick
    fn analyse(&mut self, now_ms: u64) -> Result<PressureResult, MeasurementError> {
        self.source
            .read_frequency_domain(now_ms, &mut self.frequency_domain)?;

        let spectrum = match self.analyzer.analyze(&self.frequency_domain) {
            Ok(spectrum) => spectrum,
            Err(AnalysisError::NoSignal { reason }) => {
                tracing::warn!("[MeasurementSession] No usable pitch ({}), asking for remeasure", reason);
                return Ok(PressureResult::remeasure(0.0));
            }
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(
            "[MeasurementSession] Fundamental bin {} -> {:.2} Hz",
            spectrum.peak_bin,
            spectrum.peak_frequency_hz
        );

        Ok(self.estimator.classify_measured(spectrum.peak_frequency_hz)?)
    }

    fn abort(&mut self, now_ms: u64) -> bool {
        let from = self.detector.state();
        if !self.detector.cancel() {
            return false;
        }
        self.publish_transition(from, DetectorState::Idle, now_ms);
        true
    }

    fn publish_transition(&self, from: DetectorState, to: DetectorState, timestamp_ms: u64) {
        tracing::debug!("[MeasurementSession] {:?} -> {:?}", from, to);
        self.events.publish(SessionEvent::StateChanged {
            from,
            to,
            timestamp_ms,
        });
    }
}
