// KnockDetector - ambient calibration and threshold-crossing state machine
//
// States cycle Idle -> Calibrating -> Listening -> Detected -> Idle.
//
// Calibrating samples the peak amplitude at a fixed cadence for a fixed
// window, then derives the knock threshold from the ambient mean. Listening
// compares every tick's peak against that threshold. Detected is transient:
// the owner analyses the spectrum captured on the knock tick and calls
// `complete()`.
//
// The detector never reads a clock; every tick is handed the current time in
// milliseconds so the whole cycle can be replayed deterministically.

use serde::{Deserialize, Serialize};

use crate::analysis::amplitude::AmplitudeMonitor;
use crate::calibration::CalibrationStats;
use crate::config::DetectionConfig;
use crate::error::CalibrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorState {
    Idle,
    Calibrating,
    Listening,
    Detected,
}

impl DetectorState {
    /// Whether a measurement cycle currently owns the detector
    pub fn is_active(&self) -> bool {
        !matches!(self, DetectorState::Idle)
    }
}

/// Emitted on the tick whose peak exceeded the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnockEvent {
    /// Listening tick index within the cycle
    pub tick: u64,
    pub timestamp_ms: u64,
    pub amplitude: f32,
}

/// Observable outcome of a single tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorStep {
    Idle,
    Calibrating {
        samples_collected: usize,
        ambient_estimate: Option<f32>,
    },
    /// Calibration window closed; the detector is now listening
    Calibrated(CalibrationStats),
    Listening {
        peak: f32,
        amplitude_ratio: f32,
    },
    Knock(KnockEvent),
    /// Waiting for the owner to finish analysis and call `complete()`
    Detected,
}

pub struct KnockDetector {
    config: DetectionConfig,
    state: DetectorState,
    monitor: AmplitudeMonitor,
    stats: Option<CalibrationStats>,
    calibration_started_ms: u64,
    next_sample_ms: u64,
    listening_ticks: u64,
}

impl KnockDetector {
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            config,
            state: DetectorState::Idle,
            monitor: AmplitudeMonitor::new(),
            stats: None,
            calibration_started_ms: 0,
            next_sample_ms: 0,
            listening_ticks: 0,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    /// Knock threshold of the current cycle, once calibration has finished
    pub fn threshold(&self) -> Option<f32> {
        self.stats.map(|stats| stats.threshold)
    }

    pub fn stats(&self) -> Option<CalibrationStats> {
        self.stats
    }

    /// Running ambient estimate while calibrating
    pub fn ambient_estimate(&self) -> Option<f32> {
        self.monitor.ambient_estimate()
    }

    /// Begin a new cycle at `now_ms`
    ///
    /// # Errors
    /// `AlreadyInProgress` if a cycle is active; at most one cycle runs at a time.
    pub fn start(&mut self, now_ms: u64) -> Result<(), CalibrationError> {
        if self.state.is_active() {
            return Err(CalibrationError::AlreadyInProgress);
        }

        self.reset();
        self.state = DetectorState::Calibrating;
        self.calibration_started_ms = now_ms;
        self.next_sample_ms = now_ms + self.config.sample_interval_ms;

        log::debug!(
            "[KnockDetector] Calibrating for {}ms at {}ms cadence",
            self.config.calibration_duration_ms,
            self.config.sample_interval_ms
        );
        Ok(())
    }

    /// Abort the active cycle, discarding samples and threshold
    ///
    /// Returns whether a cycle was actually cancelled.
    pub fn cancel(&mut self) -> bool {
        if !self.state.is_active() {
            return false;
        }
        log::debug!("[KnockDetector] Cancelled in state {:?}", self.state);
        self.reset();
        true
    }

    /// Finish a detected cycle and return to Idle
    pub fn complete(&mut self) -> Result<CalibrationStats, CalibrationError> {
        if self.state != DetectorState::Detected {
            return Err(CalibrationError::NotActive);
        }
        let stats = self.stats.ok_or(CalibrationError::NotActive)?;
        self.reset();
        Ok(stats)
    }

    /// Advance the state machine with the time-domain buffer of this tick
    ///
    /// # Errors
    /// `NoSamples` when the calibration window closes without any ambient
    /// sample; the detector is back in Idle afterwards.
    pub fn tick(&mut self, now_ms: u64, time_domain: &[u8]) -> Result<DetectorStep, CalibrationError> {
        match self.state {
            DetectorState::Idle => Ok(DetectorStep::Idle),
            DetectorState::Calibrating => self.tick_calibrating(now_ms, time_domain),
            DetectorState::Listening => Ok(self.tick_listening(now_ms, time_domain)),
            DetectorState::Detected => Ok(DetectorStep::Detected),
        }
    }

    fn tick_calibrating(
        &mut self,
        now_ms: u64,
        time_domain: &[u8],
    ) -> Result<DetectorStep, CalibrationError> {
        let window_end = self.calibration_started_ms + self.config.calibration_duration_ms;

        if now_ms >= self.next_sample_ms && self.next_sample_ms <= window_end {
            let peak = AmplitudeMonitor::sample_peak(time_domain);
            self.monitor.record_ambient(peak);
            // one sample per tick; a late tick does not replay missed samples
            while self.next_sample_ms <= now_ms {
                self.next_sample_ms += self.config.sample_interval_ms;
            }
        }

        if now_ms < window_end {
            return Ok(DetectorStep::Calibrating {
                samples_collected: self.monitor.ambient_sample_count(),
                ambient_estimate: self.monitor.ambient_estimate(),
            });
        }

        let samples = self.monitor.take_ambient_samples();
        match CalibrationStats::from_samples(&samples, &self.config) {
            Ok(stats) => {
                log::info!(
                    "[KnockDetector] Ambient level {:.1} over {} samples, threshold {:.1}",
                    stats.ambient_level,
                    stats.sample_count,
                    stats.threshold
                );
                self.stats = Some(stats);
                self.state = DetectorState::Listening;
                Ok(DetectorStep::Calibrated(stats))
            }
            Err(err) => {
                self.reset();
                Err(err)
            }
        }
    }

    fn tick_listening(&mut self, now_ms: u64, time_domain: &[u8]) -> DetectorStep {
        let peak = AmplitudeMonitor::sample_peak(time_domain);
        let tick = self.listening_ticks;
        self.listening_ticks += 1;

        match self.stats {
            Some(stats) if stats.is_knock(peak) => {
                self.state = DetectorState::Detected;
                DetectorStep::Knock(KnockEvent {
                    tick,
                    timestamp_ms: now_ms,
                    amplitude: peak,
                })
            }
            _ => DetectorStep::Listening {
                peak,
                amplitude_ratio: AmplitudeMonitor::amplitude_ratio(peak),
            },
        }
    }

    fn reset(&mut self) {
        self.state = DetectorState::Idle;
        self.monitor.reset();
        self.stats = None;
        self.calibration_started_ms = 0;
        self.next_sample_ms = 0;
        self.listening_ticks = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(peak: u8) -> Vec<u8> {
        let mut buf = vec![0u8; 64];
        buf[17] = peak;
        buf
    }

    /// Drive calibration with ticks every `sample_interval_ms` at a constant level
    fn calibrate(detector: &mut KnockDetector, level: u8) -> CalibrationStats {
        detector.start(0).unwrap();
        let mut now = 0;
        loop {
            now += 100;
            match detector.tick(now, &buffer(level)).unwrap() {
                DetectorStep::Calibrated(stats) => return stats,
                DetectorStep::Calibrating { .. } => {}
                other => panic!("unexpected step during calibration: {:?}", other),
            }
        }
    }

    #[test]
    fn test_initial_state_is_idle() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        assert_eq!(detector.state(), DetectorState::Idle);
        assert_eq!(detector.threshold(), None);
        assert_eq!(detector.tick(0, &buffer(250)).unwrap(), DetectorStep::Idle);
    }

    #[test]
    fn test_calibration_collects_ten_samples_and_derives_threshold() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        let stats = calibrate(&mut detector, 50);

        assert_eq!(stats.sample_count, 10);
        assert_eq!(stats.ambient_level, 50.0);
        assert_eq!(stats.threshold, 100.0);
        assert_eq!(detector.state(), DetectorState::Listening);
        assert_eq!(detector.threshold(), Some(100.0));
    }

    #[test]
    fn test_no_detection_during_calibration() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        detector.start(0).unwrap();
        for now in (16..1000).step_by(16) {
            let step = detector.tick(now, &buffer(255)).unwrap();
            assert!(matches!(step, DetectorStep::Calibrating { .. }));
        }
        assert_eq!(detector.state(), DetectorState::Calibrating);
    }

    #[test]
    fn test_fast_ticks_sample_at_cadence() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        detector.start(0).unwrap();

        let mut last = None;
        for now in (16..1000).step_by(16) {
            if let DetectorStep::Calibrating {
                samples_collected, ..
            } = detector.tick(now, &buffer(60)).unwrap()
            {
                last = Some(samples_collected);
            }
        }
        // samples due at 100..900 have been taken, 1000 is still ahead
        assert_eq!(last, Some(9));
    }

    #[test]
    fn test_knock_threshold_boundaries() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        calibrate(&mut detector, 50);

        let step = detector.tick(1100, &buffer(99)).unwrap();
        assert!(matches!(step, DetectorStep::Listening { peak, .. } if peak == 99.0));

        let step = detector.tick(1116, &buffer(100)).unwrap();
        assert!(matches!(step, DetectorStep::Listening { .. }));

        match detector.tick(1132, &buffer(101)).unwrap() {
            DetectorStep::Knock(event) => {
                assert_eq!(event.amplitude, 101.0);
                assert_eq!(event.timestamp_ms, 1132);
                assert_eq!(event.tick, 2);
            }
            other => panic!("expected knock, got {:?}", other),
        }
        assert_eq!(detector.state(), DetectorState::Detected);
        assert_eq!(detector.tick(1148, &buffer(10)).unwrap(), DetectorStep::Detected);
    }

    #[test]
    fn test_listening_reports_amplitude_ratio() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        calibrate(&mut detector, 128);

        match detector.tick(1100, &buffer(153)).unwrap() {
            DetectorStep::Listening {
                amplitude_ratio, ..
            } => assert!((amplitude_ratio - 0.6).abs() < 1e-6),
            other => panic!("expected listening, got {:?}", other),
        }
    }

    #[test]
    fn test_complete_returns_to_idle_and_clears_threshold() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        calibrate(&mut detector, 50);
        detector.tick(1100, &buffer(200)).unwrap();

        let stats = detector.complete().unwrap();
        assert_eq!(stats.threshold, 100.0);
        assert_eq!(detector.state(), DetectorState::Idle);
        assert_eq!(detector.threshold(), None);
        assert_eq!(detector.complete(), Err(CalibrationError::NotActive));
    }

    #[test]
    fn test_start_while_active_is_rejected() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        detector.start(0).unwrap();
        assert_eq!(detector.start(10), Err(CalibrationError::AlreadyInProgress));

        calibrate_from(&mut detector);
        assert_eq!(detector.start(2000), Err(CalibrationError::AlreadyInProgress));
    }

    fn calibrate_from(detector: &mut KnockDetector) {
        for now in (100..=1000).step_by(100) {
            detector.tick(now, &buffer(50)).unwrap();
        }
        assert_eq!(detector.state(), DetectorState::Listening);
    }

    #[test]
    fn test_cancel_during_calibration_at_any_sample_count() {
        for samples_before_cancel in 0..=10u64 {
            let mut detector = KnockDetector::new(DetectionConfig::default());
            detector.start(0).unwrap();
            for i in 1..=samples_before_cancel.min(9) {
                detector.tick(i * 100, &buffer(50)).unwrap();
            }

            assert!(detector.cancel());
            assert_eq!(detector.state(), DetectorState::Idle);
            assert_eq!(detector.threshold(), None);
            assert_eq!(detector.ambient_estimate(), None);
            // loud ticks after cancel never produce a knock
            assert_eq!(detector.tick(5000, &buffer(255)).unwrap(), DetectorStep::Idle);
        }
    }

    #[test]
    fn test_cancel_during_listening() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        calibrate(&mut detector, 50);
        assert!(detector.cancel());
        assert_eq!(detector.state(), DetectorState::Idle);
        assert_eq!(detector.threshold(), None);
        assert!(!detector.cancel());
    }

    #[test]
    fn test_no_samples_fails_and_returns_to_idle() {
        // window shorter than the cadence: it closes before any sample is due
        let config = DetectionConfig {
            calibration_duration_ms: 50,
            sample_interval_ms: 100,
            ..DetectionConfig::default()
        };
        let mut detector_short = KnockDetector::new(config);
        detector_short.start(0).unwrap();
        assert_eq!(
            detector_short.tick(60, &buffer(50)),
            Err(CalibrationError::NoSamples)
        );
        assert_eq!(detector_short.state(), DetectorState::Idle);
        assert_eq!(detector_short.threshold(), None);
    }

    #[test]
    fn test_single_late_tick_still_samples_once() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        detector.start(0).unwrap();
        let step = detector.tick(1500, &buffer(50)).unwrap();
        assert!(matches!(step, DetectorStep::Calibrated(stats) if stats.sample_count == 1));
    }

    #[test]
    fn test_restart_after_cycle_starts_fresh() {
        let mut detector = KnockDetector::new(DetectionConfig::default());
        calibrate(&mut detector, 50);
        detector.cancel();

        let stats = calibrate(&mut detector, 100);
        assert_eq!(stats.ambient_level, 100.0);
        assert_eq!(stats.threshold, 175.0);
    }
}
