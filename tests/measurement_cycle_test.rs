// Integration tests for complete measurement cycles
//
// These drive real audio through the byte analyser, detector, HPS and
// pressure estimator with a stepping clock, so every run is deterministic.

use std::f32::consts::PI;
use std::time::Duration;

use tire_knock::analysis::{
    DetectorState, PressureClassification, PressureEstimator, PsiEstimate, SpectrumAnalyzer,
};
use tire_knock::audio::{ByteAnalyser, PcmSource, SyntheticKnock};
use tire_knock::config::AppConfig;
use tire_knock::engine::{
    run_until_complete, CycleEnd, MeasurementSession, SessionEvent, StubTimeSource, TickOutcome,
};

const TICK: Duration = Duration::from_millis(16);

fn synthetic_session(config: &AppConfig, hz: f32, knock_at_ms: u64) -> MeasurementSession<PcmSource> {
    let samples = SyntheticKnock::new(hz).with_knock_at(knock_at_ms).render();
    let source = PcmSource::new(samples, 48_000, &config.audio);
    MeasurementSession::new(config, source).unwrap()
}

/// Steady harmonic series exactly on analyser bins
fn harmonic_tone(fundamental: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|n| {
            let t = n as f32 / 48_000.0;
            (1..=5)
                .map(|k| 0.01 * (2.0 * PI * fundamental * k as f32 * t).sin())
                .sum::<f32>()
        })
        .collect()
}

#[test]
fn test_synthetic_knock_full_cycle() {
    let config = AppConfig::default();
    let mut session = synthetic_session(&config, 85.0, 1500);
    let mut events = session.subscribe();
    let clock = StubTimeSource::new();

    let report = run_until_complete(&mut session, &clock, TICK, Duration::from_secs(3)).unwrap();

    assert_eq!(report.end, CycleEnd::Measured);
    let calibration = report.calibration.expect("calibration stats");
    assert_eq!(calibration.sample_count, 10);
    assert!(calibration.ambient_level >= 128.0 && calibration.ambient_level < 132.0);

    // fires part way up the 120ms attack
    let knock = report.knock.expect("knock event");
    assert!(knock.timestamp_ms > 1500 && knock.timestamp_ms < 1650);
    assert!(knock.amplitude > calibration.threshold);

    // 85 Hz lands on bin 7 (82.03 Hz), rounded to 82
    let result = report.result.expect("pressure result");
    assert_eq!(result.frequency_hz, 82.0);
    assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(65)));
    assert_eq!(result.classification, PressureClassification::Underinflated);
    assert_eq!(session.state(), DetectorState::Idle);

    let mut transitions = Vec::new();
    let mut saw_result = false;
    while let Ok(event) = events.try_recv() {
        match event {
            SessionEvent::StateChanged { to, .. } => transitions.push(to),
            SessionEvent::Result(published) => {
                assert_eq!(published, result);
                saw_result = true;
            }
            _ => {}
        }
    }
    assert!(saw_result);
    assert_eq!(
        transitions,
        vec![
            DetectorState::Calibrating,
            DetectorState::Listening,
            DetectorState::Detected,
            DetectorState::Idle,
        ]
    );
}

#[test]
fn test_measured_pitch_follows_fundamental() {
    let mut config = AppConfig::default();
    config.pressure.round_frequency = false;
    let bin_width = 48_000.0 / 4096.0;

    for hz in [65.0, 75.0, 85.0, 95.0, 105.0, 115.0] {
        let mut session = synthetic_session(&config, hz, 1500);
        let clock = StubTimeSource::new();
        let report =
            run_until_complete(&mut session, &clock, TICK, Duration::from_secs(3)).unwrap();

        assert_eq!(report.end, CycleEnd::Measured, "{} Hz was not measured", hz);
        let result = report.result.expect("pressure result");
        assert!(
            (result.frequency_hz - hz).abs() <= bin_width,
            "{} Hz measured as {} Hz",
            hz,
            result.frequency_hz
        );
    }
}

#[test]
fn test_pitch_decides_classification() {
    let config = AppConfig::default();
    let clock = StubTimeSource::new();

    let mut low = synthetic_session(&config, 70.0, 1500);
    let low = run_until_complete(&mut low, &clock, TICK, Duration::from_secs(3))
        .unwrap()
        .result
        .expect("pressure result");

    let clock = StubTimeSource::new();
    let mut high = synthetic_session(&config, 105.0, 1500);
    let high = run_until_complete(&mut high, &clock, TICK, Duration::from_secs(3))
        .unwrap()
        .result
        .expect("pressure result");

    assert_eq!(low.classification, PressureClassification::Underinflated);
    assert_eq!(high.classification, PressureClassification::Overinflated);
    assert!(low.frequency_hz < high.frequency_hz);
}

#[test]
fn test_no_knock_before_onset() {
    let config = AppConfig::default();
    let mut session = synthetic_session(&config, 85.0, 2500);
    session.start(0).unwrap();

    let mut now = 0;
    while now < 2400 {
        now += 16;
        let outcome = session.tick(now).unwrap();
        assert!(
            !matches!(outcome, TickOutcome::Measured { .. }),
            "knock reported at {}ms before the onset",
            now
        );
    }
    assert_eq!(session.state(), DetectorState::Listening);
}

#[test]
fn test_cancel_mid_listening_then_measure_again() {
    let config = AppConfig::default();
    let mut session = synthetic_session(&config, 85.0, 2600);
    let handle = session.cancel_handle();
    session.start(0).unwrap();

    let mut now = 0;
    while now < 1200 {
        now += 16;
        session.tick(now).unwrap();
    }
    assert_eq!(session.state(), DetectorState::Listening);

    handle.cancel();
    assert_eq!(session.tick(now + 16).unwrap(), TickOutcome::Cancelled);
    assert_eq!(session.threshold(), None);

    // recalibrate from scratch and still catch the knock at 2600ms
    now += 16;
    session.start(now).unwrap();
    let mut measured = None;
    while now < 2950 && measured.is_none() {
        now += 16;
        if let TickOutcome::Measured { knock, result } = session.tick(now).unwrap() {
            assert!(knock.timestamp_ms >= 2600);
            measured = Some(result);
        }
    }
    assert!(measured.is_some());
}

#[test]
fn test_steady_harmonic_signal_through_analyser() {
    let config = AppConfig::default();
    let mut analyser = ByteAnalyser::new(&config.audio);
    let mut analyzer = SpectrumAnalyzer::from_config(&config);
    let estimator = PressureEstimator::from_config(&config.pressure).unwrap();

    // bin 7 at 48 kHz / 4096
    let fundamental = 7.0 * 48_000.0 / 4096.0;
    let mut spectrum = vec![0u8; config.audio.frequency_bin_count()];
    analyser.frequency_bytes(&harmonic_tone(fundamental, 4096), &mut spectrum);

    let pitch = analyzer.analyze(&spectrum).unwrap();
    assert_eq!(pitch.peak_bin, 7);
    assert!((pitch.peak_frequency_hz - 82.031_25).abs() < 1e-3);

    let result = estimator.classify(pitch.peak_frequency_hz.round()).unwrap();
    assert_eq!(result.frequency_hz, 82.0);
    assert_eq!(result.psi_estimate, Some(PsiEstimate::Exact(65)));
    assert_eq!(result.classification, PressureClassification::Underinflated);
}

#[test]
fn test_two_sessions_do_not_share_state() {
    let config = AppConfig::default();
    let mut first = synthetic_session(&config, 85.0, 1500);
    let second = synthetic_session(&config, 85.0, 1500);

    first.start(0).unwrap();
    assert!(first.is_active());
    assert!(!second.is_active());
}
