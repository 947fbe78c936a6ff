// SyntheticKnock - deterministic knock recordings for tests and demos
//
// Renders low-level ambient noise followed by a single knock: a harmonic
// series on the requested fundamental under a linear attack and exponential
// decay. Noise uses a fixed seed so every render of the same parameters is
// sample-identical.
//
// The attack sets when the detector fires. The spectrum is captured on the
// tick whose peak first crosses the threshold, and the analysis window has to
// hold several periods of the fundamental by then. An instantaneous onset
// crosses within one tick, leaving only a few milliseconds of tone at the
// tapered end of the window and a pitch that no longer depends on the input.

use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::AudioError;

/// Relative level of harmonics 1..=5
const HARMONIC_WEIGHTS: [f32; 5] = [1.0, 0.6, 0.4, 0.3, 0.2];

#[derive(Debug, Clone)]
pub struct SyntheticKnock {
    pub fundamental_hz: f32,
    pub sample_rate: u32,
    /// Total length of the rendering
    pub duration_ms: u64,
    /// Knock onset
    pub knock_at_ms: u64,
    /// Peak level of the ambient noise floor
    pub noise_amplitude: f32,
    /// Peak level of the knock
    pub knock_amplitude: f32,
    /// Linear rise time of the knock envelope
    pub attack_ms: u64,
    /// Exponential decay rate of the knock envelope, per second
    pub decay_per_second: f32,
    pub seed: u64,
}

impl SyntheticKnock {
    pub fn new(fundamental_hz: f32) -> Self {
        Self {
            fundamental_hz,
            sample_rate: 48_000,
            duration_ms: 3000,
            knock_at_ms: 1500,
            noise_amplitude: 0.01,
            knock_amplitude: 0.9,
            attack_ms: 120,
            decay_per_second: 8.0,
            seed: 42,
        }
    }

    pub fn with_knock_at(mut self, knock_at_ms: u64) -> Self {
        self.knock_at_ms = knock_at_ms;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_attack(mut self, attack_ms: u64) -> Self {
        self.attack_ms = attack_ms;
        self
    }

    /// Knock envelope `t` seconds after onset, 1.0 at the end of the attack
    fn envelope(&self, t: f32) -> f32 {
        let attack = self.attack_ms as f32 / 1000.0;
        if t < attack {
            t / attack
        } else {
            (-self.decay_per_second * (t - attack)).exp()
        }
    }

    fn sample_index(&self, ms: u64) -> usize {
        (ms as u128 * self.sample_rate as u128 / 1000) as usize
    }

    /// Render mono samples in -1.0..=1.0
    pub fn render(&self) -> Vec<f32> {
        let total = self.sample_index(self.duration_ms);
        let onset = self.sample_index(self.knock_at_ms).min(total);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut samples: Vec<f32> = (0..total)
            .map(|_| rng.gen_range(-self.noise_amplitude..=self.noise_amplitude))
            .collect();

        let sample_rate = self.sample_rate as f32;
        let tone: Vec<f32> = (0..total - onset)
            .map(|n| {
                let t = n as f32 / sample_rate;
                let envelope = self.envelope(t);
                let series: f32 = HARMONIC_WEIGHTS
                    .iter()
                    .enumerate()
                    .map(|(k, weight)| {
                        let freq = self.fundamental_hz * (k + 1) as f32;
                        weight * (2.0 * std::f32::consts::PI * freq * t).sin()
                    })
                    .sum();
                envelope * series
            })
            .collect();

        let tone_peak = tone.iter().fold(0.0f32, |peak, value| peak.max(value.abs()));
        if tone_peak > 0.0 {
            let gain = self.knock_amplitude / tone_peak;
            for (sample, value) in samples[onset..].iter_mut().zip(&tone) {
                *sample = (*sample + value * gain).clamp(-1.0, 1.0);
            }
        }

        samples
    }

    /// Render and write a 16-bit mono WAV
    pub fn write_wav(&self, path: impl AsRef<Path>) -> Result<(), AudioError> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
        for sample in self.render() {
            writer.write_sample((sample * i16::MAX as f32) as i16)?;
        }
        writer.finalize()?;

        log::info!(
            "[SyntheticKnock] Wrote {} Hz knock at {} ms to {}",
            self.fundamental_hz,
            self.knock_at_ms,
            path.as_ref().display()
        );
        Ok(())
    }
}
