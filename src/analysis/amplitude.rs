// AmplitudeMonitor - instantaneous peak amplitude and running ambient estimate
//
// Buffers are unsigned 8-bit waveform samples as delivered by a byte
// analyser: 128 is silence, 0 and 255 are full-scale. The peak is the raw
// byte maximum, so silence reads as 128, not 0. Callers that want a
// centre-relative magnitude must convert before handing the buffer over.

/// Full-scale value of an unsigned byte sample
pub const FULL_SCALE: f32 = 255.0;

#[derive(Debug, Default)]
pub struct AmplitudeMonitor {
    ambient_samples: Vec<f32>,
}

impl AmplitudeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Peak (maximum) sample in the buffer; 0.0 for an empty buffer
    pub fn sample_peak(buffer: &[u8]) -> f32 {
        buffer.iter().copied().max().unwrap_or(0) as f32
    }

    /// Peak expressed as a 0.0-1.0 ratio for a live level meter
    pub fn amplitude_ratio(peak: f32) -> f32 {
        (peak / FULL_SCALE).clamp(0.0, 1.0)
    }

    /// Append one ambient peak collected during calibration
    pub fn record_ambient(&mut self, peak: f32) {
        self.ambient_samples.push(peak);
    }

    /// Running mean of ambient peaks recorded so far
    pub fn ambient_estimate(&self) -> Option<f32> {
        if self.ambient_samples.is_empty() {
            return None;
        }
        Some(self.ambient_samples.iter().sum::<f32>() / self.ambient_samples.len() as f32)
    }

    pub fn ambient_samples(&self) -> &[f32] {
        &self.ambient_samples
    }

    pub fn ambient_sample_count(&self) -> usize {
        self.ambient_samples.len()
    }

    /// Drain ambient samples, leaving the monitor empty
    pub fn take_ambient_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.ambient_samples)
    }

    pub fn reset(&mut self) {
        self.ambient_samples.clear();
    }
}
