//! Seam between the knock pipeline and whatever delivers audio.
//!
//! A source fills caller-owned byte buffers on demand: the time-domain
//! waveform every tick, the frequency-domain magnitudes only on the knock
//! tick. Buffers are overwritten in place and no history is kept by the core.

use crate::error::AudioError;

pub trait SampleSource {
    fn sample_rate(&self) -> u32;

    /// Analysis window size; buffers hold `fft_size / 2` entries
    fn fft_size(&self) -> usize;

    fn frequency_bin_count(&self) -> usize {
        self.fft_size() / 2
    }

    /// Unsigned byte waveform (128 = silence) ending at `now_ms`
    fn read_time_domain(&mut self, now_ms: u64, out: &mut [u8]) -> Result<(), AudioError>;

    /// Decibel-scaled byte magnitudes of the window ending at `now_ms`
    fn read_frequency_domain(&mut self, now_ms: u64, out: &mut [u8]) -> Result<(), AudioError>;
}

impl<S: SampleSource + ?Sized> SampleSource for Box<S> {
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }

    fn fft_size(&self) -> usize {
        (**self).fft_size()
    }

    fn read_time_domain(&mut self, now_ms: u64, out: &mut [u8]) -> Result<(), AudioError> {
        (**self).read_time_domain(now_ms, out)
    }

    fn read_frequency_domain(&mut self, now_ms: u64, out: &mut [u8]) -> Result<(), AudioError> {
        (**self).read_frequency_domain(now_ms, out)
    }
}
