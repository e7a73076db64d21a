//! Byte-valued frequency analyser for sound-presence feedback
//!
//! Mirrors the behaviour of a browser analyser node:
//! - fixed 256-sample analysis window (128 frequency bins)
//! - Blackman window, magnitude scaled by 1/N
//! - temporal smoothing (time constant 0.8) applied on every read
//! - dB range [-100, -30] mapped onto 0-255

use std::sync::Arc;

use parking_lot::Mutex;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use super::backend::FrequencySnapshot;

/// Analysis window size in samples
pub const FFT_SIZE: usize = 256;

/// Number of frequency bins produced per snapshot
pub const FREQUENCY_BIN_COUNT: usize = FFT_SIZE / 2;

pub const SMOOTHING_TIME_CONSTANT: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// FFT analyser over the most recent `FFT_SIZE` samples of the input
pub struct FrequencyAnalyser {
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    /// Ring buffer of the latest time-domain samples
    history: Vec<f32>,
    write_pos: usize,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl FrequencyAnalyser {
    pub fn new() -> Self {
        let fft = FftPlanner::new().plan_fft_forward(FFT_SIZE);

        // Blackman window
        let n = FFT_SIZE as f32;
        let window = (0..FFT_SIZE)
            .map(|i| {
                let x = i as f32 / n;
                0.42 - 0.5 * (2.0 * std::f32::consts::PI * x).cos()
                    + 0.08 * (4.0 * std::f32::consts::PI * x).cos()
            })
            .collect();

        Self {
            fft,
            window,
            history: vec![0.0; FFT_SIZE],
            write_pos: 0,
            smoothed: vec![0.0; FREQUENCY_BIN_COUNT],
            scratch: vec![Complex::new(0.0, 0.0); FFT_SIZE],
        }
    }

    /// Push mono samples in [-1.0, 1.0]
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.history[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % FFT_SIZE;
        }
    }

    /// Push interleaved 16-bit PCM, averaging channels down to mono
    pub fn push_pcm(&mut self, samples: &[i16], channels: u16) {
        let channels = channels.max(1) as usize;
        let mono: Vec<f32> = samples
            .chunks(channels)
            .map(|frame| {
                let sum: f32 = frame.iter().map(|&s| s as f32 / 32768.0).sum();
                sum / frame.len() as f32
            })
            .collect();
        self.push_samples(&mono);
    }

    /// Compute the current snapshot into `bins`
    ///
    /// Bins beyond `FREQUENCY_BIN_COUNT` are zeroed.
    pub fn byte_frequency_data(&mut self, bins: &mut [u8]) {
        // Oldest sample first
        for i in 0..FFT_SIZE {
            let sample = self.history[(self.write_pos + i) % FFT_SIZE];
            self.scratch[i] = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let range = MAX_DECIBELS - MIN_DECIBELS;
        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / FFT_SIZE as f32;
            *smoothed = SMOOTHING_TIME_CONSTANT * *smoothed
                + (1.0 - SMOOTHING_TIME_CONSTANT) * magnitude;
        }

        for (k, bin) in bins.iter_mut().enumerate() {
            *bin = match self.smoothed.get(k) {
                Some(&magnitude) if magnitude > 0.0 => {
                    let db = 20.0 * magnitude.log10();
                    (255.0 * (db - MIN_DECIBELS) / range).clamp(0.0, 255.0) as u8
                }
                _ => 0,
            };
        }
    }
}

impl Default for FrequencyAnalyser {
    fn default() -> Self {
        Self::new()
    }
}

/// Analyser shared between a capture producer and the sound monitor
#[derive(Clone, Default)]
pub struct SharedAnalyser {
    inner: Arc<Mutex<FrequencyAnalyser>>,
}

impl SharedAnalyser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_pcm(&self, samples: &[i16], channels: u16) {
        self.inner.lock().push_pcm(samples, channels);
    }

    pub fn push_samples(&self, samples: &[f32]) {
        self.inner.lock().push_samples(samples);
    }
}

impl FrequencySnapshot for SharedAnalyser {
    fn frequency_bin_count(&self) -> usize {
        FREQUENCY_BIN_COUNT
    }

    fn byte_frequency_data(&self, bins: &mut [u8]) {
        self.inner.lock().byte_frequency_data(bins);
    }
}
