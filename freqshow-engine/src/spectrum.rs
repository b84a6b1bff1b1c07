use std::sync::Arc;

use freqshow_messages::Decibels;
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::{EngineError, Result};
use crate::reader::SampleWindow;

/// Decibel value reported for a bin with zero magnitude.
pub const DB_FLOOR: f32 = -200.0;

/// Bins dropped from the raw FFT output: the DC term and the last bin.
pub const DISCARDED_BINS: usize = 2;

/// One display row of intensities in dB, lowest frequency first.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum(Vec<f32>);

impl Spectrum {
    pub fn bins(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn min(&self) -> Option<f32> {
        self.0.iter().copied().reduce(f32::min)
    }

    pub fn max(&self) -> Option<f32> {
        self.0.iter().copied().reduce(f32::max)
    }

    /// Index and value of the strongest bin.
    pub fn peak(&self) -> Option<(usize, f32)> {
        self.0
            .iter()
            .copied()
            .enumerate()
            .reduce(|best, next| if next.1 > best.1 { next } else { best })
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl From<Vec<f32>> for Spectrum {
    fn from(bins: Vec<f32>) -> Self {
        Self(bins)
    }
}

/// Amplitude to dB with a defined floor for silence.
pub fn magnitude_to_db(magnitude: f32) -> f32 {
    if magnitude > 0.0 {
        Decibels::from_linear(magnitude).as_db().max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

/// Turns a sample window into `width` centred dB bins.
pub struct SpectrumTransformer {
    width: usize,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectrumTransformer {
    pub fn new(width: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(width + DISCARDED_BINS);
        Self { width, fft }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Samples consumed per transform.
    pub fn fft_len(&self) -> usize {
        self.width + DISCARDED_BINS
    }

    /// Transform the leading `width + 2` samples of `window`; any further
    /// samples are ignored.
    pub fn transform(&self, window: &SampleWindow) -> Result<Spectrum> {
        let needed = self.fft_len();
        if window.len() < needed {
            return Err(EngineError::ShortWindow {
                got: window.len(),
                needed,
            });
        }

        let mut buf: Vec<Complex<f32>> = window.samples()[..needed].to_vec();
        self.fft.process(&mut buf);

        let mut bins: Vec<f32> = buf[1..needed - 1]
            .iter()
            .map(|value| magnitude_to_db(value.norm()))
            .collect();

        // FFT shift: [DC, positive, negative] -> [negative, DC, positive]
        let half = bins.len() / 2;
        bins.rotate_right(half);

        Ok(Spectrum(bins))
    }
}
