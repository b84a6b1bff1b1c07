use crate::{Decibels, GainMode, Hertz, IntensityBound};
use std::path::PathBuf;

/// Current state of the spectrum engine.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Center frequency
    pub center_frequency: Hertz,
    /// Sample rate
    pub sample_rate: Hertz,
    /// Tuner gain
    pub gain: GainMode,
    /// Number of bins per spectrum
    pub display_width: usize,
    /// Samples gathered per acquisition
    pub window_length: usize,
    /// Current intensity scale
    pub range: IntensityRange,
}

/// Configuration for the IQ sample source.
#[derive(Debug, Clone)]
pub enum SourceConfig {
    /// Generate a complex test tone offset from the tuned frequency.
    ToneGenerator {
        offset: Hertz,
        amplitude: Decibels,
    },
    /// Read IQ samples from a file.
    File { path: PathBuf, loop_on_eof: bool },
    /// Open a SoapySDR device with the given argument string.
    Soapy { args: String },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::ToneGenerator {
            offset: Hertz::khz(100.0),
            amplitude: Decibels(0.0), // 0 dB = amplitude 1.0
        }
    }
}

/// Display intensity scale, as tracked across spectra.
///
/// `resolved_min`/`resolved_max` stay `None` for an auto bound until a
/// spectrum has been seen, and `span` is only set once both ends are known.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntensityRange {
    pub min: IntensityBound,
    pub max: IntensityBound,
    pub resolved_min: Option<f32>,
    pub resolved_max: Option<f32>,
    pub span: Option<f32>,
}

impl IntensityRange {
    /// Fixed range derived from a reference level and dynamic range, snapped
    /// to whole display rows of `height` pixels.
    pub fn from_reference(reference_db: f32, dynamic_range_db: f32, height: usize) -> Self {
        let rows = height.saturating_sub(1).max(1) as f32;
        let step = dynamic_range_db / rows;
        let (min, max) = if step > 0.0 {
            (
                step * ((reference_db - dynamic_range_db) / step).trunc(),
                step * (reference_db / step).trunc(),
            )
        } else {
            (reference_db - dynamic_range_db, reference_db)
        };
        Self::fixed(min, max)
    }

    pub fn fixed(min_db: f32, max_db: f32) -> Self {
        Self {
            min: IntensityBound::Fixed(min_db),
            max: IntensityBound::Fixed(max_db),
            resolved_min: Some(min_db),
            resolved_max: Some(max_db),
            span: Some(max_db - min_db),
        }
    }

    /// True once both ends are known but do not enclose a positive span.
    pub fn is_degenerate(&self) -> bool {
        self.span.is_some_and(|span| span <= 0.0)
    }

    /// Map a decibel value onto `0.0..=1.0`, or `None` while the scale is
    /// unresolved or degenerate.
    pub fn normalize(&self, db: f32) -> Option<f32> {
        let (min, span) = (self.resolved_min?, self.span?);
        if span <= 0.0 {
            return None;
        }
        Some(((db - min) / span).clamp(0.0, 1.0))
    }
}
