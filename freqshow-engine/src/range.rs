use freqshow_messages::{IntensityBound, IntensityRange};
use log::debug;

use crate::spectrum::Spectrum;

/// Tracks the display scale across spectra.
///
/// Auto bounds only ever widen while the tuning stays put; any change that
/// makes the old scale meaningless clears them and they are rebuilt from the
/// next spectrum.
#[derive(Debug, Clone, Default)]
pub struct IntensityRangeTracker {
    range: IntensityRange,
}

impl IntensityRangeTracker {
    pub fn new(min: IntensityBound, max: IntensityBound) -> Self {
        let mut tracker = Self::default();
        tracker.range.min = min;
        tracker.range.max = max;
        tracker.clear();
        tracker
    }

    pub fn from_range(range: IntensityRange) -> Self {
        Self::new(range.min, range.max)
    }

    pub fn range(&self) -> IntensityRange {
        self.range
    }

    pub fn min(&self) -> IntensityBound {
        self.range.min
    }

    pub fn max(&self) -> IntensityBound {
        self.range.max
    }

    pub fn set_min(&mut self, bound: IntensityBound) {
        self.range.min = bound;
        self.clear();
    }

    pub fn set_max(&mut self, bound: IntensityBound) {
        self.range.max = bound;
        self.clear();
    }

    /// Forget auto-scaled history. Fixed bounds keep their value.
    pub fn clear(&mut self) {
        let range = &mut self.range;
        range.resolved_min = range.min.fixed_value();
        range.resolved_max = range.max.fixed_value();
        self.update_span();
    }

    /// Fold a new spectrum into the auto bounds.
    pub fn observe(&mut self, spectrum: &Spectrum) -> IntensityRange {
        let range = &mut self.range;
        if range.min.is_auto() {
            if let Some(low) = spectrum.min() {
                range.resolved_min = Some(range.resolved_min.map_or(low, |m| m.min(low)));
            }
        }
        if range.max.is_auto() {
            if let Some(high) = spectrum.max() {
                range.resolved_max = Some(range.resolved_max.map_or(high, |m| m.max(high)));
            }
        }
        self.update_span();
        if self.range.is_degenerate() {
            debug!("Degenerate intensity range: {:?}", self.range);
        }
        self.range
    }

    fn update_span(&mut self) {
        let range = &mut self.range;
        range.span = match (range.resolved_min, range.resolved_max) {
            (Some(min), Some(max)) => Some(max - min),
            _ => None,
        };
    }
}
