use crate::{GainMode, Hertz, IntensityBound};

/// Commands sent from the caller to the engine.
#[derive(Debug)]
pub enum Command {
    /// Stop the engine after the current acquisition.
    Stop,
    /// Retune the center frequency.
    SetCenterFrequency(Hertz),
    /// Change the sample rate.
    SetSampleRate(Hertz),
    /// Switch between automatic and fixed gain.
    SetGain(GainMode),
    /// Bottom of the intensity scale.
    SetMinIntensity(IntensityBound),
    /// Top of the intensity scale.
    SetMaxIntensity(IntensityBound),
}
