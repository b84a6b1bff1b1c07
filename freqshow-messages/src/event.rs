use crate::{EngineState, IntensityRange};

/// Events sent from the engine to the caller.
#[derive(Debug)]
pub enum Event {
    /// Parameter snapshot, sent on start and after every accepted command.
    StateSnapshot(EngineState),
    /// One spectrum in dB, centre-shifted, with the scale to draw it against.
    SpectrumData {
        bins: Vec<f32>,
        range: IntensityRange,
    },
    /// A command or acquisition failed; the engine keeps running.
    Error(String),
}
