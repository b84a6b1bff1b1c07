mod command;
mod event;
mod settings;
mod state;
mod units;

pub use command::Command;
pub use event::Event;
pub use settings::{AUTO, GainMode, IntensityBound, ParseSettingError};
pub use state::{EngineState, IntensityRange, SourceConfig};
pub use units::{Decibels, Hertz};
