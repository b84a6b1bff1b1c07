mod device;
mod error;
mod file;
mod model;
mod range;
mod reader;
#[cfg(feature = "soapysdr")]
mod soapy;
mod spectrum;
pub mod testing;
mod tone;

use std::collections::VecDeque;

use anyhow::Result;
use flume::{Receiver, Sender, TryRecvError};
use freqshow_messages::{Command, Event};
use log::{debug, warn};

pub use device::{CancelToken, Device, DeviceConfig, Received, StreamSession};
pub use error::{DeviceError, EngineError, StreamError, StreamErrorCode};
pub use file::FileDevice;
pub use model::{MAX_WINDOW_LEN, ModelConfig, SpectrumModel, WindowPolicy, open_device};
pub use range::IntensityRangeTracker;
pub use reader::{SampleStreamReader, SampleWindow};
#[cfg(feature = "soapysdr")]
pub use soapy::SoapyDevice;
pub use spectrum::{DB_FLOOR, Spectrum, SpectrumTransformer, magnitude_to_db};
pub use tone::ToneDevice;

/// The spectrum engine backend.
/// Owns the model and turns caller commands into parameter changes between
/// acquisitions.
pub struct Engine {
    cmd_rx: Receiver<Command>,
    event_tx: Sender<Event>,
    model: SpectrumModel,
    /// Commands that arrived during an acquisition.
    pending: VecDeque<Command>,
    should_exit: bool,
}

impl Engine {
    /// Create a new Engine instance.
    pub fn new(cmd_rx: Receiver<Command>, event_tx: Sender<Event>, model: SpectrumModel) -> Self {
        debug!("Constructing a new engine");
        Self {
            cmd_rx,
            event_tx,
            model,
            pending: VecDeque::new(),
            should_exit: false,
        }
    }

    /// Token that interrupts a running acquisition and ends [`Engine::run`].
    pub fn cancel_token(&self) -> CancelToken {
        self.model.cancel_token()
    }

    /// Run the engine (blocking).
    /// Sends a StateSnapshot, then alternates between draining commands and
    /// producing spectra until stopped, cancelled or disconnected.
    pub fn run(mut self) -> Result<()> {
        let cancel = self.model.cancel_token();
        self.publish(Event::StateSnapshot(self.model.state()));

        while !self.should_exit {
            self.process_commands();
            if self.should_exit || cancel.is_cancelled() {
                break;
            }

            let (cmd_rx, pending) = (&self.cmd_rx, &mut self.pending);
            let result = self
                .model
                .produce_spectrum_until(|| stop_requested(cmd_rx, pending));

            match result {
                Ok((spectrum, range)) => self.publish(Event::SpectrumData {
                    bins: spectrum.into_inner(),
                    range,
                }),
                // A Stop seen mid-acquisition is handled by process_commands.
                Err(EngineError::Cancelled) if !cancel.is_cancelled() => continue,
                Err(EngineError::Cancelled) => break,
                Err(e) => {
                    warn!("Acquisition failed: {e}");
                    self.publish(Event::Error(e.to_string()));
                }
            }
        }

        debug!("Engine stopped");
        Ok(())
    }

    fn publish(&mut self, event: Event) {
        // Block to provide backpressure if the caller is behind
        if self.event_tx.send(event).is_err() {
            debug!("Event channel disconnected");
            self.should_exit = true;
        }
    }

    fn process_commands(&mut self) {
        loop {
            let msg = match self.pending.pop_front() {
                Some(cmd) => Ok(cmd),
                None => self.cmd_rx.try_recv(),
            };
            match msg {
                Ok(Command::Stop) | Err(TryRecvError::Disconnected) => {
                    self.should_exit = true;
                    break;
                }
                Ok(cmd) => {
                    debug!("Engine received command: {cmd:?}");
                    match self.apply(cmd) {
                        Ok(()) => self.publish(Event::StateSnapshot(self.model.state())),
                        Err(e) => {
                            warn!("Command rejected: {e}");
                            self.publish(Event::Error(e.to_string()));
                        }
                    }
                }
                Err(TryRecvError::Empty) => break,
            }
        }
    }

    fn apply(&mut self, cmd: Command) -> std::result::Result<(), EngineError> {
        match cmd {
            Command::SetCenterFrequency(hz) => self.model.set_center_freq(hz.as_mhz()),
            Command::SetSampleRate(hz) => self.model.set_sample_rate(hz.as_mhz()),
            Command::SetGain(gain) => self.model.set_gain(gain),
            Command::SetMinIntensity(bound) => {
                self.model.set_min_intensity(bound);
                Ok(())
            }
            Command::SetMaxIntensity(bound) => {
                self.model.set_max_intensity(bound);
                Ok(())
            }
            Command::Stop => Ok(()),
        }
    }
}

/// Poll the command channel during an acquisition. Returns true once a Stop
/// (or a disconnect) is seen; everything received is queued in `pending`.
fn stop_requested(cmd_rx: &Receiver<Command>, pending: &mut VecDeque<Command>) -> bool {
    loop {
        match cmd_rx.try_recv() {
            Ok(Command::Stop) | Err(TryRecvError::Disconnected) => {
                pending.push_back(Command::Stop);
                return true;
            }
            Ok(cmd) => pending.push_back(cmd),
            Err(TryRecvError::Empty) => return false,
        }
    }
}
