//! Scripted devices for exercising the pipeline without hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use freqshow_messages::{GainMode, Hertz};
use num_complex::Complex;

use crate::device::{Device, DeviceConfig, Received, StreamSession, check_channel, check_positive};
use crate::error::{DeviceError, StreamError, StreamErrorCode};

/// What one `receive_into` call does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    /// Deliver this many samples (capped at the buffer length).
    Samples(usize),
    /// Flag the chunk with a recoverable error code.
    ChunkError(StreamErrorCode),
    /// Deliver nothing.
    Empty,
    /// Fail the call outright.
    Fail,
}

/// Counters shared with the test after the device has been moved away.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionLog {
    pub opened: usize,
    pub started: usize,
    pub stopped: usize,
    pub receives: usize,
    pub delivered: usize,
}

impl SessionLog {
    /// Every started session was stopped again.
    pub fn is_balanced(&self) -> bool {
        self.started == self.stopped
    }
}

/// Device whose receive calls follow a script. Delivered samples count up
/// from zero (`n + 0i`) so tests can check ordering.
pub struct ScriptedDevice {
    config: DeviceConfig,
    script: VecDeque<Step>,
    then: Step,
    chunk_len: usize,
    counter: usize,
    read_delay: Option<Duration>,
    rejects: Option<&'static str>,
    log: Arc<Mutex<SessionLog>>,
}

impl ScriptedDevice {
    pub fn new(chunk_len: usize, script: impl IntoIterator<Item = Step>, then: Step) -> Self {
        Self {
            config: DeviceConfig::default(),
            script: script.into_iter().collect(),
            then,
            chunk_len,
            counter: 0,
            read_delay: None,
            rejects: None,
            log: Arc::default(),
        }
    }

    /// Always delivers full chunks.
    pub fn steady(chunk_len: usize) -> Self {
        Self::new(chunk_len, [], Step::Samples(chunk_len))
    }

    /// Never delivers anything.
    pub fn silent(chunk_len: usize) -> Self {
        Self::new(chunk_len, [], Step::Empty)
    }

    /// Reject any attempt to set `parameter` ("frequency", "sample rate" or "gain").
    pub fn rejecting(mut self, parameter: &'static str) -> Self {
        self.rejects = Some(parameter);
        self
    }

    /// Block for `delay` in every receive call, like a device pacing its
    /// output to the sample rate.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn log(&self) -> Arc<Mutex<SessionLog>> {
        Arc::clone(&self.log)
    }

    fn check(&self, parameter: &'static str) -> Result<(), DeviceError> {
        if self.rejects == Some(parameter) {
            return Err(DeviceError::Rejected {
                parameter,
                message: "out of range".to_string(),
            });
        }
        Ok(())
    }

    fn record(&self, f: impl FnOnce(&mut SessionLog)) {
        if let Ok(mut log) = self.log.lock() {
            f(&mut log);
        }
    }
}

impl Device for ScriptedDevice {
    fn frequency(&self) -> Hertz {
        self.config.center_frequency
    }

    fn set_frequency(&mut self, frequency: Hertz) -> Result<(), DeviceError> {
        self.check("frequency")?;
        check_positive("frequency", frequency)?;
        self.config.center_frequency = frequency;
        Ok(())
    }

    fn sample_rate(&self) -> Hertz {
        self.config.sample_rate
    }

    fn set_sample_rate(&mut self, rate: Hertz) -> Result<(), DeviceError> {
        self.check("sample rate")?;
        check_positive("sample rate", rate)?;
        self.config.sample_rate = rate;
        Ok(())
    }

    fn gain(&self) -> GainMode {
        self.config.gain
    }

    fn set_gain(&mut self, gain: GainMode) -> Result<(), DeviceError> {
        self.check("gain")?;
        self.config.gain = gain;
        Ok(())
    }

    fn open_stream(&mut self, channel: usize) -> Result<Box<dyn StreamSession + '_>, DeviceError> {
        check_channel(channel, self.channel_count())?;
        self.record(|log| log.opened += 1);
        Ok(Box::new(ScriptedSession { device: self }))
    }
}

struct ScriptedSession<'a> {
    device: &'a mut ScriptedDevice,
}

impl StreamSession for ScriptedSession<'_> {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.device.record(|log| log.started += 1);
        Ok(())
    }

    fn max_chunk_len(&self) -> usize {
        self.device.chunk_len
    }

    fn receive_into(&mut self, buf: &mut [Complex<f32>]) -> Result<Received, DeviceError> {
        let device = &mut *self.device;
        device.record(|log| log.receives += 1);
        if let Some(delay) = device.read_delay {
            thread::sleep(delay);
        }
        let step = device.script.pop_front().unwrap_or(device.then);
        match step {
            Step::Samples(n) => {
                let n = n.min(buf.len());
                for slot in &mut buf[..n] {
                    *slot = Complex::new(device.counter as f32, 0.0);
                    device.counter += 1;
                }
                device.record(|log| log.delivered += n);
                Ok(Received::samples(n))
            }
            Step::ChunkError(code) => Ok(Received::failed(StreamError::new(code, "scripted"))),
            Step::Empty => Ok(Received::samples(0)),
            Step::Fail => Err(DeviceError::Stream("scripted failure".to_string())),
        }
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.device.record(|log| log.stopped += 1);
        Ok(())
    }
}
