use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use freqshow_messages::{GainMode, Hertz};
use log::{debug, warn};
use num_complex::Complex;

use crate::error::{DeviceError, StreamError};

/// Tuning state a device is configured with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceConfig {
    pub center_frequency: Hertz,
    pub sample_rate: Hertz,
    pub gain: GainMode,
    pub channel: usize,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            center_frequency: Hertz::mhz(100.0),
            sample_rate: Hertz::mhz(1.0),
            gain: GainMode::Fixed(10.0),
            channel: 0,
        }
    }
}

/// Outcome of one `receive_into` call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Received {
    /// Samples written to the front of the buffer.
    pub samples: usize,
    /// Set when the device flagged this chunk.
    pub error: Option<StreamError>,
}

impl Received {
    pub fn samples(samples: usize) -> Self {
        Self {
            samples,
            error: None,
        }
    }

    pub fn failed(error: StreamError) -> Self {
        Self {
            samples: 0,
            error: Some(error),
        }
    }
}

/// Abstraction over the radio front end (hardware SDR, files, generators).
///
/// Getters return the last accepted value; setters report rejection instead
/// of ignoring it.
pub trait Device: Send {
    fn frequency(&self) -> Hertz;
    fn set_frequency(&mut self, frequency: Hertz) -> Result<(), DeviceError>;

    fn sample_rate(&self) -> Hertz;
    fn set_sample_rate(&mut self, rate: Hertz) -> Result<(), DeviceError>;

    fn gain(&self) -> GainMode;
    fn set_gain(&mut self, gain: GainMode) -> Result<(), DeviceError>;

    fn channel_count(&self) -> usize {
        1
    }

    /// Open a receive session. The session borrows the device, so only one
    /// can be live at a time.
    fn open_stream(&mut self, channel: usize) -> Result<Box<dyn StreamSession + '_>, DeviceError>;
}

/// A start/drain/stop streaming session on one channel.
pub trait StreamSession {
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Largest chunk a single `receive_into` call will fill.
    fn max_chunk_len(&self) -> usize;

    /// Fill up to `buf.len()` samples. Recoverable conditions come back in
    /// [`Received::error`]; `Err` is reserved for a broken session.
    fn receive_into(&mut self, buf: &mut [Complex<f32>]) -> Result<Received, DeviceError>;

    fn stop(&mut self) -> Result<(), DeviceError>;
}

pub(crate) fn check_positive(parameter: &'static str, value: Hertz) -> Result<(), DeviceError> {
    if !(value.as_hz().is_finite() && value.as_hz() > 0.0) {
        return Err(DeviceError::Rejected {
            parameter,
            message: format!("{value} is not a positive frequency"),
        });
    }
    Ok(())
}

pub(crate) fn check_channel(channel: usize, count: usize) -> Result<(), DeviceError> {
    if channel >= count {
        return Err(DeviceError::InvalidChannel { channel, count });
    }
    Ok(())
}

/// Cooperative cancellation flag shared between the acquisition loop and
/// whoever wants to abort it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Owns a started session and makes sure it is stopped on every exit path.
pub(crate) struct SessionGuard<'a> {
    session: Box<dyn StreamSession + 'a>,
    streaming: bool,
}

impl<'a> SessionGuard<'a> {
    pub(crate) fn start(mut session: Box<dyn StreamSession + 'a>) -> Result<Self, DeviceError> {
        session.start()?;
        debug!("Stream session started");
        Ok(Self {
            session,
            streaming: true,
        })
    }

    pub(crate) fn session(&mut self) -> &mut (dyn StreamSession + 'a) {
        self.session.as_mut()
    }

    /// Stop explicitly so the caller sees the result.
    pub(crate) fn stop(mut self) -> Result<(), DeviceError> {
        self.streaming = false;
        let result = self.session.stop();
        debug!("Stream session stopped");
        result
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        if self.streaming {
            if let Err(e) = self.session.stop() {
                warn!("Failed to stop stream session: {e}");
            } else {
                debug!("Stream session stopped on early exit");
            }
        }
    }
}
