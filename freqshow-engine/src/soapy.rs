//! SoapySDR-backed front end.

use freqshow_messages::{GainMode, Hertz};
use log::{debug, info};
use num_complex::Complex;
use soapysdr::{Direction, ErrorCode, RxStream};

use crate::device::{Device, DeviceConfig, Received, StreamSession, check_channel, check_positive};
use crate::error::{DeviceError, StreamError, StreamErrorCode};

/// Per-read timeout handed to the driver.
const READ_TIMEOUT_US: i64 = 100_000;

fn rejected(parameter: &'static str, e: soapysdr::Error) -> DeviceError {
    DeviceError::Rejected {
        parameter,
        message: e.to_string(),
    }
}

pub struct SoapyDevice {
    device: soapysdr::Device,
    config: DeviceConfig,
    channels: usize,
}

impl SoapyDevice {
    /// Open the device matching `args` (e.g. `"driver=rtlsdr"`) and apply
    /// `config`.
    pub fn open(args: &str, config: DeviceConfig) -> Result<Self, DeviceError> {
        info!("Opening SoapySDR device with args: {args:?}");
        let device = soapysdr::Device::new(args)?;
        let channels = device.num_channels(Direction::Rx)?;
        check_channel(config.channel, channels)?;

        let mut this = Self {
            device,
            config,
            channels,
        };
        this.set_sample_rate(config.sample_rate)?;
        this.set_frequency(config.center_frequency)?;
        this.set_gain(config.gain)?;
        Ok(this)
    }
}

impl Device for SoapyDevice {
    fn frequency(&self) -> Hertz {
        self.config.center_frequency
    }

    fn set_frequency(&mut self, frequency: Hertz) -> Result<(), DeviceError> {
        check_positive("frequency", frequency)?;
        self.device
            .set_frequency(Direction::Rx, self.config.channel, frequency.as_hz(), ())
            .map_err(|e| rejected("frequency", e))?;
        self.config.center_frequency = self
            .device
            .frequency(Direction::Rx, self.config.channel)
            .map(Hertz)
            .unwrap_or(frequency);
        debug!("Tuned to {}", self.config.center_frequency);
        Ok(())
    }

    fn sample_rate(&self) -> Hertz {
        self.config.sample_rate
    }

    fn set_sample_rate(&mut self, rate: Hertz) -> Result<(), DeviceError> {
        check_positive("sample rate", rate)?;
        self.device
            .set_sample_rate(Direction::Rx, self.config.channel, rate.as_hz())
            .map_err(|e| rejected("sample rate", e))?;
        self.config.sample_rate = self
            .device
            .sample_rate(Direction::Rx, self.config.channel)
            .map(Hertz)
            .unwrap_or(rate);
        debug!("Sample rate {}", self.config.sample_rate);
        Ok(())
    }

    fn gain(&self) -> GainMode {
        self.config.gain
    }

    fn set_gain(&mut self, gain: GainMode) -> Result<(), DeviceError> {
        let channel = self.config.channel;
        match gain {
            GainMode::Auto => self
                .device
                .set_gain_mode(Direction::Rx, channel, true)
                .map_err(|e| rejected("gain", e))?,
            GainMode::Fixed(db) => {
                self.device
                    .set_gain_mode(Direction::Rx, channel, false)
                    .map_err(|e| rejected("gain", e))?;
                self.device
                    .set_gain(Direction::Rx, channel, f64::from(db))
                    .map_err(|e| rejected("gain", e))?;
            }
        }
        self.config.gain = gain;
        Ok(())
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn open_stream(&mut self, channel: usize) -> Result<Box<dyn StreamSession + '_>, DeviceError> {
        check_channel(channel, self.channels)?;
        let stream = self.device.rx_stream::<Complex<f32>>(&[channel])?;
        let mtu = stream.mtu()?;
        Ok(Box::new(SoapySession { stream, mtu }))
    }
}

struct SoapySession {
    stream: RxStream<Complex<f32>>,
    mtu: usize,
}

impl StreamSession for SoapySession {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.stream.activate(None)?;
        Ok(())
    }

    fn max_chunk_len(&self) -> usize {
        self.mtu
    }

    fn receive_into(&mut self, buf: &mut [Complex<f32>]) -> Result<Received, DeviceError> {
        match self.stream.read(&mut [buf], READ_TIMEOUT_US) {
            Ok(n) => Ok(Received::samples(n)),
            Err(e) => {
                let code = match e.code {
                    ErrorCode::Timeout => StreamErrorCode::Timeout,
                    ErrorCode::Overflow => StreamErrorCode::Overflow,
                    ErrorCode::Corruption => StreamErrorCode::BadPacket,
                    ErrorCode::TimeError => StreamErrorCode::LateCommand,
                    _ => return Err(e.into()),
                };
                Ok(Received::failed(StreamError::new(code, e.message)))
            }
        }
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.stream.deactivate(None)?;
        Ok(())
    }
}
