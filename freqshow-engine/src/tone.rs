use std::f64::consts::TAU;

use freqshow_messages::{Decibels, GainMode, Hertz};
use log::debug;
use num_complex::Complex;

use crate::device::{Device, DeviceConfig, Received, StreamSession, check_channel, check_positive};
use crate::error::DeviceError;

/// Samples handed out per receive call.
pub const TONE_CHUNK_LEN: usize = 4096;

/// Synthetic front end producing a single complex tone at a fixed offset
/// from the tuned frequency. Fixed gain scales the tone amplitude.
#[derive(Debug)]
pub struct ToneDevice {
    config: DeviceConfig,
    offset: Hertz,
    amplitude: f32,
    phase: f64,
}

impl ToneDevice {
    pub fn new(config: DeviceConfig, offset: Hertz, amplitude: Decibels) -> Self {
        Self {
            config,
            offset,
            amplitude: amplitude.to_linear(),
            phase: 0.0,
        }
    }

    fn level(&self) -> f32 {
        match self.config.gain {
            GainMode::Auto => self.amplitude,
            GainMode::Fixed(db) => self.amplitude * Decibels(db).to_linear(),
        }
    }
}

impl Device for ToneDevice {
    fn frequency(&self) -> Hertz {
        self.config.center_frequency
    }

    fn set_frequency(&mut self, frequency: Hertz) -> Result<(), DeviceError> {
        check_positive("frequency", frequency)?;
        self.config.center_frequency = frequency;
        Ok(())
    }

    fn sample_rate(&self) -> Hertz {
        self.config.sample_rate
    }

    fn set_sample_rate(&mut self, rate: Hertz) -> Result<(), DeviceError> {
        check_positive("sample rate", rate)?;
        self.config.sample_rate = rate;
        Ok(())
    }

    fn gain(&self) -> GainMode {
        self.config.gain
    }

    fn set_gain(&mut self, gain: GainMode) -> Result<(), DeviceError> {
        self.config.gain = gain;
        Ok(())
    }

    fn open_stream(&mut self, channel: usize) -> Result<Box<dyn StreamSession + '_>, DeviceError> {
        check_channel(channel, self.channel_count())?;
        Ok(Box::new(ToneSession {
            device: self,
            streaming: false,
        }))
    }
}

struct ToneSession<'a> {
    device: &'a mut ToneDevice,
    streaming: bool,
}

impl StreamSession for ToneSession<'_> {
    fn start(&mut self) -> Result<(), DeviceError> {
        debug!(
            "Tone stream at {} + {}",
            self.device.config.center_frequency, self.device.offset
        );
        self.streaming = true;
        Ok(())
    }

    fn max_chunk_len(&self) -> usize {
        TONE_CHUNK_LEN
    }

    fn receive_into(&mut self, buf: &mut [Complex<f32>]) -> Result<Received, DeviceError> {
        if !self.streaming {
            return Err(DeviceError::Stream("session not started".to_string()));
        }
        let device = &mut *self.device;
        let step = TAU * device.offset.as_hz() / device.config.sample_rate.as_hz();
        let level = device.level();
        let n = buf.len().min(TONE_CHUNK_LEN);
        for slot in &mut buf[..n] {
            *slot = Complex::from_polar(level, device.phase as f32);
            device.phase = (device.phase + step).rem_euclid(TAU);
        }
        Ok(Received::samples(n))
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.streaming = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> ToneDevice {
        ToneDevice::new(DeviceConfig::default(), Hertz::khz(100.0), Decibels(0.0))
    }

    #[test]
    fn test_set_then_get() {
        let mut device = device();
        device.set_frequency(Hertz::mhz(433.92)).unwrap();
        device.set_sample_rate(Hertz::mhz(2.4)).unwrap();
        device.set_gain(GainMode::Auto).unwrap();

        assert_eq!(device.frequency(), Hertz::mhz(433.92));
        assert_eq!(device.sample_rate(), Hertz::mhz(2.4));
        assert_eq!(device.gain(), GainMode::Auto);
    }

    #[test]
    fn test_rejects_non_positive_tuning() {
        let mut device = device();
        assert!(device.set_frequency(Hertz(0.0)).is_err());
        assert!(device.set_sample_rate(Hertz(-1.0)).is_err());
        assert!(device.set_sample_rate(Hertz(f64::NAN)).is_err());
        assert_eq!(device.sample_rate(), DeviceConfig::default().sample_rate);
    }

    #[test]
    fn test_receive_requires_start() {
        let mut device = device();
        let mut session = device.open_stream(0).unwrap();
        let mut buf = vec![Complex::new(0.0, 0.0); 8];

        assert!(session.receive_into(&mut buf).is_err());
        session.start().unwrap();
        assert_eq!(session.receive_into(&mut buf).unwrap(), Received::samples(8));
        session.stop().unwrap();
    }

    #[test]
    fn test_fixed_gain_scales_tone() {
        let mut device = device();
        device.set_gain(GainMode::Fixed(20.0)).unwrap();
        let mut session = device.open_stream(0).unwrap();
        session.start().unwrap();
        let mut buf = vec![Complex::new(0.0, 0.0); 4];
        session.receive_into(&mut buf).unwrap();

        assert!(buf.iter().all(|s| (s.norm() - 10.0).abs() < 1e-4));
    }
}
