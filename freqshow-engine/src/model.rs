use std::time::Duration;

use freqshow_messages::{
    EngineState, GainMode, Hertz, IntensityBound, IntensityRange, SourceConfig,
};
use log::{debug, info};

use crate::device::{CancelToken, Device, DeviceConfig};
use crate::error::{DeviceError, EngineError, Result};
use crate::file::FileDevice;
use crate::range::IntensityRangeTracker;
use crate::reader::{DEFAULT_MAX_STALLED_READS, DEFAULT_TIMEOUT, SampleStreamReader};
use crate::spectrum::{DISCARDED_BINS, Spectrum, SpectrumTransformer};
use crate::tone::ToneDevice;

/// Largest window one acquisition may buffer (512 MiB of samples).
pub const MAX_WINDOW_LEN: usize = 1 << 26;

/// How many samples one acquisition gathers. The transform only ever uses
/// the leading `display_width + 2` of them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WindowPolicy {
    /// Exactly `display_width + 2` samples.
    #[default]
    Display,
    /// At least this many samples.
    SampleCount(usize),
    /// At least `ceil(duration * sample_rate)` samples.
    Duration(Duration),
}

/// Everything the model needs, injected once at construction.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub display_width: usize,
    pub display_height: usize,
    pub device: DeviceConfig,
    pub window: WindowPolicy,
    pub timeout: Duration,
    pub max_stalled_reads: u32,
    pub range: IntensityRange,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            display_width: 320,
            display_height: 240,
            device: DeviceConfig::default(),
            window: WindowPolicy::Display,
            timeout: DEFAULT_TIMEOUT,
            max_stalled_reads: DEFAULT_MAX_STALLED_READS,
            range: IntensityRange::default(),
        }
    }
}

/// Build the device described by `source`, tuned to `config`.
pub fn open_device(source: &SourceConfig, config: DeviceConfig) -> Result<Box<dyn Device>> {
    match source {
        SourceConfig::ToneGenerator { offset, amplitude } => {
            Ok(Box::new(ToneDevice::new(config, *offset, *amplitude)))
        }
        SourceConfig::File { path, loop_on_eof } => {
            let device = FileDevice::open(path, *loop_on_eof, config).map_err(|e| {
                EngineError::InvalidValue {
                    parameter: "source",
                    message: format!("cannot open {}: {e}", path.display()),
                }
            })?;
            Ok(Box::new(device))
        }
        #[cfg(feature = "soapysdr")]
        SourceConfig::Soapy { args } => {
            Ok(Box::new(crate::soapy::SoapyDevice::open(args, config)?))
        }
        #[cfg(not(feature = "soapysdr"))]
        SourceConfig::Soapy { .. } => Err(EngineError::InvalidValue {
            parameter: "source",
            message: "built without SoapySDR support".to_string(),
        }),
    }
}

/// Parameter and acquisition surface for a renderer.
///
/// Frequencies cross this boundary in MHz. Every tuning change that would
/// make the old intensity scale meaningless clears the auto-scaled bounds.
pub struct SpectrumModel {
    device: Box<dyn Device>,
    channel: usize,
    width: usize,
    height: usize,
    window: WindowPolicy,
    timeout: Duration,
    max_stalled_reads: u32,
    transformer: SpectrumTransformer,
    tracker: IntensityRangeTracker,
    cancel: CancelToken,
}

impl SpectrumModel {
    /// Wrap `device`, pushing the configured tuning to it.
    pub fn new(mut device: Box<dyn Device>, config: ModelConfig) -> Result<Self> {
        if config.display_width == 0 {
            return Err(EngineError::InvalidValue {
                parameter: "display width",
                message: "must be at least one bin".to_string(),
            });
        }
        let channels = device.channel_count();
        if config.device.channel >= channels {
            return Err(DeviceError::InvalidChannel {
                channel: config.device.channel,
                count: channels,
            }
            .into());
        }

        device.set_sample_rate(config.device.sample_rate)?;
        device.set_frequency(config.device.center_frequency)?;
        device.set_gain(config.device.gain)?;
        debug!(
            "Model ready: {} bins at {} / {}",
            config.display_width,
            device.frequency(),
            device.sample_rate()
        );

        let model = Self {
            device,
            channel: config.device.channel,
            width: config.display_width,
            height: config.display_height,
            window: config.window,
            timeout: config.timeout,
            max_stalled_reads: config.max_stalled_reads,
            transformer: SpectrumTransformer::new(config.display_width),
            tracker: IntensityRangeTracker::from_range(config.range),
            cancel: CancelToken::new(),
        };
        model.checked_window_length()?;
        Ok(model)
    }

    /// Open the device for `source` and build a model around it.
    pub fn open(source: &SourceConfig, config: ModelConfig) -> Result<Self> {
        let device = open_device(source, config.device)?;
        Self::new(device, config)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Token that aborts an in-flight acquisition from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn clear_intensity(&mut self) {
        self.tracker.clear();
    }

    /// Tuner center frequency in MHz.
    pub fn center_freq(&self) -> f64 {
        self.device.frequency().as_mhz()
    }

    pub fn set_center_freq(&mut self, freq_mhz: f64) -> Result<()> {
        self.device.set_frequency(Hertz::mhz(freq_mhz))?;
        info!("Center frequency set to {freq_mhz} MHz");
        self.clear_intensity();
        Ok(())
    }

    /// Sample rate in MHz.
    pub fn sample_rate(&self) -> f64 {
        self.device.sample_rate().as_mhz()
    }

    pub fn set_sample_rate(&mut self, rate_mhz: f64) -> Result<()> {
        self.device.set_sample_rate(Hertz::mhz(rate_mhz))?;
        info!("Sample rate set to {rate_mhz} MHz");
        self.clear_intensity();
        Ok(())
    }

    pub fn gain(&self) -> GainMode {
        self.device.gain()
    }

    /// `"AUTO"` or the gain in dB with one decimal.
    pub fn gain_string(&self) -> String {
        self.gain().to_string()
    }

    pub fn set_gain(&mut self, gain: GainMode) -> Result<()> {
        self.device.set_gain(gain)?;
        info!("Gain set to {gain}");
        self.clear_intensity();
        Ok(())
    }

    /// Accepts `"AUTO"` or a decibel value.
    pub fn set_gain_str(&mut self, gain: &str) -> Result<()> {
        self.set_gain(gain.parse()?)
    }

    pub fn min_intensity(&self) -> IntensityBound {
        self.tracker.min()
    }

    /// `"AUTO"` or the bound rounded to whole dB.
    pub fn min_string(&self) -> String {
        self.min_intensity().to_string()
    }

    pub fn set_min_intensity(&mut self, bound: IntensityBound) {
        info!("Minimum intensity set to {bound}");
        self.tracker.set_min(bound);
    }

    pub fn set_min_str(&mut self, bound: &str) -> Result<()> {
        self.set_min_intensity(bound.parse()?);
        Ok(())
    }

    pub fn max_intensity(&self) -> IntensityBound {
        self.tracker.max()
    }

    /// `"AUTO"` or the bound rounded to whole dB.
    pub fn max_string(&self) -> String {
        self.max_intensity().to_string()
    }

    pub fn set_max_intensity(&mut self, bound: IntensityBound) {
        info!("Maximum intensity set to {bound}");
        self.tracker.set_max(bound);
    }

    pub fn set_max_str(&mut self, bound: &str) -> Result<()> {
        self.set_max_intensity(bound.parse()?);
        Ok(())
    }

    pub fn range(&self) -> IntensityRange {
        self.tracker.range()
    }

    /// Samples gathered per acquisition under the current settings.
    pub fn required_length(&self) -> usize {
        let display = self.width + DISCARDED_BINS;
        let minimum = match self.window {
            WindowPolicy::Display => 0,
            WindowPolicy::SampleCount(n) => n,
            WindowPolicy::Duration(d) => {
                (d.as_secs_f64() * self.device.sample_rate().as_hz()).ceil() as usize
            }
        };
        minimum.max(display)
    }

    fn checked_window_length(&self) -> Result<usize> {
        let length = self.required_length();
        if length > MAX_WINDOW_LEN {
            return Err(EngineError::InvalidValue {
                parameter: "window length",
                message: format!("{length} samples exceeds the limit of {MAX_WINDOW_LEN}"),
            });
        }
        Ok(length)
    }

    /// Acquire one window, transform it and fold it into the intensity range.
    pub fn produce_spectrum(&mut self) -> Result<(Spectrum, IntensityRange)> {
        self.produce_spectrum_until(|| false)
    }

    /// [`produce_spectrum`](Self::produce_spectrum) that also gives up with
    /// [`EngineError::Cancelled`] once `interrupt` returns true.
    pub fn produce_spectrum_until(
        &mut self,
        mut interrupt: impl FnMut() -> bool,
    ) -> Result<(Spectrum, IntensityRange)> {
        let reader = SampleStreamReader::new(self.checked_window_length()?)
            .with_timeout(self.timeout)
            .with_max_stalled_reads(self.max_stalled_reads);
        let cancel = &self.cancel;
        let window = reader.acquire_until(self.device.as_mut(), self.channel, || {
            cancel.is_cancelled() || interrupt()
        })?;
        let spectrum = self.transformer.transform(&window)?;
        let range = self.tracker.observe(&spectrum);
        Ok((spectrum, range))
    }

    pub fn state(&self) -> EngineState {
        EngineState {
            center_frequency: self.device.frequency(),
            sample_rate: self.device.sample_rate(),
            gain: self.gain(),
            display_width: self.width,
            window_length: self.required_length(),
            range: self.range(),
        }
    }
}
