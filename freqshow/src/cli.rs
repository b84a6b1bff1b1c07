use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::{Parser, ValueEnum};
use freqshow_engine::{DeviceConfig, ModelConfig, WindowPolicy};
use freqshow_messages::{Decibels, GainMode, Hertz, IntensityRange, SourceConfig};

/// Which minimum window length to acquire per spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowArg {
    /// Just enough samples for one display row.
    Display,
    /// At least `--nsamps` samples.
    Nsamps,
    /// At least `--duration` seconds of samples.
    Duration,
}

/// Live spectrum of an SDR front end, one text row per acquisition.
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// SoapySDR device arguments, e.g. "driver=rtlsdr"
    #[arg(short = 'a', long = "args", default_value = "")]
    pub device_args: String,

    /// Replay interleaved little-endian f32 IQ samples from a file
    #[arg(long, conflicts_with = "device_args")]
    pub file: Option<PathBuf>,

    /// Restart the file from the beginning at EOF
    #[arg(long = "loop", requires = "file")]
    pub loop_on_eof: bool,

    /// Offset of the built-in test tone in kHz, used without a device or file
    #[arg(long, default_value_t = 100.0)]
    pub tone_offset_khz: f64,

    /// Center frequency in Hz
    #[arg(short, long)]
    pub freq: f64,

    /// Sample rate in Hz
    #[arg(short, long, default_value_t = 1e6)]
    pub rate: f64,

    /// Gain in dB, or AUTO
    #[arg(short, long, default_value = "10")]
    pub gain: GainMode,

    /// Acquisition length in seconds for `--window duration`
    #[arg(short, long, default_value_t = 5.0)]
    pub duration: f64,

    /// Receive channels; only a single channel is supported
    #[arg(short, long, num_args = 1.., default_values_t = [0])]
    pub channels: Vec<usize>,

    /// Sample count for `--window nsamps`
    #[arg(short, long, default_value_t = 100_000)]
    pub nsamps: usize,

    #[arg(long, value_enum, default_value_t = WindowArg::Display)]
    pub window: WindowArg,

    /// Dynamic range in dB for `--fixed-range`
    #[arg(long = "dyn", default_value_t = 60.0)]
    pub dynamic_range: f32,

    /// Reference level in dB for `--fixed-range`
    #[arg(long = "ref", default_value_t = 0.0, allow_hyphen_values = true)]
    pub reference_level: f32,

    /// Pin the intensity scale to ref-dyn .. ref instead of auto-scaling
    #[arg(long)]
    pub fixed_range: bool,

    /// Frequency bins per spectrum
    #[arg(long, default_value_t = 320)]
    pub width: usize,

    /// Display rows the fixed range is quantised to
    #[arg(long, default_value_t = 240)]
    pub height: usize,

    /// Characters per printed row
    #[arg(long, default_value_t = 80)]
    pub columns: usize,

    /// Exit after this many spectra
    #[arg(long)]
    pub frames: Option<usize>,

    /// Give up on an acquisition after this many milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub timeout_ms: u64,
}

impl Cli {
    pub fn source(&self) -> SourceConfig {
        if let Some(path) = &self.file {
            SourceConfig::File {
                path: path.clone(),
                loop_on_eof: self.loop_on_eof,
            }
        } else if !self.device_args.is_empty() {
            SourceConfig::Soapy {
                args: self.device_args.clone(),
            }
        } else {
            SourceConfig::ToneGenerator {
                offset: Hertz::khz(self.tone_offset_khz),
                amplitude: Decibels(0.0),
            }
        }
    }

    pub fn model_config(&self) -> anyhow::Result<ModelConfig> {
        let channel = match self.channels.as_slice() {
            [channel] => *channel,
            [] => 0,
            many => bail!("only one channel is supported, got {many:?}"),
        };
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            bail!("duration must be a non-negative number of seconds");
        }

        let window = match self.window {
            WindowArg::Display => WindowPolicy::Display,
            WindowArg::Nsamps => WindowPolicy::SampleCount(self.nsamps),
            WindowArg::Duration => WindowPolicy::Duration(Duration::from_secs_f64(self.duration)),
        };
        let range = if self.fixed_range {
            IntensityRange::from_reference(self.reference_level, self.dynamic_range, self.height)
        } else {
            IntensityRange::default()
        };

        Ok(ModelConfig {
            display_width: self.width,
            display_height: self.height,
            device: DeviceConfig {
                center_frequency: Hertz(self.freq),
                sample_rate: Hertz(self.rate),
                gain: self.gain,
                channel,
            },
            window,
            timeout: Duration::from_millis(self.timeout_ms),
            range,
            ..ModelConfig::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freqshow_messages::IntensityBound;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("freqshow").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["-f", "100e6"]);
        let config = cli.model_config().unwrap();

        assert_eq!(config.device.center_frequency, Hertz(100e6));
        assert_eq!(config.device.sample_rate, Hertz(1e6));
        assert_eq!(config.device.gain, GainMode::Fixed(10.0));
        assert_eq!(config.device.channel, 0);
        assert_eq!(config.window, WindowPolicy::Display);
        assert_eq!(config.range.min, IntensityBound::Auto);
        assert!(matches!(cli.source(), SourceConfig::ToneGenerator { .. }));
    }

    #[test]
    fn test_freq_is_required() {
        assert!(Cli::try_parse_from(["freqshow"]).is_err());
    }

    #[test]
    fn test_auto_gain_and_fixed_range() {
        let cli = parse(&[
            "-f",
            "1e8",
            "-g",
            "AUTO",
            "--fixed-range",
            "--ref",
            "-10",
            "--height",
            "61",
        ]);
        let config = cli.model_config().unwrap();

        assert_eq!(config.device.gain, GainMode::Auto);
        assert_eq!(config.range.resolved_min, Some(-70.0));
        assert_eq!(config.range.resolved_max, Some(-10.0));
    }

    #[test]
    fn test_window_policies() {
        let cli = parse(&["-f", "1e8", "--window", "nsamps", "-n", "4096"]);
        assert_eq!(cli.model_config().unwrap().window, WindowPolicy::SampleCount(4096));

        let cli = parse(&["-f", "1e8", "--window", "duration", "-d", "0.5"]);
        assert_eq!(
            cli.model_config().unwrap().window,
            WindowPolicy::Duration(Duration::from_millis(500))
        );
    }

    #[test]
    fn test_multiple_channels_rejected() {
        let cli = parse(&["-f", "1e8", "-c", "0", "1"]);
        assert!(cli.model_config().is_err());
    }

    #[test]
    fn test_source_selection() {
        let cli = parse(&["-f", "1e8", "-a", "driver=rtlsdr"]);
        assert!(matches!(cli.source(), SourceConfig::Soapy { args } if args == "driver=rtlsdr"));

        let cli = parse(&["-f", "1e8", "--file", "capture.iq", "--loop"]);
        assert!(matches!(cli.source(), SourceConfig::File { loop_on_eof: true, .. }));
    }
}
