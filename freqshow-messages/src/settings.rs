use std::fmt;
use std::str::FromStr;

/// Text callers use to request automatic gain or auto-scaled intensity.
pub const AUTO: &str = "AUTO";

/// Error returned when a setting string is neither `"AUTO"` nor a number.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseSettingError {
    input: String,
}

impl fmt::Display for ParseSettingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected \"{AUTO}\" or a decibel value, got {:?}", self.input)
    }
}

impl std::error::Error for ParseSettingError {}

fn parse_db(s: &str) -> Result<Option<f32>, ParseSettingError> {
    let trimmed = s.trim();
    if trimmed.eq_ignore_ascii_case(AUTO) {
        return Ok(None);
    }
    match trimmed.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(ParseSettingError {
            input: s.to_string(),
        }),
    }
}

/// Tuner gain: automatic gain control or a fixed value in dB.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GainMode {
    #[default]
    Auto,
    Fixed(f32),
}

impl fmt::Display for GainMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str(AUTO),
            Self::Fixed(db) => write!(f, "{db:.1}"),
        }
    }
}

impl FromStr for GainMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_db(s)?.map_or(Self::Auto, Self::Fixed))
    }
}

/// One end of the display intensity scale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum IntensityBound {
    /// Follow the observed spectra.
    #[default]
    Auto,
    /// Pinned to a decibel value.
    Fixed(f32),
}

impl IntensityBound {
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }

    pub fn fixed_value(&self) -> Option<f32> {
        match self {
            Self::Auto => None,
            Self::Fixed(db) => Some(*db),
        }
    }
}

impl fmt::Display for IntensityBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str(AUTO),
            Self::Fixed(db) => write!(f, "{db:.0}"),
        }
    }
}

impl FromStr for IntensityBound {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_db(s)?.map_or(Self::Auto, Self::Fixed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_mode_parse_and_display() {
        assert_eq!("AUTO".parse::<GainMode>().unwrap(), GainMode::Auto);
        assert_eq!("auto".parse::<GainMode>().unwrap(), GainMode::Auto);
        assert_eq!(" 12.5 ".parse::<GainMode>().unwrap(), GainMode::Fixed(12.5));
        assert_eq!(GainMode::Fixed(10.0).to_string(), "10.0");
        assert_eq!(GainMode::Auto.to_string(), "AUTO");
    }

    #[test]
    fn test_intensity_bound_rounds_to_whole_db() {
        assert_eq!(IntensityBound::Fixed(-40.0).to_string(), "-40");
        assert_eq!(IntensityBound::Fixed(-39.6).to_string(), "-40");
        assert_eq!(IntensityBound::Auto.to_string(), "AUTO");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("loud".parse::<GainMode>().is_err());
        assert!("".parse::<IntensityBound>().is_err());
        assert!("NaN".parse::<IntensityBound>().is_err());
    }
}
