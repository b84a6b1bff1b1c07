use std::fmt;
use std::time::Duration;

use freqshow_messages::ParseSettingError;
use thiserror::Error;

/// Failure reported by a device or one of its streaming sessions.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("device rejected {parameter}: {message}")]
    Rejected {
        parameter: &'static str,
        message: String,
    },
    #[error("channel {channel} out of range, device has {count}")]
    InvalidChannel { channel: usize, count: usize },
    #[error("stream error: {0}")]
    Stream(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "soapysdr")]
    #[error(transparent)]
    Soapy(#[from] soapysdr::Error),
}

/// Recoverable per-chunk condition codes, after UHD's RX metadata codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorCode {
    Timeout,
    Overflow,
    LateCommand,
    BrokenChain,
    Alignment,
    BadPacket,
}

/// A chunk the device flagged as bad. The chunk contributes no samples.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamError {
    pub code: StreamErrorCode,
    pub message: String,
}

impl StreamError {
    pub fn new(code: StreamErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(
        "acquisition timed out after {elapsed:?}: received {received} of {required} samples"
    )]
    AcquisitionTimeout {
        received: usize,
        required: usize,
        elapsed: Duration,
    },
    #[error("acquisition cancelled")]
    Cancelled,
    #[error("window holds {got} samples, transform needs {needed}")]
    ShortWindow { got: usize, needed: usize },
    #[error("invalid {parameter}: {message}")]
    InvalidValue {
        parameter: &'static str,
        message: String,
    },
    #[error(transparent)]
    Parse(#[from] ParseSettingError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
