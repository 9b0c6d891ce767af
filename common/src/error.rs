use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by the capture pipeline and its collaborators.
///
/// None of these are fatal to the process: callers either retry
/// (interactive mode) or abort the run after releasing the device.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("failed to open camera {index}: {reason}")]
    DeviceOpen { index: u32, reason: String },

    #[error("failed to read frame: {0}")]
    FrameRead(String),

    #[error("failed to release camera: {0}")]
    DeviceClose(String),

    #[error("failed to write {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("could not set resolution {width}x{height}: {reason}")]
    Resolution {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("camera is not initialized")]
    NotReady,

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("interrupted")]
    Interrupted,
}

impl CaptureError {
    pub fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        CaptureError::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type CaptureResult<T> = std::result::Result<T, CaptureError>;

/// Failures while loading the TOML configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
