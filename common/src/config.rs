use crate::error::ConfigError;
use crate::logger::{LogLevel, LoggerConfig};
use crate::settings::{DEFAULT_BRIGHTNESS, DEFAULT_CONTRAST, ImageSettings};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "camtune.toml";

/// Which camera collaborator feeds frames to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OS camera API through nokhwa
    #[default]
    Native,
    /// raw RGB24 frames piped from an ffmpeg child process
    Ffmpeg,
    /// synthetic test pattern, no hardware needed
    Mock,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BackendKind::Native => write!(f, "native"),
            BackendKind::Ffmpeg => write!(f, "ffmpeg"),
            BackendKind::Mock => write!(f, "mock"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "native" => Ok(BackendKind::Native),
            "ffmpeg" => Ok(BackendKind::Ffmpeg),
            "mock" => Ok(BackendKind::Mock),
            other => Err(format!(
                "unknown backend '{}' (expected native, ffmpeg or mock)",
                other
            )),
        }
    }
}

/// Camera device selection and requested capture size
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub camera_index: u32,
    pub camera_width: u32,
    pub camera_height: u32,
    pub backend: BackendKind,
    /// DirectShow device name, only used by the ffmpeg backend on Windows
    pub dshow_device: Option<String>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            camera_index: 0,
            camera_width: 640,
            camera_height: 480,
            backend: BackendKind::default(),
            dshow_device: None,
        }
    }
}

/// Initial adjustment values and the step used by each key press
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdjustConfig {
    pub brightness: f64,
    pub contrast: f64,
    pub brightness_step: f64,
    pub contrast_step: f64,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
            brightness_step: 5.0,
            contrast_step: 0.1,
        }
    }
}

impl AdjustConfig {
    /// Starting settings, clamped into their valid ranges
    pub fn settings(&self) -> ImageSettings {
        ImageSettings::new(self.brightness, self.contrast)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// file extension, also selects the encoder
    pub extension: String,
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            extension: "jpg".to_string(),
            prefix: "capture".to_string(),
        }
    }
}

/// Interactive preview loop tuning
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub ascii_width: usize,
    pub ascii_height: usize,
    /// how long to wait for a key each iteration
    pub poll_ms: u64,
    /// pause after a failed frame read
    pub retry_delay_ms: u64,
    /// consecutive failed reads before the loop gives up
    pub max_read_failures: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            ascii_width: 60,
            ascii_height: 22,
            poll_ms: 30,
            retry_delay_ms: 50,
            max_read_failures: 100,
        }
    }
}

impl PreviewConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Everything a run needs, passed explicitly to each component
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: VideoConfig,
    pub adjust: AdjustConfig,
    pub output: OutputConfig,
    pub preview: PreviewConfig,
    pub log: LoggerConfig,
}

/// Values given on the command line; `None` keeps the file/default value
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub camera_index: Option<u32>,
    pub backend: Option<BackendKind>,
    pub output_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub verbose: bool,
}

impl AppConfig {
    pub fn from_toml_str(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from `path`, or from `camtune.toml` in the working
    /// directory if it exists, or fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;

        Self::from_toml_str(&path, &contents)
    }

    pub fn apply(&mut self, overrides: &Overrides) {
        if let Some(index) = overrides.camera_index {
            self.camera.camera_index = index;
        }
        if let Some(backend) = overrides.backend {
            self.camera.backend = backend;
        }
        if let Some(dir) = &overrides.output_dir {
            self.output.dir = dir.clone();
        }
        if let Some(file) = &overrides.log_file {
            self.log.log_file = file.clone();
        }
        if overrides.verbose && self.log.min_level > LogLevel::Debug {
            self.log.min_level = LogLevel::Debug;
        }
    }
}
