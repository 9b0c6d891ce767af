use anyhow::Context;
use chrono::Local;
use common::adjust::adjust_frame;
use common::camera::CameraBackend;
use common::config::{AdjustConfig, AppConfig, PreviewConfig};
use common::error::CaptureError;
use common::image_frame::ImageFrame;
use common::logger::Logger;
use common::pipeline::CapturePipeline;
use common::settings::ImageSettings;
use common::writer::{FrameWriter, SaveCounter};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

// Actions the user can take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Quit,
    Interrupt,
    Save,
    BrightnessUp,
    BrightnessDown,
    ContrastUp,
    ContrastDown,
}

/// Key bindings of the preview window
pub fn action_for_key(key: KeyEvent) -> Option<UserAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(UserAction::Interrupt),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(UserAction::Quit),
        KeyCode::Char('c') | KeyCode::Char(' ') => Some(UserAction::Save),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => Some(UserAction::BrightnessUp),
        KeyCode::Char('-') | KeyCode::Down => Some(UserAction::BrightnessDown),
        KeyCode::Char(']') | KeyCode::Right => Some(UserAction::ContrastUp),
        KeyCode::Char('[') | KeyCode::Left => Some(UserAction::ContrastDown),
        _ => None,
    }
}

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    Interrupted,
}

/// One redraw worth of state
pub struct PreviewView<'a> {
    pub raw: Option<&'a ImageFrame>,
    pub adjusted: Option<&'a ImageFrame>,
    pub settings: ImageSettings,
    pub saved: u32,
    pub message: &'a str,
}

/// Where the preview is drawn and keys come from
pub trait Display {
    fn show(&mut self, view: &PreviewView<'_>) -> io::Result<()>;

    /// Wait up to `timeout` for a key press
    fn poll_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>>;
}

// Main app state
pub struct App {
    settings: ImageSettings,
    brightness_step: f64,
    contrast_step: f64,
    preview: PreviewConfig,
    counter: SaveCounter,
    last_frame: Option<ImageFrame>,
    message: String,
    read_failures: u32,
    logger: Arc<Logger>,
}

impl App {
    pub fn new(config: &AppConfig, logger: Arc<Logger>) -> App {
        let AdjustConfig {
            brightness_step,
            contrast_step,
            ..
        } = config.adjust;

        App {
            settings: config.adjust.settings(),
            brightness_step,
            contrast_step,
            preview: config.preview.clone(),
            counter: SaveCounter::new(&config.output.prefix, &config.output.extension, Local::now()),
            last_frame: None,
            message: String::from("Ready"),
            read_failures: 0,
            logger,
        }
    }

    pub fn settings(&self) -> ImageSettings {
        self.settings
    }

    pub fn saved(&self) -> u32 {
        self.counter.saved()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Open the camera, run the preview until the user leaves, then release
    /// the camera whatever the outcome.
    pub fn run<B: CameraBackend, D: Display>(
        &mut self,
        pipeline: &mut CapturePipeline<B>,
        display: &mut D,
        writer: &FrameWriter,
        interrupted: &AtomicBool,
    ) -> anyhow::Result<SessionEnd> {
        pipeline.initialize()?;
        self.logger.info("interactive session started");

        let result = self.preview_loop(pipeline, display, writer, interrupted);
        pipeline.release();

        match &result {
            Ok(end) => self.logger.info(&format!(
                "interactive session ended ({:?}), {} image(s) saved",
                end,
                self.counter.saved()
            )),
            Err(e) => self
                .logger
                .error(&format!("interactive session aborted: {:#}", e)),
        }
        result
    }

    fn preview_loop<B: CameraBackend, D: Display>(
        &mut self,
        pipeline: &mut CapturePipeline<B>,
        display: &mut D,
        writer: &FrameWriter,
        interrupted: &AtomicBool,
    ) -> anyhow::Result<SessionEnd> {
        loop {
            if interrupted.load(Ordering::Relaxed) {
                return Ok(SessionEnd::Interrupted);
            }

            match pipeline.capture() {
                Ok(frame) => {
                    if self.read_failures > 0 {
                        self.message = String::from("Camera feed restored");
                        self.read_failures = 0;
                    }
                    let adjusted = adjust_frame(&frame, &self.settings);
                    display
                        .show(&PreviewView {
                            raw: Some(&frame),
                            adjusted: Some(&adjusted),
                            settings: self.settings,
                            saved: self.counter.saved(),
                            message: &self.message,
                        })
                        .context("drawing preview")?;
                    self.last_frame = Some(frame);
                }
                Err(e) => {
                    self.read_failures += 1;
                    if self.read_failures >= self.preview.max_read_failures {
                        return Err(anyhow::Error::new(e).context(format!(
                            "{} consecutive frame reads failed",
                            self.read_failures
                        )));
                    }

                    self.message = format!("Frame read failed, retrying ({})", self.read_failures);
                    display
                        .show(&PreviewView {
                            raw: None,
                            adjusted: None,
                            settings: self.settings,
                            saved: self.counter.saved(),
                            message: &self.message,
                        })
                        .context("drawing preview")?;
                    std::thread::sleep(self.preview.retry_delay());
                }
            }

            let key = display
                .poll_key(self.preview.poll_timeout())
                .context("reading keyboard input")?;
            if let Some(action) = key.and_then(action_for_key) {
                if let Some(end) = self.handle_action(action, writer) {
                    return Ok(end);
                }
            }
        }
    }

    /// Apply one user action. Returns `Some` when the session should end.
    pub fn handle_action(&mut self, action: UserAction, writer: &FrameWriter) -> Option<SessionEnd> {
        match action {
            UserAction::Quit => return Some(SessionEnd::Quit),
            UserAction::Interrupt => return Some(SessionEnd::Interrupted),
            UserAction::Save => self.save_current(writer),
            UserAction::BrightnessUp => self.settings.increase_brightness(self.brightness_step),
            UserAction::BrightnessDown => self.settings.decrease_brightness(self.brightness_step),
            UserAction::ContrastUp => self.settings.increase_contrast(self.contrast_step),
            UserAction::ContrastDown => self.settings.decrease_contrast(self.contrast_step),
        }

        if action != UserAction::Save {
            self.message = format!(
                "Brightness {:.0}, contrast {:.1}",
                self.settings.brightness(),
                self.settings.contrast()
            );
            self.logger.debug(&self.message);
        }
        None
    }

    /// Save the latest frame with the current settings applied
    fn save_current(&mut self, writer: &FrameWriter) {
        let Some(frame) = &self.last_frame else {
            self.message = String::from("No frame to save yet");
            return;
        };

        let adjusted = adjust_frame(frame, &self.settings);
        match writer.save(&adjusted, &self.counter.peek()) {
            Ok(path) => {
                self.counter.advance();
                self.message = format!("Saved {}", path.display());
            }
            // already logged by the writer
            Err(CaptureError::Write { path, .. }) => {
                self.message = format!("Could not save {}", path.display());
            }
            Err(e) => self.message = format!("Could not save: {}", e),
        }
    }
}
