mod app;
mod ascii_converter;
mod ui;

use anyhow::Context;
use app::{App, SessionEnd};
use chrono::Local;
use clap::{ArgAction, Parser};
use common::camera::AnyBackend;
use common::config::{AppConfig, BackendKind, Overrides};
use common::error::{CaptureError, CaptureResult};
use common::logger::Logger;
use common::pipeline::{CapturePipeline, run_single_shot};
use common::settings::ImageSettings;
use common::writer::{FrameWriter, sanitize_filename, timestamped_filename};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use ui::TerminalDisplay;

/// Webcam preview with live brightness and contrast controls
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// TOML config file (defaults to ./camtune.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera index
    #[arg(short = 'i', long)]
    camera_index: Option<u32>,

    /// Camera backend: native, ffmpeg or mock
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Directory for captured images
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log file path
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            camera_index: self.camera_index,
            backend: self.backend,
            output_dir: self.output_dir.clone(),
            log_file: self.log_file.clone(),
            verbose: self.verbose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Interactive,
    SingleCapture,
}

fn parse_mode(input: &str) -> Option<Mode> {
    match input.trim() {
        "1" => Some(Mode::Interactive),
        "2" => Some(Mode::SingleCapture),
        _ => None,
    }
}

/// Print `question` and read one line. EOF yields an empty answer.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> io::Result<String> {
    write!(output, "{}", question)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            println!("✗ Unexpected error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Ctrl+C handling for the whole run. Until a camera may be open there is
/// nothing to release, so the process leaves at once with status 1;
/// afterwards the signal only raises `interrupted` for the capture code.
#[derive(Default)]
struct InterruptState {
    camera_phase: AtomicBool,
    interrupted: AtomicBool,
}

impl InterruptState {
    /// Record one Ctrl+C. Returns true when the process should exit now.
    fn signal(&self) -> bool {
        if self.camera_phase.load(Ordering::SeqCst) {
            self.interrupted.store(true, Ordering::SeqCst);
            false
        } else {
            true
        }
    }

    fn enter_camera_phase(&self) {
        self.camera_phase.store(true, Ordering::SeqCst);
    }

    fn interrupted(&self) -> &AtomicBool {
        &self.interrupted
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply(&args.overrides());

    let logger = Arc::new(
        Logger::with_config(config.log.clone())
            .with_context(|| format!("opening log file {}", config.log.log_file.display()))?,
    );

    let interrupts = Arc::new(InterruptState::default());
    {
        let interrupts = Arc::clone(&interrupts);
        let logger = Arc::clone(&logger);
        ctrlc::set_handler(move || {
            if interrupts.signal() {
                logger.warn("interrupted by user before the camera was opened");
                println!("\n✗ Interrupted by user");
                std::process::exit(1);
            }
        })
        .context("installing Ctrl+C handler")?;
    }

    println!("=== Webcam brightness/contrast ===");
    println!("1. Interactive preview");
    println!("2. Single capture");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut stdout = io::stdout();

    let answer = prompt(&mut input, &mut stdout, "Select mode (1/2): ")?;
    let Some(mode) = parse_mode(&answer) else {
        println!("✗ Invalid option: {:?}", answer);
        return Ok(ExitCode::FAILURE);
    };

    let filename = match mode {
        Mode::Interactive => None,
        Mode::SingleCapture => {
            let answer = prompt(
                &mut input,
                &mut stdout,
                "File name (leave blank for a timestamped name): ",
            )?;
            Some(
                sanitize_filename(&answer, &config.output.extension).unwrap_or_else(|| {
                    timestamped_filename(&config.output.prefix, &config.output.extension, Local::now())
                }),
            )
        }
    };
    drop(input);

    interrupts.enter_camera_phase();

    let writer = FrameWriter::new(&config.output, Arc::clone(&logger));
    let mut pipeline = CapturePipeline::new(
        AnyBackend::from_config(&config.camera, Arc::clone(&logger)),
        config.camera.clone(),
        Arc::clone(&logger),
    );
    let interrupted = interrupts.interrupted();

    match filename {
        None => {
            let mut app = App::new(&config, Arc::clone(&logger));
            let result = {
                let mut display = TerminalDisplay::new(&config.preview, Arc::clone(&logger))
                    .context("setting up the terminal")?;
                app.run(&mut pipeline, &mut display, &writer, interrupted)
            };
            Ok(report_session(result, app.saved(), &logger))
        }
        Some(filename) => {
            let settings = config.adjust.settings();
            println!("Capturing image...");
            let result = run_single_shot(&mut pipeline, &settings, &writer, &filename, interrupted);
            Ok(report_single(result, &settings, &logger))
        }
    }
}

/// Print how the preview ended and map it to the process exit code
fn report_session(result: anyhow::Result<SessionEnd>, saved: u32, logger: &Logger) -> ExitCode {
    match result {
        Ok(SessionEnd::Quit) => {
            println!("✓ Session ended, {} image(s) saved", saved);
            ExitCode::SUCCESS
        }
        Ok(SessionEnd::Interrupted) => {
            logger.warn("interactive session interrupted by user");
            println!("✗ Interrupted by user, {} image(s) saved", saved);
            ExitCode::FAILURE
        }
        Err(e) => {
            println!("✗ Preview failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Print the outcome of a single capture and map it to the process exit code
fn report_single(result: CaptureResult<PathBuf>, settings: &ImageSettings, logger: &Logger) -> ExitCode {
    match result {
        Ok(path) => {
            println!("✓ Image captured: {}", path.display());
            println!("✓ Brightness applied: {}", settings.brightness());
            println!("✓ Contrast applied: {}", settings.contrast());
            ExitCode::SUCCESS
        }
        Err(CaptureError::Interrupted) => {
            logger.warn("single capture interrupted by user");
            println!("\n✗ Interrupted by user");
            ExitCode::FAILURE
        }
        Err(e) => {
            logger.error(&format!("single capture failed: {}", e));
            println!("✗ Failed to capture image: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Display, PreviewView};
    use common::config::{OutputConfig, VideoConfig};
    use common::logger::{LogLevel, LoggerConfig};
    use common::mock_frame_generator::{MockBackend, PatternType};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::time::Duration;

    /// Presses `key` on the first poll
    struct OneKey(KeyCode, KeyModifiers);

    impl Display for OneKey {
        fn show(&mut self, _view: &PreviewView<'_>) -> io::Result<()> {
            Ok(())
        }

        fn poll_key(&mut self, _timeout: Duration) -> io::Result<Option<KeyEvent>> {
            Ok(Some(KeyEvent::new(self.0, self.1)))
        }
    }

    struct Setup {
        _dir: tempfile::TempDir,
        config: AppConfig,
        logger: Arc<Logger>,
        writer: FrameWriter,
    }

    fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            Logger::with_config(LoggerConfig {
                log_file: dir.path().join("test.log"),
                min_level: LogLevel::Debug,
            })
            .unwrap(),
        );
        let config = AppConfig {
            camera: VideoConfig {
                camera_width: 8,
                camera_height: 6,
                ..Default::default()
            },
            output: OutputConfig {
                dir: dir.path().join("output"),
                extension: "png".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let writer = FrameWriter::new(&config.output, Arc::clone(&logger));
        Setup {
            _dir: dir,
            config,
            logger,
            writer,
        }
    }

    fn session_exit_code(s: &Setup, backend: MockBackend, mut display: OneKey) -> ExitCode {
        let mut pipeline =
            CapturePipeline::new(backend, s.config.camera.clone(), Arc::clone(&s.logger));
        let mut app = App::new(&s.config, Arc::clone(&s.logger));
        let result = app.run(&mut pipeline, &mut display, &s.writer, &AtomicBool::new(false));
        report_session(result, app.saved(), &s.logger)
    }

    fn single_exit_code(s: &Setup, backend: MockBackend, interrupted: bool) -> ExitCode {
        let mut pipeline =
            CapturePipeline::new(backend, s.config.camera.clone(), Arc::clone(&s.logger));
        let settings = s.config.adjust.settings();
        let result = run_single_shot(
            &mut pipeline,
            &settings,
            &s.writer,
            "shot.png",
            &AtomicBool::new(interrupted),
        );
        report_single(result, &settings, &s.logger)
    }

    #[test]
    fn quitting_the_preview_exits_zero() {
        let s = setup();
        let backend = MockBackend::new(8, 6, PatternType::Gradient);
        let code = session_exit_code(&s, backend, OneKey(KeyCode::Char('q'), KeyModifiers::NONE));
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn ctrl_c_in_the_preview_exits_one() {
        let s = setup();
        let backend = MockBackend::new(8, 6, PatternType::Gradient);
        let code = session_exit_code(&s, backend, OneKey(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn preview_without_camera_exits_one() {
        let s = setup();
        let backend = MockBackend::new(8, 6, PatternType::Gradient).with_missing_device(0);
        let code = session_exit_code(&s, backend, OneKey(KeyCode::Char('q'), KeyModifiers::NONE));
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn single_capture_exit_codes() {
        let s = setup();
        let ok = MockBackend::new(8, 6, PatternType::Gradient);
        assert_eq!(single_exit_code(&s, ok.clone(), false), ExitCode::SUCCESS);
        assert_eq!(single_exit_code(&s, ok, true), ExitCode::FAILURE);

        let failing = MockBackend::new(8, 6, PatternType::Gradient).with_failing_reads(1);
        assert_eq!(single_exit_code(&s, failing, false), ExitCode::FAILURE);
    }

    #[test]
    fn ctrl_c_before_camera_exits_immediately() {
        let interrupts = InterruptState::default();
        assert!(interrupts.signal());
        assert!(!interrupts.interrupted().load(Ordering::SeqCst));
    }

    #[test]
    fn ctrl_c_with_camera_only_raises_the_flag() {
        let interrupts = InterruptState::default();
        interrupts.enter_camera_phase();
        assert!(!interrupts.signal());
        assert!(interrupts.interrupted().load(Ordering::SeqCst));
    }

    #[test]
    fn mode_choices() {
        assert_eq!(parse_mode("1"), Some(Mode::Interactive));
        assert_eq!(parse_mode(" 2\n"), Some(Mode::SingleCapture));
        assert_eq!(parse_mode("3"), None);
        assert_eq!(parse_mode(""), None);
    }

    #[test]
    fn prompt_writes_question_and_trims_answer() {
        let mut input = io::Cursor::new(b"  selfie \nrest\n".to_vec());
        let mut output = Vec::new();

        let answer = prompt(&mut input, &mut output, "Name: ").unwrap();
        assert_eq!(answer, "selfie");
        assert_eq!(output, b"Name: ");
    }

    #[test]
    fn prompt_at_eof_is_blank() {
        let mut input = io::Cursor::new(Vec::new());
        let mut output = Vec::new();
        assert_eq!(prompt(&mut input, &mut output, "? ").unwrap(), "");
    }

    #[test]
    fn args_become_overrides() {
        let args = Args::parse_from(["camtune-client", "-i", "2", "--backend", "mock", "-v"]);
        let overrides = args.overrides();

        assert_eq!(overrides.camera_index, Some(2));
        assert_eq!(overrides.backend, Some(BackendKind::Mock));
        assert!(overrides.verbose);
        assert!(overrides.output_dir.is_none());
    }
}
