use anyhow::Context;
use chrono::Local;
use clap::{ArgAction, Parser};
use common::camera::AnyBackend;
use common::config::{AppConfig, BackendKind, Overrides};
use common::error::{CaptureError, CaptureResult};
use common::logger::Logger;
use common::pipeline::{CapturePipeline, run_single_shot};
use common::settings::ImageSettings;
use common::writer::{FrameWriter, timestamped_filename};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Capture one webcam frame, apply brightness/contrast and save it.
///
/// With no arguments the default camera is used and the image lands in
/// `output/capture_<timestamp>.jpg`.
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

    println!("=== Webcam single capture ===");

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            println!("✗ Unexpected error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<ExitCode> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    config.apply(&args.overrides());

    let logger = Arc::new(
        Logger::with_config(config.log.clone())
            .with_context(|| format!("opening log file {}", config.log.log_file.display()))?,
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::Relaxed))
            .context("installing Ctrl+C handler")?;
    }

    let settings = config.adjust.settings();
    let writer = FrameWriter::new(&config.output, Arc::clone(&logger));
    let filename = timestamped_filename(&config.output.prefix, &config.output.extension, Local::now());

    println!("Initializing camera...");
    let mut pipeline = CapturePipeline::new(
        AnyBackend::from_config(&config.camera, Arc::clone(&logger)),
        config.camera.clone(),
        Arc::clone(&logger),
    );

    println!("Capturing image...");
    let result = run_single_shot(&mut pipeline, &settings, &writer, &filename, &interrupted);
    Ok(report(result, &settings, &logger))
}

/// Print the outcome of a capture and map it to the process exit code
fn report(result: CaptureResult<PathBuf>, settings: &ImageSettings, logger: &Logger) -> ExitCode {
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
    use common::config::{OutputConfig, VideoConfig};
    use common::logger::{LogLevel, LoggerConfig};
    use common::mock_frame_generator::{MockBackend, PatternType};

    fn capture_with(backend: MockBackend, interrupted: bool) -> (tempfile::TempDir, ExitCode) {
        let dir = tempfile::tempdir().unwrap();
        let logger = Arc::new(
            Logger::with_config(LoggerConfig {
                log_file: dir.path().join("test.log"),
                min_level: LogLevel::Debug,
            })
            .unwrap(),
        );
        let writer = FrameWriter::new(
            &OutputConfig {
                dir: dir.path().join("output"),
                ..Default::default()
            },
            Arc::clone(&logger),
        );
        let video = VideoConfig {
            camera_width: 8,
            camera_height: 6,
            ..Default::default()
        };
        let mut pipeline = CapturePipeline::new(backend, video, Arc::clone(&logger));
        let settings = ImageSettings::default();

        let result = run_single_shot(
            &mut pipeline,
            &settings,
            &writer,
            "shot.png",
            &AtomicBool::new(interrupted),
        );
        let code = report(result, &settings, &logger);
        (dir, code)
    }

    #[test]
    fn successful_capture_exits_zero() {
        let (dir, code) = capture_with(MockBackend::new(8, 6, PatternType::Gradient), false);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(dir.path().join("output").join("shot.png").exists());
    }

    #[test]
    fn missing_camera_exits_one() {
        let backend = MockBackend::new(8, 6, PatternType::Gradient).with_missing_device(0);
        let (_dir, code) = capture_with(backend, false);
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn interrupt_exits_one() {
        let (_dir, code) = capture_with(MockBackend::new(8, 6, PatternType::Gradient), true);
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[test]
    fn no_arguments_are_required() {
        let args = Args::parse_from(["camtune"]);
        assert!(args.config.is_none());
        assert!(!args.overrides().verbose);
    }
}
