use crate::config::OutputConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::image_frame::ImageFrame;
use crate::logger::Logger;
use chrono::{DateTime, Local};
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `<prefix>_YYYYMMDD_HHMMSS.<extension>`
pub fn timestamped_filename(prefix: &str, extension: &str, now: DateTime<Local>) -> String {
    format!("{}_{}.{}", prefix, now.format("%Y%m%d_%H%M%S"), extension)
}

/// Turn user input into a bare file name inside the output directory.
///
/// Directory components are dropped and `extension` is appended when the
/// name has none. Returns `None` for blank input.
pub fn sanitize_filename(input: &str, extension: &str) -> Option<String> {
    let trimmed = input.trim();
    let name = Path::new(trimmed).file_name()?.to_str()?.trim();
    if name.is_empty() {
        return None;
    }

    if Path::new(name).extension().is_some() {
        Some(name.to_string())
    } else {
        Some(format!("{}.{}", name, extension))
    }
}

/// Names for frames saved during one interactive session:
/// `<prefix>_<session timestamp>_<counter>.<extension>`, counting from 1.
pub struct SaveCounter {
    stem: String,
    extension: String,
    next: u32,
}

impl SaveCounter {
    pub fn new(prefix: &str, extension: &str, session_start: DateTime<Local>) -> Self {
        Self {
            stem: format!("{}_{}", prefix, session_start.format("%Y%m%d_%H%M%S")),
            extension: extension.to_string(),
            next: 1,
        }
    }

    /// Name the next save would use
    pub fn peek(&self) -> String {
        format!("{}_{:03}.{}", self.stem, self.next, self.extension)
    }

    /// Advance after a successful save
    pub fn advance(&mut self) {
        self.next += 1;
    }

    /// Number of saves recorded so far
    pub fn saved(&self) -> u32 {
        self.next - 1
    }
}

/// Encodes frames and writes them under the output directory. The encoder
/// is picked from the file extension.
pub struct FrameWriter {
    output_dir: PathBuf,
    logger: Arc<Logger>,
}

impl FrameWriter {
    pub fn new(config: &OutputConfig, logger: Arc<Logger>) -> Self {
        Self {
            output_dir: config.dir.clone(),
            logger,
        }
    }

    /// Write `frame` to `<output_dir>/<filename>`, creating the directory
    /// if needed. Returns the full path written.
    pub fn save(&self, frame: &ImageFrame, filename: &str) -> CaptureResult<PathBuf> {
        let full_path = self.output_dir.join(filename);

        let result = self.encode_and_write(frame, &full_path);
        match &result {
            Ok(()) => self
                .logger
                .info(&format!("image saved: {}", full_path.display())),
            Err(e) => self.logger.error(&e.to_string()),
        }

        result.map(|_| full_path)
    }

    fn encode_and_write(&self, frame: &ImageFrame, path: &Path) -> CaptureResult<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| CaptureError::write(path, e))?;

        let image = to_dynamic_image(frame).ok_or_else(|| {
            CaptureError::write(path, "frame buffer does not match its dimensions")
        })?;

        image.save(path).map_err(|e| CaptureError::write(path, e))
    }
}

fn to_dynamic_image(frame: &ImageFrame) -> Option<DynamicImage> {
    let (w, h) = (frame.width() as u32, frame.height() as u32);
    let data = frame.buffer().to_vec();

    match frame.bytes_per_pixel() {
        1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{LogLevel, LoggerConfig};
    use chrono::TimeZone;

    fn writer_in(dir: &Path) -> FrameWriter {
        let logger = Logger::with_config(LoggerConfig {
            log_file: dir.join("test.log"),
            min_level: LogLevel::Debug,
        })
        .unwrap();
        let config = OutputConfig {
            dir: dir.join("output"),
            ..Default::default()
        };
        FrameWriter::new(&config, Arc::new(logger))
    }

    fn frame() -> ImageFrame {
        let data: Vec<u8> = (0..4 * 3 * 3).map(|i| (i * 7) as u8).collect();
        ImageFrame::from_raw(4, 3, 3, data).unwrap()
    }

    #[test]
    fn creates_output_directory_and_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let path = writer.save(&frame(), "shot.png").unwrap();
        assert_eq!(path, dir.path().join("output").join("shot.png"));

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (4, 3));
        assert_eq!(decoded.into_raw(), frame().into_raw());
    }

    #[test]
    fn writes_jpeg_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let path = writer.save(&frame(), "shot.jpg").unwrap();
        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn unknown_extension_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        let err = writer.save(&frame(), "shot.nope").unwrap_err();
        assert!(matches!(err, CaptureError::Write { .. }));
    }

    #[test]
    fn unwritable_directory_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the output directory should go
        fs::write(dir.path().join("output"), b"").unwrap();
        let writer = writer_in(dir.path());

        assert!(matches!(
            writer.save(&frame(), "shot.png"),
            Err(CaptureError::Write { .. })
        ));
    }

    #[test]
    fn timestamped_names_differ_across_clock_times() {
        let t1 = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let t2 = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 54).unwrap();

        let a = timestamped_filename("capture", "jpg", t1);
        let b = timestamped_filename("capture", "jpg", t2);

        assert_eq!(a, "capture_20250314_092653.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn sanitize_strips_directories_and_adds_extension() {
        assert_eq!(sanitize_filename("  ", "jpg"), None);
        assert_eq!(sanitize_filename("me", "jpg").as_deref(), Some("me.jpg"));
        assert_eq!(sanitize_filename("me.png", "jpg").as_deref(), Some("me.png"));
        assert_eq!(
            sanitize_filename("../../etc/me", "jpg").as_deref(),
            Some("me.jpg")
        );
    }

    #[test]
    fn save_counter_increases_monotonically() {
        let start = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut counter = SaveCounter::new("capture", "png", start);

        assert_eq!(counter.peek(), "capture_20250102_030405_001.png");
        assert_eq!(counter.saved(), 0);
        counter.advance();
        counter.advance();
        assert_eq!(counter.peek(), "capture_20250102_030405_003.png");
        assert_eq!(counter.saved(), 2);
    }
}
