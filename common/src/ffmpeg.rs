use crate::camera::{CameraBackend, CameraDevice};
use crate::error::{CaptureError, CaptureResult};
use crate::image_frame::ImageFrame;
use crate::logger::Logger;
use std::io::{BufReader, Read};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::Arc;

const BYTES_PER_PIXEL: usize = 3;

/// Platforms with a known ffmpeg capture input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOs {
    MacOs,
    Linux,
    Windows,
}

impl CaptureOs {
    pub fn current() -> Option<Self> {
        if cfg!(target_os = "macos") {
            Some(CaptureOs::MacOs)
        } else if cfg!(target_os = "linux") {
            Some(CaptureOs::Linux)
        } else if cfg!(target_os = "windows") {
            Some(CaptureOs::Windows)
        } else {
            None
        }
    }
}

/// Builds the ffmpeg command line for the given platform: capture from
/// camera `index` at `width`x`height` and write raw RGB24 frames to stdout.
///
/// Windows DirectShow needs a device name rather than an index.
pub fn capture_args(
    os: CaptureOs,
    index: u32,
    width: u32,
    height: u32,
    dshow_device: Option<&str>,
) -> CaptureResult<Vec<String>> {
    let size = format!("{}x{}", width, height);

    let mut args: Vec<String> = match os {
        CaptureOs::MacOs => vec![
            "-f".into(),
            "avfoundation".into(),
            "-framerate".into(),
            "30".into(),
            "-video_size".into(),
            size,
            "-pixel_format".into(),
            "rgb24".into(),
            "-i".into(),
            format!("{}:none", index),
        ],
        CaptureOs::Linux => vec![
            "-f".into(),
            "v4l2".into(),
            "-framerate".into(),
            "30".into(),
            "-video_size".into(),
            size,
            "-i".into(),
            format!("/dev/video{}", index),
        ],
        CaptureOs::Windows => {
            let device = dshow_device.ok_or_else(|| CaptureError::DeviceOpen {
                index,
                reason: "ffmpeg on Windows needs a DirectShow device name (dshow_device)".into(),
            })?;
            vec![
                "-f".into(),
                "dshow".into(),
                "-framerate".into(),
                "30".into(),
                "-video_size".into(),
                size,
                "-vcodec".into(),
                "mjpeg".into(),
                "-i".into(),
                format!("video={}", device),
            ]
        }
    };

    // output opts, then latency opts, then pipe to stdout
    args.extend(
        [
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgb24",
            "-probesize",
            "32",
            "-analyzeduration",
            "0",
            "-fflags",
            "nobuffer",
            "-flags",
            "low_delay",
            "pipe:1",
        ]
        .iter()
        .map(|s| s.to_string()),
    );

    Ok(args)
}

/// Feeds frames from an `ffmpeg` child process. The capture size is fixed
/// when the process is spawned.
#[derive(Clone)]
pub struct FfmpegBackend {
    width: u32,
    height: u32,
    dshow_device: Option<String>,
    /// executable to run, `ffmpeg` from `PATH` unless overridden
    program: String,
    logger: Arc<Logger>,
}

impl FfmpegBackend {
    pub fn new(
        width: u32,
        height: u32,
        dshow_device: Option<String>,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            width,
            height,
            dshow_device,
            program: String::from("ffmpeg"),
            logger,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl CameraBackend for FfmpegBackend {
    type Device = FfmpegDevice;

    fn name(&self) -> &'static str {
        "ffmpeg"
    }

    fn open(&mut self, index: u32) -> CaptureResult<FfmpegDevice> {
        let open_err = |reason: String| CaptureError::DeviceOpen { index, reason };

        if self.width == 0 || self.height == 0 {
            return Err(open_err("dimensions must be greater than zero".into()));
        }

        match Command::new(&self.program).arg("-version").output() {
            Ok(output) => self.logger.debug(&format!(
                "ffmpeg found: {}",
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .unwrap_or_default()
            )),
            Err(e) => return Err(open_err(format!("ffmpeg not found or not accessible: {}", e))),
        }

        let os = CaptureOs::current().ok_or_else(|| open_err("current OS not supported".into()))?;
        let args = capture_args(
            os,
            index,
            self.width,
            self.height,
            self.dshow_device.as_deref(),
        )?;

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| open_err(format!("failed to spawn ffmpeg process: {}", e)))?;

        let stdout = match child.stdout.take() {
            Some(stdout) => stdout,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(open_err("failed to get ffmpeg stdout".into()));
            }
        };

        let (w, h) = (self.width as usize, self.height as usize);
        let buffer_size = w * h * BYTES_PER_PIXEL;

        Ok(FfmpegDevice {
            w,
            h,
            child: Some(child),
            frame_reader: BufReader::with_capacity(buffer_size, stdout),
            frame_buffer: vec![0u8; buffer_size],
            logger: Arc::clone(&self.logger),
        })
    }
}

pub struct FfmpegDevice {
    /// Requested image width
    w: usize,
    /// Requested image height
    h: usize,
    /// FFmpeg child process, `None` once closed
    child: Option<Child>,
    /// Reads output frames from the FFmpeg child process
    frame_reader: BufReader<ChildStdout>,
    /// Intermediate buffer between the child process and `ImageFrame` data
    frame_buffer: Vec<u8>,
    logger: Arc<Logger>,
}

impl CameraDevice for FfmpegDevice {
    fn set_resolution(&mut self, width: u32, height: u32) -> CaptureResult<()> {
        if width as usize == self.w && height as usize == self.h {
            return Ok(());
        }
        Err(CaptureError::Resolution {
            width,
            height,
            reason: format!(
                "ffmpeg capture size is fixed at {}x{} when spawned",
                self.w, self.h
            ),
        })
    }

    fn read_frame(&mut self) -> CaptureResult<ImageFrame> {
        if self.child.is_none() {
            return Err(CaptureError::NotReady);
        }

        self.frame_reader
            .read_exact(&mut self.frame_buffer)
            .map_err(|e| CaptureError::FrameRead(format!("failed to read camera frame: {}", e)))?;

        ImageFrame::from_raw(self.w, self.h, BYTES_PER_PIXEL, self.frame_buffer.clone())
    }

    fn close(&mut self) -> CaptureResult<()> {
        if let Some(mut child) = self.child.take() {
            // an already exited process is fine here
            let _ = child.kill();
            child
                .wait()
                .map_err(|e| CaptureError::DeviceClose(format!("failed to reap ffmpeg: {}", e)))?;
        }
        Ok(())
    }
}

impl Drop for FfmpegDevice {
    fn drop(&mut self) {
        // kill ffmpeg when the device is dropped without being closed
        if let Err(e) = self.close() {
            self.logger.warn(&format!("failed to stop ffmpeg: {}", e));
        }
    }
}
