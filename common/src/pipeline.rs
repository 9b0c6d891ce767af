use crate::adjust::adjust_frame;
use crate::camera::{CameraBackend, CameraDevice};
use crate::config::VideoConfig;
use crate::error::{CaptureError, CaptureResult};
use crate::image_frame::ImageFrame;
use crate::logger::Logger;
use crate::settings::ImageSettings;
use crate::writer::FrameWriter;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observable lifecycle of the pipeline's camera device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Ready,
    Released,
}

/// The device handle lives inside the state it belongs to, so there is no
/// way to read from a camera that is not open.
enum DeviceState<D> {
    Uninitialized,
    Ready(D),
    Released,
}

/// Owns one camera device from open to release.
///
/// `release` is called by `Drop` if the owner has not done so, which keeps
/// the device from leaking on early returns and unwinding.
pub struct CapturePipeline<B: CameraBackend> {
    backend: B,
    video: VideoConfig,
    logger: Arc<Logger>,
    device: DeviceState<B::Device>,
}

impl<B: CameraBackend> CapturePipeline<B> {
    pub fn new(backend: B, video: VideoConfig, logger: Arc<Logger>) -> Self {
        Self {
            backend,
            video,
            logger,
            device: DeviceState::Uninitialized,
        }
    }

    pub fn state(&self) -> PipelineState {
        match self.device {
            DeviceState::Uninitialized => PipelineState::Uninitialized,
            DeviceState::Ready(_) => PipelineState::Ready,
            DeviceState::Released => PipelineState::Released,
        }
    }

    /// Open the configured camera and request the configured resolution.
    ///
    /// On failure the state is left as it was. Calling this while already
    /// `Ready` is a no-op.
    pub fn initialize(&mut self) -> CaptureResult<()> {
        if let DeviceState::Ready(_) = self.device {
            return Ok(());
        }

        let index = self.video.camera_index;
        let mut device = match self.backend.open(index) {
            Ok(device) => device,
            Err(e) => {
                self.logger.error(&format!("camera initialization failed: {}", e));
                return Err(e);
            }
        };

        let (w, h) = (self.video.camera_width, self.video.camera_height);
        if let Err(e) = device.set_resolution(w, h) {
            self.logger
                .warn(&format!("{}, keeping the device default", e));
        }

        self.logger.info(&format!(
            "camera {} initialized ({} backend)",
            index,
            self.backend.name()
        ));
        self.device = DeviceState::Ready(device);
        Ok(())
    }

    /// Read one frame. A failed read leaves the device open for the next try.
    pub fn capture(&mut self) -> CaptureResult<ImageFrame> {
        match &mut self.device {
            DeviceState::Ready(device) => device.read_frame().inspect_err(|e| {
                self.logger.warn(&format!("could not capture frame: {}", e));
            }),
            _ => {
                self.logger.warn("camera not initialized");
                Err(CaptureError::NotReady)
            }
        }
    }

    /// Close the device if one is open and move to `Released`.
    /// Safe to call more than once; the device is closed exactly once.
    pub fn release(&mut self) {
        let previous = std::mem::replace(&mut self.device, DeviceState::Released);
        if let DeviceState::Ready(mut device) = previous {
            match device.close() {
                Ok(()) => self.logger.info("camera released"),
                Err(e) => self
                    .logger
                    .warn(&format!("camera release reported an error: {}", e)),
            }
        }
    }
}

impl<B: CameraBackend> Drop for CapturePipeline<B> {
    fn drop(&mut self) {
        self.release();
    }
}

fn check_interrupt(interrupted: &AtomicBool) -> CaptureResult<()> {
    if interrupted.load(Ordering::Relaxed) {
        return Err(CaptureError::Interrupted);
    }
    Ok(())
}

/// Initialize, capture one frame, adjust it, write it, release.
///
/// Once initialization succeeded the device is released whatever happens
/// afterwards. Returns the path of the written file.
pub fn run_single_shot<B: CameraBackend>(
    pipeline: &mut CapturePipeline<B>,
    settings: &ImageSettings,
    writer: &FrameWriter,
    filename: &str,
    interrupted: &AtomicBool,
) -> CaptureResult<PathBuf> {
    check_interrupt(interrupted)?;
    pipeline.initialize()?;

    let result = capture_adjust_save(pipeline, settings, writer, filename, interrupted);
    pipeline.release();

    result
}

fn capture_adjust_save<B: CameraBackend>(
    pipeline: &mut CapturePipeline<B>,
    settings: &ImageSettings,
    writer: &FrameWriter,
    filename: &str,
    interrupted: &AtomicBool,
) -> CaptureResult<PathBuf> {
    let frame = pipeline.capture()?;
    check_interrupt(interrupted)?;

    let adjusted = adjust_frame(&frame, settings);
    check_interrupt(interrupted)?;

    writer.save(&adjusted, filename)
}
