use crate::config::{BackendKind, VideoConfig};
use crate::error::{CaptureError, CaptureResult};
use crate::ffmpeg::{FfmpegBackend, FfmpegDevice};
use crate::image_frame::ImageFrame;
use crate::logger::Logger;
use crate::mock_frame_generator::{MockBackend, MockDevice, PatternType};
use nokhwa::Camera;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use std::sync::Arc;

/// Opens camera devices. One backend can open several devices over its
/// lifetime, but a device is only ever read by the pipeline that opened it.
pub trait CameraBackend {
    type Device: CameraDevice;

    fn name(&self) -> &'static str;

    fn open(&mut self, index: u32) -> CaptureResult<Self::Device>;
}

/// An open camera handle
pub trait CameraDevice {
    /// Best-effort; callers treat failure as a warning.
    fn set_resolution(&mut self, width: u32, height: u32) -> CaptureResult<()>;

    /// Block until the next frame is available.
    fn read_frame(&mut self) -> CaptureResult<ImageFrame>;

    /// Stop streaming and give the device back to the OS.
    fn close(&mut self) -> CaptureResult<()>;
}

/// Camera access through the OS camera API (V4L2, AVFoundation, Media
/// Foundation) via nokhwa
#[derive(Debug, Default, Clone, Copy)]
pub struct NokhwaBackend;

impl CameraBackend for NokhwaBackend {
    type Device = NokhwaDevice;

    fn name(&self) -> &'static str {
        "native"
    }

    fn open(&mut self, index: u32) -> CaptureResult<NokhwaDevice> {
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);

        let mut camera = Camera::new(CameraIndex::Index(index), requested).map_err(|e| {
            CaptureError::DeviceOpen {
                index,
                reason: e.to_string(),
            }
        })?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::DeviceOpen {
                index,
                reason: e.to_string(),
            })?;

        Ok(NokhwaDevice {
            camera,
            streaming: true,
        })
    }
}

pub struct NokhwaDevice {
    camera: Camera,
    streaming: bool,
}

impl CameraDevice for NokhwaDevice {
    fn set_resolution(&mut self, width: u32, height: u32) -> CaptureResult<()> {
        // resets the stream if it is already open
        self.camera
            .set_resolution(Resolution::new(width, height))
            .map_err(|e| CaptureError::Resolution {
                width,
                height,
                reason: e.to_string(),
            })
    }

    fn read_frame(&mut self) -> CaptureResult<ImageFrame> {
        if !self.streaming {
            return Err(CaptureError::NotReady);
        }

        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::FrameRead(e.to_string()))?;
        let decoded = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| CaptureError::FrameRead(e.to_string()))?;

        let (w, h) = (decoded.width() as usize, decoded.height() as usize);
        ImageFrame::from_raw(w, h, 3, decoded.into_raw())
    }

    fn close(&mut self) -> CaptureResult<()> {
        if !self.streaming {
            return Ok(());
        }
        self.streaming = false;
        self.camera
            .stop_stream()
            .map_err(|e| CaptureError::DeviceClose(format!("failed to stop stream: {}", e)))
    }
}

impl Drop for NokhwaDevice {
    fn drop(&mut self) {
        if self.streaming {
            let _ = self.close();
        }
    }
}

/// Backend picked at runtime from the configuration
pub enum AnyBackend {
    Native(NokhwaBackend),
    Ffmpeg(FfmpegBackend),
    Mock(MockBackend),
}

impl AnyBackend {
    pub fn from_config(video: &VideoConfig, logger: Arc<Logger>) -> Self {
        match video.backend {
            BackendKind::Native => AnyBackend::Native(NokhwaBackend),
            BackendKind::Ffmpeg => AnyBackend::Ffmpeg(FfmpegBackend::new(
                video.camera_width,
                video.camera_height,
                video.dshow_device.clone(),
                logger,
            )),
            BackendKind::Mock => AnyBackend::Mock(
                MockBackend::new(
                    video.camera_width as usize,
                    video.camera_height as usize,
                    PatternType::Gradient,
                )
                .with_fps(30),
            ),
        }
    }
}

pub enum AnyDevice {
    Native(NokhwaDevice),
    Ffmpeg(FfmpegDevice),
    Mock(MockDevice),
}

impl CameraBackend for AnyBackend {
    type Device = AnyDevice;

    fn name(&self) -> &'static str {
        match self {
            AnyBackend::Native(b) => b.name(),
            AnyBackend::Ffmpeg(b) => b.name(),
            AnyBackend::Mock(b) => b.name(),
        }
    }

    fn open(&mut self, index: u32) -> CaptureResult<AnyDevice> {
        match self {
            AnyBackend::Native(b) => b.open(index).map(AnyDevice::Native),
            AnyBackend::Ffmpeg(b) => b.open(index).map(AnyDevice::Ffmpeg),
            AnyBackend::Mock(b) => b.open(index).map(AnyDevice::Mock),
        }
    }
}

impl CameraDevice for AnyDevice {
    fn set_resolution(&mut self, width: u32, height: u32) -> CaptureResult<()> {
        match self {
            AnyDevice::Native(d) => d.set_resolution(width, height),
            AnyDevice::Ffmpeg(d) => d.set_resolution(width, height),
            AnyDevice::Mock(d) => d.set_resolution(width, height),
        }
    }

    fn read_frame(&mut self) -> CaptureResult<ImageFrame> {
        match self {
            AnyDevice::Native(d) => d.read_frame(),
            AnyDevice::Ffmpeg(d) => d.read_frame(),
            AnyDevice::Mock(d) => d.read_frame(),
        }
    }

    fn close(&mut self) -> CaptureResult<()> {
        match self {
            AnyDevice::Native(d) => d.close(),
            AnyDevice::Ffmpeg(d) => d.close(),
            AnyDevice::Mock(d) => d.close(),
        }
    }
}
