use crate::camera::{CameraBackend, CameraDevice};
use crate::error::{CaptureError, CaptureResult};
use crate::image_frame::ImageFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Test patterns for local development
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternType {
    Checkerboard,
    Gradient,
    /// seeded, so runs are reproducible
    Noise(u64),
}

/// Factory for "fake" RGB frames to test without a camera.
pub struct MockFrameGenerator {
    /// width of mock frame
    w: usize,
    /// height of mock frame
    h: usize,
    /// counter to determine how the frame should look temporally
    frame_counter: usize,
    /// determine current time
    last_frame_time: Instant,
    /// how long to wait to create a new frame (effectively FPS),
    /// `None` produces frames as fast as they are requested
    frame_delay: Option<Duration>,
    /// pattern to generate
    pattern_type: PatternType,
    rng: StdRng,
}

impl MockFrameGenerator {
    pub fn new(
        w: usize,
        h: usize,
        fps: Option<u32>,
        pattern_type: PatternType,
    ) -> CaptureResult<Self> {
        if w == 0 || h == 0 || fps == Some(0) {
            return Err(CaptureError::InvalidFrame(
                "failed to create mock frame generator".into(),
            ));
        }

        let frame_delay = fps.map(|fps| Duration::from_millis((1000 / fps) as u64));
        let seed = match pattern_type {
            PatternType::Noise(seed) => seed,
            _ => 0,
        };

        Ok(MockFrameGenerator {
            w,
            h,
            frame_counter: 0,
            last_frame_time: Instant::now(),
            frame_delay,
            pattern_type,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Generate a mock frame
    pub fn generate_frame(&mut self) -> CaptureResult<ImageFrame> {
        if let Some(delay) = self.frame_delay {
            let elapsed = self.last_frame_time.elapsed();
            if elapsed < delay {
                std::thread::sleep(delay - elapsed);
            }
        }
        self.last_frame_time = Instant::now();

        let buffer = match self.pattern_type {
            PatternType::Checkerboard => self.generate_checkerboard(),
            PatternType::Gradient => self.generate_gradient(),
            PatternType::Noise(_) => self.generate_noise(),
        };

        self.frame_counter += 1;

        ImageFrame::from_raw(self.w, self.h, 3, buffer)
    }

    /// 8x8 pixel checkerboard that inverts every 5 frames
    fn generate_checkerboard(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.w * self.h * 3);
        let pattern_offset = (self.frame_counter / 5) % 2;

        for y in 0..self.h {
            for x in 0..self.w {
                let is_odd = (x / 8 + y / 8) % 2;
                let v = if (is_odd + pattern_offset) % 2 == 0 { 32 } else { 224 };
                buffer.extend_from_slice(&[v, v, v]);
            }
        }

        buffer
    }

    /// Horizontal ramp that scrolls one column per frame
    fn generate_gradient(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.w * self.h * 3);

        for y in 0..self.h {
            for x in 0..self.w {
                let v = (((x + self.frame_counter) % self.w) * 255 / self.w.max(2).saturating_sub(1))
                    .min(255) as u8;
                let g = (y * 255 / self.h.max(2).saturating_sub(1)).min(255) as u8;
                buffer.extend_from_slice(&[v, g, 255 - v]);
            }
        }

        buffer
    }

    fn generate_noise(&mut self) -> Vec<u8> {
        let mut buffer = vec![0u8; self.w * self.h * 3];
        self.rng.fill(buffer.as_mut_slice());
        buffer
    }
}

/// Counters shared between a `MockBackend` and the devices it opens
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MockStats {
    pub opened: u32,
    pub closed: u32,
    pub frames: u32,
}

#[derive(Default)]
struct MockState {
    /// indices currently held open; a second open of the same index fails
    in_use: HashSet<u32>,
    stats: MockStats,
}

/// Camera backend serving generated frames. Devices are exclusive per
/// index, like real hardware, so a leaked handle makes the next open fail.
#[derive(Clone)]
pub struct MockBackend {
    w: usize,
    h: usize,
    fps: Option<u32>,
    pattern: PatternType,
    /// indices that do not exist
    missing: HashSet<u32>,
    /// every device fails this many reads before producing frames
    failing_reads: u32,
    /// closing a device reports an error (the index is still freed)
    failing_close: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new(w: usize, h: usize, pattern: PatternType) -> Self {
        Self {
            w,
            h,
            fps: None,
            pattern,
            missing: HashSet::new(),
            failing_reads: 0,
            failing_close: false,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Throttle generated frames to roughly `fps`
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_missing_device(mut self, index: u32) -> Self {
        self.missing.insert(index);
        self
    }

    pub fn with_failing_reads(mut self, count: u32) -> Self {
        self.failing_reads = count;
        self
    }

    pub fn with_failing_close(mut self) -> Self {
        self.failing_close = true;
        self
    }

    pub fn stats(&self) -> MockStats {
        self.state
            .lock()
            .map(|s| s.stats.clone())
            .unwrap_or_default()
    }

    pub fn is_in_use(&self, index: u32) -> bool {
        self.state
            .lock()
            .map(|s| s.in_use.contains(&index))
            .unwrap_or(false)
    }
}

impl CameraBackend for MockBackend {
    type Device = MockDevice;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&mut self, index: u32) -> CaptureResult<MockDevice> {
        let open_err = |reason: &str| CaptureError::DeviceOpen {
            index,
            reason: reason.to_string(),
        };

        if self.missing.contains(&index) {
            return Err(open_err("no such device"));
        }

        let generator = MockFrameGenerator::new(self.w, self.h, self.fps, self.pattern)?;

        let mut state = self
            .state
            .lock()
            .map_err(|_| open_err("mock state poisoned"))?;
        if !state.in_use.insert(index) {
            return Err(open_err("device busy"));
        }
        state.stats.opened += 1;

        Ok(MockDevice {
            index,
            generator,
            fps: self.fps,
            failing_reads: self.failing_reads,
            failing_close: self.failing_close,
            open: true,
            state: Arc::clone(&self.state),
        })
    }
}

pub struct MockDevice {
    index: u32,
    generator: MockFrameGenerator,
    fps: Option<u32>,
    failing_reads: u32,
    failing_close: bool,
    open: bool,
    state: Arc<Mutex<MockState>>,
}

impl CameraDevice for MockDevice {
    fn set_resolution(&mut self, width: u32, height: u32) -> CaptureResult<()> {
        if width == 0 || height == 0 {
            return Err(CaptureError::Resolution {
                width,
                height,
                reason: "dimensions must be greater than zero".into(),
            });
        }
        self.generator = MockFrameGenerator::new(
            width as usize,
            height as usize,
            self.fps,
            self.generator.pattern_type,
        )?;
        Ok(())
    }

    fn read_frame(&mut self) -> CaptureResult<ImageFrame> {
        if !self.open {
            return Err(CaptureError::NotReady);
        }
        if self.failing_reads > 0 {
            self.failing_reads -= 1;
            return Err(CaptureError::FrameRead("device returned no frame".into()));
        }

        let frame = self.generator.generate_frame()?;
        if let Ok(mut state) = self.state.lock() {
            state.stats.frames += 1;
        }
        Ok(frame)
    }

    fn close(&mut self) -> CaptureResult<()> {
        if !self.open {
            return Ok(());
        }
        self.open = false;

        let mut state = self
            .state
            .lock()
            .map_err(|_| CaptureError::DeviceClose("mock state poisoned".into()))?;
        state.in_use.remove(&self.index);
        if self.failing_close {
            return Err(CaptureError::DeviceClose("device did not stop cleanly".into()));
        }
        state.stats.closed += 1;
        Ok(())
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_rejects_bad_parameters() {
        assert!(MockFrameGenerator::new(0, 10, None, PatternType::Gradient).is_err());
        assert!(MockFrameGenerator::new(10, 10, Some(0), PatternType::Gradient).is_err());
    }

    #[test]
    fn checkerboard_inverts_every_five_frames() {
        let mut generator = MockFrameGenerator::new(16, 16, None, PatternType::Checkerboard).unwrap();
        let first = generator.generate_frame().unwrap();
        for _ in 0..4 {
            generator.generate_frame().unwrap();
        }
        let sixth = generator.generate_frame().unwrap();

        assert_eq!(first.get_pixel(0, 0), Some((32, 32, 32)));
        assert_eq!(first.get_pixel(8, 0), Some((224, 224, 224)));
        assert_eq!(sixth.get_pixel(0, 0), Some((224, 224, 224)));
    }

    #[test]
    fn noise_is_reproducible_for_a_seed() {
        let mut a = MockFrameGenerator::new(8, 8, None, PatternType::Noise(7)).unwrap();
        let mut b = MockFrameGenerator::new(8, 8, None, PatternType::Noise(7)).unwrap();
        assert_eq!(a.generate_frame().unwrap(), b.generate_frame().unwrap());
    }

    #[test]
    fn device_is_exclusive_until_closed() {
        let mut backend = MockBackend::new(4, 4, PatternType::Gradient);
        let mut device = backend.open(0).unwrap();

        assert!(backend.is_in_use(0));
        assert!(matches!(
            backend.open(0),
            Err(CaptureError::DeviceOpen { index: 0, .. })
        ));
        assert!(backend.open(1).is_ok());

        device.close().unwrap();
        assert!(!backend.is_in_use(0));
        assert!(backend.open(0).is_ok());
    }

    #[test]
    fn dropping_a_device_releases_it() {
        let mut backend = MockBackend::new(4, 4, PatternType::Gradient);
        {
            let _device = backend.open(0).unwrap();
        }
        assert!(!backend.is_in_use(0));
        assert_eq!(backend.stats().closed, 1);
    }

    #[test]
    fn failing_reads_then_recovers() {
        let mut backend = MockBackend::new(4, 4, PatternType::Gradient).with_failing_reads(2);
        let mut device = backend.open(0).unwrap();

        assert!(matches!(device.read_frame(), Err(CaptureError::FrameRead(_))));
        assert!(matches!(device.read_frame(), Err(CaptureError::FrameRead(_))));
        assert!(device.read_frame().is_ok());
        assert_eq!(backend.stats().frames, 1);
    }

    #[test]
    fn set_resolution_changes_frame_size() {
        let mut backend = MockBackend::new(4, 4, PatternType::Gradient);
        let mut device = backend.open(0).unwrap();
        device.set_resolution(10, 6).unwrap();

        let frame = device.read_frame().unwrap();
        assert_eq!((frame.width(), frame.height()), (10, 6));
        assert!(device.set_resolution(0, 6).is_err());
    }

    #[test]
    fn set_resolution_keeps_frame_rate() {
        let mut backend = MockBackend::new(4, 4, PatternType::Gradient).with_fps(10);
        let mut device = backend.open(0).unwrap();
        device.set_resolution(8, 8).unwrap();

        let start = Instant::now();
        device.read_frame().unwrap();
        device.read_frame().unwrap();
        // two frames at 10 fps, first one timed from the resolution change
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn failing_close_is_reported_as_release_error() {
        let mut backend = MockBackend::new(4, 4, PatternType::Gradient).with_failing_close();
        let mut device = backend.open(0).unwrap();

        assert!(matches!(device.close(), Err(CaptureError::DeviceClose(_))));
        assert!(!backend.is_in_use(0));
        assert_eq!(backend.stats().closed, 0);
    }
}
