use crate::error::{CaptureError, CaptureResult};

/// The coefficients below are derived from Rec. ITU-R BT.601-7.
/// They weight each channel by how much it contributes to the
/// human eye's perception of brightness.
pub const R_LUMINANCE: f32 = 0.2989;
pub const G_LUMINANCE: f32 = 0.5870;
pub const B_LUMINANCE: f32 = 0.1140;

/// One captured image, row-major and tightly packed.
///
/// A frame never changes once built; adjustments produce a new frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    /// width of image
    w: usize,
    /// height of image
    h: usize,
    /// 1 (gray), 3 (RGB) or 4 (RGBA)
    bytes_per_pixel: usize,
    /// frame data
    buffer: Vec<u8>,
}

impl ImageFrame {
    /// Wrap raw pixel data, checking that it matches the dimensions.
    pub fn from_raw(
        w: usize,
        h: usize,
        bytes_per_pixel: usize,
        buffer: Vec<u8>,
    ) -> CaptureResult<Self> {
        if w == 0 || h == 0 {
            return Err(CaptureError::InvalidFrame(
                "width and height must be greater than zero".into(),
            ));
        }

        if !matches!(bytes_per_pixel, 1 | 3 | 4) {
            return Err(CaptureError::InvalidFrame(format!(
                "unsupported channel count: {}",
                bytes_per_pixel
            )));
        }

        let expected = w * h * bytes_per_pixel;
        if buffer.len() != expected {
            return Err(CaptureError::InvalidFrame(format!(
                "expected {} bytes for {}x{}x{} but got {}",
                expected,
                w,
                h,
                bytes_per_pixel,
                buffer.len()
            )));
        }

        Ok(Self {
            w,
            h,
            bytes_per_pixel,
            buffer,
        })
    }

    /// A frame with every sample set to `value`.
    pub fn filled(w: usize, h: usize, bytes_per_pixel: usize, value: u8) -> CaptureResult<Self> {
        Self::from_raw(w, h, bytes_per_pixel, vec![value; w * h * bytes_per_pixel])
    }

    /// Same dimensions, new samples. Callers keep the length identical.
    pub(crate) fn with_buffer(&self, buffer: Vec<u8>) -> Self {
        debug_assert_eq!(buffer.len(), self.buffer.len());
        Self {
            w: self.w,
            h: self.h,
            bytes_per_pixel: self.bytes_per_pixel,
            buffer,
        }
    }

    pub fn width(&self) -> usize {
        self.w
    }

    pub fn height(&self) -> usize {
        self.h
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_pixel
    }

    /// Return raw image data
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.buffer
    }

    /// Get pixel RGB values, with bounds checking. Gray frames repeat the
    /// single sample and the alpha channel of RGBA frames is dropped.
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<(u8, u8, u8)> {
        if x >= self.w || y >= self.h {
            return None;
        }

        let i = (y * self.w + x) * self.bytes_per_pixel;
        match self.bytes_per_pixel {
            1 => self.buffer.get(i).map(|&v| (v, v, v)),
            _ => {
                let px = self.buffer.get(i..i + 3)?;
                Some((px[0], px[1], px[2]))
            }
        }
    }

    /// Calculate the grayscale intensity value (relative luminance)
    /// of a given pixel
    pub fn calculate_intensity((r, g, b): (u8, u8, u8)) -> f32 {
        R_LUMINANCE * r as f32 + G_LUMINANCE * g as f32 + B_LUMINANCE * b as f32
    }

    /// Calculate the grayscale intensity value (relative luminance)
    /// of a given pixel and cast as a `u8`
    pub fn calculate_intensity_u8((r, g, b): (u8, u8, u8)) -> u8 {
        ImageFrame::calculate_intensity((r, g, b)) as u8
    }
}
