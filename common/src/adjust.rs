use crate::image_frame::ImageFrame;
use crate::settings::ImageSettings;

/// Map a single channel sample through `contrast * s + brightness`,
/// rounding half to even and saturating to the 8-bit range.
pub fn adjust_sample(sample: u8, settings: &ImageSettings) -> u8 {
    let v = settings.contrast() * sample as f64 + settings.brightness();
    // floor of 0 and ceiling of 255 (prevent overflow)
    v.round_ties_even().clamp(0.0, 255.0) as u8
}

/// Precomputed `adjust_sample` for all 256 input values of one settings
/// snapshot.
pub struct AdjustmentTable {
    lut: [u8; 256],
}

impl AdjustmentTable {
    pub fn new(settings: &ImageSettings) -> Self {
        let mut lut = [0u8; 256];
        for (value, out) in lut.iter_mut().enumerate() {
            *out = adjust_sample(value as u8, settings);
        }
        Self { lut }
    }

    #[inline]
    pub fn apply(&self, sample: u8) -> u8 {
        self.lut[sample as usize]
    }

    /// Produce a new frame with the same dimensions and every channel
    /// sample, alpha included, mapped through the table.
    pub fn apply_frame(&self, frame: &ImageFrame) -> ImageFrame {
        let out = frame.buffer().iter().map(|&c| self.apply(c)).collect();
        frame.with_buffer(out)
    }
}

/// Apply brightness and contrast to a frame, leaving the source untouched.
pub fn adjust_frame(frame: &ImageFrame, settings: &ImageSettings) -> ImageFrame {
    AdjustmentTable::new(settings).apply_frame(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> ImageFrame {
        let data: Vec<u8> = (0..=255u8).flat_map(|v| [v, v, v]).collect();
        ImageFrame::from_raw(16, 16, 3, data).unwrap()
    }

    #[test]
    fn identity_settings_return_identical_frame() {
        let frame = ramp();
        let out = adjust_frame(&frame, &ImageSettings::new(0.0, 1.0));
        assert_eq!(out, frame);
    }

    #[test]
    fn saturates_above_255() {
        let settings = ImageSettings::new(50.0, 1.0);
        assert_eq!(adjust_sample(250, &settings), 255);
    }

    #[test]
    fn saturates_below_zero() {
        let settings = ImageSettings::new(-100.0, 0.5);
        assert_eq!(adjust_sample(100, &settings), 0);
        assert_eq!(adjust_sample(255, &settings), 28);
    }

    #[test]
    fn rounds_half_to_even() {
        let settings = ImageSettings::new(0.0, 0.5);
        // 0.5 -> 0, 1.5 -> 2, 2.5 -> 2
        assert_eq!(adjust_sample(1, &settings), 0);
        assert_eq!(adjust_sample(3, &settings), 2);
        assert_eq!(adjust_sample(5, &settings), 2);
        assert_eq!(adjust_sample(7, &settings), 4);
    }

    #[test]
    fn table_agrees_with_direct_computation() {
        let settings = ImageSettings::new(-37.0, 1.75);
        let table = AdjustmentTable::new(&settings);
        for v in 0..=255u8 {
            assert_eq!(table.apply(v), adjust_sample(v, &settings));
        }
    }

    #[test]
    fn output_keeps_dimensions_and_source_is_untouched() {
        let frame = ramp();
        let before = frame.clone();
        let out = adjust_frame(&frame, &ImageSettings::new(20.0, 2.0));

        assert_eq!(out.width(), frame.width());
        assert_eq!(out.height(), frame.height());
        assert_eq!(out.bytes_per_pixel(), frame.bytes_per_pixel());
        assert_eq!(frame, before);
        assert_eq!(out.get_pixel(1, 0), Some((22, 22, 22)));
    }

    #[test]
    fn repeated_application_on_same_source_is_independent() {
        let frame = ramp();
        let bright = adjust_frame(&frame, &ImageSettings::new(40.0, 1.0));
        let dark = adjust_frame(&frame, &ImageSettings::new(-40.0, 1.0));
        let bright_again = adjust_frame(&frame, &ImageSettings::new(40.0, 1.0));

        assert_eq!(bright, bright_again);
        assert_ne!(bright, dark);
    }

    #[test]
    fn every_rgba_channel_is_mapped() {
        let frame = ImageFrame::from_raw(1, 1, 4, vec![10, 20, 30, 100]).unwrap();
        let out = adjust_frame(&frame, &ImageSettings::new(50.0, 1.0));
        assert_eq!(out.buffer(), &[60, 70, 80, 150]);
    }
}
