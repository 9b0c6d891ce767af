use common::image_frame::ImageFrame;

/// Turns an `ImageFrame` into rows of characters for the terminal preview
pub struct AsciiConverter {
    /// Intensity ramp, darkest first
    ascii_intensity: Vec<char>,
}

impl AsciiConverter {
    pub const DEFAULT_ASCII_INTENSITY: &'static str = " .:coPO?@■";

    pub fn new(ascii_intensity: Vec<char>) -> Self {
        let ascii_intensity = if ascii_intensity.is_empty() {
            Self::DEFAULT_ASCII_INTENSITY.chars().collect()
        } else {
            ascii_intensity
        };
        Self { ascii_intensity }
    }

    /// Convert a frame to `h` rows of `w` characters, sampling the nearest
    /// source pixel for each cell and mapping its luminance onto the ramp.
    pub fn convert(&self, frame: &ImageFrame, w: usize, h: usize) -> Vec<String> {
        if w == 0 || h == 0 {
            return Vec::new();
        }

        // scaling factors to map the ASCII grid onto the source frame
        let scale_x = frame.width() as f32 / w as f32;
        let scale_y = frame.height() as f32 / h as f32;
        let levels = self.ascii_intensity.len();

        (0..h)
            .map(|y| {
                (0..w)
                    .map(|x| {
                        let i_x = (x as f32 * scale_x) as usize;
                        let i_y = (y as f32 * scale_y) as usize;

                        match frame.get_pixel(i_x, i_y) {
                            Some(rgb) => {
                                let intensity = ImageFrame::calculate_intensity_u8(rgb);
                                let char_i = (intensity as f32 / 255.0 * levels as f32) as usize;
                                // bounds check (e.g. floating point rounding error)
                                self.ascii_intensity[char_i.min(levels - 1)]
                            }
                            None => ' ',
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

impl Default for AsciiConverter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ASCII_INTENSITY.chars().collect())
    }
}
