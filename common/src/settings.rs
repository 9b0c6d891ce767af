pub const MIN_BRIGHTNESS: f64 = -100.0;
pub const MAX_BRIGHTNESS: f64 = 100.0;
pub const MIN_CONTRAST: f64 = 0.1;
pub const MAX_CONTRAST: f64 = 3.0;

pub const DEFAULT_BRIGHTNESS: f64 = 0.0;
pub const DEFAULT_CONTRAST: f64 = 0.8;

/// Brightness and contrast applied to every captured frame.
///
/// Fields are private so the only way to change them is through the
/// bounded mutators below; both values stay inside their ranges after
/// every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageSettings {
    /// Additive offset per channel, in [-100, 100]
    brightness: f64,
    /// Multiplicative factor per channel, in [0.1, 3.0]
    contrast: f64,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            brightness: DEFAULT_BRIGHTNESS,
            contrast: DEFAULT_CONTRAST,
        }
    }
}

impl ImageSettings {
    /// Build settings from arbitrary values, clamping each into its range.
    /// Non-finite inputs fall back to the defaults.
    pub fn new(brightness: f64, contrast: f64) -> Self {
        let brightness = if brightness.is_finite() {
            brightness.clamp(MIN_BRIGHTNESS, MAX_BRIGHTNESS)
        } else {
            DEFAULT_BRIGHTNESS
        };
        let contrast = if contrast.is_finite() {
            contrast.clamp(MIN_CONTRAST, MAX_CONTRAST)
        } else {
            DEFAULT_CONTRAST
        };

        Self {
            brightness,
            contrast,
        }
    }

    pub fn brightness(&self) -> f64 {
        self.brightness
    }

    pub fn contrast(&self) -> f64 {
        self.contrast
    }

    pub fn increase_brightness(&mut self, step: f64) {
        self.brightness = bounded(self.brightness, step, MIN_BRIGHTNESS, MAX_BRIGHTNESS);
    }

    pub fn decrease_brightness(&mut self, step: f64) {
        self.brightness = bounded(self.brightness, -step, MIN_BRIGHTNESS, MAX_BRIGHTNESS);
    }

    pub fn increase_contrast(&mut self, step: f64) {
        self.contrast = bounded(self.contrast, step, MIN_CONTRAST, MAX_CONTRAST);
    }

    pub fn decrease_contrast(&mut self, step: f64) {
        self.contrast = bounded(self.contrast, -step, MIN_CONTRAST, MAX_CONTRAST);
    }
}

/// Apply `delta` to `current` and clamp on both ends, so a negative or
/// oversized step cannot escape the range either.
fn bounded(current: f64, delta: f64, min: f64, max: f64) -> f64 {
    if !delta.is_finite() {
        return current;
    }
    (current + delta).clamp(min, max)
}
