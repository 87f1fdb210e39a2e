use tracing::debug;

use crate::GlApi;

// Minimums guaranteed by OpenGL 3.3, used when a query reports nothing.
const MIN_TEXTURE_SIZE: u32 = 1024;
const MIN_TEXTURE_UNITS: u32 = 16;
const MIN_COMBINED_UNITS: u32 = 48;

/// Texture size and unit limits of the current context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureLimits {
    pub max_texture_size: u32,
    pub max_texture_units: u32,
    pub max_combined_units: u32,
}

impl Default for TextureLimits {
    fn default() -> Self {
        Self {
            max_texture_size: MIN_TEXTURE_SIZE,
            max_texture_units: MIN_TEXTURE_UNITS,
            max_combined_units: MIN_COMBINED_UNITS,
        }
    }
}

fn positive_or(value: i32, fallback: u32) -> u32 {
    u32::try_from(value).ok().filter(|v| *v > 0).unwrap_or(fallback)
}

impl TextureLimits {
    pub fn query(api: &dyn GlApi) -> Self {
        let limits = Self {
            max_texture_size: positive_or(api.get_integer(gl::MAX_TEXTURE_SIZE), MIN_TEXTURE_SIZE),
            max_texture_units: positive_or(
                api.get_integer(gl::MAX_TEXTURE_IMAGE_UNITS),
                MIN_TEXTURE_UNITS,
            ),
            max_combined_units: positive_or(
                api.get_integer(gl::MAX_COMBINED_TEXTURE_IMAGE_UNITS),
                MIN_COMBINED_UNITS,
            ),
        };
        debug!(?limits, "queried texture limits");
        limits
    }

    /// Whether fragment-visible texture unit `unit` exists.
    pub fn allows_unit(&self, unit: u32) -> bool {
        unit < self.max_texture_units.min(self.max_combined_units)
    }

    pub fn fits(&self, width: u32, height: u32) -> bool {
        width <= self.max_texture_size && height <= self.max_texture_size
    }

    /// Largest size with the same aspect ratio that fits.
    pub fn scale_to_fit(&self, width: u32, height: u32) -> (u32, u32) {
        if self.fits(width, height) {
            return (width, height);
        }
        let max = u64::from(self.max_texture_size);
        let (w, h) = (u64::from(width), u64::from(height));
        if w >= h {
            (self.max_texture_size, ((h * max) / w).max(1) as u32)
        } else {
            (((w * max) / h).max(1) as u32, self.max_texture_size)
        }
    }
}
