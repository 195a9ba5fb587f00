//! RGB to hue-space conversion.
//!
//! Produces the 8-bit HSV layout common in vision tooling: hue halved
//! onto 0..=180 so it fits a byte, saturation and value on 0..=255.
//! Hue bands in the configuration use the same scale.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::types::{Dimensions, PipelineError};

/// Largest accepted hue value; the wheel spans 0..=180.
pub const HUE_MAX: u8 = 180;

/// Color-space tag carried by 3-channel images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorSpace {
    /// Red, green, blue.
    Rgb,
    /// Hue, saturation, value (hue channel first).
    Hsv,
}

/// One HSV pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
    /// Hue on 0..=180.
    pub h: u8,
    /// Saturation on 0..=255.
    pub s: u8,
    /// Value on 0..=255.
    pub v: u8,
}

/// A hue-channel-first image.
///
/// Storage reuses the 3-channel buffer type; the tag distinguishes it
/// from RGB data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HueImage(RgbImage);

impl HueImage {
    /// Wrap interleaved `h, s, v` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the buffer length is
    /// not `width * height * 3` or a hue exceeds [`HUE_MAX`].
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
        if data.chunks(3).any(|px| px[0] > HUE_MAX) {
            return Err(PipelineError::InvalidInput(format!(
                "hue channel exceeds {HUE_MAX}"
            )));
        }
        RgbImage::from_raw(width, height, data).map(Self).ok_or_else(|| {
            PipelineError::InvalidInput(format!(
                "hue buffer does not match {width}x{height}x3"
            ))
        })
    }

    /// Always [`ColorSpace::Hsv`].
    #[must_use]
    pub const fn color_space(&self) -> ColorSpace {
        ColorSpace::Hsv
    }

    /// Image dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.0)
    }

    /// The pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Hsv {
        let [h, s, v] = self.0.get_pixel(x, y).0;
        Hsv { h, s, v }
    }

    /// Iterate all pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = Hsv> + '_ {
        self.0.pixels().map(|p| {
            let [h, s, v] = p.0;
            Hsv { h, s, v }
        })
    }

    /// Raw interleaved `h, s, v` bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.0.as_raw()
    }
}

/// Convert an RGB image to hue space.
///
/// The input type already guarantees three channels; malformed raw
/// buffers are rejected earlier by [`Frame`](crate::frame::Frame).
#[must_use = "returns the hue image"]
pub fn to_hue_space(image: &RgbImage) -> HueImage {
    let mut out = RgbImage::new(image.width(), image.height());
    for (src, dst) in image.pixels().zip(out.pixels_mut()) {
        let [r, g, b] = src.0;
        let hsv = rgb_to_hsv(r, g, b);
        dst.0 = [hsv.h, hsv.s, hsv.v];
    }
    HueImage(out)
}

/// Convert a single RGB triple.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let (rf, gf, bf) = (f32::from(r), f32::from(g), f32::from(b));
    let max = rf.max(gf).max(bf);
    let min = rf.min(gf).min(bf);
    let delta = max - min;

    let s = if max > 0.0 { 255.0 * delta / max } else { 0.0 };

    let degrees = if delta == 0.0 {
        0.0
    } else if max == rf {
        60.0 * (gf - bf) / delta
    } else if max == gf {
        60.0f32.mul_add((bf - rf) / delta, 120.0)
    } else {
        60.0f32.mul_add((rf - gf) / delta, 240.0)
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };

    // 359.x degrees rounds to 180, which wraps back to red.
    let h = (degrees / 2.0).round() % f32::from(HUE_MAX);

    Hsv {
        h: h as u8,
        s: s.round() as u8,
        v: max as u8,
    }
}
