//! Color frame intake and validation.
//!
//! Everything upstream of the pipeline (file decoding, capture devices)
//! is an external collaborator. This module is the boundary: it turns
//! whatever pixel data arrives into a validated 3-channel RGB [`Frame`],
//! or reports [`PipelineError::InvalidInput`].

use image::{DynamicImage, RgbImage};

use crate::hsv::ColorSpace;
use crate::types::{Dimensions, PipelineError};

/// A validated, non-empty RGB frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(RgbImage);

impl Frame {
    /// Wrap an RGB image, rejecting zero dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if either dimension is zero.
    pub fn new(image: RgbImage) -> Result<Self, PipelineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::InvalidInput(format!(
                "zero-sized image ({}x{})",
                image.width(),
                image.height()
            )));
        }
        Ok(Self(image))
    }

    /// Build a frame from interleaved 8-bit pixel data.
    ///
    /// `channels` must be 3 (RGB) or 4 (RGBA; alpha is discarded).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] for zero dimensions, an
    /// unsupported channel count, or a buffer whose length does not
    /// equal `width * height * channels`.
    pub fn from_raw(
        width: u32,
        height: u32,
        channels: u8,
        data: &[u8],
    ) -> Result<Self, PipelineError> {
        if !matches!(channels, 3 | 4) {
            return Err(PipelineError::InvalidInput(format!(
                "expected 3 or 4 color channels, got {channels}"
            )));
        }
        let expected = u64::from(width) * u64::from(height) * u64::from(channels);
        if data.len() as u64 != expected {
            return Err(PipelineError::InvalidInput(format!(
                "buffer holds {} bytes, {width}x{height}x{channels} needs {expected}",
                data.len()
            )));
        }

        let rgb: Vec<u8> = if channels == 3 {
            data.to_vec()
        } else {
            data.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect()
        };
        let image = RgbImage::from_raw(width, height, rgb)
            .ok_or_else(|| PipelineError::InvalidInput("buffer size mismatch".to_string()))?;
        Self::new(image)
    }

    /// The underlying RGB image.
    #[must_use]
    pub const fn image(&self) -> &RgbImage {
        &self.0
    }

    /// Frame dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::of(&self.0)
    }

    /// Always [`ColorSpace::Rgb`].
    #[must_use]
    pub const fn color_space(&self) -> ColorSpace {
        ColorSpace::Rgb
    }
}

impl TryFrom<&DynamicImage> for Frame {
    type Error = PipelineError;

    /// Accepts any color layout; grayscale layouts have the wrong
    /// channel count and are rejected.
    fn try_from(image: &DynamicImage) -> Result<Self, Self::Error> {
        if !image.color().has_color() {
            return Err(PipelineError::InvalidInput(format!(
                "expected a color image, got {:?}",
                image.color()
            )));
        }
        Self::new(image.to_rgb8())
    }
}

/// Decode encoded image bytes (PNG, JPEG, BMP, WebP) into a frame.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if `bytes` is empty or the
/// decoded image is not a color image, and
/// [`PipelineError::ImageDecode`] if the format is unrecognized or the
/// data is corrupt.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::InvalidInput(
            "input image data is empty".to_string(),
        ));
    }
    let image = image::load_from_memory(bytes)?;
    Frame::try_from(&image)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        let result = Frame::new(RgbImage::new(0, 10));
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn raw_rgb_is_accepted() {
        let data = vec![10u8; 4 * 3 * 3];
        let frame = Frame::from_raw(4, 3, 3, &data).unwrap();
        assert_eq!(
            frame.dimensions(),
            Dimensions {
                width: 4,
                height: 3
            }
        );
    }

    #[test]
    fn frames_are_tagged_rgb() {
        let frame = Frame::from_raw(2, 2, 3, &[0u8; 12]).unwrap();
        assert_eq!(frame.color_space(), ColorSpace::Rgb);
    }

    #[test]
    fn raw_rgba_drops_alpha() {
        let data = [1, 2, 3, 255, 4, 5, 6, 0];
        let frame = Frame::from_raw(2, 1, 4, &data).unwrap();
        assert_eq!(frame.image().get_pixel(0, 0).0, [1, 2, 3]);
        assert_eq!(frame.image().get_pixel(1, 0).0, [4, 5, 6]);
    }

    #[test]
    fn single_channel_raw_is_rejected() {
        let data = vec![0u8; 16];
        let result = Frame::from_raw(4, 4, 1, &data);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let data = vec![0u8; 10];
        let result = Frame::from_raw(4, 4, 3, &data);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn grayscale_dynamic_image_is_rejected() {
        let gray = DynamicImage::ImageLuma8(image::GrayImage::new(4, 4));
        let result = Frame::try_from(&gray);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn empty_bytes_are_rejected() {
        assert!(matches!(
            decode_frame(&[]),
            Err(PipelineError::InvalidInput(_))
        ));
    }

    #[test]
    fn corrupt_bytes_return_decode_error() {
        assert!(matches!(
            decode_frame(&[0xFF, 0xFE, 0x00, 0x01]),
            Err(PipelineError::ImageDecode(_))
        ));
    }

    #[test]
    fn png_decodes_to_rgb_frame() {
        let img = image::RgbaImage::from_fn(5, 7, |_, _| image::Rgba([200, 100, 50, 255]));
        let frame = decode_frame(&encode_png(&img)).unwrap();
        assert_eq!(frame.image().get_pixel(2, 3).0, [200, 100, 50]);
        assert_eq!(frame.dimensions().width, 5);
        assert_eq!(frame.dimensions().height, 7);
    }
}
