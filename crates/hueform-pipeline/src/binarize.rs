//! Binarization: color frame to foreground mask.
//!
//! Converts to luminance, applies a fixed-level cut, then inverts so
//! dark ink becomes the high-value foreground that contour extraction
//! follows.
//!
//! This is the first stage of the pipeline, ahead of contour extraction.

use image::buffer::ConvertBuffer;
use image::{GrayImage, RgbImage};

/// Binarize a color image into a white-on-black foreground mask.
///
/// Pixels with luminance `>= threshold_low` map to `threshold_high`,
/// all others to 0, and the result is bitwise inverted. With the
/// conventional `threshold_high` of 255 the mask is strictly {0, 255};
/// a lower ceiling leaves the light class at `255 - threshold_high`,
/// which is still foreground to the extractor.
///
/// Luminance uses the luma weights of the `image` crate's RGB-to-gray conversion.
/// An empty image yields an empty mask.
#[must_use = "returns the foreground mask"]
pub fn binarize(image: &RgbImage, threshold_low: u8, threshold_high: u8) -> GrayImage {
    let gray: GrayImage = image.convert();
    let mut mask = threshold(&gray, threshold_low, threshold_high);
    invert(&mut mask);
    mask
}

/// Fixed-level threshold: `>= level` becomes `max_value`, the rest 0.
#[must_use = "returns the thresholded image"]
pub fn threshold(gray: &GrayImage, level: u8, max_value: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let v = gray.get_pixel(x, y).0[0];
        image::Luma([if v >= level { max_value } else { 0 }])
    })
}

/// Bitwise NOT in place.
pub fn invert(mask: &mut GrayImage) {
    for pixel in mask.pixels_mut() {
        pixel.0[0] = !pixel.0[0];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 20x20 white frame with a black 10x10 square in the middle.
    fn dark_square_on_white() -> RgbImage {
        RgbImage::from_fn(20, 20, |x, y| {
            if (5..15).contains(&x) && (5..15).contains(&y) {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn dark_ink_becomes_foreground() {
        let mask = binarize(&dark_square_on_white(), 100, 255);
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn mask_is_binary_with_full_ceiling() {
        let img = RgbImage::from_fn(16, 16, |x, y| {
            let v = u8::try_from((x * 16 + y) % 256).unwrap_or(0);
            image::Rgb([v, v, v])
        });
        let mask = binarize(&img, 128, 255);
        assert!(mask.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn threshold_is_inclusive() {
        let gray = GrayImage::from_fn(3, 1, |x, _| image::Luma([[99, 100, 101][x as usize]]));
        let out = threshold(&gray, 100, 255);
        assert_eq!(out.as_raw(), &vec![0, 255, 255]);
    }

    #[test]
    fn lower_ceiling_leaves_light_class_nonzero() {
        let mask = binarize(&dark_square_on_white(), 100, 200);
        assert_eq!(mask.get_pixel(0, 0).0[0], 55);
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
    }

    #[test]
    fn empty_image_yields_empty_mask() {
        let mask = binarize(&RgbImage::new(0, 0), 100, 255);
        assert_eq!(mask.width(), 0);
        assert_eq!(mask.height(), 0);
    }

    #[test]
    fn double_invert_is_identity() {
        let mut mask = GrayImage::new(5, 5);
        mask.put_pixel(2, 2, image::Luma([255]));
        let original = mask.clone();
        invert(&mut mask);
        invert(&mut mask);
        assert_eq!(mask, original);
    }

    #[test]
    fn output_dimensions_match_input() {
        let mask = binarize(&RgbImage::new(17, 31), 100, 255);
        assert_eq!(mask.width(), 17);
        assert_eq!(mask.height(), 31);
    }
}
