//! Contour extraction: closed region boundaries from a binary mask.
//!
//! This module defines the [`ContourExtractor`] trait for pluggable
//! boundary extraction and the [`RetrievalMode`] enum selecting which
//! boundaries to keep.
//!
//! Border following is delegated to `imageproc`, which treats every
//! non-zero pixel as foreground and pads the image internally, so
//! regions touching the frame edge are traced without point loss.
//! Hierarchy links are discarded here: downstream stages see a flat
//! list of closed loops in discovery order.

use image::GrayImage;
use imageproc::contours::BorderType;
use serde::{Deserialize, Serialize};

use crate::types::{Contour, PipelineError, Point};

/// Selects which region boundaries to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetrievalMode {
    /// Outermost boundaries only; holes and anything nested in them
    /// are ignored.
    #[default]
    External,
    /// Every boundary, outer and hole alike, as one flat list.
    List,
}

/// Trait for contour extraction strategies.
///
/// Input: a binary mask (non-zero = foreground).
/// Output: one closed contour per retained boundary.
pub trait ContourExtractor {
    /// Extract contours from the given mask.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the mask is not binary.
    fn extract(&self, mask: &GrayImage) -> Result<Vec<Contour>, PipelineError>;
}

impl ContourExtractor for RetrievalMode {
    fn extract(&self, mask: &GrayImage) -> Result<Vec<Contour>, PipelineError> {
        ensure_binary(mask)?;

        let contours: Vec<imageproc::contours::Contour<i32>> =
            imageproc::contours::find_contours(mask);

        let mode = *self;
        Ok(contours
            .into_iter()
            .filter(|c| match mode {
                Self::External => c.border_type == BorderType::Outer && c.parent.is_none(),
                Self::List => true,
            })
            .filter(|c| c.points.len() >= 2)
            .map(|c| Contour::new(c.points.into_iter().map(|p| Point::new(p.x, p.y)).collect()))
            .collect())
    }
}

/// Reject masks holding more than two distinct pixel values.
fn ensure_binary(mask: &GrayImage) -> Result<(), PipelineError> {
    let mut first: Option<u8> = None;
    let mut second: Option<u8> = None;
    for pixel in mask.pixels() {
        let v = Some(pixel.0[0]);
        if first.is_none() {
            first = v;
        } else if first != v && second.is_none() {
            second = v;
        } else if first != v && second != v {
            return Err(PipelineError::InvalidInput(format!(
                "mask is not binary: found values {first:?}, {second:?} and {v:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn filled_rect(img: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, value: u8) {
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, image::Luma([value]));
            }
        }
    }

    #[test]
    fn default_is_external() {
        assert_eq!(RetrievalMode::default(), RetrievalMode::External);
    }

    #[test]
    fn all_black_mask_has_no_contours() {
        let img = GrayImage::new(10, 10);
        let result = RetrievalMode::External.extract(&img).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn single_pixel_contour_is_filtered_out() {
        let mut img = GrayImage::new(10, 10);
        img.put_pixel(5, 5, image::Luma([255]));
        let result = RetrievalMode::List.extract(&img).unwrap();
        for contour in &result {
            assert!(contour.len() >= 2);
        }
    }

    #[test]
    fn square_produces_one_contour() {
        let mut img = GrayImage::new(20, 20);
        filled_rect(&mut img, 5, 5, 15, 15, 255);
        let result = RetrievalMode::External.extract(&img).unwrap();
        assert_eq!(result.len(), 1);
        assert!(result[0].len() >= 4);
        assert!(result[0].points().contains(&Point::new(5, 5)));
        assert!(result[0].points().contains(&Point::new(14, 14)));
    }

    #[test]
    fn ring_external_ignores_hole_but_list_keeps_it() {
        let mut img = GrayImage::new(30, 30);
        filled_rect(&mut img, 5, 5, 25, 25, 255);
        filled_rect(&mut img, 10, 10, 20, 20, 0);

        let external = RetrievalMode::External.extract(&img).unwrap();
        assert_eq!(external.len(), 1);

        let all = RetrievalMode::List.extract(&img).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn island_inside_hole_is_not_external() {
        let mut img = GrayImage::new(40, 40);
        filled_rect(&mut img, 2, 2, 38, 38, 255);
        filled_rect(&mut img, 8, 8, 32, 32, 0);
        filled_rect(&mut img, 15, 15, 25, 25, 255);

        let external = RetrievalMode::External.extract(&img).unwrap();
        assert_eq!(external.len(), 1);

        let all = RetrievalMode::List.extract(&img).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn region_touching_border_keeps_edge_points() {
        let mut img = GrayImage::new(12, 12);
        filled_rect(&mut img, 0, 0, 6, 6, 255);
        let result = RetrievalMode::External.extract(&img).unwrap();
        assert_eq!(result.len(), 1);
        let points = result[0].points();
        assert!(points.contains(&Point::new(0, 0)));
        assert!(points.contains(&Point::new(5, 0)));
        assert!(points.contains(&Point::new(0, 5)));
        assert!(points.contains(&Point::new(5, 5)));
    }

    #[test]
    fn extraction_is_deterministic() {
        let mut img = GrayImage::new(30, 30);
        filled_rect(&mut img, 2, 2, 10, 10, 255);
        filled_rect(&mut img, 15, 4, 27, 20, 255);
        let first = RetrievalMode::List.extract(&img).unwrap();
        let second = RetrievalMode::List.extract(&img).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_binary_mask_is_rejected() {
        let mut img = GrayImage::new(4, 4);
        img.put_pixel(0, 0, image::Luma([128]));
        img.put_pixel(1, 0, image::Luma([255]));
        let result = RetrievalMode::External.extract(&img);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn two_level_mask_with_nonzero_background_is_binary() {
        let mut img = GrayImage::from_pixel(6, 6, image::Luma([55]));
        filled_rect(&mut img, 2, 2, 4, 4, 255);
        let result = RetrievalMode::External.extract(&img).unwrap();
        // Every pixel is foreground, so the whole frame is one region.
        assert_eq!(result.len(), 1);
    }
}
