//! hueform-pipeline: Real-time shape and color recognition (sans-IO).
//!
//! Turns an RGB frame into a list of drawable shapes through:
//! binarize -> contour extraction -> polygon simplification ->
//! classification -> hue-band color sampling.
//!
//! This crate has **no I/O dependencies** beyond decoding in-memory
//! image bytes. Capturing frames, drawing the overlay, and editing the
//! config interactively belong to the caller; a config is handed in
//! per frame, either directly or through a [`SharedConfig`].

pub mod binarize;
pub mod classify;
pub mod color;
pub mod config;
pub mod contour;
pub mod diagnostics;
pub mod frame;
pub mod hsv;
pub mod pipeline;
pub mod pool;
pub mod simplify;
pub mod types;

pub use classify::{MaxRegionSize, Rejection};
pub use color::{BandColor, HueBand, HueRange};
pub use config::{DebugViews, PipelineConfig, SharedConfig};
pub use contour::{ContourExtractor, RetrievalMode};
pub use frame::{Frame, decode_frame};
pub use hsv::{ColorSpace, HueImage};
pub use pipeline::{
    Artifact, ArtifactImage, FrameArtifacts, FrameResult, Pipeline, PipelineStage, ShapeDetector,
};
pub use pool::BufferPool;
pub use types::{
    BoundingBox, Color, Contour, Dimensions, DrawableShape, PipelineError, Point, Polygon,
    ShapeKind,
};

/// Run one frame through every stage and return everything it produced.
///
/// Uses a fresh [`BufferPool`]; a frame loop should hold a
/// [`ShapeDetector`] instead so scratch buffers are reused.
///
/// # Pipeline steps
///
/// 1. Validate the config
/// 2. Binarize (luminance threshold, then invert)
/// 3. Extract contours from the mask
/// 4. Simplify each contour (Ramer-Douglas-Peucker)
/// 5. Classify by vertex count, dropping degenerate and oversized ones
/// 6. Convert to hue space and color each region by its dominant band
///
/// # Errors
///
/// Returns [`PipelineError::InvalidConfig`] if the config fails
/// validation.
/// Returns [`PipelineError::InvalidInput`] if the mask is malformed.
pub fn process(frame: Frame, config: &PipelineConfig) -> Result<FrameResult, PipelineError> {
    let pool = BufferPool::new();
    Ok(Pipeline::new(frame, config.clone())
        .binarize()?
        .extract_contours()?
        .simplify()
        .classify()
        .sample_colors(&pool)
        .into_result())
}

/// Decode image bytes and return the shapes recognized in them.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized.
/// Otherwise the same errors as [`process`].
pub fn detect(
    image_bytes: &[u8],
    config: &PipelineConfig,
) -> Result<Vec<DrawableShape>, PipelineError> {
    let frame = decode_frame(image_bytes)?;
    Ok(process(frame, config)?.shapes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Encode an RGB image as PNG bytes.
    fn encode_png(img: &image::RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .unwrap();
        buf
    }

    /// White frame with a saturated red square.
    fn red_square(width: u32, height: u32) -> image::RgbImage {
        image::RgbImage::from_fn(width, height, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                image::Rgb([255, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn detect_empty_input() {
        let result = detect(&[], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn detect_corrupt_input() {
        let result = detect(&[0xFF, 0x00], &PipelineConfig::default());
        assert!(matches!(result, Err(PipelineError::ImageDecode(_))));
    }

    #[test]
    fn detect_red_square_from_png() {
        let png = encode_png(&red_square(80, 80));
        let shapes = detect(&png, &PipelineConfig::default()).unwrap();
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].kind, ShapeKind::Rectangle);
        assert_eq!(shapes[0].color, BandColor::Red.rgb());
    }

    #[test]
    fn process_reports_dimensions_and_contours() {
        let frame = Frame::new(red_square(80, 60)).unwrap();
        let result = process(frame, &PipelineConfig::default()).unwrap();
        assert_eq!(
            result.dimensions,
            Dimensions {
                width: 80,
                height: 60
            }
        );
        assert_eq!(result.contours.len(), 1);
        assert_eq!(result.rejected, 0);
    }

    #[test]
    fn process_uniform_frame_is_empty() {
        let frame = Frame::new(image::RgbImage::from_pixel(
            30,
            30,
            image::Rgb([255, 255, 255]),
        ))
        .unwrap();
        let result = process(frame, &PipelineConfig::default()).unwrap();
        assert!(result.shapes.is_empty());
        assert!(result.contours.is_empty());
    }
}
