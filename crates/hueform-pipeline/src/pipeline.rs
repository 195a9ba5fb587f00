//! Frame pipeline: advance stage-by-stage, inspecting each
//! intermediate result before continuing.
//!
//! ```rust
//! # use hueform_pipeline::{BufferPool, Frame, Pipeline, PipelineConfig, PipelineError};
//! # fn run(frame: Frame) -> Result<(), PipelineError> {
//! let pool = BufferPool::new();
//! let result = Pipeline::new(frame, PipelineConfig::default())
//!     .binarize()?
//!     .extract_contours()?
//!     .simplify()
//!     .classify()
//!     .sample_colors(&pool)
//!     .into_result();
//!
//! for shape in &result.shapes {
//!     println!("{} with {} vertices", shape.kind, shape.points.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next stage,
//! carrying forward what later stages and the final [`FrameResult`]
//! need. Per-contour rejections never fail a stage: the contour is
//! logged, counted, and skipped.
//!
//! [`ShapeDetector`] wraps the stages for a frame loop, reusing one
//! [`BufferPool`] across frames and keeping the last frame's contours
//! and debug images for an external viewer.

use tracing::{debug, trace};

use crate::classify::{self, Rejection};
use crate::color::{BandColor, BandMasks};
use crate::config::{PipelineConfig, SharedConfig};
use crate::contour::ContourExtractor;
use crate::diagnostics::StageMetrics;
use crate::frame::Frame;
use crate::hsv::{self, HueImage};
use crate::pool::BufferPool;
use crate::types::{
    BoundingBox, Color, Contour, Dimensions, DrawableShape, GrayImage, PipelineError, Polygon,
    ShapeKind,
};

/// Entry point for the typed stage API.
pub struct Pipeline;

impl Pipeline {
    /// Start a frame run. Nothing is computed until the first stage
    /// method is called.
    #[allow(clippy::new_ret_no_self)]
    pub const fn new(frame: Frame, config: PipelineConfig) -> Pending {
        Pending { config, frame }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// A frame and its config snapshot, not yet processed.
#[must_use = "pipeline stages are consumed by advancing; call .binarize() to continue"]
pub struct Pending {
    config: PipelineConfig,
    frame: Frame,
}

impl Pending {
    /// The input frame.
    #[must_use]
    pub const fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Validate the config and binarize the frame.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if the config fails
    /// [`PipelineConfig::validate`].
    pub fn binarize(self) -> Result<Binarized, PipelineError> {
        self.config.validate()?;
        let mask = crate::binarize::binarize(
            self.frame.image(),
            self.config.threshold_low,
            self.config.threshold_high,
        );
        Ok(Binarized {
            dimensions: self.frame.dimensions(),
            config: self.config,
            frame: self.frame,
            mask,
        })
    }
}

// ───────────────────────── Stage 1: Binarized ────────────────────────

/// Frame after binarization.
#[must_use = "pipeline stages are consumed by advancing; call .extract_contours() to continue"]
pub struct Binarized {
    config: PipelineConfig,
    frame: Frame,
    mask: GrayImage,
    dimensions: Dimensions,
}

impl Binarized {
    /// The white-on-black foreground mask.
    #[must_use]
    pub const fn mask(&self) -> &GrayImage {
        &self.mask
    }

    /// Extract region boundaries from the mask.
    ///
    /// A mask with no foreground yields an empty contour list, not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidInput`] if the mask is not binary.
    pub fn extract_contours(self) -> Result<ContoursExtracted, PipelineError> {
        let contours = self.config.retrieval_mode.extract(&self.mask)?;
        Ok(ContoursExtracted {
            config: self.config,
            frame: self.frame,
            mask: self.mask,
            contours,
            dimensions: self.dimensions,
        })
    }
}

// ───────────────────────── Stage 2: ContoursExtracted ────────────────

/// Frame after contour extraction.
#[must_use = "pipeline stages are consumed by advancing; call .simplify() to continue"]
pub struct ContoursExtracted {
    config: PipelineConfig,
    frame: Frame,
    mask: GrayImage,
    contours: Vec<Contour>,
    dimensions: Dimensions,
}

impl ContoursExtracted {
    /// The extracted contours, in discovery order.
    #[must_use]
    pub fn contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Simplify every contour to a polygon.
    pub fn simplify(self) -> Simplified {
        let polygons = self
            .contours
            .iter()
            .enumerate()
            .filter_map(
                |(index, contour)| match crate::simplify::simplify(contour, self.config.epsilon_factor) {
                    Ok(polygon) => Some((index, polygon)),
                    Err(e) => {
                        debug!(contour = index, error = %e, "skipping contour");
                        None
                    }
                },
            )
            .collect();
        Simplified {
            config: self.config,
            frame: self.frame,
            mask: self.mask,
            contours: self.contours,
            polygons,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 3: Simplified ───────────────────────

/// Frame after polygon simplification.
#[must_use = "pipeline stages are consumed by advancing; call .classify() to continue"]
pub struct Simplified {
    config: PipelineConfig,
    frame: Frame,
    mask: GrayImage,
    contours: Vec<Contour>,
    /// `(contour index, polygon)` for every contour that simplified.
    polygons: Vec<(usize, Polygon)>,
    dimensions: Dimensions,
}

impl Simplified {
    /// Simplified polygons paired with the index of their contour.
    #[must_use]
    pub fn polygons(&self) -> &[(usize, Polygon)] {
        &self.polygons
    }

    /// Classify each polygon, dropping degenerate and oversized ones.
    pub fn classify(self) -> Classified {
        let filter = self.config.max_region_size.filter_for(self.dimensions);
        let mut regions = Vec::with_capacity(self.polygons.len());
        let mut rejections = Vec::new();

        for (index, polygon) in self.polygons {
            let Some(bbox) = BoundingBox::of(polygon.points(), self.dimensions) else {
                debug!(contour = index, rejection = %Rejection::OutsideFrame, "skipping contour");
                rejections.push(Rejection::OutsideFrame);
                continue;
            };
            match classify::classify(&polygon, &bbox, filter.as_ref()) {
                Ok(kind) => regions.push(Region {
                    kind,
                    polygon,
                    bbox,
                }),
                Err(rejection) => {
                    debug!(contour = index, %rejection, "skipping contour");
                    rejections.push(rejection);
                }
            }
        }

        Classified {
            config: self.config,
            frame: self.frame,
            mask: self.mask,
            contours: self.contours,
            regions,
            rejections,
            dimensions: self.dimensions,
        }
    }
}

/// An accepted polygon awaiting its color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Shape classification.
    pub kind: ShapeKind,
    /// Simplified outline.
    pub polygon: Polygon,
    /// Bounding box within the frame.
    pub bbox: BoundingBox,
}

// ───────────────────────── Stage 4: Classified ───────────────────────

/// Frame after shape classification.
#[must_use = "pipeline stages are consumed by advancing; call .sample_colors() to continue"]
pub struct Classified {
    config: PipelineConfig,
    frame: Frame,
    mask: GrayImage,
    contours: Vec<Contour>,
    regions: Vec<Region>,
    rejections: Vec<Rejection>,
    dimensions: Dimensions,
}

impl Classified {
    /// Regions that passed classification.
    #[must_use]
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Why each rejected polygon was dropped.
    #[must_use]
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    /// Convert to hue space and pick each region's dominant band.
    ///
    /// Band masks are built once for the frame in buffers borrowed
    /// from `pool`, and returned to it before this method returns.
    pub fn sample_colors(self, pool: &BufferPool) -> Colored {
        let hue = hsv::to_hue_space(self.frame.image());
        let bands = self.config.bands();
        let masks = BandMasks::build(&hue, &bands, pool);

        let shapes: Vec<DrawableShape> = self
            .regions
            .into_iter()
            .map(|region| {
                let color = masks.dominant(&region.bbox);
                trace!(kind = %region.kind, vertices = region.polygon.len(), ?color, "shape");
                DrawableShape {
                    kind: region.kind,
                    points: region.polygon,
                    color,
                }
            })
            .collect();

        let views = self.config.debug_views;
        let band_masks = if views.band_masks {
            BandColor::ALL
                .into_iter()
                .filter_map(|c| masks.to_image(c).map(|img| (c, img)))
                .collect()
        } else {
            Vec::new()
        };
        drop(masks);

        Colored {
            show_shapes: self.config.show_shapes,
            artifacts: FrameArtifacts {
                mask: views.mask.then_some(self.mask),
                hue: views.hue.then_some(hue),
                band_masks,
            },
            contours: self.contours,
            shapes,
            rejected: self.rejections.len(),
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Stage 5: Colored ──────────────────────────

/// Frame after color sampling, the final stage.
#[must_use = "call .into_result() to extract the FrameResult"]
pub struct Colored {
    show_shapes: bool,
    artifacts: FrameArtifacts,
    contours: Vec<Contour>,
    shapes: Vec<DrawableShape>,
    rejected: usize,
    dimensions: Dimensions,
}

impl Colored {
    /// Every recognized shape, regardless of `show_shapes`.
    #[must_use]
    pub fn shapes(&self) -> &[DrawableShape] {
        &self.shapes
    }

    /// Consume the pipeline and return the [`FrameResult`].
    #[must_use]
    pub fn into_result(self) -> FrameResult {
        debug!(
            contours = self.contours.len(),
            shapes = self.shapes.len(),
            rejected = self.rejected,
            "frame done"
        );
        FrameResult {
            shapes: if self.show_shapes {
                self.shapes
            } else {
                Vec::new()
            },
            contours: self.contours,
            artifacts: self.artifacts,
            rejected: self.rejected,
            dimensions: self.dimensions,
        }
    }
}

// ───────────────────────── Results and artifacts ─────────────────────

/// Everything one frame run produced.
#[derive(Debug, Clone)]
pub struct FrameResult {
    /// Drawable shapes in contour discovery order. Empty when
    /// `show_shapes` is off.
    pub shapes: Vec<DrawableShape>,
    /// All extracted contours.
    pub contours: Vec<Contour>,
    /// Intermediate images selected by `debug_views`.
    pub artifacts: FrameArtifacts,
    /// Number of contours dropped before coloring.
    pub rejected: usize,
    /// Frame dimensions.
    pub dimensions: Dimensions,
}

/// Names of the retrievable intermediate images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Binary foreground mask.
    Mask,
    /// Hue-space image.
    Hue,
    /// One band's selection mask.
    BandMask(BandColor),
}

impl Artifact {
    /// Every artifact name.
    pub const ALL: [Self; 5] = [
        Self::Mask,
        Self::Hue,
        Self::BandMask(BandColor::Red),
        Self::BandMask(BandColor::Green),
        Self::BandMask(BandColor::Blue),
    ];
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mask => f.write_str("mask"),
            Self::Hue => f.write_str("hue"),
            Self::BandMask(color) => write!(f, "band-{color}"),
        }
    }
}

/// A borrowed artifact image.
#[derive(Debug, Clone, Copy)]
pub enum ArtifactImage<'a> {
    /// Single-channel mask.
    Gray(&'a GrayImage),
    /// Hue-channel-first image.
    Hue(&'a HueImage),
}

/// Intermediate images kept from one frame.
#[derive(Debug, Clone, Default)]
pub struct FrameArtifacts {
    mask: Option<GrayImage>,
    hue: Option<HueImage>,
    band_masks: Vec<(BandColor, GrayImage)>,
}

impl FrameArtifacts {
    /// Look up an artifact; `None` when it was not kept.
    #[must_use]
    pub fn get(&self, artifact: Artifact) -> Option<ArtifactImage<'_>> {
        match artifact {
            Artifact::Mask => self.mask.as_ref().map(ArtifactImage::Gray),
            Artifact::Hue => self.hue.as_ref().map(ArtifactImage::Hue),
            Artifact::BandMask(color) => self
                .band_masks
                .iter()
                .find(|(c, _)| *c == color)
                .map(|(_, img)| ArtifactImage::Gray(img)),
        }
    }

    /// Whether no artifact was kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mask.is_none() && self.hue.is_none() && self.band_masks.is_empty()
    }
}

// ───────────────────────── Frame loop driver ─────────────────────────

/// Runs frames strictly one after another, reusing scratch buffers.
///
/// Holds no cross-frame state other than the pool and the last frame's
/// contours and artifacts, which are replaced (or cleared, on error)
/// by every call.
#[derive(Debug, Default)]
pub struct ShapeDetector {
    pool: BufferPool,
    contours: Vec<Contour>,
    artifacts: FrameArtifacts,
}

impl ShapeDetector {
    /// Create a detector with an empty buffer pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one frame against a config snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] for an invalid config
    /// and [`PipelineError::InvalidInput`] for a malformed mask. Nothing
    /// partial is returned or retained on error.
    pub fn process(
        &mut self,
        frame: Frame,
        config: &PipelineConfig,
    ) -> Result<Vec<DrawableShape>, PipelineError> {
        self.contours.clear();
        self.artifacts = FrameArtifacts::default();

        let result = Pipeline::new(frame, config.clone())
            .binarize()?
            .extract_contours()?
            .simplify()
            .classify()
            .sample_colors(&self.pool)
            .into_result();

        self.contours = result.contours;
        self.artifacts = result.artifacts;
        Ok(result.shapes)
    }

    /// Process one frame against the current value of a shared config.
    ///
    /// # Errors
    ///
    /// See [`process`](Self::process).
    pub fn process_shared(
        &mut self,
        frame: Frame,
        config: &SharedConfig,
    ) -> Result<Vec<DrawableShape>, PipelineError> {
        let snapshot = config.snapshot();
        self.process(frame, &snapshot)
    }

    /// Contours extracted from the last successful frame.
    #[must_use]
    pub fn last_contours(&self) -> &[Contour] {
        &self.contours
    }

    /// Artifacts kept from the last successful frame.
    #[must_use]
    pub const fn artifacts(&self) -> &FrameArtifacts {
        &self.artifacts
    }

    /// The detector's scratch buffer pool.
    #[must_use]
    pub const fn pool(&self) -> &BufferPool {
        &self.pool
    }
}

// ──────────────────── Stage metadata for diagnostics ──────────────────

/// Implemented by every stage that has done work.
pub trait PipelineStage {
    /// Human-readable stage name.
    const NAME: &str;

    /// Stage-specific metrics.
    fn metrics(&self) -> StageMetrics;
}

impl PipelineStage for Binarized {
    const NAME: &str = "binarize";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Binarize {
            threshold_low: self.config.threshold_low,
            threshold_high: self.config.threshold_high,
            foreground_pixels: crate::diagnostics::count_foreground(&self.mask),
            total_pixels: self.dimensions.pixel_count(),
        }
    }
}

impl PipelineStage for ContoursExtracted {
    const NAME: &str = "contours";

    fn metrics(&self) -> StageMetrics {
        let stats = crate::diagnostics::contour_stats(&self.contours);
        StageMetrics::ContourExtraction {
            mode: format!("{:?}", self.config.retrieval_mode),
            contour_count: self.contours.len(),
            total_point_count: stats.total,
            min_contour_points: stats.min,
            max_contour_points: stats.max,
            mean_contour_points: stats.mean,
        }
    }
}

impl PipelineStage for Simplified {
    const NAME: &str = "simplify";

    fn metrics(&self) -> StageMetrics {
        StageMetrics::Simplification {
            epsilon_factor: self.config.epsilon_factor,
            polygon_count: self.polygons.len(),
            points_before: self.contours.iter().map(Contour::len).sum(),
            points_after: self.polygons.iter().map(|(_, p)| p.len()).sum(),
        }
    }
}

impl PipelineStage for Classified {
    const NAME: &str = "classify";

    fn metrics(&self) -> StageMetrics {
        let count = |kind| self.regions.iter().filter(|r| r.kind == kind).count();
        StageMetrics::Classification {
            triangles: count(ShapeKind::Triangle),
            rectangles: count(ShapeKind::Rectangle),
            circles: count(ShapeKind::Circle),
            too_few_points: self
                .rejections
                .iter()
                .filter(|r| matches!(r, Rejection::TooFewPoints(_)))
                .count(),
            oversized: self
                .rejections
                .iter()
                .filter(|r| matches!(r, Rejection::Oversized(_)))
                .count(),
        }
    }
}

impl PipelineStage for Colored {
    const NAME: &str = "color";

    fn metrics(&self) -> StageMetrics {
        let count = |color: Color| self.shapes.iter().filter(|s| s.color == color).count();
        StageMetrics::ColorSampling {
            red: count(BandColor::Red.rgb()),
            green: count(BandColor::Green.rgb()),
            blue: count(BandColor::Blue.rgb()),
            unmatched: count(Color::BLACK),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::classify::MaxRegionSize;
    use crate::config::DebugViews;
    use image::RgbImage;

    /// White frame with a dark square of the given color.
    fn square_frame(color: [u8; 3]) -> Frame {
        Frame::new(RgbImage::from_fn(80, 60, |x, y| {
            if (20..40).contains(&x) && (15..35).contains(&y) {
                image::Rgb(color)
            } else {
                image::Rgb([255, 255, 255])
            }
        }))
        .unwrap()
    }

    #[test]
    fn stages_expose_intermediates() {
        let pool = BufferPool::new();
        let binarized = Pipeline::new(square_frame([0, 0, 0]), PipelineConfig::default())
            .binarize()
            .unwrap();
        assert_eq!(binarized.mask().get_pixel(25, 20).0[0], 255);

        let extracted = binarized.extract_contours().unwrap();
        assert_eq!(extracted.contours().len(), 1);

        let simplified = extracted.simplify();
        assert_eq!(simplified.polygons()[0].1.len(), 4);

        let classified = simplified.classify();
        assert_eq!(classified.regions()[0].kind, ShapeKind::Rectangle);

        let colored = classified.sample_colors(&pool);
        assert_eq!(colored.shapes()[0].color, Color::BLACK);
    }

    #[test]
    fn invalid_config_fails_the_frame() {
        let config = PipelineConfig {
            threshold_low: 255,
            threshold_high: 0,
            ..PipelineConfig::default()
        };
        let result = Pipeline::new(square_frame([0, 0, 0]), config).binarize();
        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn show_shapes_off_still_computes() {
        let config = PipelineConfig {
            show_shapes: false,
            ..PipelineConfig::default()
        };
        let mut detector = ShapeDetector::new();
        let shapes = detector.process(square_frame([0, 0, 0]), &config).unwrap();
        assert!(shapes.is_empty());
        assert_eq!(detector.last_contours().len(), 1);
    }

    #[test]
    fn artifacts_follow_debug_views() {
        let mut detector = ShapeDetector::new();
        detector
            .process(square_frame([0, 0, 0]), &PipelineConfig::default())
            .unwrap();
        assert!(detector.artifacts().is_empty());

        let config = PipelineConfig {
            debug_views: DebugViews::ALL,
            ..PipelineConfig::default()
        };
        detector.process(square_frame([0, 0, 0]), &config).unwrap();
        for artifact in Artifact::ALL {
            assert!(
                detector.artifacts().get(artifact).is_some(),
                "missing {artifact}"
            );
        }
        assert!(matches!(
            detector.artifacts().get(Artifact::Hue),
            Some(ArtifactImage::Hue(_))
        ));
    }

    #[test]
    fn failed_frame_clears_previous_state() {
        let mut detector = ShapeDetector::new();
        let config = PipelineConfig {
            debug_views: DebugViews::ALL,
            ..PipelineConfig::default()
        };
        detector.process(square_frame([0, 0, 0]), &config).unwrap();
        assert!(!detector.last_contours().is_empty());

        let bad = PipelineConfig {
            epsilon_factor: 0.0,
            ..config
        };
        assert!(detector.process(square_frame([0, 0, 0]), &bad).is_err());
        assert!(detector.last_contours().is_empty());
        assert!(detector.artifacts().is_empty());
    }

    #[test]
    fn shared_config_edits_apply_to_the_next_frame() {
        let shared = SharedConfig::new(PipelineConfig::default());
        let mut detector = ShapeDetector::new();

        let before = detector
            .process_shared(square_frame([0, 0, 0]), &shared)
            .unwrap();
        assert_eq!(before.len(), 1);

        // Every pixel is at or above a zero cut, so nothing is foreground.
        shared.update(|c| c.threshold_low = 0);
        let after = detector
            .process_shared(square_frame([0, 0, 0]), &shared)
            .unwrap();
        assert!(after.is_empty());
        assert!(detector.last_contours().is_empty());

        shared.update(|c| c.threshold_low = PipelineConfig::DEFAULT_THRESHOLD_LOW);
        let restored = detector
            .process_shared(square_frame([0, 0, 0]), &shared)
            .unwrap();
        assert_eq!(restored, before);
    }

    #[test]
    fn pool_buffers_are_reused_across_frames() {
        let mut detector = ShapeDetector::new();
        let config = PipelineConfig::default();
        detector.process(square_frame([0, 0, 0]), &config).unwrap();
        assert_eq!(detector.pool().available(), 3);
        detector.process(square_frame([0, 0, 0]), &config).unwrap();
        assert_eq!(detector.pool().available(), 3);
    }

    #[test]
    fn oversized_region_is_counted_as_rejected() {
        // A frame that is almost entirely dark: its one region spans
        // the whole frame.
        let frame = Frame::new(RgbImage::from_fn(40, 40, |x, y| {
            if x == 20 && y == 20 {
                image::Rgb([255, 255, 255])
            } else {
                image::Rgb([0, 0, 0])
            }
        }))
        .unwrap();
        let config = PipelineConfig {
            max_region_size: MaxRegionSize::HalfFrame,
            ..PipelineConfig::default()
        };
        let classified = Pipeline::new(frame, config)
            .binarize()
            .unwrap()
            .extract_contours()
            .unwrap()
            .simplify()
            .classify();
        assert!(classified.regions().is_empty());
        assert!(matches!(
            classified.rejections(),
            [Rejection::Oversized(_)]
        ));
    }

    #[test]
    fn stage_metrics_report_counts() {
        let pool = BufferPool::new();
        let classified = Pipeline::new(square_frame([0, 0, 0]), PipelineConfig::default())
            .binarize()
            .unwrap()
            .extract_contours()
            .unwrap()
            .simplify()
            .classify();
        assert!(matches!(
            classified.metrics(),
            StageMetrics::Classification { rectangles: 1, .. }
        ));
        let colored = classified.sample_colors(&pool);
        assert!(matches!(
            colored.metrics(),
            StageMetrics::ColorSampling { unmatched: 1, .. }
        ));
    }
}
