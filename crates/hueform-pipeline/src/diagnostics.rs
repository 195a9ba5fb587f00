//! Pipeline diagnostics: timing and counts for each stage.
//!
//! Time is read through the [`Clock`] trait so the crate stays free of
//! platform time sources; the caller supplies one.
//!
//! In JSON every duration is a plain number of seconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::frame::Frame;
use crate::pipeline::{FrameResult, Pipeline, PipelineStage};
use crate::pool::BufferPool;
use crate::types::{Contour, GrayImage, PipelineError};

/// `Duration` as `f64` seconds.
mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, out: S) -> Result<S::Ok, S::Error> {
        out.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(input: D) -> Result<Duration, D::Error> {
        let raw = f64::deserialize(input)?;
        Duration::try_from_secs_f64(raw)
            .map_err(|e| serde::de::Error::custom(format!("bad duration {raw}: {e}")))
    }
}

/// Source of monotonic time for stage measurements.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time elapsed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Diagnostics collected from a single frame run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Luminance threshold and inversion.
    pub binarize: StageDiagnostics,
    /// Border following.
    pub contour_extraction: StageDiagnostics,
    /// RDP simplification.
    pub simplification: StageDiagnostics,
    /// Vertex-count classification and size filtering.
    pub classification: StageDiagnostics,
    /// Hue conversion, band masks, and per-region sampling.
    pub color_sampling: StageDiagnostics,
    /// Whole frame, start to finish.
    #[serde(with = "seconds")]
    pub total_duration: Duration,
    /// Frame-level counts.
    pub summary: PipelineSummary,
}

/// Timing and counts for one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Time spent in the stage.
    #[serde(with = "seconds")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Binarization metrics.
    Binarize {
        /// Luminance cut level.
        threshold_low: u8,
        /// Light-class value before inversion.
        threshold_high: u8,
        /// Non-zero mask pixels.
        foreground_pixels: u64,
        /// Total pixel count.
        total_pixels: u64,
    },
    /// Contour extraction metrics.
    ContourExtraction {
        /// Retrieval mode used.
        mode: String,
        /// Contours kept.
        contour_count: usize,
        /// Boundary points over all contours.
        total_point_count: usize,
        /// Shortest contour.
        min_contour_points: usize,
        /// Longest contour.
        max_contour_points: usize,
        /// Average contour length.
        mean_contour_points: f64,
    },
    /// Simplification metrics.
    Simplification {
        /// Tolerance as a fraction of perimeter.
        epsilon_factor: f64,
        /// Polygons produced.
        polygon_count: usize,
        /// Total contour points before simplification.
        points_before: usize,
        /// Total polygon vertices after simplification.
        points_after: usize,
    },
    /// Classification metrics.
    Classification {
        /// Accepted triangles.
        triangles: usize,
        /// Accepted rectangles.
        rectangles: usize,
        /// Accepted circle-like blobs.
        circles: usize,
        /// Polygons with fewer than three vertices.
        too_few_points: usize,
        /// Polygons rejected by the size filter.
        oversized: usize,
    },
    /// Color sampling metrics.
    ColorSampling {
        /// Regions colored red.
        red: usize,
        /// Regions colored green.
        green: usize,
        /// Regions colored blue.
        blue: usize,
        /// Regions no band matched.
        unmatched: usize,
    },
}

/// Frame-level counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSummary {
    /// Frame width in pixels.
    pub image_width: u32,
    /// Frame height in pixels.
    pub image_height: u32,
    /// Total pixel count.
    pub pixel_count: u64,
    /// Contours extracted.
    pub contour_count: usize,
    /// Shapes emitted.
    pub shape_count: usize,
    /// Number of contours dropped before coloring.
    pub rejected_count: usize,
}

/// Run one frame through every stage, timing each.
///
/// # Errors
///
/// Returns the same errors as [`ShapeDetector::process`](crate::ShapeDetector::process).
pub fn process_with_diagnostics<C: Clock>(
    frame: Frame,
    config: &PipelineConfig,
    pool: &BufferPool,
    clock: &C,
) -> Result<(FrameResult, PipelineDiagnostics), PipelineError> {
    let start = clock.now();

    let t = clock.now();
    let binarized = Pipeline::new(frame, config.clone()).binarize()?;
    let binarize = timed(clock, &t, &binarized);

    let t = clock.now();
    let extracted = binarized.extract_contours()?;
    let contour_extraction = timed(clock, &t, &extracted);

    let t = clock.now();
    let simplified = extracted.simplify();
    let simplification = timed(clock, &t, &simplified);

    let t = clock.now();
    let classified = simplified.classify();
    let classification = timed(clock, &t, &classified);

    let t = clock.now();
    let colored = classified.sample_colors(pool);
    let color_sampling = timed(clock, &t, &colored);

    let result = colored.into_result();
    let total_duration = clock.elapsed(&start);

    let summary = PipelineSummary {
        image_width: result.dimensions.width,
        image_height: result.dimensions.height,
        pixel_count: result.dimensions.pixel_count(),
        contour_count: result.contours.len(),
        shape_count: result.shapes.len(),
        rejected_count: result.rejected,
    };

    Ok((
        result,
        PipelineDiagnostics {
            binarize,
            contour_extraction,
            simplification,
            classification,
            color_sampling,
            total_duration,
            summary,
        },
    ))
}

fn timed<C: Clock, S: PipelineStage>(clock: &C, since: &C::Instant, stage: &S) -> StageDiagnostics {
    let duration = clock.elapsed(since);
    StageDiagnostics {
        duration,
        metrics: stage.metrics(),
    }
}

impl PipelineDiagnostics {
    /// Plain-text table of stage timings and counts.
    #[must_use]
    pub fn report(&self) -> String {
        let total = millis(self.total_duration);
        let summary = &self.summary;

        let mut out = format!(
            "Frame {}x{} ({} px), {total:.3}ms\n",
            summary.image_width, summary.image_height, summary.pixel_count,
        );
        out.push_str(&format!("{:<20} {:>10} {:>7}  {}\n", "stage", "ms", "share", "detail"));
        out.push_str(&"-".repeat(72));
        out.push('\n');

        for (name, stage) in self.stages() {
            let ms = millis(stage.duration);
            let share = if total > 0.0 { 100.0 * ms / total } else { 0.0 };
            out.push_str(&format!(
                "{name:<20} {ms:>10.3} {share:>6.1}%  {}\n",
                describe(&stage.metrics)
            ));
        }

        out.push_str(&format!(
            "contours={} shapes={} rejected={}",
            summary.contour_count, summary.shape_count, summary.rejected_count,
        ));
        out
    }

    /// Stage diagnostics paired with display names, in pipeline order.
    #[must_use]
    pub fn stages(&self) -> [(&'static str, &StageDiagnostics); 5] {
        [
            ("Binarize", &self.binarize),
            ("Contour Extraction", &self.contour_extraction),
            ("Simplification", &self.simplification),
            ("Classification", &self.classification),
            ("Color Sampling", &self.color_sampling),
        ]
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn describe(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Binarize {
            threshold_low,
            threshold_high,
            foreground_pixels,
            total_pixels,
        } => {
            #[allow(clippy::cast_precision_loss)]
            let coverage = if *total_pixels == 0 {
                0.0
            } else {
                100.0 * *foreground_pixels as f64 / *total_pixels as f64
            };
            format!(
                "cut {threshold_low}/{threshold_high}, {foreground_pixels} foreground ({coverage:.1}%)"
            )
        }
        StageMetrics::ContourExtraction {
            mode,
            contour_count,
            total_point_count,
            min_contour_points,
            max_contour_points,
            mean_contour_points,
        } => format!(
            "{mode}: {contour_count} contours, {total_point_count} pts \
             [{min_contour_points}..{max_contour_points}, avg {mean_contour_points:.1}]"
        ),
        StageMetrics::Simplification {
            epsilon_factor,
            polygon_count,
            points_before,
            points_after,
        } => format!(
            "eps {epsilon_factor:.3}*perimeter, {polygon_count} polygons, {points_before} -> {points_after} pts"
        ),
        StageMetrics::Classification {
            triangles,
            rectangles,
            circles,
            too_few_points,
            oversized,
        } => format!(
            "tri={triangles} rect={rectangles} circle={circles} degenerate={too_few_points} oversized={oversized}"
        ),
        StageMetrics::ColorSampling {
            red,
            green,
            blue,
            unmatched,
        } => format!("red={red} green={green} blue={blue} black={unmatched}"),
    }
}

/// Count non-zero pixels in a mask.
pub(crate) fn count_foreground(mask: &GrayImage) -> u64 {
    mask.pixels().map(|p| u64::from(p.0[0] != 0)).sum()
}

/// Point counts over a contour list.
pub(crate) struct ContourStats {
    pub total: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

pub(crate) fn contour_stats(contours: &[Contour]) -> ContourStats {
    let lengths = || contours.iter().map(Contour::len);
    let total: usize = lengths().sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = match contours.len() {
        0 => 0.0,
        n => total as f64 / n as f64,
    };
    ContourStats {
        total,
        min: lengths().min().unwrap_or(0),
        max: lengths().max().unwrap_or(0),
        mean,
    }
}
