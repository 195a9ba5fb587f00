//! Region color sampling against three hue bands.
//!
//! Each band selects pixels whose hue lies in its inclusive range and
//! whose saturation and value reach [`SV_FLOOR`]. A region's color is
//! the band with the strictly largest count inside its bounding box;
//! earlier bands win ties, and a region no band touches is black.
//!
//! [`sample_color`] is the direct form. [`BandMasks`] builds the masks
//! once per frame and answers every region from them, which gives the
//! same result without rescanning the frame per region.

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::hsv::{HUE_MAX, Hsv, HueImage};
use crate::pool::{BufferPool, PooledBuffer};
use crate::types::{BoundingBox, Color, Dimensions, PipelineError};

/// Minimum saturation and value for a pixel to count toward any band.
pub const SV_FLOOR: u8 = 100;

/// Mask value for selected pixels.
const SELECTED: u8 = 255;

/// The three recognized color buckets, in tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BandColor {
    /// Red.
    Red,
    /// Green.
    Green,
    /// Blue.
    Blue,
}

impl BandColor {
    /// All buckets in declaration order.
    pub const ALL: [Self; 3] = [Self::Red, Self::Green, Self::Blue];

    /// The color a matching region is drawn with.
    #[must_use]
    pub const fn rgb(self) -> Color {
        match self {
            Self::Red => Color::new(255, 0, 0),
            Self::Green => Color::new(0, 255, 0),
            Self::Blue => Color::new(0, 0, 255),
        }
    }
}

impl std::fmt::Display for BandColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => f.write_str("red"),
            Self::Green => f.write_str("green"),
            Self::Blue => f.write_str("blue"),
        }
    }
}

/// Inclusive hue interval on the 0..=180 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueRange {
    /// Lowest accepted hue.
    pub low: u8,
    /// Highest accepted hue.
    pub high: u8,
}

impl HueRange {
    /// Create a new range.
    #[must_use]
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    /// Whether `hue` lies in the range.
    #[must_use]
    pub const fn contains(self, hue: u8) -> bool {
        self.low <= hue && hue <= self.high
    }

    /// Check ordering and scale.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] if `low > high` or
    /// `high` exceeds the hue scale.
    pub fn validate(self, name: &str) -> Result<(), PipelineError> {
        if self.low > self.high {
            return Err(PipelineError::InvalidConfig(format!(
                "{name} hue range is inverted ({} > {})",
                self.low, self.high
            )));
        }
        if self.high > HUE_MAX {
            return Err(PipelineError::InvalidConfig(format!(
                "{name} hue range ends at {}, above {HUE_MAX}",
                self.high
            )));
        }
        Ok(())
    }
}

/// A color bucket and the hue interval that selects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HueBand {
    /// Which bucket this band reports.
    pub color: BandColor,
    /// Accepted hues.
    pub range: HueRange,
}

impl HueBand {
    /// Whether a pixel belongs to this band.
    #[must_use]
    pub const fn selects(&self, px: Hsv) -> bool {
        self.range.contains(px.h) && px.s >= SV_FLOOR && px.v >= SV_FLOOR
    }
}

/// Dominant band color inside `bbox`, scanning the whole hue image.
///
/// Builds each band's full-frame mask and counts selected pixels in
/// the box. Prefer [`BandMasks`] when sampling many regions per frame.
#[must_use]
pub fn sample_color(hue: &HueImage, bbox: &BoundingBox, bands: &[HueBand]) -> Color {
    let dims = hue.dimensions();
    let counts = bands.iter().map(|band| {
        let mut mask = vec![0u8; mask_len(dims)];
        fill_mask(hue, band, &mut mask);
        count_in_box(&mask, dims, bbox)
    });
    pick(bands.iter().map(|b| b.color).zip(counts))
}

/// Full-frame band masks for one frame, backed by pooled buffers.
#[derive(Debug)]
pub struct BandMasks<'a> {
    dimensions: Dimensions,
    masks: Vec<(HueBand, PooledBuffer<'a>)>,
}

impl<'a> BandMasks<'a> {
    /// Build one mask per band in a single pass per band.
    pub fn build(hue: &HueImage, bands: &[HueBand], pool: &'a BufferPool) -> Self {
        let dimensions = hue.dimensions();
        let masks = bands
            .iter()
            .map(|band| {
                let mut buf = pool.acquire(mask_len(dimensions));
                fill_mask(hue, band, &mut buf);
                (*band, buf)
            })
            .collect();
        Self { dimensions, masks }
    }

    /// Dominant band color inside `bbox`.
    #[must_use]
    pub fn dominant(&self, bbox: &BoundingBox) -> Color {
        pick(
            self.masks
                .iter()
                .map(|(band, mask)| (band.color, count_in_box(mask, self.dimensions, bbox))),
        )
    }

    /// Copy one band's mask out as an image.
    #[must_use]
    pub fn to_image(&self, color: BandColor) -> Option<GrayImage> {
        let (_, mask) = self.masks.iter().find(|(band, _)| band.color == color)?;
        GrayImage::from_raw(self.dimensions.width, self.dimensions.height, mask.to_vec())
    }
}

/// Strictly-greater running max starting from black with count 0.
fn pick(counts: impl Iterator<Item = (BandColor, u64)>) -> Color {
    let mut best = Color::BLACK;
    let mut best_count = 0;
    for (color, count) in counts {
        if count > best_count {
            best_count = count;
            best = color.rgb();
        }
    }
    best
}

fn mask_len(dims: Dimensions) -> usize {
    usize::try_from(dims.pixel_count()).unwrap_or(0)
}

fn fill_mask(hue: &HueImage, band: &HueBand, mask: &mut [u8]) {
    for (px, out) in hue.pixels().zip(mask.iter_mut()) {
        *out = if band.selects(px) { SELECTED } else { 0 };
    }
}

fn count_in_box(mask: &[u8], dims: Dimensions, bbox: &BoundingBox) -> u64 {
    let width = dims.width as usize;
    let right = bbox.right().min(dims.width) as usize;
    let bottom = bbox.bottom().min(dims.height);
    let left = (bbox.x as usize).min(right);
    (bbox.y..bottom)
        .map(|y| {
            let row = y as usize * width;
            mask[row + left..row + right]
                .iter()
                .map(|&v| u64::from(v == SELECTED))
                .sum::<u64>()
        })
        .sum()
}
