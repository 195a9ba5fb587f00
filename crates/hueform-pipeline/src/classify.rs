//! Shape classification by vertex count, with an optional size filter.
//!
//! The mapping is deliberately coarse: 3 vertices is a triangle, 4 is a
//! rectangle, anything else is a circle-like blob. No geometric fit is
//! attempted.

use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, Dimensions, Polygon, ShapeKind};

/// How the maximum accepted region size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MaxRegionSize {
    /// Half the frame width and half the frame height.
    #[default]
    HalfFrame,
    /// Fixed pixel limits.
    Fixed {
        /// Largest accepted bounding-box width.
        width: u32,
        /// Largest accepted bounding-box height.
        height: u32,
    },
    /// Accept regions of any size.
    Unlimited,
}

impl MaxRegionSize {
    /// Resolve into a concrete filter for a frame of the given size.
    #[must_use]
    pub const fn filter_for(self, frame: Dimensions) -> Option<RegionFilter> {
        match self {
            Self::HalfFrame => Some(RegionFilter {
                max_width: frame.width / 2,
                max_height: frame.height / 2,
            }),
            Self::Fixed { width, height } => Some(RegionFilter {
                max_width: width,
                max_height: height,
            }),
            Self::Unlimited => None,
        }
    }
}

/// Rejects bounding boxes larger than a fixed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionFilter {
    /// Largest accepted width.
    pub max_width: u32,
    /// Largest accepted height.
    pub max_height: u32,
}

impl RegionFilter {
    /// Whether `bbox` exceeds the limit in either direction.
    #[must_use]
    pub const fn rejects(&self, bbox: &BoundingBox) -> bool {
        bbox.width > self.max_width || bbox.height > self.max_height
    }
}

/// Why a polygon produced no shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Fewer than three vertices.
    TooFewPoints(usize),
    /// Bounding box exceeds the configured region size.
    Oversized(BoundingBox),
    /// No vertex lies inside the frame.
    OutsideFrame,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TooFewPoints(n) => write!(f, "{n} vertices, need at least 3"),
            Self::Oversized(b) => write!(f, "region {}x{} exceeds size limit", b.width, b.height),
            Self::OutsideFrame => f.write_str("polygon lies outside the frame"),
        }
    }
}

/// Classify a polygon, applying the size filter when one is given.
///
/// `bbox` is the polygon's bounding box; it is only consulted when a
/// filter is present.
///
/// # Errors
///
/// Returns a [`Rejection`] for polygons with fewer than 3 vertices or
/// whose bounding box the filter rejects. These are expected outcomes,
/// not pipeline errors.
pub fn classify(
    polygon: &Polygon,
    bbox: &BoundingBox,
    filter: Option<&RegionFilter>,
) -> Result<ShapeKind, Rejection> {
    let kind =
        ShapeKind::from_vertex_count(polygon.len()).ok_or(Rejection::TooFewPoints(polygon.len()))?;
    if filter.is_some_and(|f| f.rejects(bbox)) {
        return Err(Rejection::Oversized(*bbox));
    }
    Ok(kind)
}
