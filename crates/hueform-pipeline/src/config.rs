//! Pipeline configuration and its shared, snapshot-on-read handle.

use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::classify::MaxRegionSize;
use crate::color::{BandColor, HueBand, HueRange};
use crate::contour::RetrievalMode;
use crate::simplify::DEFAULT_EPSILON_FACTOR;
use crate::types::PipelineError;

/// Which intermediate images a frame run keeps for inspection.
///
/// Contours are always kept; images cost a full-frame copy each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugViews {
    /// Keep the binary foreground mask.
    pub mask: bool,
    /// Keep the hue image.
    pub hue: bool,
    /// Keep each band's selection mask.
    pub band_masks: bool,
}

impl DebugViews {
    /// Every view enabled.
    pub const ALL: Self = Self {
        mask: true,
        hue: true,
        band_masks: true,
    };
}

/// Tunable parameters for one frame run.
///
/// The interactive control surface produces new values of this type
/// between frames; a run only ever reads the snapshot it started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Luminance cut level: pixels at or above become the light class.
    pub threshold_low: u8,
    /// Value written for the light class before inversion.
    pub threshold_high: u8,
    /// Hue range of the red bucket.
    pub red_hue: HueRange,
    /// Hue range of the green bucket.
    pub green_hue: HueRange,
    /// Hue range of the blue bucket.
    pub blue_hue: HueRange,
    /// Which contours to extract.
    pub retrieval_mode: RetrievalMode,
    /// RDP tolerance as a fraction of contour perimeter.
    pub epsilon_factor: f64,
    /// Bounding-box rejection filter.
    pub max_region_size: MaxRegionSize,
    /// Emit shapes. When off, the frame still runs but returns none.
    pub show_shapes: bool,
    /// Intermediate images to keep.
    pub debug_views: DebugViews,
}

impl PipelineConfig {
    /// Default luminance cut level.
    pub const DEFAULT_THRESHOLD_LOW: u8 = 100;
    /// Default light-class value.
    pub const DEFAULT_THRESHOLD_HIGH: u8 = 255;
    /// Default red hue range.
    pub const DEFAULT_RED_HUE: HueRange = HueRange::new(0, 10);
    /// Default green hue range.
    pub const DEFAULT_GREEN_HUE: HueRange = HueRange::new(40, 80);
    /// Default blue hue range.
    pub const DEFAULT_BLUE_HUE: HueRange = HueRange::new(100, 130);
    /// Default RDP tolerance factor.
    pub const DEFAULT_EPSILON_FACTOR: f64 = DEFAULT_EPSILON_FACTOR;

    /// Hue bands in tie-break order: red, green, blue.
    #[must_use]
    pub const fn bands(&self) -> [HueBand; 3] {
        [
            HueBand {
                color: BandColor::Red,
                range: self.red_hue,
            },
            HueBand {
                color: BandColor::Green,
                range: self.green_hue,
            },
            HueBand {
                color: BandColor::Blue,
                range: self.blue_hue,
            },
        ]
    }

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidConfig`] when the threshold pair
    /// is inverted, a hue range is inverted or off-scale, or the
    /// epsilon factor is outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.threshold_low > self.threshold_high {
            return Err(PipelineError::InvalidConfig(format!(
                "threshold_low ({}) > threshold_high ({})",
                self.threshold_low, self.threshold_high
            )));
        }
        for band in self.bands() {
            band.range.validate(&band.color.to_string())?;
        }
        if !(self.epsilon_factor > 0.0 && self.epsilon_factor <= 1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "epsilon_factor must be in (0, 1], got {}",
                self.epsilon_factor
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold_low: Self::DEFAULT_THRESHOLD_LOW,
            threshold_high: Self::DEFAULT_THRESHOLD_HIGH,
            red_hue: Self::DEFAULT_RED_HUE,
            green_hue: Self::DEFAULT_GREEN_HUE,
            blue_hue: Self::DEFAULT_BLUE_HUE,
            retrieval_mode: RetrievalMode::default(),
            epsilon_factor: Self::DEFAULT_EPSILON_FACTOR,
            max_region_size: MaxRegionSize::default(),
            show_shapes: true,
            debug_views: DebugViews::default(),
        }
    }
}

/// Config shared between a control surface and a frame loop on
/// another thread.
///
/// Writers replace fields under the lock; the frame loop copies the
/// whole value once per frame, so it never sees half of an update.
#[derive(Debug, Clone, Default)]
pub struct SharedConfig(Arc<RwLock<PipelineConfig>>);

impl SharedConfig {
    /// Wrap an initial configuration.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Copy of the current configuration.
    #[must_use]
    pub fn snapshot(&self) -> PipelineConfig {
        // The config is plain data; a panicked writer cannot leave it
        // in a state worse than any other value.
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply an edit atomically with respect to [`snapshot`](Self::snapshot).
    pub fn update(&self, edit: impl FnOnce(&mut PipelineConfig)) {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        edit(&mut guard);
    }
}
