//! Render options shared by every map renderer.

use std::path::Path;

use grid_processor::EnhancementConfig;
use raster_common::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};

use renderer::DEFAULT_RAMP;

/// Tile set name that disables all base layers.
pub const NO_TILES: &str = "none";

/// Everything a caller can tune about a rendered map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Color ramp name, `_r` suffix for reversed.
    pub colormap: String,

    /// Lower stretch bound; the 2nd percentile when unset.
    pub vmin: Option<f64>,

    /// Upper stretch bound; the 98th percentile when unset.
    pub vmax: Option<f64>,

    /// Overlay opacity in `[0, 1]`.
    pub opacity: f64,

    /// Fraction of the AOI extent added around it for clip bounds.
    pub padding_factor: f64,

    #[serde(flatten)]
    pub enhancement: EnhancementConfig,

    /// Base tile set: a known name, a `{z}/{x}/{y}` URL template or `none`.
    pub base_tiles: String,

    pub tile_attribution: Option<String>,

    /// Initial zoom; renderers pick their own default when unset.
    pub zoom_start: Option<u8>,

    /// True-color stretch percentiles.
    pub stretch_lower: f64,
    pub stretch_upper: f64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            colormap: DEFAULT_RAMP.to_string(),
            vmin: None,
            vmax: None,
            opacity: 0.75,
            padding_factor: 0.3,
            enhancement: EnhancementConfig::default(),
            base_tiles: "CartoDB positron".to_string(),
            tile_attribution: None,
            zoom_start: None,
            stretch_lower: 2.0,
            stretch_upper: 98.0,
        }
    }
}

fn env_f64(name: &str) -> Option<f64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl RenderOptions {
    /// Defaults for the side-by-side comparison of every index.
    pub fn compare_all() -> Self {
        Self {
            enhancement: EnhancementConfig::compare_all(),
            ..Self::default()
        }
    }

    /// Load configuration from `RENDER_*` environment variables.
    pub fn from_env() -> Self {
        let mut options = Self {
            enhancement: EnhancementConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("RENDER_COLORMAP") {
            options.colormap = val;
        }
        if let Some(v) = env_f64("RENDER_VMIN") {
            options.vmin = Some(v);
        }
        if let Some(v) = env_f64("RENDER_VMAX") {
            options.vmax = Some(v);
        }
        if let Some(v) = env_f64("RENDER_OPACITY") {
            options.opacity = v;
        }
        if let Some(v) = env_f64("RENDER_PADDING") {
            options.padding_factor = v;
        }
        if let Ok(val) = std::env::var("RENDER_BASE_TILES") {
            options.base_tiles = val;
        }
        if let Ok(val) = std::env::var("RENDER_TILE_ATTRIBUTION") {
            options.tile_attribution = Some(val);
        }
        if let Some(zoom) = std::env::var("RENDER_ZOOM").ok().and_then(|v| v.parse().ok()) {
            options.zoom_start = Some(zoom);
        }
        if let Some(v) = env_f64("RENDER_STRETCH_LOWER") {
            options.stretch_lower = v;
        }
        if let Some(v) = env_f64("RENDER_STRETCH_UPPER") {
            options.stretch_upper = v;
        }

        options
    }

    /// Load options from a JSON file; absent fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| RenderError::input_not_found(path, e))?;
        let options: Self = serde_json::from_str(&text)
            .map_err(|e| RenderError::invalid_config(format!("{}: {}", path.display(), e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RenderResult<()> {
        self.enhancement.validate()?;

        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(RenderError::invalid_config("opacity must be within [0, 1]"));
        }

        if !(self.padding_factor.is_finite() && self.padding_factor >= 0.0) {
            return Err(RenderError::invalid_config("padding_factor must be >= 0"));
        }

        if let (Some(min), Some(max)) = (self.vmin, self.vmax) {
            if min >= max {
                return Err(RenderError::invalid_config(format!(
                    "vmin ({}) must be lower than vmax ({})",
                    min, max
                )));
            }
        }

        if !(0.0 <= self.stretch_lower && self.stretch_lower < self.stretch_upper && self.stretch_upper <= 100.0) {
            return Err(RenderError::invalid_config(
                "stretch percentiles must satisfy 0 <= lower < upper <= 100",
            ));
        }

        renderer::ColorRamp::named(&self.colormap)?;
        crate::document::BaseTiles::resolve(&self.base_tiles, self.tile_attribution.as_deref())?;

        Ok(())
    }
}
