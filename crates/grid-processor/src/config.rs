//! Configuration for the enhancement chain.

use raster_common::{RenderError, RenderResult};
use serde::{Deserialize, Serialize};

/// Options controlling clipping, sharpening, upsampling and smoothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Mask the grid to the AOI polygons and read only the AOI window.
    pub clip: bool,

    /// Resampling factor; values `<= 1` disable upsampling.
    pub upsample_factor: f64,

    /// Apply an unsharp mask before masking.
    pub sharpen: bool,

    /// Gaussian sigma of the unsharp mask, in pixels.
    pub sharpen_radius: f64,

    /// Strength of the unsharp mask.
    pub sharpen_amount: f64,

    /// Gaussian sigma applied after upsampling; `<= 0` disables smoothing.
    pub smooth_radius: f64,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            clip: false,
            upsample_factor: 1.0,
            sharpen: false,
            sharpen_radius: 1.0,
            sharpen_amount: 1.3,
            smooth_radius: 0.0,
        }
    }
}

fn env_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl EnhancementConfig {
    /// Settings used for the persisted side-by-side comparison of all indices.
    pub fn compare_all() -> Self {
        Self {
            clip: true,
            upsample_factor: 12.0,
            sharpen: true,
            sharpen_radius: 1.2,
            sharpen_amount: 1.5,
            smooth_radius: 1.0,
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RENDER_CLIP") {
            config.clip = env_flag(&val);
        }

        if let Ok(val) = std::env::var("RENDER_UPSAMPLE") {
            if let Ok(factor) = val.parse() {
                config.upsample_factor = factor;
            }
        }

        if let Ok(val) = std::env::var("RENDER_SHARPEN") {
            config.sharpen = env_flag(&val);
        }

        if let Ok(val) = std::env::var("RENDER_SHARPEN_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.sharpen_radius = radius;
            }
        }

        if let Ok(val) = std::env::var("RENDER_SHARPEN_AMOUNT") {
            if let Ok(amount) = val.parse() {
                config.sharpen_amount = amount;
            }
        }

        if let Ok(val) = std::env::var("RENDER_SMOOTH_RADIUS") {
            if let Ok(radius) = val.parse() {
                config.smooth_radius = radius;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RenderResult<()> {
        if !(self.upsample_factor.is_finite() && self.upsample_factor > 0.0) {
            return Err(RenderError::invalid_config("upsample_factor must be > 0"));
        }

        if !(self.sharpen_radius.is_finite() && self.sharpen_radius >= 0.0) {
            return Err(RenderError::invalid_config("sharpen_radius must be >= 0"));
        }

        if !self.sharpen_amount.is_finite() {
            return Err(RenderError::invalid_config("sharpen_amount must be finite"));
        }

        if !(self.smooth_radius.is_finite() && self.smooth_radius >= 0.0) {
            return Err(RenderError::invalid_config("smooth_radius must be >= 0"));
        }

        Ok(())
    }
}
