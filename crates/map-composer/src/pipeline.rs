//! The shared enhancement pipeline that turns a raster source into a
//! prepared layer.

use grid_processor::{require_clip_bounds, ClipConform, EnhancementChain};
use raster_common::{AreaOfInterest, BoundingBox, ClipBounds, GeoTransform, RasterGrid, RenderResult};
use tracing::info;

use crate::config::RenderOptions;
use crate::source::RasterSource;

/// A fully processed grid, ready for colorization.
#[derive(Debug, Clone)]
pub struct PreparedLayer {
    name: String,
    grid: RasterGrid,
    transform: GeoTransform,
    bounds: BoundingBox,
    clip_bounds: Option<ClipBounds>,
    aoi: AreaOfInterest,
}

impl PreparedLayer {
    pub fn new(
        name: impl Into<String>,
        grid: RasterGrid,
        transform: GeoTransform,
        clip_bounds: Option<ClipBounds>,
        aoi: AreaOfInterest,
    ) -> Self {
        let bounds = transform.bounds(grid.rows(), grid.cols());
        Self {
            name: name.into(),
            grid,
            transform,
            bounds,
            clip_bounds,
            aoi,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> &RasterGrid {
        &self.grid
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    /// Extent of the processed grid.
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Padded AOI bounds the layer was clipped to, if any.
    pub fn clip_bounds(&self) -> Option<&ClipBounds> {
        self.clip_bounds.as_ref()
    }

    /// AOI drawn over the layer.
    pub fn aoi(&self) -> &AreaOfInterest {
        &self.aoi
    }

    /// Map extent: the clip bounds when clipped, the grid extent otherwise.
    pub fn view_bounds(&self) -> BoundingBox {
        self.clip_bounds.unwrap_or(self.bounds)
    }
}

/// Routes the chain's conform hook to the source.
struct SourceConform<'a, S: ?Sized>(&'a S);

impl<S: RasterSource + ?Sized> ClipConform for SourceConform<'_, S> {
    fn conform_to_clip(
        &self,
        grid: RasterGrid,
        transform: GeoTransform,
        clip: &ClipBounds,
    ) -> RenderResult<(RasterGrid, GeoTransform)> {
        self.0.conform_to_clip(grid, transform, clip)
    }
}

/// Load, mask and enhance layers against one AOI.
pub struct LayerPipeline<'a> {
    aoi: &'a AreaOfInterest,
    chain: EnhancementChain,
    clip_bounds: Option<ClipBounds>,
}

impl<'a> LayerPipeline<'a> {
    /// Resolve clip bounds once for every layer rendered with `options`.
    pub fn new(options: &RenderOptions, aoi: &'a AreaOfInterest) -> RenderResult<Self> {
        options.validate()?;
        let clip_bounds = if options.enhancement.clip {
            require_clip_bounds(aoi, options.padding_factor)?
        } else {
            None
        };
        Ok(Self {
            aoi,
            chain: EnhancementChain::new(options.enhancement.clone()),
            clip_bounds,
        })
    }

    pub fn clip_bounds(&self) -> Option<&ClipBounds> {
        self.clip_bounds.as_ref()
    }

    pub fn aoi(&self) -> &AreaOfInterest {
        self.aoi
    }

    pub fn prepare(&self, source: &dyn RasterSource) -> RenderResult<PreparedLayer> {
        let loaded = source.load(self.clip_bounds.as_ref())?;
        let (grid, transform) = self.chain.apply(
            loaded.grid,
            loaded.transform,
            self.aoi,
            self.clip_bounds.as_ref(),
            &SourceConform(source),
        )?;
        let layer = PreparedLayer::new(source.name(), grid, transform, self.clip_bounds, self.aoi.clone());

        info!(
            layer = layer.name(),
            rows = layer.grid().rows(),
            cols = layer.grid().cols(),
            finite = layer.grid().finite_count(),
            "Prepared layer"
        );
        Ok(layer)
    }
}
