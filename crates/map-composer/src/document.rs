//! Map document model and its self-contained HTML serialization.
//!
//! A [`MapDocument`] is a plain serde model: base tile layers, PNG image
//! overlays embedded as data URIs, AOI outlines, gradient legends and a
//! layer-control widget. [`MapDocument::to_html`] embeds the model as JSON
//! next to a small Leaflet bootstrap script that builds the map from it.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use grid_processor::write_atomic;
use raster_common::{AreaOfInterest, BoundingBox, RenderError, RenderResult};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::NO_TILES;

pub const ESRI_WORLD_IMAGERY_URL: &str =
    "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}";
pub const ESRI_WORLD_IMAGERY: &str = "Esri World Imagery";

const LEAFLET_VERSION: &str = "1.9.4";

const OSM_ATTRIBUTION: &str = "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

/// A slippy-map tile layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayerSpec {
    pub name: String,
    pub url: String,
    pub attribution: String,
}

/// The primary base layer of a document, or none at all.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseTiles {
    None,
    Layer(TileLayerSpec),
}

impl BaseTiles {
    /// Resolve a tile set name or URL template.
    ///
    /// Known names are matched case-insensitively. URL templates must carry
    /// an attribution.
    pub fn resolve(name: &str, attribution: Option<&str>) -> RenderResult<Self> {
        let known = match name.to_lowercase().as_str() {
            NO_TILES => return Ok(BaseTiles::None),
            "openstreetmap" => Some(("https://tile.openstreetmap.org/{z}/{x}/{y}.png", OSM_ATTRIBUTION.to_string())),
            "cartodb positron" => Some((
                "https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png",
                format!("{} &copy; <a href=\"https://carto.com/attributions\">CARTO</a>", OSM_ATTRIBUTION),
            )),
            "cartodb dark_matter" => Some((
                "https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png",
                format!("{} &copy; <a href=\"https://carto.com/attributions\">CARTO</a>", OSM_ATTRIBUTION),
            )),
            _ => None,
        };

        let layer = match known {
            Some((url, default_attribution)) => TileLayerSpec {
                name: name.to_string(),
                url: url.to_string(),
                attribution: attribution.map(str::to_string).unwrap_or(default_attribution),
            },
            None if name.contains("{z}") => TileLayerSpec {
                name: "Base map".to_string(),
                url: name.to_string(),
                attribution: attribution
                    .ok_or_else(|| RenderError::invalid_config("custom tile URLs need a tile_attribution"))?
                    .to_string(),
            },
            None => {
                return Err(RenderError::invalid_config(format!(
                    "unknown base tiles '{}' (use a known name, a {{z}}/{{x}}/{{y}} URL or \"none\")",
                    name
                )))
            }
        };
        Ok(BaseTiles::Layer(layer))
    }
}

fn esri_world_imagery() -> TileLayerSpec {
    TileLayerSpec {
        name: ESRI_WORLD_IMAGERY.to_string(),
        url: ESRI_WORLD_IMAGERY_URL.to_string(),
        attribution: ESRI_WORLD_IMAGERY.to_string(),
    }
}

/// A georeferenced PNG overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageOverlaySpec {
    pub name: String,
    pub data_uri: String,
    /// `[[south, west], [north, east]]`
    pub bounds: [[f64; 2]; 2],
    pub opacity: f64,
    /// Visible when the map opens.
    pub show: bool,
    /// Listed in the layer control.
    pub control: bool,
}

/// A horizontal color-gradient legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendSpec {
    pub caption: String,
    pub colors: Vec<String>,
    pub vmin: f64,
    pub vmax: f64,
    /// Overlay whose visibility the legend follows.
    pub layer: Option<String>,
}

impl LegendSpec {
    pub fn new(caption: impl Into<String>, colors: Vec<String>, vmin: f64, vmax: f64) -> Self {
        Self {
            caption: caption.into(),
            colors,
            vmin,
            vmax,
            layer: None,
        }
    }

    pub fn for_layer(mut self, layer: impl Into<String>) -> Self {
        self.layer = Some(layer.into());
        self
    }
}

/// An AOI outline, drawn without fill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoiOverlaySpec {
    pub name: String,
    pub data: Value,
    pub style: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LayerControlSpec {
    pub collapsed: bool,
}

/// A complete interactive map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapDocument {
    title: String,
    /// `[lat, lon]`
    center: [f64; 2],
    zoom_start: u8,
    base_layers: Vec<TileLayerSpec>,
    overlays: Vec<ImageOverlaySpec>,
    aoi: Vec<AoiOverlaySpec>,
    legends: Vec<LegendSpec>,
    layer_control: Option<LayerControlSpec>,
    fit_bounds: Option<[[f64; 2]; 2]>,
}

/// `data:` URI of an encoded PNG.
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

impl MapDocument {
    /// A document centred on `view`, with the base tiles plus the Esri
    /// imagery alternative unless tiles are disabled.
    pub fn new(title: impl Into<String>, view: &BoundingBox, zoom_start: u8, tiles: &BaseTiles) -> Self {
        let (lon, lat) = view.center();
        let base_layers = match tiles {
            BaseTiles::None => Vec::new(),
            BaseTiles::Layer(layer) => vec![layer.clone(), esri_world_imagery()],
        };
        Self {
            title: title.into(),
            center: [lat, lon],
            zoom_start,
            base_layers,
            overlays: Vec::new(),
            aoi: Vec::new(),
            legends: Vec::new(),
            layer_control: None,
            fit_bounds: None,
        }
    }

    pub fn add_image_overlay(
        &mut self,
        name: impl Into<String>,
        png: &[u8],
        bounds: &BoundingBox,
        show: bool,
        control: bool,
    ) -> &mut Self {
        self.overlays.push(ImageOverlaySpec {
            name: name.into(),
            data_uri: png_data_uri(png),
            bounds: bounds.to_lat_lon_corners(),
            opacity: 1.0,
            show,
            control,
        });
        self
    }

    pub fn add_legend(&mut self, legend: LegendSpec) -> &mut Self {
        self.legends.push(legend);
        self
    }

    /// Outline every AOI document with a transparent fill.
    pub fn add_aoi(&mut self, aoi: &AreaOfInterest) -> &mut Self {
        for (i, doc) in aoi.documents().iter().enumerate() {
            let name = if i == 0 { "AOI".to_string() } else { format!("AOI {}", i + 1) };
            self.aoi.push(AoiOverlaySpec {
                name,
                data: doc.raw().clone(),
                style: serde_json::json!({ "fillOpacity": 0 }),
            });
        }
        self
    }

    pub fn with_layer_control(&mut self, collapsed: bool) -> &mut Self {
        self.layer_control = Some(LayerControlSpec { collapsed });
        self
    }

    pub fn fit_to(&mut self, bounds: &BoundingBox) -> &mut Self {
        self.fit_bounds = Some(bounds.to_lat_lon_corners());
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn center(&self) -> [f64; 2] {
        self.center
    }

    pub fn zoom_start(&self) -> u8 {
        self.zoom_start
    }

    pub fn base_layers(&self) -> &[TileLayerSpec] {
        &self.base_layers
    }

    pub fn overlays(&self) -> &[ImageOverlaySpec] {
        &self.overlays
    }

    pub fn aoi_overlays(&self) -> &[AoiOverlaySpec] {
        &self.aoi
    }

    pub fn legends(&self) -> &[LegendSpec] {
        &self.legends
    }

    pub fn layer_control(&self) -> Option<LayerControlSpec> {
        self.layer_control
    }

    pub fn fit_bounds(&self) -> Option<[[f64; 2]; 2]> {
        self.fit_bounds
    }

    /// The embedded JSON model.
    pub fn to_json(&self) -> RenderResult<String> {
        serde_json::to_string(self).map_err(|e| RenderError::invalid_config(format!("map model: {}", e)))
    }

    /// Serialize to one self-contained HTML page.
    pub fn to_html(&self) -> RenderResult<String> {
        // Keep "</script>" out of the inline JSON
        let model = self.to_json()?.replace("</", "<\\/");
        Ok(HTML_TEMPLATE
            .replace("{{LEAFLET_VERSION}}", LEAFLET_VERSION)
            .replace("{{TITLE}}", &escape_html(&self.title))
            .replace("{{MODEL}}", &model))
    }

    /// Write the HTML page atomically and return its path.
    pub fn write_html(&self, path: impl AsRef<Path>) -> RenderResult<PathBuf> {
        let path = path.as_ref();
        let html = self.to_html()?;
        write_atomic(path, html.as_bytes())?;
        info!(
            path = %path.display(),
            overlays = self.overlays.len(),
            legends = self.legends.len(),
            "Wrote map document"
        );
        Ok(path.to_path_buf())
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{{TITLE}}</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{{LEAFLET_VERSION}}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{{LEAFLET_VERSION}}/dist/leaflet.js"></script>
<style>
html, body, #map { height: 100%; width: 100%; margin: 0; padding: 0; }
.legend { background: rgba(255, 255, 255, 0.85); padding: 6px 8px; border-radius: 4px; font: 12px sans-serif; min-width: 220px; }
.legend-bar { height: 12px; margin: 4px 0; }
.legend-ticks { display: flex; justify-content: space-between; }
</style>
</head>
<body>
<div id="map"></div>
<script type="application/json" id="map-model">{{MODEL}}</script>
<script>
(function () {
  var model = JSON.parse(document.getElementById('map-model').textContent);
  var map = L.map('map', { center: model.center, zoom: model.zoom_start });

  var baseLayers = {};
  model.base_layers.forEach(function (entry, i) {
    var layer = L.tileLayer(entry.url, { attribution: entry.attribution, maxZoom: 19 });
    if (i === 0) { layer.addTo(map); }
    baseLayers[entry.name] = layer;
  });

  var overlays = {};
  var byName = {};
  model.overlays.forEach(function (entry) {
    var layer = L.imageOverlay(entry.data_uri, entry.bounds, { opacity: entry.opacity });
    if (entry.show) { layer.addTo(map); }
    if (entry.control) { overlays[entry.name] = layer; }
    byName[entry.name] = layer;
  });

  model.aoi.forEach(function (entry) {
    var layer = L.geoJSON(entry.data, { style: function () { return entry.style; } }).addTo(map);
    overlays[entry.name] = layer;
  });

  model.legends.forEach(function (entry) {
    var legend = L.control({ position: 'topright' });
    legend.onAdd = function () {
      var div = L.DomUtil.create('div', 'legend');
      var caption = L.DomUtil.create('div', 'legend-caption', div);
      caption.textContent = entry.caption;
      var bar = L.DomUtil.create('div', 'legend-bar', div);
      bar.style.background = 'linear-gradient(to right, ' + entry.colors.join(', ') + ')';
      var ticks = L.DomUtil.create('div', 'legend-ticks', div);
      L.DomUtil.create('span', '', ticks).textContent = entry.vmin.toFixed(3);
      L.DomUtil.create('span', '', ticks).textContent = entry.vmax.toFixed(3);
      return div;
    };
    var target = entry.layer ? byName[entry.layer] : null;
    if (!target || map.hasLayer(target)) { legend.addTo(map); }
    if (target) {
      map.on('overlayadd', function (e) { if (e.layer === target) { legend.addTo(map); } });
      map.on('overlayremove', function (e) { if (e.layer === target) { legend.remove(); } });
    }
  });

  if (model.layer_control) {
    L.control.layers(baseLayers, overlays, { collapsed: model.layer_control.collapsed }).addTo(map);
  }
  if (model.fit_bounds) {
    map.fitBounds(model.fit_bounds);
  }
})();
</script>
</body>
</html>
"#;
