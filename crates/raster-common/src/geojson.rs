//! Area-of-interest GeoJSON model.
//!
//! Only polygonal geometry is meaningful for clipping. `Feature` and
//! `FeatureCollection` wrappers are unwrapped recursively; any other geometry
//! type deserializes into [`GeoJson::Other`] so callers can report it instead
//! of failing the whole document.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RenderError, RenderResult};
use crate::BoundingBox;

/// A GeoJSON position. Only the first two ordinates (x, y) are used.
pub type Position = Vec<f64>;

/// A closed linear ring.
pub type Ring = Vec<Position>;

/// Any GeoJSON object the AOI loader may encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GeoJson {
    Geometry(Geometry),
    /// Anything that is not polygonal or a wrapper (`Point`, `LineString`, ...).
    Other {
        #[serde(rename = "type")]
        kind: String,
    },
}

/// Polygonal geometries and the wrappers that may contain them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon {
        coordinates: Vec<Ring>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Ring>>,
    },
    Feature {
        #[serde(default)]
        geometry: Option<Box<GeoJson>>,
    },
    FeatureCollection {
        #[serde(default)]
        features: Vec<GeoJson>,
    },
}

/// Callbacks for a depth-first walk over a GeoJSON tree.
pub trait GeometryVisitor {
    /// Called once per polygon with its rings (exterior first).
    fn visit_polygon(&mut self, rings: &[Ring]);

    /// Called for geometry types that cannot be used for clipping.
    fn visit_unsupported(&mut self, _kind: &str) {}
}

impl GeoJson {
    /// Walk the tree, unwrapping features and multi-polygons.
    pub fn accept<V: GeometryVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            GeoJson::Geometry(Geometry::Polygon { coordinates }) => visitor.visit_polygon(coordinates),
            GeoJson::Geometry(Geometry::MultiPolygon { coordinates }) => {
                for polygon in coordinates {
                    visitor.visit_polygon(polygon);
                }
            }
            GeoJson::Geometry(Geometry::Feature { geometry }) => {
                if let Some(geometry) = geometry {
                    geometry.accept(visitor);
                }
            }
            GeoJson::Geometry(Geometry::FeatureCollection { features }) => {
                for feature in features {
                    feature.accept(visitor);
                }
            }
            GeoJson::Other { kind } => visitor.visit_unsupported(kind),
        }
    }
}

/// One parsed AOI document plus its original JSON for embedding in output.
#[derive(Debug, Clone, PartialEq)]
pub struct AoiDocument {
    raw: Value,
    parsed: GeoJson,
}

impl AoiDocument {
    /// Parse an already-decoded JSON value.
    pub fn from_value(raw: Value) -> RenderResult<Self> {
        let parsed = GeoJson::deserialize(&raw).map_err(|e| {
            RenderError::UnsupportedGeometry(format!("not a GeoJSON object: {}", e))
        })?;
        Ok(Self { raw, parsed })
    }

    /// Parse GeoJSON text.
    pub fn parse(text: &str) -> RenderResult<Self> {
        let raw: Value = serde_json::from_str(text)
            .map_err(|e| RenderError::UnsupportedGeometry(format!("invalid GeoJSON: {}", e)))?;
        Self::from_value(raw)
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn geojson(&self) -> &GeoJson {
        &self.parsed
    }
}

/// Polygon rings collected from a GeoJSON walk, as `(x, y)` pairs.
#[derive(Debug, Default, Clone)]
pub struct PolygonCollector {
    pub polygons: Vec<Vec<Vec<(f64, f64)>>>,
    pub unsupported: Vec<String>,
}

impl GeometryVisitor for PolygonCollector {
    fn visit_polygon(&mut self, rings: &[Ring]) {
        let rings: Vec<Vec<(f64, f64)>> = rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| (p[0], p[1]))
                    .collect::<Vec<_>>()
            })
            .filter(|ring| !ring.is_empty())
            .collect();
        if !rings.is_empty() {
            self.polygons.push(rings);
        }
    }

    fn visit_unsupported(&mut self, kind: &str) {
        self.unsupported.push(kind.to_string());
    }
}

/// Zero or more AOI documents treated as a single clipping region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AreaOfInterest {
    documents: Vec<AoiDocument>,
}

impl AreaOfInterest {
    pub fn new(documents: Vec<AoiDocument>) -> Self {
        Self { documents }
    }

    /// An AOI with no geometry; masking with it is the identity.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Read and parse GeoJSON files in order.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> RenderResult<Self> {
        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let path = path.as_ref();
            let text = std::fs::read_to_string(path)
                .map_err(|e| RenderError::input_not_found(path, e))?;
            let document = AoiDocument::parse(&text).map_err(|e| match e {
                RenderError::UnsupportedGeometry(msg) => {
                    RenderError::UnsupportedGeometry(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })?;
            documents.push(document);
        }
        Ok(Self { documents })
    }

    pub fn documents(&self) -> &[AoiDocument] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Walk every document with the same visitor.
    pub fn accept<V: GeometryVisitor + ?Sized>(&self, visitor: &mut V) {
        for document in &self.documents {
            document.geojson().accept(visitor);
        }
    }

    /// All polygons across all documents plus the unsupported types seen.
    pub fn collect_polygons(&self) -> PolygonCollector {
        let mut collector = PolygonCollector::default();
        self.accept(&mut collector);
        collector
    }

    /// Unpadded union bounds of every polygon vertex.
    pub fn vertex_bounds(&self) -> Option<BoundingBox> {
        let collector = self.collect_polygons();
        BoundingBox::from_points(
            collector
                .polygons
                .iter()
                .flatten()
                .flatten()
                .copied(),
        )
    }
}
