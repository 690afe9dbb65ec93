//! GeoJSON geometry model.
//!
//! The [`Geometry`] enum serializes directly to a GeoJSON geometry object
//! (`{"type": "...", "coordinates": [...]}`) via serde, so a parsed perimeter
//! can be embedded into a Feature without an intermediate conversion step.

use serde::Serialize;
use thiserror::Error;

/// A single coordinate tuple: `[x, y]` or `[x, y, z]`.
///
/// The third ordinate is only present when the source geometry carries a
/// finite Z value. Additional ordinates (measures) are never emitted.
pub type Position = Vec<f64>;

/// A closed ring of positions. Ring closure is preserved from the source
/// geometry, not enforced here.
pub type Ring = Vec<Position>;

/// Errors raised while converting a WKT perimeter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// The WKT text could not be parsed.
    #[error("invalid WKT at offset {offset}: {reason}")]
    Parse {
        /// Byte offset of the first unparseable token.
        offset: usize,
        /// What the parser expected or found.
        reason: String,
    },

    /// The WKT parsed but names a geometry type this codec does not handle
    /// (e.g. `GEOMETRYCOLLECTION`). The offending type name is preserved so
    /// the failure is never silent.
    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),
}

/// A GeoJSON geometry.
///
/// Polygon and MultiPolygon coordinates are rings-of-points where ring 0 is
/// the exterior and any subsequent rings are holes, in source order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Returns the GeoJSON type name of this geometry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Returns true when the geometry has no coordinates at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Point(p) => p.is_empty(),
            Geometry::LineString(line) => line.is_empty(),
            Geometry::MultiLineString(lines) => lines.iter().all(|l| l.is_empty()),
            Geometry::Polygon(rings) => rings.iter().all(|r| r.is_empty()),
            Geometry::MultiPolygon(polys) => {
                polys.iter().all(|p| p.iter().all(|r| r.is_empty()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_serializes_to_geojson() {
        let geometry = Geometry::Point(vec![6.5, 46.5]);
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "Point", "coordinates": [6.5, 46.5]})
        );
    }

    #[test]
    fn test_polygon_serializes_with_rings() {
        let exterior = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 0.0],
        ];
        let geometry = Geometry::Polygon(vec![exterior.clone()]);
        let json = serde_json::to_value(&geometry).unwrap();
        assert_eq!(json["type"], "Polygon");
        assert_eq!(json["coordinates"][0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Geometry::Point(vec![]).type_name(), "Point");
        assert_eq!(Geometry::MultiPolygon(vec![]).type_name(), "MultiPolygon");
    }

    #[test]
    fn test_empty_detection() {
        assert!(Geometry::LineString(vec![]).is_empty());
        assert!(!Geometry::Point(vec![1.0, 2.0]).is_empty());
    }
}
