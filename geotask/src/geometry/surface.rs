//! Approximate surface computation for order perimeters.
//!
//! The area is computed on raw coordinate values (assumed WGS84 degrees) and
//! scaled by a fixed 111000 m/degree factor. This equirectangular
//! approximation is deliberately rough: it matches the documented behavior
//! of the remote workspaces consuming the value, and is not corrected with a
//! true geodesic projection.

use super::types::{Geometry, GeometryError, Ring};
use super::wkt::parse_wkt;

/// Meters per degree of latitude at the equator, used as a flat scale factor
/// for both axes.
const METERS_PER_DEGREE: f64 = 111_000.0;

/// Computes the approximate surface of a WKT perimeter in square meters.
///
/// Only polygonal geometry contributes area; points and lines yield 0.0.
/// Holes are subtracted from their enclosing polygon.
pub fn approximate_surface(wkt: &str) -> Result<f64, GeometryError> {
    let geometry = parse_wkt(wkt)?;
    Ok(planar_area(&geometry) * METERS_PER_DEGREE * METERS_PER_DEGREE)
}

/// Planar area of a geometry in squared coordinate units.
fn planar_area(geometry: &Geometry) -> f64 {
    match geometry {
        Geometry::Point(_) | Geometry::LineString(_) | Geometry::MultiLineString(_) => 0.0,
        Geometry::Polygon(rings) => polygon_area(rings),
        Geometry::MultiPolygon(polygons) => polygons.iter().map(|p| polygon_area(p)).sum(),
    }
}

/// Exterior area minus hole areas. Never negative.
fn polygon_area(rings: &[Ring]) -> f64 {
    let mut iter = rings.iter();
    let exterior = match iter.next() {
        Some(ring) => ring_area(ring),
        None => return 0.0,
    };
    let holes: f64 = iter.map(|ring| ring_area(ring)).sum();
    (exterior - holes).max(0.0)
}

/// Shoelace formula over a closed ring; orientation-independent.
fn ring_area(ring: &Ring) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for window in ring.windows(2) {
        let (a, b) = (&window[0], &window[1]);
        sum += a[0] * b[1] - b[0] * a[1];
    }
    // Close the ring in case the last point does not repeat the first.
    let (first, last) = (&ring[0], &ring[ring.len() - 1]);
    if first[..2] != last[..2] {
        sum += last[0] * first[1] - first[0] * last[1];
    }
    sum.abs() / 2.0
}
