//! Recursive-descent WKT (Well-Known Text) reader.
//!
//! Parses the perimeter strings attached to extraction orders into the
//! [`Geometry`] model. Supported types: `POINT`, `LINESTRING`,
//! `MULTILINESTRING`, `POLYGON` (with holes), `MULTIPOLYGON`. Each may carry
//! an optional `Z` dimension tag or be declared `EMPTY`.
//!
//! Any other geometry type (notably `GEOMETRYCOLLECTION`) is rejected with
//! [`GeometryError::UnsupportedType`] naming the type, so data is never
//! silently dropped.

use super::types::{Geometry, GeometryError, Position, Ring};

/// Parses a WKT string into a GeoJSON geometry.
///
/// # Examples
///
/// ```
/// use geotask::geometry::parse_wkt;
///
/// let geometry = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
/// assert_eq!(geometry.type_name(), "Polygon");
/// ```
pub fn parse_wkt(input: &str) -> Result<Geometry, GeometryError> {
    let mut parser = Parser::new(input);
    let geometry = parser.parse_geometry()?;
    parser.expect_end()?;
    Ok(geometry)
}

/// Dimension tag following the geometry type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dimension {
    Xy,
    Xyz,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_geometry(&mut self) -> Result<Geometry, GeometryError> {
        let type_name = self.read_keyword()?;
        let dimension = self.read_dimension_tag()?;

        match type_name.to_ascii_uppercase().as_str() {
            "POINT" => self.parse_point(dimension),
            "LINESTRING" => Ok(Geometry::LineString(self.parse_position_list(dimension)?)),
            "MULTILINESTRING" => {
                Ok(Geometry::MultiLineString(self.parse_line_list(dimension)?))
            }
            "POLYGON" => Ok(Geometry::Polygon(self.parse_ring_list(dimension)?)),
            "MULTIPOLYGON" => Ok(Geometry::MultiPolygon(self.parse_polygon_list(dimension)?)),
            other => Err(GeometryError::UnsupportedType(canonical_type_name(other))),
        }
    }

    fn parse_point(&mut self, dimension: Dimension) -> Result<Geometry, GeometryError> {
        if self.try_keyword("EMPTY") {
            return Ok(Geometry::Point(Vec::new()));
        }
        self.expect_char('(')?;
        let position = self.parse_position(dimension)?;
        self.expect_char(')')?;
        Ok(Geometry::Point(position))
    }

    /// `(x y, x y, ...)` or `EMPTY`.
    fn parse_position_list(
        &mut self,
        dimension: Dimension,
    ) -> Result<Vec<Position>, GeometryError> {
        if self.try_keyword("EMPTY") {
            return Ok(Vec::new());
        }
        self.expect_char('(')?;
        let mut positions = vec![self.parse_position(dimension)?];
        while self.try_char(',') {
            positions.push(self.parse_position(dimension)?);
        }
        self.expect_char(')')?;
        Ok(positions)
    }

    /// A list of linestrings: `((...), (...))`.
    fn parse_line_list(
        &mut self,
        dimension: Dimension,
    ) -> Result<Vec<Vec<Position>>, GeometryError> {
        if self.try_keyword("EMPTY") {
            return Ok(Vec::new());
        }
        self.expect_char('(')?;
        let mut lines = vec![self.parse_position_list(dimension)?];
        while self.try_char(',') {
            lines.push(self.parse_position_list(dimension)?);
        }
        self.expect_char(')')?;
        Ok(lines)
    }

    /// Ring list `((ring), (ring), ...)`: exterior first, holes after,
    /// order kept.
    fn parse_ring_list(&mut self, dimension: Dimension) -> Result<Vec<Ring>, GeometryError> {
        if self.try_keyword("EMPTY") {
            return Ok(Vec::new());
        }
        self.expect_char('(')?;
        let mut rings = vec![self.parse_position_list(dimension)?];
        while self.try_char(',') {
            rings.push(self.parse_position_list(dimension)?);
        }
        self.expect_char(')')?;
        Ok(rings)
    }

    /// A list of polygons: `(((ring)), ((ring)))`.
    fn parse_polygon_list(
        &mut self,
        dimension: Dimension,
    ) -> Result<Vec<Vec<Ring>>, GeometryError> {
        if self.try_keyword("EMPTY") {
            return Ok(Vec::new());
        }
        self.expect_char('(')?;
        let mut polygons = vec![self.parse_ring_list(dimension)?];
        while self.try_char(',') {
            polygons.push(self.parse_ring_list(dimension)?);
        }
        self.expect_char(')')?;
        Ok(polygons)
    }

    /// A single coordinate tuple. With an explicit `Z` tag three ordinates
    /// are required; without it a third ordinate is still accepted when
    /// present (matching the permissive reader the orders were produced for).
    fn parse_position(&mut self, dimension: Dimension) -> Result<Position, GeometryError> {
        let x = self.read_number()?;
        let y = self.read_number()?;

        let mut position = vec![x, y];
        match dimension {
            Dimension::Xyz => {
                let z = self.read_number()?;
                if z.is_finite() {
                    position.push(z);
                }
            }
            Dimension::Xy => {
                if let Some(z) = self.try_read_number() {
                    if z.is_finite() {
                        position.push(z);
                    }
                }
            }
        }
        Ok(position)
    }

    fn read_dimension_tag(&mut self) -> Result<Dimension, GeometryError> {
        if self.try_keyword("ZM") || self.try_keyword("M") {
            return Err(self.error("measured (M) coordinates are not supported"));
        }
        if self.try_keyword("Z") {
            Ok(Dimension::Xyz)
        } else {
            Ok(Dimension::Xy)
        }
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.input[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn read_keyword(&mut self) -> Result<String, GeometryError> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphabetic() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected a geometry type keyword"));
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Consumes `keyword` (case-insensitive) if it is the next token.
    fn try_keyword(&mut self, keyword: &str) -> bool {
        self.skip_whitespace();
        let rest = &self.input[self.pos..];
        if rest.len() < keyword.len() || !rest[..keyword.len()].eq_ignore_ascii_case(keyword) {
            return false;
        }
        // Must be a whole word, not a prefix of a longer identifier.
        if rest[keyword.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn try_char(&mut self, expected: char) -> bool {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), GeometryError> {
        if self.try_char(expected) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", expected)))
        }
    }

    fn read_number(&mut self) -> Result<f64, GeometryError> {
        self.try_read_number()
            .ok_or_else(|| self.error("expected a number"))
    }

    fn try_read_number(&mut self) -> Option<f64> {
        self.skip_whitespace();

        // WKT writers emit NaN for missing ordinates.
        let rest = &self.input[self.pos..];
        if rest.len() >= 3 && rest[..3].eq_ignore_ascii_case("nan") {
            self.pos += 3;
            return Some(f64::NAN);
        }

        let start = self.pos;
        let mut end = self.pos;
        let bytes = self.input.as_bytes();

        if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
            end += 1;
        }
        while end < bytes.len()
            && (bytes[end].is_ascii_digit()
                || bytes[end] == b'.'
                || bytes[end] == b'e'
                || bytes[end] == b'E'
                || ((bytes[end] == b'-' || bytes[end] == b'+')
                    && (bytes[end - 1] == b'e' || bytes[end - 1] == b'E')))
        {
            end += 1;
        }

        let value: f64 = self.input[start..end].parse().ok()?;
        self.pos = end;
        Some(value)
    }

    fn expect_end(&mut self) -> Result<(), GeometryError> {
        self.skip_whitespace();
        if self.pos < self.input.len() {
            Err(self.error("unexpected trailing characters"))
        } else {
            Ok(())
        }
    }

    fn error(&self, reason: &str) -> GeometryError {
        GeometryError::Parse {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }
}

/// Maps an uppercase WKT keyword to the conventional mixed-case type name
/// used in error messages (`GEOMETRYCOLLECTION` → `GeometryCollection`).
fn canonical_type_name(keyword: &str) -> String {
    match keyword.to_ascii_uppercase().as_str() {
        "GEOMETRYCOLLECTION" => "GeometryCollection".to_string(),
        "MULTIPOINT" => "MultiPoint".to_string(),
        "TRIANGLE" => "Triangle".to_string(),
        "CIRCULARSTRING" => "CircularString".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        let geometry = parse_wkt("POINT(6.6335 46.5197)").unwrap();
        assert_eq!(geometry, Geometry::Point(vec![6.6335, 46.5197]));
    }

    #[test]
    fn test_parse_point_with_z() {
        let geometry = parse_wkt("POINT Z (6.6 46.5 372.0)").unwrap();
        assert_eq!(geometry, Geometry::Point(vec![6.6, 46.5, 372.0]));
    }

    #[test]
    fn test_parse_point_implicit_z() {
        // JTS accepts a third ordinate without the Z tag; so do we.
        let geometry = parse_wkt("POINT(1 2 3)").unwrap();
        assert_eq!(geometry, Geometry::Point(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_parse_point_nan_z_dropped() {
        let geometry = parse_wkt("POINT Z (1 2 NaN)").unwrap();
        assert_eq!(geometry, Geometry::Point(vec![1.0, 2.0]));
    }

    #[test]
    fn test_parse_linestring() {
        let geometry = parse_wkt("LINESTRING(0 0, 1 1, 2 0.5)").unwrap();
        assert_eq!(
            geometry,
            Geometry::LineString(vec![
                vec![0.0, 0.0],
                vec![1.0, 1.0],
                vec![2.0, 0.5]
            ])
        );
    }

    #[test]
    fn test_parse_multilinestring() {
        let geometry = parse_wkt("MULTILINESTRING((0 0, 1 1), (2 2, 3 3))").unwrap();
        assert_eq!(
            geometry,
            Geometry::MultiLineString(vec![
                vec![vec![0.0, 0.0], vec![1.0, 1.0]],
                vec![vec![2.0, 2.0], vec![3.0, 3.0]],
            ])
        );
    }

    #[test]
    fn test_parse_polygon() {
        let geometry = parse_wkt("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))").unwrap();
        match geometry {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0][0], rings[0][4]);
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_polygon_with_hole_keeps_ring_order() {
        let wkt = "POLYGON((0 0, 10 0, 10 10, 0 10, 0 0), (2 2, 4 2, 4 4, 2 4, 2 2))";
        let geometry = parse_wkt(wkt).unwrap();
        match geometry {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 2);
                // Exterior first, hole second, coordinates unmodified.
                assert_eq!(rings[0][1], vec![10.0, 0.0]);
                assert_eq!(rings[1][0], vec![2.0, 2.0]);
            }
            other => panic!("expected Polygon, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_multipolygon() {
        let wkt = "MULTIPOLYGON(((0 0, 1 0, 1 1, 0 0)), ((5 5, 6 5, 6 6, 5 5)))";
        let geometry = parse_wkt(wkt).unwrap();
        match geometry {
            Geometry::MultiPolygon(polygons) => {
                assert_eq!(polygons.len(), 2);
                assert_eq!(polygons[0].len(), 1);
                assert_eq!(polygons[1][0][0], vec![5.0, 5.0]);
            }
            other => panic!("expected MultiPolygon, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_geometries() {
        assert!(parse_wkt("POINT EMPTY").unwrap().is_empty());
        assert!(parse_wkt("LINESTRING EMPTY").unwrap().is_empty());
        assert!(parse_wkt("POLYGON EMPTY").unwrap().is_empty());
        assert!(parse_wkt("MULTIPOLYGON EMPTY").unwrap().is_empty());
    }

    #[test]
    fn test_geometrycollection_fails_loudly() {
        let err = parse_wkt("GEOMETRYCOLLECTION EMPTY").unwrap_err();
        match err {
            GeometryError::UnsupportedType(name) => {
                assert_eq!(name, "GeometryCollection");
            }
            other => panic!("expected UnsupportedType, got {:?}", other),
        }
    }

    #[test]
    fn test_case_insensitive_keywords() {
        assert!(parse_wkt("polygon((0 0, 1 0, 1 1, 0 0))").is_ok());
        assert!(parse_wkt("Point(1 2)").is_ok());
    }

    #[test]
    fn test_scientific_notation() {
        let geometry = parse_wkt("POINT(1e3 -2.5E-2)").unwrap();
        assert_eq!(geometry, Geometry::Point(vec![1000.0, -0.025]));
    }

    #[test]
    fn test_malformed_inputs_rejected() {
        assert!(parse_wkt("").is_err());
        assert!(parse_wkt("POINT(1)").is_err());
        assert!(parse_wkt("POINT(1 2").is_err());
        assert!(parse_wkt("POLYGON(0 0, 1 1)").is_err());
        assert!(parse_wkt("POINT(1 2) garbage").is_err());
    }

    #[test]
    fn test_measured_coordinates_rejected() {
        assert!(parse_wkt("POINT M (1 2 3)").is_err());
        assert!(parse_wkt("POINT ZM (1 2 3 4)").is_err());
    }
}
