//! WKT perimeter conversion and surface approximation.
//!
//! Extraction orders describe their perimeter as a WKT string. This module
//! converts that text into a GeoJSON geometry for the outgoing job payload
//! and computes the rough surface figure the remote workspaces expect.

mod surface;
mod types;
mod wkt;

pub use surface::approximate_surface;
pub use types::{Geometry, GeometryError, Position, Ring};
pub use wkt::parse_wkt;
