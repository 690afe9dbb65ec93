//! Outgoing job payload assembly.
//!
//! The remote workspace receives one GeoJSON Feature: the order perimeter as
//! its geometry and the order metadata as its properties. Geometry is
//! optional context: an absent or unparseable perimeter degrades to a JSON
//! null geometry with a logged warning, never a failure.

use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::geometry::{approximate_surface, parse_wkt};
use crate::request::TaskRequest;

/// Property key names used in the Feature, configurable because remote
/// workspaces differ in the schema they publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyKeys {
    pub request_id: String,
    pub folder_out: String,
    pub folder_in: String,
    pub order_guid: String,
    pub order_label: String,
    pub client_guid: String,
    pub client_name: String,
    pub organism_guid: String,
    pub organism_name: String,
    pub product_guid: String,
    pub product_label: String,
    pub surface: String,
    pub parameters: String,
}

impl Default for PropertyKeys {
    fn default() -> Self {
        Self {
            request_id: "Request".to_string(),
            folder_out: "FolderOut".to_string(),
            folder_in: "FolderIn".to_string(),
            order_guid: "OrderGuid".to_string(),
            order_label: "OrderLabel".to_string(),
            client_guid: "ClientGuid".to_string(),
            client_name: "ClientName".to_string(),
            organism_guid: "OrganismGuid".to_string(),
            organism_name: "OrganismName".to_string(),
            product_guid: "ProductGuid".to_string(),
            product_label: "ProductLabel".to_string(),
            surface: "Surface".to_string(),
            parameters: "Parameters".to_string(),
        }
    }
}

/// Builds the GeoJSON Feature submitted to the geoprocessing service.
#[derive(Debug, Clone, Default)]
pub struct PayloadBuilder {
    keys: PropertyKeys,
}

impl PayloadBuilder {
    /// A builder using the platform's default property keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder with remapped property keys.
    pub fn with_keys(keys: PropertyKeys) -> Self {
        Self { keys }
    }

    /// Assembles the Feature document for `request`.
    pub fn build(&self, request: &TaskRequest) -> Value {
        json!({
            "type": "Feature",
            "geometry": self.geometry_value(request),
            "properties": self.properties_value(request),
        })
    }

    /// Parsed perimeter, or JSON null when absent or unparseable.
    fn geometry_value(&self, request: &TaskRequest) -> Value {
        let perimeter = match &request.perimeter {
            Some(p) if !p.trim().is_empty() => p,
            _ => {
                debug!(request_id = request.id, "no perimeter defined, using null geometry");
                return Value::Null;
            }
        };

        match parse_wkt(perimeter) {
            Ok(geometry) => {
                debug!(request_id = request.id, "converted WKT perimeter to GeoJSON");
                serde_json::to_value(&geometry).unwrap_or(Value::Null)
            }
            Err(e) => {
                warn!(
                    request_id = request.id,
                    error = %e,
                    "could not convert WKT perimeter, using null geometry"
                );
                Value::Null
            }
        }
    }

    fn properties_value(&self, request: &TaskRequest) -> Value {
        let keys = &self.keys;
        let mut properties = Map::new();

        properties.insert(keys.request_id.clone(), json!(request.id));
        properties.insert(
            keys.folder_out.clone(),
            json!(request.folder_out.to_string_lossy()),
        );
        properties.insert(
            keys.folder_in.clone(),
            json!(request.folder_in.to_string_lossy()),
        );
        properties.insert(keys.order_guid.clone(), json!(request.order_guid));
        properties.insert(keys.order_label.clone(), json!(request.order_label));
        properties.insert(keys.client_guid.clone(), json!(request.client_guid));
        properties.insert(keys.client_name.clone(), json!(request.client_name));
        properties.insert(keys.organism_guid.clone(), json!(request.organism_guid));
        properties.insert(keys.organism_name.clone(), json!(request.organism_name));
        properties.insert(keys.product_guid.clone(), json!(request.product_guid));
        properties.insert(keys.product_label.clone(), json!(request.product_label));

        if let Some(perimeter) = &request.perimeter {
            match approximate_surface(perimeter) {
                Ok(surface) => {
                    properties.insert(keys.surface.clone(), json!(surface));
                }
                Err(e) => {
                    debug!(request_id = request.id, error = %e, "could not compute surface");
                }
            }
        }

        properties.insert(keys.parameters.clone(), self.parameters_value(request));

        Value::Object(properties)
    }

    /// Custom parameters: a JSON object when the stored string parses as
    /// one, the raw string otherwise, an empty object when absent.
    fn parameters_value(&self, request: &TaskRequest) -> Value {
        let raw = match &request.parameters {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return json!({}),
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) | Err(_) => {
                warn!(
                    request_id = request.id,
                    "custom parameters are not a JSON object, passing them as a string"
                );
                json!(raw)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_request() -> TaskRequest {
        TaskRequest {
            id: 42,
            order_guid: "order-guid-1".to_string(),
            order_label: "Order 1".to_string(),
            client_guid: "client-guid-1".to_string(),
            client_name: "Alice Example".to_string(),
            organism_guid: "org-guid-1".to_string(),
            organism_name: "Example Org".to_string(),
            product_guid: "product-guid-1".to_string(),
            product_label: "Cadastral extract".to_string(),
            perimeter: Some("POLYGON((0 0, 1 0, 1 1, 0 1, 0 0))".to_string()),
            parameters: Some(r#"{"FORMAT":"DXF","SRS":"EPSG:2056"}"#.to_string()),
            folder_in: PathBuf::from("/data/in/42"),
            folder_out: PathBuf::from("/data/out/42"),
            start_date: None,
            end_date: None,
        }
    }

    #[test]
    fn test_feature_shape() {
        let payload = PayloadBuilder::new().build(&sample_request());
        assert_eq!(payload["type"], "Feature");
        assert_eq!(payload["geometry"]["type"], "Polygon");
        assert!(payload["properties"].is_object());
    }

    #[test]
    fn test_properties_content() {
        let payload = PayloadBuilder::new().build(&sample_request());
        let properties = &payload["properties"];
        assert_eq!(properties["Request"], 42);
        assert_eq!(properties["OrderGuid"], "order-guid-1");
        assert_eq!(properties["ClientName"], "Alice Example");
        assert_eq!(properties["OrganismName"], "Example Org");
        assert_eq!(properties["ProductLabel"], "Cadastral extract");
        assert_eq!(properties["FolderOut"], "/data/out/42");
        assert_eq!(properties["Parameters"]["FORMAT"], "DXF");
    }

    #[test]
    fn test_surface_for_unit_square() {
        let payload = PayloadBuilder::new().build(&sample_request());
        let surface = payload["properties"]["Surface"].as_f64().unwrap();
        assert_eq!(surface, 111_000.0 * 111_000.0);
    }

    #[test]
    fn test_missing_perimeter_yields_null_geometry() {
        let mut request = sample_request();
        request.perimeter = None;
        let payload = PayloadBuilder::new().build(&request);
        assert!(payload["geometry"].is_null());
        assert!(payload["properties"]["Surface"].is_null());
    }

    #[test]
    fn test_unparseable_perimeter_degrades_to_null_geometry() {
        let mut request = sample_request();
        request.perimeter = Some("POLYGON((broken".to_string());
        let payload = PayloadBuilder::new().build(&request);
        assert!(payload["geometry"].is_null());
        // Build still succeeds with the full property set.
        assert_eq!(payload["properties"]["Request"], 42);
    }

    #[test]
    fn test_non_json_parameters_kept_as_string() {
        let mut request = sample_request();
        request.parameters = Some("FORMAT=DXF;SRS=2056".to_string());
        let payload = PayloadBuilder::new().build(&request);
        assert_eq!(payload["properties"]["Parameters"], "FORMAT=DXF;SRS=2056");
    }

    #[test]
    fn test_absent_parameters_become_empty_object() {
        let mut request = sample_request();
        request.parameters = None;
        let payload = PayloadBuilder::new().build(&request);
        assert_eq!(payload["properties"]["Parameters"], serde_json::json!({}));
    }

    #[test]
    fn test_custom_property_keys() {
        let keys = PropertyKeys {
            order_guid: "COMMANDE".to_string(),
            ..PropertyKeys::default()
        };
        let payload = PayloadBuilder::with_keys(keys).build(&sample_request());
        assert_eq!(payload["properties"]["COMMANDE"], "order-guid-1");
        assert!(payload["properties"]["OrderGuid"].is_null());
    }
}
