use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier assigned to a marker by the remote service.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(String);

impl MarkerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MarkerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MarkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// Lets the store look markers up by `&str` without allocating.
impl Borrow<str> for MarkerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A latitude/longitude pair in decimal degrees.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A map pin as persisted by the remote service.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub title: String,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Marker {
    /// Markers without an explicit flag are shown.
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_marker_minimal() {
        let json = r#"{"id":"m1","title":"Cafe","position":{"lat":1.0,"lng":2.0}}"#;
        let marker: Marker = serde_json::from_str(json).expect("Failed to parse marker JSON");

        assert_eq!(marker.id.as_str(), "m1");
        assert_eq!(marker.title, "Cafe");
        assert_eq!(marker.position, Position::new(1.0, 2.0));
        assert!(marker.full_address.is_none());
        assert!(marker.is_enabled());
    }

    #[test]
    fn test_parse_marker_ignores_unknown_fields() {
        let json = r#"{"id":"m2","title":"Bakery","position":{"lat":48.1,"lng":11.5},
            "full_address":"1 Main St","enabled":false,"created_by":"admin"}"#;
        let marker: Marker = serde_json::from_str(json).expect("Failed to parse marker JSON");

        assert_eq!(marker.full_address.as_deref(), Some("1 Main St"));
        assert!(!marker.is_enabled());
    }

    #[test]
    fn test_serialize_omits_missing_optionals() {
        let marker = Marker {
            id: MarkerId::from("m1"),
            title: "Cafe".to_string(),
            position: Position::new(1.0, 2.0),
            full_address: None,
            description: None,
            address: None,
            phone: Some("555-0100".to_string()),
            email: None,
            website: None,
            enabled: None,
        };
        let value = serde_json::to_value(&marker).expect("Failed to serialize marker");

        assert_eq!(value["id"], "m1");
        assert_eq!(value["phone"], "555-0100");
        assert!(value.get("email").is_none());
        assert!(value.get("enabled").is_none());
    }
}
