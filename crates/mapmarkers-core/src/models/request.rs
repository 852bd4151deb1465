//! Create/update payloads and their validation.
//!
//! Callers fill in a `MarkerData` (typically straight from a form), and the
//! store turns it into a `NewMarker` or `MarkerUpdate` before anything is
//! sent to the service. Blank strings count as missing.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Marker, MarkerId, Position};

/// A required field that was absent or blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Id,
    Title,
    Position,
    FullAddress,
}

impl MissingField {
    pub fn name(&self) -> &'static str {
        match self {
            MissingField::Id => "id",
            MissingField::Title => "title",
            MissingField::Position => "position",
            MissingField::FullAddress => "full_address",
        }
    }
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::error::Error for MissingField {}

/// Marker-shaped input where every field may be missing.
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
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

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl MarkerData {
    /// Validate into a create request.
    ///
    /// `require_full_address` selects between the admin form, where the
    /// full address is mandatory, and the lenient variant.
    pub fn into_new_marker(self, require_full_address: bool) -> Result<NewMarker, MissingField> {
        let title = present(&self.title).ok_or(MissingField::Title)?.to_string();
        let position = self.position.ok_or(MissingField::Position)?;
        let full_address = present(&self.full_address).map(str::to_string);
        if require_full_address && full_address.is_none() {
            return Err(MissingField::FullAddress);
        }

        Ok(NewMarker {
            title,
            position,
            full_address,
            description: self.description,
            address: self.address,
            phone: self.phone,
            email: self.email,
            website: self.website,
            enabled: self.enabled,
        })
    }

    /// Validate into an update request. Only id, title and position are required.
    pub fn into_update(self) -> Result<MarkerUpdate, MissingField> {
        let id = MarkerId::from(present(&self.id).ok_or(MissingField::Id)?);
        let title = present(&self.title).ok_or(MissingField::Title)?.to_string();
        let position = self.position.ok_or(MissingField::Position)?;

        Ok(MarkerUpdate {
            id,
            title,
            position,
            full_address: self.full_address,
            description: self.description,
            address: self.address,
            phone: self.phone,
            email: self.email,
            website: self.website,
            enabled: self.enabled,
        })
    }
}

impl From<Marker> for MarkerData {
    fn from(marker: Marker) -> Self {
        Self {
            id: Some(marker.id.to_string()),
            title: Some(marker.title),
            position: Some(marker.position),
            full_address: marker.full_address,
            description: marker.description,
            address: marker.address,
            phone: marker.phone,
            email: marker.email,
            website: marker.website,
            enabled: marker.enabled,
        }
    }
}

/// Body of a create call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewMarker {
    pub title: String,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// Body of an update call. The id travels in the URL as well as the body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerUpdate {
    pub id: MarkerId,
    pub title: String,
    pub position: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cafe() -> MarkerData {
        MarkerData {
            title: Some("Cafe".to_string()),
            position: Some(Position::new(1.0, 2.0)),
            full_address: Some("1 Main St".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_marker_requires_title_and_position() {
        let mut data = cafe();
        data.title = None;
        assert_eq!(data.into_new_marker(true), Err(MissingField::Title));

        let mut data = cafe();
        data.position = None;
        assert_eq!(data.into_new_marker(true), Err(MissingField::Position));
    }

    #[test]
    fn test_blank_strings_count_as_missing() {
        let mut data = cafe();
        data.title = Some("   ".to_string());
        assert_eq!(data.into_new_marker(false), Err(MissingField::Title));

        let mut data = cafe();
        data.full_address = Some(String::new());
        assert_eq!(data.into_new_marker(true), Err(MissingField::FullAddress));
    }

    #[test]
    fn test_full_address_only_required_when_configured() {
        let mut data = cafe();
        data.full_address = None;
        assert_eq!(data.clone().into_new_marker(true), Err(MissingField::FullAddress));

        let new_marker = data.into_new_marker(false).expect("lenient variant should accept");
        assert_eq!(new_marker.title, "Cafe");
        assert!(new_marker.full_address.is_none());
    }

    #[test]
    fn test_update_requires_id() {
        assert_eq!(cafe().into_update(), Err(MissingField::Id));

        let mut data = cafe();
        data.id = Some("m1".to_string());
        data.full_address = None;
        let update = data.into_update().expect("update should validate");
        assert_eq!(update.id, MarkerId::from("m1"));
        assert!(update.full_address.is_none());
    }

    #[test]
    fn test_new_marker_body_omits_missing_optionals() {
        let body = serde_json::to_value(cafe().into_new_marker(true).unwrap()).unwrap();
        assert_eq!(body["title"], "Cafe");
        assert_eq!(body["position"]["lng"], 2.0);
        assert_eq!(body["full_address"], "1 Main St");
        assert!(body.get("website").is_none());
        assert!(body.get("id").is_none());
    }

    #[test]
    fn test_parse_marker_data_from_form_json() {
        let json = r#"{"title":"Cafe","position":{"lat":1,"lng":2},"enabled":true}"#;
        let data: MarkerData = serde_json::from_str(json).expect("Failed to parse marker data");
        assert!(data.id.is_none());
        assert_eq!(data.enabled, Some(true));
        assert_eq!(data.into_new_marker(true), Err(MissingField::FullAddress));
    }
}
