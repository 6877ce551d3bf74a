use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Geo Types ---

/// A bare latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components are real numbers (no NaN / infinity).
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }
}

/// Haversine great-circle distance between two lat/lng points in kilometers.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Where an incident happened, with the human-readable zone it was filed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub zone: String,
}

impl Location {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.lat, self.lng)
    }
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    GangActivity,
    SexualViolence,
    CivilUnrest,
    Kidnapping,
    Robbery,
    NaturalDisaster,
    RoadClosure,
}

impl Category {
    /// Human-readable label shown on cards and in the report form.
    pub fn label(self) -> &'static str {
        match self {
            Category::GangActivity => "Gang Activity",
            Category::SexualViolence => "Sexual Violence",
            Category::CivilUnrest => "Civil Unrest",
            Category::Kidnapping => "Kidnapping",
            Category::Robbery => "Robbery",
            Category::NaturalDisaster => "Natural Disaster",
            Category::RoadClosure => "Road Closure",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::GangActivity => write!(f, "GANG_ACTIVITY"),
            Category::SexualViolence => write!(f, "SEXUAL_VIOLENCE"),
            Category::CivilUnrest => write!(f, "CIVIL_UNREST"),
            Category::Kidnapping => write!(f, "KIDNAPPING"),
            Category::Robbery => write!(f, "ROBBERY"),
            Category::NaturalDisaster => write!(f, "NATURAL_DISASTER"),
            Category::RoadClosure => write!(f, "ROAD_CLOSURE"),
        }
    }
}

/// Ordered so that `Critical > High > Moderate > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Moderate,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Moderate => write!(f, "MODERATE"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Upvote,
    Downvote,
}

impl std::fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteDirection::Upvote => write!(f, "upvote"),
            VoteDirection::Downvote => write!(f, "downvote"),
        }
    }
}

// --- Media ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub url: String,
}

/// A file attached to a new report. Only the store knows where it ends up.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    pub fn kind(&self) -> Option<MediaKind> {
        if self.content_type.starts_with("image/") {
            Some(MediaKind::Image)
        } else if self.content_type.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

// --- Incidents ---

/// A community incident report as served by the incident store.
///
/// Read-only on the client: counts and verification only change by refetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    #[serde(rename = "type")]
    pub category: Category,
    pub severity: Severity,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
    #[serde(rename = "incident_media", default)]
    pub media: Vec<MediaRef>,
}

impl Incident {
    /// Coordinates usable for distance math, if the incident has any.
    pub fn coordinates(&self) -> Option<Coordinates> {
        self.location
            .as_ref()
            .map(Location::coordinates)
            .filter(Coordinates::is_finite)
    }
}

/// A new report before the store has assigned it an id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentDraft {
    #[serde(rename = "type")]
    pub category: Category,
    pub description: String,
    pub severity: Severity,
    pub location: Location,
    pub anonymous: bool,
    #[serde(skip)]
    pub media: Vec<MediaUpload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = (18.9712, -72.2852);
        let b = (18.5392, -72.3364);
        let ab = haversine_km(a.0, a.1, b.0, b.1);
        let ba = haversine_km(b.0, b.1, a.0, a.1);
        assert!((ab - ba).abs() < 1e-9);
        assert_eq!(haversine_km(a.0, a.1, a.0, a.1), 0.0);
    }

    #[test]
    fn distance_to_leogane_area() {
        let d = haversine_km(18.9712, -72.2852, 18.5392, -72.3364);
        assert!(d > 48.0 && d < 50.0, "Expected ~48-50 km, got {d}");
    }

    #[test]
    fn distance_propagates_nan() {
        assert!(haversine_km(f64::NAN, 0.0, 1.0, 1.0).is_nan());
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Moderate);
        assert!(Severity::Moderate > Severity::Low);
    }

    #[test]
    fn incident_deserializes_store_payload() {
        let json = r#"{
            "id": "inc-1",
            "type": "ROAD_CLOSURE",
            "severity": "HIGH",
            "description": "Barricade on Route 2",
            "location": { "lat": 18.5, "lng": -72.3, "zone": "Delmas" },
            "created_at": "2024-03-01T12:00:00Z",
            "verified": true,
            "upvotes": 4,
            "downvotes": 1,
            "incident_media": [{ "type": "image", "url": "https://cdn.example/1.jpg" }]
        }"#;
        let incident: Incident = serde_json::from_str(json).unwrap();
        assert_eq!(incident.category, Category::RoadClosure);
        assert_eq!(incident.severity, Severity::High);
        assert_eq!(incident.media[0].kind, MediaKind::Image);
        assert_eq!(incident.location.unwrap().zone, "Delmas");
    }

    #[test]
    fn incident_defaults_optional_fields() {
        let json = r#"{
            "id": "inc-2",
            "type": "ROBBERY",
            "severity": "LOW",
            "created_at": "2024-03-01T12:00:00Z"
        }"#;
        let incident: Incident = serde_json::from_str(json).unwrap();
        assert!(incident.location.is_none());
        assert!(incident.media.is_empty());
        assert_eq!(incident.upvotes, 0);
        assert!(!incident.verified);
    }

    #[test]
    fn non_finite_location_has_no_coordinates() {
        let json = r#"{
            "id": "inc-3",
            "type": "KIDNAPPING",
            "severity": "CRITICAL",
            "location": { "lat": 1.0, "lng": 2.0, "zone": "X" },
            "created_at": "2024-03-01T12:00:00Z"
        }"#;
        let mut incident: Incident = serde_json::from_str(json).unwrap();
        assert!(incident.coordinates().is_some());
        incident.location.as_mut().unwrap().lat = f64::NAN;
        assert!(incident.coordinates().is_none());
    }

    #[test]
    fn draft_serializes_without_media() {
        let draft = IncidentDraft {
            category: Category::CivilUnrest,
            description: "Crowd gathering".into(),
            severity: Severity::Moderate,
            location: Location { lat: 1.0, lng: 2.0, zone: "Pétion-Ville".into() },
            anonymous: true,
            media: vec![MediaUpload {
                file_name: "a.jpg".into(),
                content_type: "image/jpeg".into(),
                bytes: vec![1, 2, 3],
            }],
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(value["type"], "CIVIL_UNREST");
        assert_eq!(value["severity"], "MODERATE");
        assert!(value.get("media").is_none());
    }
}
