//! Presentation-facing fields derived from an [`Incident`].
//!
//! Nothing here touches the network or the cache; list, detail and map views
//! render straight from these values.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{Category, Coordinates, Incident, Severity};

/// Four fixed display tiers, one per severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    Red,
    Orange,
    Yellow,
    Blue,
}

impl SeverityTier {
    pub fn badge_class(self) -> &'static str {
        match self {
            SeverityTier::Red => "bg-red-100 text-red-800",
            SeverityTier::Orange => "bg-orange-100 text-orange-800",
            SeverityTier::Yellow => "bg-yellow-100 text-yellow-800",
            SeverityTier::Blue => "bg-blue-100 text-blue-800",
        }
    }
}

impl From<Severity> for SeverityTier {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Critical => SeverityTier::Red,
            Severity::High => SeverityTier::Orange,
            Severity::Moderate => SeverityTier::Yellow,
            Severity::Low => SeverityTier::Blue,
        }
    }
}

/// Flattened card/detail fields for one incident.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncidentView {
    pub id: String,
    pub category: Category,
    pub category_label: &'static str,
    pub severity: Severity,
    pub tier: SeverityTier,
    pub badge_class: &'static str,
    pub description: Option<String>,
    pub zone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub verified: bool,
    pub upvotes: u32,
    pub downvotes: u32,
    pub media_count: usize,
}

impl From<&Incident> for IncidentView {
    fn from(incident: &Incident) -> Self {
        let tier = SeverityTier::from(incident.severity);
        Self {
            id: incident.id.clone(),
            category: incident.category,
            category_label: incident.category.label(),
            severity: incident.severity,
            tier,
            badge_class: tier.badge_class(),
            description: incident.description.clone(),
            zone: incident.location.as_ref().map(|l| l.zone.clone()),
            created_at: incident.created_at,
            verified: incident.verified,
            upvotes: incident.upvotes,
            downvotes: incident.downvotes,
            media_count: incident.media.len(),
        }
    }
}

/// A pin on the map. Only incidents with usable coordinates get one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapMarker {
    pub id: String,
    pub position: Coordinates,
    pub category_label: &'static str,
    pub tier: SeverityTier,
}

impl MapMarker {
    pub fn for_incident(incident: &Incident) -> Option<Self> {
        let position = incident.coordinates()?;
        Some(Self {
            id: incident.id.clone(),
            position,
            category_label: incident.category.label(),
            tier: incident.severity.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Location, MediaKind, MediaRef};

    fn incident(severity: Severity, location: Option<Location>) -> Incident {
        Incident {
            id: "inc-1".into(),
            category: Category::NaturalDisaster,
            severity,
            description: None,
            location,
            created_at: Utc::now(),
            verified: false,
            upvotes: 2,
            downvotes: 0,
            media: vec![
                MediaRef { kind: MediaKind::Image, url: "a".into() },
                MediaRef { kind: MediaKind::Video, url: "b".into() },
            ],
        }
    }

    #[test]
    fn severity_maps_to_fixed_tiers() {
        assert_eq!(SeverityTier::from(Severity::Critical), SeverityTier::Red);
        assert_eq!(SeverityTier::from(Severity::High), SeverityTier::Orange);
        assert_eq!(SeverityTier::from(Severity::Moderate), SeverityTier::Yellow);
        assert_eq!(SeverityTier::from(Severity::Low), SeverityTier::Blue);
        assert_eq!(SeverityTier::Red.badge_class(), "bg-red-100 text-red-800");
    }

    #[test]
    fn view_carries_label_and_media_count() {
        let loc = Location { lat: 18.5, lng: -72.3, zone: "Carrefour".into() };
        let view = IncidentView::from(&incident(Severity::High, Some(loc)));
        assert_eq!(view.category_label, "Natural Disaster");
        assert_eq!(view.media_count, 2);
        assert_eq!(view.zone.as_deref(), Some("Carrefour"));
        assert_eq!(view.badge_class, "bg-orange-100 text-orange-800");
    }

    #[test]
    fn marker_requires_finite_location() {
        assert!(MapMarker::for_incident(&incident(Severity::Low, None)).is_none());

        let nan = Location { lat: f64::NAN, lng: -72.3, zone: "?".into() };
        assert!(MapMarker::for_incident(&incident(Severity::Low, Some(nan))).is_none());

        let ok = Location { lat: 18.5, lng: -72.3, zone: "Carrefour".into() };
        let marker = MapMarker::for_incident(&incident(Severity::Low, Some(ok))).unwrap();
        assert_eq!(marker.position, Coordinates::new(18.5, -72.3));
        assert_eq!(marker.tier, SeverityTier::Blue);
    }
}
