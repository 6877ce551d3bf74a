//! Device position for ranking and for filing reports.
//!
//! The two uses recover differently. Ranking always gets a coordinate: a failed
//! lookup falls back to [`FALLBACK_LOCATION`]. A report must carry where the
//! reporter actually is, so [`ReportLocator`] surfaces the failure instead.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use vigil_common::{Coordinates, Location};

use crate::traits::{GeolocationProvider, ReverseGeocoder};

/// Used for ranking when the device position is unavailable.
pub const FALLBACK_LOCATION: Coordinates = Coordinates::new(18.9712, -72.2852);

/// Zone label when reverse geocoding fails or returns nothing.
pub const UNKNOWN_AREA: &str = "Unknown Area";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location request timed out")]
    Timeout,

    #[error("geolocation is not supported on this device")]
    Unsupported,

    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Ask the provider once; on any failure use `fallback`.
pub async fn resolve_reference(
    provider: &dyn GeolocationProvider,
    fallback: Coordinates,
) -> Coordinates {
    match provider.current_position().await {
        Ok(position) if position.is_finite() => {
            tracing::info!("Reference location resolved from device");
            tracing::debug!(lat = position.lat, lng = position.lng, "Device position");
            position
        }
        Ok(_) => {
            tracing::warn!("Device reported a non-finite position, using fallback");
            fallback
        }
        Err(e) => {
            tracing::warn!(error = %e, "Geolocation failed, using fallback reference location");
            fallback
        }
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

/// A device whose position is known up front (configured or pinned).
pub struct FixedGeolocation {
    position: Coordinates,
}

impl FixedGeolocation {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.position)
    }
}

/// A device with no geolocation capability.
pub struct NoGeolocation;

#[async_trait]
impl GeolocationProvider for NoGeolocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unsupported)
    }
}

// ---------------------------------------------------------------------------
// ReportLocator
// ---------------------------------------------------------------------------

/// Builds the [`Location`] attached to a new report: device position plus a
/// best-effort zone label.
pub struct ReportLocator {
    geolocation: Arc<dyn GeolocationProvider>,
    geocoder: Arc<dyn ReverseGeocoder>,
}

impl ReportLocator {
    pub fn new(geolocation: Arc<dyn GeolocationProvider>, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        Self {
            geolocation,
            geocoder,
        }
    }

    pub async fn locate(&self) -> Result<Location, LocationError> {
        let position = self.geolocation.current_position().await?;
        if !position.is_finite() {
            return Err(LocationError::Unavailable("non-finite position".into()));
        }

        let zone = match self.geocoder.zone_label(position).await {
            Ok(Some(zone)) if !zone.trim().is_empty() => zone,
            Ok(_) => UNKNOWN_AREA.to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Reverse geocoding failed");
                UNKNOWN_AREA.to_string()
            }
        };

        Ok(Location {
            lat: position.lat,
            lng: position.lng,
            zone,
        })
    }
}
