// Trait boundaries for the feed engine's external collaborators.
//
// IncidentStore: the remote incident store (list / create / vote).
// GeolocationProvider: one-shot "where is the device right now".
// ReverseGeocoder: coordinate to zone label, used only when filing a report.
//
// The controller, cache and vote mutator only see these traits, so tests run
// against the mocks in `testing` with no network.

use anyhow::Result;
use async_trait::async_trait;

use incident_store_client::IncidentStoreClient;
use vigil_common::{Coordinates, Incident, IncidentDraft, VoteDirection};

use crate::location::LocationError;

// ---------------------------------------------------------------------------
// IncidentStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn list_incidents(&self) -> incident_store_client::Result<Vec<Incident>>;

    async fn create_incident(&self, draft: &IncidentDraft) -> incident_store_client::Result<Incident>;

    async fn cast_vote(
        &self,
        incident_id: &str,
        direction: VoteDirection,
    ) -> incident_store_client::Result<()>;
}

#[async_trait]
impl IncidentStore for IncidentStoreClient {
    async fn list_incidents(&self) -> incident_store_client::Result<Vec<Incident>> {
        self.list_incidents().await
    }

    async fn create_incident(&self, draft: &IncidentDraft) -> incident_store_client::Result<Incident> {
        self.create_incident(draft).await
    }

    async fn cast_vote(
        &self,
        incident_id: &str,
        direction: VoteDirection,
    ) -> incident_store_client::Result<()> {
        self.cast_vote(incident_id, direction).await
    }
}

// ---------------------------------------------------------------------------
// GeolocationProvider
// ---------------------------------------------------------------------------

#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    /// Ask for the current position once. No continuous tracking.
    async fn current_position(&self) -> std::result::Result<Coordinates, LocationError>;
}

// ---------------------------------------------------------------------------
// ReverseGeocoder
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Human-readable zone for a coordinate. `Ok(None)` when the lookup worked
    /// but produced nothing usable.
    async fn zone_label(&self, at: Coordinates) -> Result<Option<String>>;
}
