// Test mocks for the feed engine.
//
// Three mocks matching the three trait boundaries:
// - MockIncidentStore (IncidentStore): stateful in-memory store with
//   scriptable failures, a vote gate and queued list responses
// - ScriptedGeolocation (GeolocationProvider): fixed answer, counts requests
// - FixedGeocoder (ReverseGeocoder): fixed label, empty, or failing
//
// Plus helpers for constructing incidents and drafts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use incident_store_client::StoreError;
use tokio::sync::watch;
use vigil_common::{
    Category, Coordinates, Incident, IncidentDraft, Location, Severity, VoteDirection,
};

use crate::location::LocationError;
use crate::traits::{GeolocationProvider, IncidentStore, ReverseGeocoder};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Port-au-Prince, near the fallback reference.
pub const PORT_AU_PRINCE: (f64, f64) = (18.5392, -72.3364);
/// Cap-Haïtien, far north.
pub const CAP_HAITIEN: (f64, f64) = (19.7580, -72.2040);

pub fn incident_at(id: &str, lat: f64, lng: f64) -> Incident {
    Incident {
        id: id.to_string(),
        category: Category::RoadClosure,
        severity: Severity::Moderate,
        description: Some(format!("Report {id}")),
        location: Some(Location {
            lat,
            lng,
            zone: "Test Zone".to_string(),
        }),
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        verified: false,
        upvotes: 0,
        downvotes: 0,
        media: Vec::new(),
    }
}

pub fn incident_without_location(id: &str) -> Incident {
    Incident {
        location: None,
        ..incident_at(id, 0.0, 0.0)
    }
}

pub fn draft_at(lat: f64, lng: f64) -> IncidentDraft {
    IncidentDraft {
        category: Category::Robbery,
        description: "Armed robbery at the market".to_string(),
        severity: Severity::High,
        location: Location {
            lat,
            lng,
            zone: "Croix-des-Bossales".to_string(),
        },
        anonymous: false,
        media: Vec::new(),
    }
}

/// `StoreError` is not `Clone`; scripted failures are replayed through this.
fn replay(err: &StoreError) -> StoreError {
    match err {
        StoreError::Network(m) => StoreError::Network(m.clone()),
        StoreError::Parse(m) => StoreError::Parse(m.clone()),
        StoreError::Api { status, message } => StoreError::Api {
            status: *status,
            message: message.clone(),
        },
        StoreError::Validation(m) => StoreError::Validation(m.clone()),
        StoreError::NotFound(m) => StoreError::NotFound(m.clone()),
        StoreError::InvalidUrl(m) => StoreError::InvalidUrl(m.clone()),
    }
}

// ---------------------------------------------------------------------------
// MockIncidentStore
// ---------------------------------------------------------------------------

/// In-memory incident store. Successful votes and creates are applied to the
/// stored incidents, so a later list reflects them like the real store would.
pub struct MockIncidentStore {
    incidents: Mutex<Vec<Incident>>,
    queued_lists: Mutex<VecDeque<(Duration, Vec<Incident>)>>,
    list_failure: Mutex<Option<StoreError>>,
    create_failure: Mutex<Option<StoreError>>,
    vote_failure: Mutex<Option<StoreError>>,
    list_calls: AtomicUsize,
    created: Mutex<Vec<IncidentDraft>>,
    vote_calls: Mutex<Vec<(String, VoteDirection)>>,
    vote_count: watch::Sender<usize>,
    vote_gate: Option<watch::Sender<bool>>,
}

impl MockIncidentStore {
    pub fn new() -> Self {
        Self {
            incidents: Mutex::new(Vec::new()),
            queued_lists: Mutex::new(VecDeque::new()),
            list_failure: Mutex::new(None),
            create_failure: Mutex::new(None),
            vote_failure: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            created: Mutex::new(Vec::new()),
            vote_calls: Mutex::new(Vec::new()),
            vote_count: watch::channel(0).0,
            vote_gate: None,
        }
    }

    pub fn with_incidents(self, incidents: Vec<Incident>) -> Self {
        *self.incidents.lock().unwrap() = incidents;
        self
    }

    /// Votes block inside the store until [`open_vote_gate`](Self::open_vote_gate).
    pub fn with_vote_gate(mut self) -> Self {
        self.vote_gate = Some(watch::channel(false).0);
        self
    }

    pub fn set_incidents(&self, incidents: Vec<Incident>) {
        *self.incidents.lock().unwrap() = incidents;
    }

    /// The next list call answers `incidents` after `delay`, ahead of the
    /// stored set. Queued answers are consumed in call order.
    pub fn queue_list_response(&self, delay: Duration, incidents: Vec<Incident>) {
        self.queued_lists
            .lock()
            .unwrap()
            .push_back((delay, incidents));
    }

    pub fn fail_list_with(&self, err: StoreError) {
        *self.list_failure.lock().unwrap() = Some(err);
    }

    pub fn clear_list_failure(&self) {
        *self.list_failure.lock().unwrap() = None;
    }

    pub fn fail_create_with(&self, err: StoreError) {
        *self.create_failure.lock().unwrap() = Some(err);
    }

    pub fn fail_votes_with(&self, err: StoreError) {
        *self.vote_failure.lock().unwrap() = Some(err);
    }

    pub fn clear_vote_failure(&self) {
        *self.vote_failure.lock().unwrap() = None;
    }

    pub fn open_vote_gate(&self) {
        if let Some(gate) = &self.vote_gate {
            gate.send_replace(true);
        }
    }

    /// Resolves once at least `n` vote calls have reached the store.
    pub async fn wait_for_vote_calls(&self, n: usize) {
        let mut rx = self.vote_count.subscribe();
        let _ = rx.wait_for(|count| *count >= n).await;
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn vote_calls(&self) -> Vec<(String, VoteDirection)> {
        self.vote_calls.lock().unwrap().clone()
    }

    pub fn created_drafts(&self) -> Vec<IncidentDraft> {
        self.created.lock().unwrap().clone()
    }
}

impl Default for MockIncidentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IncidentStore for MockIncidentStore {
    async fn list_incidents(&self) -> incident_store_client::Result<Vec<Incident>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let queued = self.queued_lists.lock().unwrap().pop_front();
        if let Some((delay, incidents)) = queued {
            tokio::time::sleep(delay).await;
            return Ok(incidents);
        }

        if let Some(err) = self.list_failure.lock().unwrap().as_ref() {
            return Err(replay(err));
        }
        Ok(self.incidents.lock().unwrap().clone())
    }

    async fn create_incident(&self, draft: &IncidentDraft) -> incident_store_client::Result<Incident> {
        if let Some(err) = self.create_failure.lock().unwrap().as_ref() {
            return Err(replay(err));
        }

        let mut created = self.created.lock().unwrap();
        created.push(draft.clone());
        let incident = Incident {
            id: format!("created-{}", created.len()),
            category: draft.category,
            severity: draft.severity,
            description: Some(draft.description.clone()),
            location: Some(draft.location.clone()),
            created_at: Utc::now(),
            verified: false,
            upvotes: 0,
            downvotes: 0,
            media: Vec::new(),
        };
        drop(created);

        self.incidents.lock().unwrap().push(incident.clone());
        Ok(incident)
    }

    async fn cast_vote(
        &self,
        incident_id: &str,
        direction: VoteDirection,
    ) -> incident_store_client::Result<()> {
        self.vote_calls
            .lock()
            .unwrap()
            .push((incident_id.to_string(), direction));
        self.vote_count.send_modify(|count| *count += 1);

        if let Some(gate) = &self.vote_gate {
            let mut rx = gate.subscribe();
            let _ = rx.wait_for(|open| *open).await;
        }

        if let Some(err) = self.vote_failure.lock().unwrap().as_ref() {
            return Err(replay(err));
        }

        let mut incidents = self.incidents.lock().unwrap();
        let incident = incidents
            .iter_mut()
            .find(|i| i.id == incident_id)
            .ok_or_else(|| StoreError::NotFound(incident_id.to_string()))?;
        match direction {
            VoteDirection::Upvote => incident.upvotes += 1,
            VoteDirection::Downvote => incident.downvotes += 1,
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedGeolocation
// ---------------------------------------------------------------------------

/// Answers every request the same way and counts how often it was asked.
pub struct ScriptedGeolocation {
    answer: Result<Coordinates, LocationError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedGeolocation {
    pub fn ok(position: Coordinates) -> Self {
        Self {
            answer: Ok(position),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn err(err: LocationError) -> Self {
        Self {
            answer: Err(err),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeolocationProvider for ScriptedGeolocation {
    async fn current_position(&self) -> std::result::Result<Coordinates, LocationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.answer.clone()
    }
}

// ---------------------------------------------------------------------------
// FixedGeocoder
// ---------------------------------------------------------------------------

pub struct FixedGeocoder {
    answer: Option<Option<String>>,
}

impl FixedGeocoder {
    pub fn label(zone: &str) -> Self {
        Self {
            answer: Some(Some(zone.to_string())),
        }
    }

    /// Lookup succeeds but has no usable area name.
    pub fn empty() -> Self {
        Self { answer: Some(None) }
    }

    pub fn failing() -> Self {
        Self { answer: None }
    }
}

#[async_trait]
impl ReverseGeocoder for FixedGeocoder {
    async fn zone_label(&self, _at: Coordinates) -> Result<Option<String>> {
        self.answer
            .clone()
            .ok_or_else(|| anyhow::anyhow!("FixedGeocoder: lookup failed"))
    }
}
