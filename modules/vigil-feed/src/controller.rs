//! Feed orchestration: reference location, refresh cadence, and the read path
//! presentation surfaces use.
//!
//! `current_feed()` is a pure read of cache + reference location. Fetch errors
//! never reach it; they show up in [`FeedStatus`] while the last good feed
//! stays visible. Create and vote errors go straight back to the caller.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use incident_store_client::StoreError;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use vigil_common::{
    Coordinates, Incident, IncidentDraft, IncidentView, Location, MapMarker, VoteDirection,
};

use crate::cache::FeedCache;
use crate::config::FeedConfig;
use crate::location::{resolve_reference, LocationError, ReportLocator};
use crate::ranker::rank;
use crate::traits::{GeolocationProvider, IncidentStore, ReverseGeocoder};
use crate::vote::{VoteMutator, VoteOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedStatus {
    /// No fetch has completed yet.
    Loading,
    Ready { fetched_at: DateTime<Utc> },
    /// The last fetch failed. The previous snapshot (if any) is still served.
    Unavailable { error: String, since: DateTime<Utc> },
}

impl FeedStatus {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, FeedStatus::Unavailable { .. })
    }
}

pub struct FeedController {
    store: Arc<dyn IncidentStore>,
    cache: Arc<FeedCache>,
    votes: VoteMutator,
    geolocation: Arc<dyn GeolocationProvider>,
    report_locator: ReportLocator,
    fallback: Coordinates,
    reference: OnceCell<Coordinates>,
    refresh_interval: Duration,
    status: RwLock<FeedStatus>,
}

impl FeedController {
    pub fn new(
        store: Arc<dyn IncidentStore>,
        geolocation: Arc<dyn GeolocationProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
        config: &FeedConfig,
    ) -> Self {
        let cache = Arc::new(FeedCache::new(store.clone(), config.stale_after));
        Self {
            votes: VoteMutator::new(store.clone(), cache.clone()),
            report_locator: ReportLocator::new(geolocation.clone(), geocoder),
            store,
            cache,
            geolocation,
            fallback: config.fallback_location,
            reference: OnceCell::new(),
            refresh_interval: config.refresh_interval,
            status: RwLock::new(FeedStatus::Loading),
        }
    }

    /// Resolve the reference location, then load the first snapshot.
    pub async fn start(&self) -> FeedStatus {
        self.resolve_reference_location().await;
        self.refresh_feed().await
    }

    /// Resolve the ranking reference at most once per controller. Concurrent
    /// first callers share a single geolocation request.
    pub async fn resolve_reference_location(&self) -> Coordinates {
        *self
            .reference
            .get_or_init(|| resolve_reference(self.geolocation.as_ref(), self.fallback))
            .await
    }

    /// `None` until [`resolve_reference_location`](Self::resolve_reference_location) completes.
    pub fn reference_location(&self) -> Option<Coordinates> {
        self.reference.get().copied()
    }

    // --- Read path ---

    /// The cached feed ordered by proximity to the reference location.
    pub fn current_feed(&self) -> Vec<Incident> {
        rank(&self.cache.get(), self.reference_location())
    }

    /// Card fields for the list view. Incidents without a location are not listed.
    pub fn incident_views(&self) -> Vec<IncidentView> {
        self.current_feed()
            .iter()
            .filter(|incident| incident.location.is_some())
            .map(IncidentView::from)
            .collect()
    }

    pub fn map_markers(&self) -> Vec<MapMarker> {
        self.current_feed()
            .iter()
            .filter_map(MapMarker::for_incident)
            .collect()
    }

    /// Lookup for the detail view.
    pub fn incident(&self, incident_id: &str) -> Option<Incident> {
        self.cache.find(incident_id)
    }

    pub fn status(&self) -> FeedStatus {
        self.status
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    // --- Refresh ---

    /// Refetch unconditionally. Failures only change the status.
    pub async fn refresh_feed(&self) -> FeedStatus {
        let result = self.cache.refresh().await;

        let mut status = self.status.write().unwrap_or_else(PoisonError::into_inner);
        let next = match result {
            Ok(_) => FeedStatus::Ready {
                fetched_at: self.cache.last_fetched().unwrap_or_else(Utc::now),
            },
            Err(e) => {
                let since = match &*status {
                    FeedStatus::Unavailable { since, .. } => *since,
                    _ => Utc::now(),
                };
                FeedStatus::Unavailable {
                    error: e.to_string(),
                    since,
                }
            }
        };
        *status = next.clone();
        next
    }

    /// Refetch only when the cache reports stale or invalidated.
    pub async fn ensure_fresh(&self) -> FeedStatus {
        if self.cache.is_stale() {
            self.refresh_feed().await
        } else {
            self.status()
        }
    }

    /// Refresh on a fixed interval until the returned handle is stopped or dropped.
    pub fn spawn_refresh_loop(self: &Arc<Self>) -> RefreshLoop {
        let controller = Arc::clone(self);
        let period = self.refresh_interval.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let status = controller.refresh_feed().await;
                tracing::debug!(unavailable = status.is_unavailable(), "Periodic feed refresh");
            }
        });

        tracing::info!(interval_secs = period.as_secs_f64(), "Feed refresh loop started");
        RefreshLoop { handle }
    }

    // --- Mutations ---

    /// Create a report, then refresh so the feed includes it.
    pub async fn submit_incident(&self, draft: &IncidentDraft) -> Result<Incident, StoreError> {
        let created = self.store.create_incident(draft).await?;
        self.cache.invalidate();
        self.refresh_feed().await;
        Ok(created)
    }

    /// Vote on an incident. A recorded vote triggers an immediate refresh; a
    /// rejected duplicate or a failed vote does not.
    pub async fn vote(
        &self,
        incident_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, StoreError> {
        let outcome = self.votes.cast_vote(incident_id, direction).await?;
        if outcome == VoteOutcome::Recorded {
            self.refresh_feed().await;
        }
        Ok(outcome)
    }

    pub fn is_vote_pending(&self, incident_id: &str) -> bool {
        self.votes.is_pending(incident_id)
    }

    /// Position and zone label for a new report. Does not fall back.
    pub async fn locate_report(&self) -> Result<Location, LocationError> {
        self.report_locator.locate().await
    }
}

/// Handle to the periodic refresh task. Dropping it stops the loop; a fetch
/// already in flight is abandoned.
pub struct RefreshLoop {
    handle: JoinHandle<()>,
}

impl RefreshLoop {
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for RefreshLoop {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
