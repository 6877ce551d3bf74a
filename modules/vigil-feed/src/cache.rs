//! Last known-good incident snapshot.
//!
//! A failed refresh never clears the snapshot: consumers keep seeing the last
//! good feed through transient store errors. Overlapping refreshes are not
//! sequenced; whichever response arrives last replaces the snapshot.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use incident_store_client::StoreError;
use vigil_common::Incident;

use crate::traits::IncidentStore;

pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60);

#[derive(Default)]
struct CacheState {
    /// Ids in the order the store returned them.
    order: Vec<String>,
    by_id: HashMap<String, Incident>,
    fetched_at: Option<Instant>,
    fetched_at_wall: Option<DateTime<Utc>>,
    invalidated: bool,
    /// Bumped on every `invalidate()`.
    epoch: u64,
}

pub struct FeedCache {
    store: Arc<dyn IncidentStore>,
    stale_after: Duration,
    state: RwLock<CacheState>,
}

impl FeedCache {
    pub fn new(store: Arc<dyn IncidentStore>, stale_after: Duration) -> Self {
        Self {
            store,
            stale_after,
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Snapshot in fetch order. Possibly stale, empty before the first fetch.
    pub fn get(&self) -> Vec<Incident> {
        let state = self.read();
        state
            .order
            .iter()
            .filter_map(|id| state.by_id.get(id).cloned())
            .collect()
    }

    pub fn find(&self, incident_id: &str) -> Option<Incident> {
        self.read().by_id.get(incident_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fetch from the store and swap the snapshot in. Always hits the store;
    /// deciding whether a refetch is warranted is the caller's job.
    ///
    /// Returns the number of incidents now cached.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let epoch_at_request = self.read().epoch;

        let incidents = match self.store.list_incidents().await {
            Ok(incidents) => incidents,
            Err(e) => {
                tracing::warn!(error = %e, "Feed refresh failed, keeping previous snapshot");
                return Err(e);
            }
        };

        let mut order = Vec::with_capacity(incidents.len());
        let mut by_id = HashMap::with_capacity(incidents.len());
        for incident in incidents {
            if !by_id.contains_key(&incident.id) {
                order.push(incident.id.clone());
            }
            by_id.insert(incident.id.clone(), incident);
        }
        let count = order.len();

        let mut state = self.write();
        state.order = order;
        state.by_id = by_id;
        state.fetched_at = Some(Instant::now());
        state.fetched_at_wall = Some(Utc::now());
        // A mutation that landed while this request was in flight may not be
        // reflected in the response, so the invalid mark survives it.
        if state.epoch == epoch_at_request {
            state.invalidated = false;
        }
        drop(state);

        tracing::debug!(count, "Feed snapshot replaced");
        Ok(count)
    }

    /// Mark the snapshot untrusted after a mutation.
    pub fn invalidate(&self) {
        let mut state = self.write();
        state.invalidated = true;
        state.epoch += 1;
    }

    pub fn is_invalidated(&self) -> bool {
        self.read().invalidated
    }

    /// Never fetched, invalidated, or older than the staleness threshold.
    pub fn is_stale(&self) -> bool {
        let state = self.read();
        match state.fetched_at {
            None => true,
            Some(_) if state.invalidated => true,
            Some(at) => at.elapsed() >= self.stale_after,
        }
    }

    pub fn last_fetched(&self) -> Option<DateTime<Utc>> {
        self.read().fetched_at_wall
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{incident_at, incident_without_location, MockIncidentStore};

    fn ids(incidents: &[Incident]) -> Vec<&str> {
        incidents.iter().map(|i| i.id.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_before_first_fetch() {
        let cache = FeedCache::new(Arc::new(MockIncidentStore::new()), DEFAULT_STALE_AFTER);
        assert!(cache.get().is_empty());
        assert!(cache.is_empty());
        assert!(cache.is_stale());
        assert!(cache.last_fetched().is_none());
    }

    #[tokio::test]
    async fn refresh_replaces_snapshot_in_fetch_order() {
        let store = Arc::new(MockIncidentStore::new().with_incidents(vec![
            incident_at("b", 1.0, 1.0),
            incident_without_location("c"),
            incident_at("a", 0.0, 0.0),
        ]));
        let cache = FeedCache::new(store.clone(), DEFAULT_STALE_AFTER);

        assert_eq!(cache.refresh().await.unwrap(), 3);
        assert_eq!(cache.len(), 3);
        assert!(!cache.is_empty());
        assert_eq!(ids(&cache.get()), vec!["b", "c", "a"]);
        assert!(!cache.is_stale());
        assert!(cache.last_fetched().is_some());
        assert_eq!(cache.find("c").unwrap().id, "c");

        store.set_incidents(vec![incident_at("z", 0.0, 0.0)]);
        cache.refresh().await.unwrap();
        assert_eq!(ids(&cache.get()), vec!["z"]);
        assert!(cache.find("a").is_none());
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let store = Arc::new(MockIncidentStore::new().with_incidents(vec![
            incident_at("a", 0.0, 0.0),
            incident_at("b", 1.0, 1.0),
        ]));
        let cache = FeedCache::new(store.clone(), DEFAULT_STALE_AFTER);
        cache.refresh().await.unwrap();
        let before = cache.get();
        let fetched = cache.last_fetched();

        store.fail_list_with(StoreError::Network("connection reset".into()));
        let err = cache.refresh().await.unwrap_err();

        assert!(err.is_transport());
        assert_eq!(cache.get(), before);
        assert_eq!(cache.last_fetched(), fetched);
    }

    #[tokio::test]
    async fn duplicate_ids_keep_first_position_and_last_record() {
        let mut newer = incident_at("a", 0.0, 0.0);
        newer.upvotes = 9;
        let store = Arc::new(MockIncidentStore::new().with_incidents(vec![
            incident_at("a", 0.0, 0.0),
            incident_at("b", 1.0, 1.0),
            newer,
        ]));
        let cache = FeedCache::new(store, DEFAULT_STALE_AFTER);

        assert_eq!(cache.refresh().await.unwrap(), 2);
        let snapshot = cache.get();
        assert_eq!(ids(&snapshot), vec!["a", "b"]);
        assert_eq!(snapshot[0].upvotes, 9);
    }

    #[tokio::test]
    async fn invalidate_marks_stale_until_next_refresh() {
        let store = Arc::new(MockIncidentStore::new());
        let cache = FeedCache::new(store.clone(), DEFAULT_STALE_AFTER);
        cache.refresh().await.unwrap();
        assert!(!cache.is_stale());

        cache.invalidate();
        assert!(cache.is_invalidated());
        assert!(cache.is_stale());

        cache.refresh().await.unwrap();
        assert!(!cache.is_invalidated());
        assert!(!cache.is_stale());
        assert_eq!(store.list_calls(), 2);
    }

    #[tokio::test]
    async fn snapshot_older_than_threshold_is_stale() {
        let cache = FeedCache::new(Arc::new(MockIncidentStore::new()), Duration::ZERO);
        cache.refresh().await.unwrap();
        assert!(cache.is_stale());
    }
}
