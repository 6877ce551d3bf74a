//! Vote mutations with at most one in-flight request per incident.
//!
//! Each incident id is either idle or pending. A vote on a pending id is
//! rejected without reaching the store, so rapid repeated clicks cannot
//! double-count. Only a successful vote invalidates the feed cache.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use incident_store_client::StoreError;
use vigil_common::VoteDirection;

use crate::cache::FeedCache;
use crate::traits::IncidentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The store accepted the vote and the cache was invalidated.
    Recorded,
    /// Another vote on this incident has not settled yet; nothing was sent.
    AlreadyPending,
}

pub struct VoteMutator {
    store: Arc<dyn IncidentStore>,
    cache: Arc<FeedCache>,
    pending: Arc<Mutex<HashSet<String>>>,
}

impl VoteMutator {
    pub fn new(store: Arc<dyn IncidentStore>, cache: Arc<FeedCache>) -> Self {
        Self {
            store,
            cache,
            pending: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn cast_vote(
        &self,
        incident_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, StoreError> {
        let Some(_guard) = PendingGuard::acquire(&self.pending, incident_id) else {
            tracing::debug!(incident_id, %direction, "Vote already in flight, ignoring");
            return Ok(VoteOutcome::AlreadyPending);
        };

        match self.store.cast_vote(incident_id, direction).await {
            Ok(()) => {
                self.cache.invalidate();
                tracing::info!(incident_id, %direction, "Vote recorded");
                Ok(VoteOutcome::Recorded)
            }
            Err(e) => {
                tracing::warn!(incident_id, %direction, error = %e, "Vote failed");
                Err(e)
            }
        }
    }

    pub fn is_pending(&self, incident_id: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(incident_id)
    }
}

/// Holds an id in the pending set; dropping it (settled or cancelled) returns
/// the id to idle.
struct PendingGuard {
    pending: Arc<Mutex<HashSet<String>>>,
    incident_id: String,
}

impl PendingGuard {
    fn acquire(pending: &Arc<Mutex<HashSet<String>>>, incident_id: &str) -> Option<Self> {
        let inserted = pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(incident_id.to_string());
        inserted.then(|| Self {
            pending: Arc::clone(pending),
            incident_id: incident_id.to_string(),
        })
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.incident_id);
    }
}
