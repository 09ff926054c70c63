//! OAuth `state` tokens for interactive connections.
//!
//! Each authorization redirect carries a random state token that maps back to
//! exactly one connection. Tokens stay resolvable for the authorization window
//! so a duplicate callback still reaches its connection (and observes the
//! terminal state) instead of an unknown-token error.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// State token entry
#[derive(Clone, Debug)]
pub struct StateEntry {
    pub connection_id: String,
    pub created_at: DateTime<Utc>,
}

/// OAuth state manager with expiry
#[derive(Clone)]
pub struct StateManager {
    states: Arc<Mutex<HashMap<String, StateEntry>>>,
    expiry_duration: Duration,
}

impl StateManager {
    /// Create a new state manager
    ///
    /// # Arguments
    /// * `expiry` - How long states remain resolvable (the authorization window)
    pub fn new(expiry: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            expiry_duration: expiry,
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, StateEntry>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Generate a new state token for a connection
    pub fn create_state(&self, connection_id: &str) -> String {
        let state = Uuid::new_v4().to_string();
        let entry = StateEntry {
            connection_id: connection_id.to_string(),
            created_at: Utc::now(),
        };
        self.states().insert(state.clone(), entry);
        state
    }

    /// Resolve a state token to its entry, even if past expiry.
    ///
    /// Expiry is enforced on the connection itself; stale tokens are only
    /// dropped by [`cleanup_expired`](Self::cleanup_expired).
    pub fn resolve(&self, state: &str) -> Option<StateEntry> {
        self.states().get(state).cloned()
    }

    /// Drop every token older than the expiry window
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut states = self.states();
        let before = states.len();
        states.retain(|_, entry| now - entry.created_at <= self.expiry_duration);
        before - states.len()
    }

    pub fn count(&self) -> usize {
        self.states().len()
    }
}
