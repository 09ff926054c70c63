use super::{Connection, ConnectionRequest, ConnectionStatus};
use crate::error::ConnectError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory connection state.
///
/// Each connection sits behind its own `RwLock`: transitions take the write
/// lock (single writer per connection), reads take a short read lock and
/// return a snapshot. The map shard lock is released before the connection
/// lock is taken.
#[derive(Default)]
pub struct ConnectionStore {
    connections: DashMap<String, Arc<RwLock<Connection>>>,
    requests: DashMap<String, ConnectionRequest>,
}

impl ConnectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&self, request: ConnectionRequest, connection: Connection) {
        self.requests.insert(request.id.clone(), request);
        self.connections
            .insert(connection.id.clone(), Arc::new(RwLock::new(connection)));
    }

    fn slot(&self, id: &str) -> Result<Arc<RwLock<Connection>>, ConnectError> {
        self.connections
            .get(id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(|| ConnectError::ConnectionNotFound { id: id.to_string() })
    }

    /// Snapshot of the connection's current state.
    pub fn get(&self, id: &str) -> Result<Connection, ConnectError> {
        let slot = self.slot(id)?;
        let connection = slot.read().unwrap_or_else(PoisonError::into_inner);
        Ok(connection.clone())
    }

    pub fn request(&self, id: &str) -> Option<ConnectionRequest> {
        self.requests.get(id).map(|r| r.clone())
    }

    /// Applies `apply` iff the current status is one of `from`.
    ///
    /// Returns the connection after the transition. A terminal current
    /// status yields `AlreadyTerminal`, any other mismatch `InvalidState`;
    /// in both cases the connection is left untouched.
    pub(crate) fn transition<F>(
        &self,
        id: &str,
        from: &[ConnectionStatus],
        apply: F,
    ) -> Result<Connection, ConnectError>
    where
        F: FnOnce(&mut Connection),
    {
        let slot = self.slot(id)?;
        let mut connection = slot.write().unwrap_or_else(PoisonError::into_inner);

        if !from.contains(&connection.status) {
            let status = connection.status;
            return Err(if status.is_terminal() {
                ConnectError::AlreadyTerminal {
                    id: id.to_string(),
                    status,
                }
            } else {
                ConnectError::InvalidState {
                    id: id.to_string(),
                    status,
                }
            });
        }

        apply(&mut connection);
        Ok(connection.clone())
    }

    /// Connections of one entity, oldest first.
    pub fn list_by_entity(&self, entity_id: &str) -> Vec<Connection> {
        let slots: Vec<_> = self
            .connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut connections: Vec<Connection> = slots
            .iter()
            .map(|slot| slot.read().unwrap_or_else(PoisonError::into_inner).clone())
            .filter(|c| c.entity_id == entity_id)
            .collect();
        connections.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        connections
    }

    /// Ids of non-terminal connections past their authorization deadline.
    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<String> {
        let slots: Vec<_> = self
            .connections
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        slots
            .iter()
            .filter_map(|slot| {
                let connection = slot.read().unwrap_or_else(PoisonError::into_inner);
                connection.is_overdue(now).then(|| connection.id.clone())
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }
}
