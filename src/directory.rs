//! # Node Directory
//!
//! Holds the static, ordered coordinator list and the table affinity cache
//! mapping a table name to the storage nodes last known to own it. Updates
//! are atomic per table.

use dashmap::DashMap;
use tracing::debug;

use crate::model::NodeEndpoint;

#[derive(Debug)]
pub struct NodeDirectory {
    coordinators: Vec<NodeEndpoint>,
    affinity: DashMap<String, Vec<NodeEndpoint>>,
}

impl NodeDirectory {
    pub fn new(coordinators: Vec<NodeEndpoint>) -> Self {
        Self {
            coordinators,
            affinity: DashMap::new(),
        }
    }

    /// Coordinators in configured failover order.
    pub fn coordinators(&self) -> &[NodeEndpoint] {
        &self.coordinators
    }

    /// Snapshot of the cached owners of `table`. Empty on a miss.
    pub fn lookup_cached(&self, table: &str) -> Vec<NodeEndpoint> {
        self.affinity
            .get(table)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Records the owners returned by a successful coordinator resolution.
    /// Last writer wins; an empty owner set is never cached.
    pub fn install(&self, table: &str, endpoints: Vec<NodeEndpoint>) {
        if endpoints.is_empty() {
            self.invalidate(table);
            return;
        }
        debug!(table, owners = endpoints.len(), "installing table affinity");
        self.affinity.insert(table.to_string(), endpoints);
    }

    /// Drops the cached owners of `table` so the next statement re-resolves.
    pub fn invalidate(&self, table: &str) {
        if self.affinity.remove(table).is_some() {
            debug!(table, "invalidated table affinity");
        }
    }

    pub fn cached_tables(&self) -> usize {
        self.affinity.len()
    }
}
