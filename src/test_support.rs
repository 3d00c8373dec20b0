//! In-memory cluster used by tests: every coordinator and storage node is a
//! scripted endpoint with call counters.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::model::{NodeEndpoint, OperationKind};
use crate::transport::{
    CatalogReply, ClusterTransport, RouteReply, RouteRequest, StorageReply, StorageRequest,
};

/// Scripted behaviour of a coordinator's routing call.
#[derive(Debug, Clone)]
pub enum CoordinatorScript {
    Owners(Vec<String>),
    Reject(u16, String),
    Hang,
    Unreachable,
    Malformed,
}

/// Scripted behaviour of a storage node.
#[derive(Debug, Clone)]
pub enum StorageScript {
    Reply(StorageReply),
    /// Replies after the given delay.
    Delayed(Duration, StorageReply),
    Hang,
    Unreachable,
}

/// Scripted behaviour of a coordinator's metadata call.
#[derive(Debug, Clone)]
pub enum CatalogScript {
    Regions(Vec<Vec<String>>),
    Hang,
    Unreachable,
}

#[derive(Default)]
struct ClusterState {
    coordinators: HashMap<NodeEndpoint, CoordinatorScript>,
    storage: HashMap<NodeEndpoint, StorageScript>,
    catalogs: HashMap<NodeEndpoint, CatalogScript>,
    route_requests: Vec<(NodeEndpoint, RouteRequest)>,
    storage_requests: Vec<(NodeEndpoint, OperationKind, StorageRequest)>,
}

/// Cloneable handle; clones share scripts and counters.
#[derive(Clone, Default)]
pub struct ScriptedCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl ScriptedCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut ClusterState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    pub fn script_coordinator(&self, endpoint: &NodeEndpoint, script: CoordinatorScript) {
        self.with_state(|state| state.coordinators.insert(endpoint.clone(), script));
    }

    pub fn script_storage(&self, endpoint: &NodeEndpoint, script: StorageScript) {
        self.with_state(|state| state.storage.insert(endpoint.clone(), script));
    }

    pub fn script_catalog(&self, endpoint: &NodeEndpoint, script: CatalogScript) {
        self.with_state(|state| state.catalogs.insert(endpoint.clone(), script));
    }

    /// Routing calls received by one coordinator.
    pub fn route_calls(&self, endpoint: &NodeEndpoint) -> usize {
        self.with_state(|state| {
            state
                .route_requests
                .iter()
                .filter(|(target, _)| target == endpoint)
                .count()
        })
    }

    /// Routing calls received by all coordinators.
    pub fn total_route_calls(&self) -> usize {
        self.with_state(|state| state.route_requests.len())
    }

    pub fn route_requests(&self) -> Vec<(NodeEndpoint, RouteRequest)> {
        self.with_state(|state| state.route_requests.clone())
    }

    /// Execution calls received by one storage node.
    pub fn storage_calls(&self, endpoint: &NodeEndpoint) -> usize {
        self.with_state(|state| {
            state
                .storage_requests
                .iter()
                .filter(|(target, _, _)| target == endpoint)
                .count()
        })
    }

    pub fn storage_requests(&self) -> Vec<(NodeEndpoint, OperationKind, StorageRequest)> {
        self.with_state(|state| state.storage_requests.clone())
    }
}

fn unknown(endpoint: &NodeEndpoint) -> TransportError {
    TransportError::Network(format!("connection refused: {endpoint}"))
}

#[async_trait]
impl ClusterTransport for ScriptedCluster {
    async fn route(
        &self,
        coordinator: &NodeEndpoint,
        request: &RouteRequest,
    ) -> Result<RouteReply, TransportError> {
        let script = self.with_state(|state| {
            state
                .route_requests
                .push((coordinator.clone(), request.clone()));
            state.coordinators.get(coordinator).cloned()
        });
        match script {
            Some(CoordinatorScript::Owners(hosts)) => Ok(RouteReply::ok(hosts)),
            Some(CoordinatorScript::Reject(status, message)) => {
                Ok(RouteReply::rejected(status, message))
            }
            Some(CoordinatorScript::Hang) => std::future::pending().await,
            Some(CoordinatorScript::Malformed) => {
                Err(TransportError::Decode("missing field `status`".into()))
            }
            Some(CoordinatorScript::Unreachable) | None => Err(unknown(coordinator)),
        }
    }

    async fn execute(
        &self,
        node: &NodeEndpoint,
        kind: OperationKind,
        request: &StorageRequest,
    ) -> Result<StorageReply, TransportError> {
        let script = self.with_state(|state| {
            state
                .storage_requests
                .push((node.clone(), kind, request.clone()));
            state.storage.get(node).cloned()
        });
        match script {
            Some(StorageScript::Reply(reply)) => Ok(reply),
            Some(StorageScript::Delayed(delay, reply)) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            Some(StorageScript::Hang) => std::future::pending().await,
            Some(StorageScript::Unreachable) | None => Err(unknown(node)),
        }
    }

    async fn catalog(&self, coordinator: &NodeEndpoint) -> Result<CatalogReply, TransportError> {
        let script = self.with_state(|state| state.catalogs.get(coordinator).cloned());
        match script {
            Some(CatalogScript::Regions(regions)) => Ok(CatalogReply::from_regions(regions)),
            Some(CatalogScript::Hang) => std::future::pending().await,
            Some(CatalogScript::Unreachable) | None => Err(unknown(coordinator)),
        }
    }
}
