//! # Node Resolution
//!
//! Strategies for finding the storage nodes that own a statement's table.
//!
//! - [`CoordinatorFailover`] asks the coordinators in order for every
//!   statement, moving on only when one times out or cannot be reached.
//! - [`CachedAffinity`] answers from the directory's affinity cache and
//!   falls back to coordinator failover on a miss, installing the result.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::{ResolutionMode, StorageConfig, TimeoutConfig};
use crate::directory::NodeDirectory;
use crate::model::{NodeEndpoint, OperationKind, Statement};
use crate::transport::{ClusterTransport, RouteRequest};

/// Outcome of resolving one statement's owners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Storage nodes to fan out to, snapshotted before dispatch.
    Owners {
        endpoints: Vec<NodeEndpoint>,
        from_cache: bool,
    },
    /// A coordinator answered with a failure status; the statement is
    /// abandoned without asking the remaining coordinators.
    Rejected { message: String },
    /// A coordinator accepted the statement but named no usable owner.
    NoOwners,
    /// No coordinator answered before its deadline.
    Exhausted { attempted: usize },
}

#[async_trait]
pub trait ResolutionStrategy: Send + Sync {
    async fn resolve(&self, statement: &Statement) -> Resolution;

    /// Forgets anything remembered about `table`.
    fn invalidate(&self, table: &str);

    fn mode(&self) -> ResolutionMode;
}

/// Builds the strategy selected by configuration.
pub fn build_strategy(
    mode: ResolutionMode,
    directory: Arc<NodeDirectory>,
    transport: Arc<dyn ClusterTransport>,
    timeouts: TimeoutConfig,
    storage: StorageConfig,
) -> Arc<dyn ResolutionStrategy> {
    let failover = CoordinatorFailover::new(directory.clone(), transport, timeouts, storage);
    match mode {
        ResolutionMode::Failover => Arc::new(failover),
        ResolutionMode::Cached => Arc::new(CachedAffinity::new(failover, directory)),
    }
}

/// Broadcast-style resolution over the fixed coordinator set.
pub struct CoordinatorFailover {
    directory: Arc<NodeDirectory>,
    transport: Arc<dyn ClusterTransport>,
    timeouts: TimeoutConfig,
    storage: StorageConfig,
}

impl CoordinatorFailover {
    pub fn new(
        directory: Arc<NodeDirectory>,
        transport: Arc<dyn ClusterTransport>,
        timeouts: TimeoutConfig,
        storage: StorageConfig,
    ) -> Self {
        Self {
            directory,
            transport,
            timeouts,
            storage,
        }
    }

    fn route_request(statement: &Statement) -> RouteRequest {
        let text = (statement.kind() == OperationKind::CreateTable)
            .then(|| statement.raw_text().to_string());
        RouteRequest {
            kind: statement.kind(),
            table: statement.table().to_string(),
            primary_key: statement.primary_key().map(str::to_string),
            text,
        }
    }
}

#[async_trait]
impl ResolutionStrategy for CoordinatorFailover {
    async fn resolve(&self, statement: &Statement) -> Resolution {
        let request = Self::route_request(statement);
        let coordinators = self.directory.coordinators();

        for coordinator in coordinators {
            sleep(self.timeouts.warmup()).await;

            let reply = match timeout(
                self.timeouts.coordinator(),
                self.transport.route(coordinator, &request),
            )
            .await
            {
                Err(_) => {
                    warn!(
                        coordinator = %coordinator,
                        table = statement.table(),
                        deadline_ms = self.timeouts.coordinator_ms,
                        "coordinator timed out, trying next"
                    );
                    continue;
                }
                Ok(Err(err)) => {
                    warn!(
                        coordinator = %coordinator,
                        table = statement.table(),
                        error = %err,
                        "coordinator unreachable, trying next"
                    );
                    continue;
                }
                Ok(Ok(reply)) => reply,
            };

            if !reply.status.is_success() {
                info!(
                    coordinator = %coordinator,
                    table = statement.table(),
                    status = reply.status.0,
                    "coordinator rejected statement"
                );
                let message = if reply.message.is_empty() {
                    format!("coordinator rejected with status {}", reply.status.0)
                } else {
                    reply.message
                };
                return Resolution::Rejected { message };
            }

            let endpoints: Vec<NodeEndpoint> = reply
                .owners()
                .iter()
                .filter_map(|id| {
                    NodeEndpoint::from_owner(id, self.storage.port, self.storage.keep_owner_port)
                })
                .collect();
            if endpoints.is_empty() {
                return Resolution::NoOwners;
            }
            debug!(
                coordinator = %coordinator,
                table = statement.table(),
                owners = endpoints.len(),
                "resolved table owners"
            );
            return Resolution::Owners {
                endpoints,
                from_cache: false,
            };
        }

        Resolution::Exhausted {
            attempted: coordinators.len(),
        }
    }

    fn invalidate(&self, _table: &str) {}

    fn mode(&self) -> ResolutionMode {
        ResolutionMode::Failover
    }
}

/// Cached direct-to-owner resolution.
pub struct CachedAffinity {
    failover: CoordinatorFailover,
    directory: Arc<NodeDirectory>,
}

impl CachedAffinity {
    pub fn new(failover: CoordinatorFailover, directory: Arc<NodeDirectory>) -> Self {
        Self {
            failover,
            directory,
        }
    }
}

#[async_trait]
impl ResolutionStrategy for CachedAffinity {
    async fn resolve(&self, statement: &Statement) -> Resolution {
        // Placement of a new table is always the coordinator's call.
        if statement.kind() != OperationKind::CreateTable {
            let cached = self.directory.lookup_cached(statement.table());
            if !cached.is_empty() {
                debug!(table = statement.table(), "table affinity cache hit");
                return Resolution::Owners {
                    endpoints: cached,
                    from_cache: true,
                };
            }
        }

        let resolution = self.failover.resolve(statement).await;
        if let Resolution::Owners { endpoints, .. } = &resolution {
            self.directory.install(statement.table(), endpoints.clone());
        }
        resolution
    }

    fn invalidate(&self, table: &str) {
        self.directory.invalidate(table);
    }

    fn mode(&self) -> ResolutionMode {
        ResolutionMode::Cached
    }
}
