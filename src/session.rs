//! # Session
//!
//! The execution driver. A session owns the dispatcher, the status feed and
//! the last query result, and runs statements strictly one after another:
//! statement N is fully resolved before statement N+1 is classified.

use std::sync::Arc;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::classifier::classify;
use crate::config::{RouterConfig, TimeoutConfig};
use crate::directory::NodeDirectory;
use crate::dispatcher::Dispatcher;
use crate::error::RouterError;
use crate::feed::StatusFeed;
use crate::model::{ResultTable, StatusMessage};
use crate::resolution::build_strategy;
use crate::splitter::split_statements;
use crate::transport::{ClusterTransport, HttpTransport};

/// Counts for one [`Session::execute`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub failed: usize,
}

pub struct Session {
    dispatcher: Dispatcher,
    directory: Arc<NodeDirectory>,
    transport: Arc<dyn ClusterTransport>,
    timeouts: TimeoutConfig,
    feed: StatusFeed,
    table: ResultTable,
}

impl Session {
    /// Builds a session talking HTTP to the configured cluster.
    pub fn new(config: &RouterConfig) -> Result<Self, RouterError> {
        Self::with_transport(config, Arc::new(HttpTransport::new()?))
    }

    pub fn with_transport(
        config: &RouterConfig,
        transport: Arc<dyn ClusterTransport>,
    ) -> Result<Self, RouterError> {
        let directory = Arc::new(NodeDirectory::new(config.coordinator_endpoints()?));
        let strategy = build_strategy(
            config.router.resolution,
            directory.clone(),
            transport.clone(),
            config.timeouts.clone(),
            config.storage.clone(),
        );
        let dispatcher = Dispatcher::new(strategy, transport.clone(), config.timeouts.storage());
        Ok(Self {
            dispatcher,
            directory,
            transport,
            timeouts: config.timeouts.clone(),
            feed: StatusFeed::new(config.router.feed_capacity),
            table: ResultTable::default(),
        })
    }

    /// Splits, classifies and dispatches every statement in `sql`, in order.
    ///
    /// Each statement appends one message to the feed. A successful QUERY
    /// replaces the result table. When no coordinator can be reached the
    /// run stops and the error is returned; statements after it are not
    /// attempted.
    pub async fn execute(&mut self, sql: &str) -> Result<RunSummary, RouterError> {
        let mut summary = RunSummary::default();

        for text in split_statements(sql) {
            let statement = match classify(&text) {
                Ok(statement) => statement,
                Err(err) => {
                    info!(statement = %text, error = %err, "skipping statement");
                    self.feed.push(StatusMessage::failed(text, err.to_string()));
                    summary.failed += 1;
                    continue;
                }
            };

            let outcome = match self.dispatcher.dispatch(&statement).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.feed
                        .push(StatusMessage::failed(statement.raw_text(), err.to_string()));
                    return Err(err);
                }
            };

            if outcome.message.success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            if let Some(table) = outcome.table {
                self.table = table;
            }
            self.feed.push(outcome.message);
        }

        Ok(summary)
    }

    /// Lists every table known to the cluster, asking coordinators in order
    /// until one answers with its metadata.
    pub async fn list_tables(&self) -> Result<Vec<String>, RouterError> {
        let coordinators = self.directory.coordinators();
        for coordinator in coordinators {
            match timeout(self.timeouts.catalog(), self.transport.catalog(coordinator)).await {
                Ok(Ok(reply)) => match reply.tables() {
                    Some(tables) => return Ok(tables),
                    None => warn!(coordinator = %coordinator, "catalog reply without metadata"),
                },
                Ok(Err(err)) => warn!(coordinator = %coordinator, error = %err, "catalog request failed"),
                Err(_) => warn!(coordinator = %coordinator, "catalog request timed out"),
            }
        }
        Err(RouterError::CoordinatorsUnreachable {
            attempted: coordinators.len(),
        })
    }

    pub fn feed(&self) -> &StatusFeed {
        &self.feed
    }

    /// Result of the most recent successful QUERY.
    pub fn table(&self) -> &ResultTable {
        &self.table
    }

    pub fn directory(&self) -> &NodeDirectory {
        &self.directory
    }
}
