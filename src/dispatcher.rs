//! # Dispatcher
//!
//! Drives one statement from owner resolution to a terminal status:
//! resolve the owners (cache or coordinators), fan the statement out to
//! every owner concurrently, join the replies, and fold them into a status
//! message plus, for queries, a result table.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::aggregate::aggregate;
use crate::error::{RouterError, TransportError};
use crate::model::{NodeEndpoint, OperationKind, ResultTable, Statement, StatusMessage};
use crate::resolution::{Resolution, ResolutionStrategy};
use crate::transport::{ClusterTransport, StorageReply, StorageRequest};

/// Detail attached to a successful statement.
pub const SUCCESS_DETAIL: &str = "Success!";

/// Terminal state of one dispatched statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub message: StatusMessage,
    /// Present only for a successful QUERY.
    pub table: Option<ResultTable>,
}

impl DispatchOutcome {
    fn failed(statement: &Statement, detail: impl Into<String>) -> Self {
        Self {
            message: StatusMessage::failed(statement.raw_text(), detail),
            table: None,
        }
    }

    fn succeeded(statement: &Statement, table: Option<ResultTable>) -> Self {
        Self {
            message: StatusMessage::ok(statement.raw_text(), SUCCESS_DETAIL),
            table,
        }
    }
}

pub struct Dispatcher {
    strategy: Arc<dyn ResolutionStrategy>,
    transport: Arc<dyn ClusterTransport>,
    storage_timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        strategy: Arc<dyn ResolutionStrategy>,
        transport: Arc<dyn ClusterTransport>,
        storage_timeout: Duration,
    ) -> Self {
        Self {
            strategy,
            transport,
            storage_timeout,
        }
    }

    /// Runs one statement to completion.
    ///
    /// Every failure except coordinator exhaustion is reported through the
    /// returned outcome.
    #[instrument(skip(self, statement), fields(table = statement.table(), kind = %statement.kind()))]
    pub async fn dispatch(&self, statement: &Statement) -> Result<DispatchOutcome, RouterError> {
        let endpoints = match self.strategy.resolve(statement).await {
            Resolution::Owners {
                endpoints,
                from_cache,
            } => {
                debug!(owners = endpoints.len(), from_cache, "sending to storage");
                endpoints
            }
            Resolution::Rejected { message } => {
                return Ok(DispatchOutcome::failed(statement, message));
            }
            Resolution::NoOwners => {
                return Ok(DispatchOutcome::failed(
                    statement,
                    format!("no storage node owns table {}", statement.table()),
                ));
            }
            Resolution::Exhausted { attempted } => {
                warn!(attempted, "all coordinators unreachable");
                return Err(RouterError::CoordinatorsUnreachable { attempted });
            }
        };

        let replies = self.fan_out(statement, &endpoints).await;

        let mut failure = None;
        let mut successes = Vec::with_capacity(replies.len());
        for (node, result) in endpoints.iter().zip(replies) {
            match result {
                Ok(reply) if reply.status.is_success() => successes.push(reply),
                Ok(reply) => {
                    warn!(node = %node, status = reply.status.0, msg = %reply.msg, "storage node failed");
                    failure = Some(if reply.msg.is_empty() {
                        format!("storage node {} failed with status {}", node, reply.status.0)
                    } else {
                        reply.msg
                    });
                }
                Err(err) => {
                    warn!(node = %node, error = %err, "storage node unreachable");
                    failure = Some(format!("storage node {node}: {err}"));
                }
            }
        }

        if let Some(detail) = failure {
            self.strategy.invalidate(statement.table());
            return Ok(DispatchOutcome::failed(statement, detail));
        }

        let table = match statement.kind() {
            OperationKind::Query => match aggregate(successes.iter().map(|reply| &reply.fields)) {
                Ok(table) => Some(table),
                Err(err) => {
                    warn!(error = %err, "malformed query result");
                    self.strategy.invalidate(statement.table());
                    return Ok(DispatchOutcome::failed(
                        statement,
                        format!("malformed query result: {err}"),
                    ));
                }
            },
            OperationKind::DropTable => {
                self.strategy.invalidate(statement.table());
                None
            }
            _ => None,
        };

        Ok(DispatchOutcome::succeeded(statement, table))
    }

    /// Sends the statement to every owner concurrently and joins the replies,
    /// returned in owner order.
    async fn fan_out(
        &self,
        statement: &Statement,
        endpoints: &[NodeEndpoint],
    ) -> Vec<Result<StorageReply, TransportError>> {
        let request = StorageRequest {
            sql: statement.raw_text().to_string(),
            table_name: statement.table().to_string(),
        };
        let deadline_ms = self.storage_timeout.as_millis() as u64;

        let calls = endpoints.iter().map(|node| {
            let request = &request;
            async move {
                match timeout(
                    self.storage_timeout,
                    self.transport.execute(node, statement.kind(), request),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout(deadline_ms)),
                }
            }
        });
        join_all(calls).await
    }
}
