//! # MiniSQL Router
//!
//! A client-side statement router for a distributed SQL cluster made of
//! coordinator ("master") nodes and storage ("region") nodes.
//!
//! Raw multi-statement SQL text is split and normalized, each statement is
//! classified by operation and target table, and the router then decides
//! which storage nodes must run it: either from a per-table affinity cache
//! or by asking the coordinators in order, failing over when one does not
//! answer in time. Statements that touch several storage nodes fan out
//! concurrently and their partial query results are merged into a single
//! ordered table.
//!
//! ```no_run
//! use minisql_router::{RouterConfig, Session};
//!
//! # async fn run() -> Result<(), minisql_router::RouterError> {
//! let config = RouterConfig::from_env(None)?;
//! let mut session = Session::new(&config)?;
//! session.execute("create table t (id int); insert into t values (1); select * from t;").await?;
//! for message in session.feed().iter() {
//!     println!("{message}");
//! }
//! print!("{}", session.table());
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod classifier;
pub mod config;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod feed;
pub mod model;
pub mod resolution;
pub mod session;
pub mod splitter;
#[doc(hidden)]
pub mod test_support;
pub mod transport;

// Re-export main types for convenience
pub use config::{ConfigOverrides, ResolutionMode, RouterConfig};
pub use error::{AggregateError, ClassifyError, RouterError, TransportError};
pub use feed::StatusFeed;
pub use model::{Column, NodeEndpoint, OperationKind, ResultTable, Row, Statement, StatusMessage};
pub use session::{RunSummary, Session};
