//! # Data Model
//!
//! Core data structures shared by the router components: classified
//! statements, cluster endpoints, status messages and result tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The six statement kinds the router knows how to place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    CreateTable,
    Query,
    Insert,
    Update,
    Delete,
    DropTable,
}

impl OperationKind {
    /// Path of the coordinator routing call for this operation.
    pub fn coordinator_path(self) -> &'static str {
        match self {
            OperationKind::CreateTable => "create_table",
            OperationKind::Query => "query_table",
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::DropTable => "drop_table",
        }
    }

    /// Path of the storage-node execution call. Row mutations share one
    /// endpoint.
    pub fn storage_path(self) -> &'static str {
        match self {
            OperationKind::CreateTable => "create",
            OperationKind::Query => "query",
            OperationKind::DropTable => "drop",
            OperationKind::Insert | OperationKind::Update | OperationKind::Delete => "update",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationKind::CreateTable => "CREATE",
            OperationKind::Query => "QUERY",
            OperationKind::Insert => "INSERT",
            OperationKind::Update => "UPDATE",
            OperationKind::Delete => "DELETE",
            OperationKind::DropTable => "DROP",
        };
        f.write_str(label)
    }
}

/// One classified, normalized unit of SQL work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    raw_text: String,
    kind: OperationKind,
    table: String,
    primary_key: Option<String>,
}

impl Statement {
    pub fn new(
        raw_text: impl Into<String>,
        kind: OperationKind,
        table: impl Into<String>,
        primary_key: Option<String>,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            kind,
            table: table.into(),
            primary_key,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// First VALUES element of an INSERT.
    pub fn primary_key(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }
}

/// A `host:port` address of a coordinator or a storage node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeEndpoint {
    pub host: String,
    pub port: u16,
}

impl NodeEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Builds the storage endpoint for an owner host identifier reported by a
    /// coordinator. The identifier names the region master (`host:port`);
    /// unless `keep_port` is set its port is replaced with `storage_port`.
    pub fn from_owner(identifier: &str, storage_port: u16, keep_port: bool) -> Option<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        match split_host_port(identifier) {
            Some((host, port)) if keep_port => Some(Self::new(host, port)),
            Some((host, _)) => Some(Self::new(host, storage_port)),
            None if keep_port => None,
            None => Some(Self::new(identifier, storage_port)),
        }
    }

    /// `http://host:port` prefix for requests to this node.
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for NodeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for NodeEndpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let without_scheme = trimmed
            .strip_prefix("http://")
            .or_else(|| trimmed.strip_prefix("https://"))
            .unwrap_or(trimmed)
            .trim_end_matches('/');
        let (host, port) = split_host_port(without_scheme)
            .ok_or_else(|| format!("'{s}' is not a host:port address"))?;
        if host.is_empty() {
            return Err(format!("'{s}' has an empty host"));
        }
        Ok(Self::new(host, port))
    }
}

fn split_host_port(addr: &str) -> Option<(&str, u16)> {
    let (host, port) = addr.rsplit_once(':')?;
    let port = port.parse().ok()?;
    Some((host, port))
}

/// One entry of the user-visible status feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub success: bool,
    pub statement_text: String,
    pub detail: String,
}

impl StatusMessage {
    pub fn ok(statement_text: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            statement_text: statement_text.into(),
            detail: detail.into(),
        }
    }

    pub fn failed(statement_text: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            statement_text: statement_text.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.success { "[ok]" } else { "[failed]" };
        write!(f, "{} {} {}", marker, self.statement_text, self.detail)
    }
}

/// Result table column: upper-cased display title and lower-cased field key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub title: String,
    pub key: String,
}

impl Column {
    pub fn from_name(name: &str) -> Self {
        Self {
            title: name.to_uppercase(),
            key: name.to_lowercase(),
        }
    }
}

/// One result row, keyed by the numeric index the storage node reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub key: u64,
    pub fields: BTreeMap<String, String>,
}

impl Row {
    pub fn get(&self, column_key: &str) -> Option<&str> {
        self.fields.get(column_key).map(String::as_str)
    }
}

/// Unified tabular result of a QUERY statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl ResultTable {
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}

impl fmt::Display for ResultTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<&str>> = self
            .rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|column| row.get(&column.key).unwrap_or(""))
                    .collect()
            })
            .collect();

        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                cells
                    .iter()
                    .map(|row| row[idx].len())
                    .chain(std::iter::once(column.title.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header: Vec<String> = self
            .columns
            .iter()
            .zip(&widths)
            .map(|(column, width)| format!("{:<width$}", column.title, width = *width))
            .collect();
        writeln!(f, "{}", header.join(" | ").trim_end())?;
        for row in cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
                .collect();
            writeln!(f, "{}", line.join(" | ").trim_end())?;
        }
        Ok(())
    }
}
