//! # Cluster Transport
//!
//! Wire types for coordinator and storage-node calls, and the
//! [`ClusterTransport`] seam the dispatcher talks through. [`HttpTransport`]
//! is the production implementation over JSON/HTTP.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::model::{NodeEndpoint, OperationKind};

/// Status code carried in reply bodies. Coordinators send numbers, storage
/// nodes send numeric strings; both decode to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawStatus", into = "u16")]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const OK: StatusCode = StatusCode(200);

    pub fn is_success(self) -> bool {
        self == Self::OK
    }
}

impl From<StatusCode> for u16 {
    fn from(code: StatusCode) -> u16 {
        code.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawStatus {
    Number(u64),
    Text(String),
}

impl TryFrom<RawStatus> for StatusCode {
    type Error = String;

    fn try_from(raw: RawStatus) -> Result<Self, Self::Error> {
        let value = match raw {
            RawStatus::Number(n) => n,
            RawStatus::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| format!("status '{s}' is not numeric"))?,
        };
        u16::try_from(value)
            .map(StatusCode)
            .map_err(|_| format!("status {value} out of range"))
    }
}

/// Routing question put to a coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequest {
    pub kind: OperationKind,
    pub table: String,
    pub primary_key: Option<String>,
    /// Raw statement text, sent only for CREATE.
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
struct RouteBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

/// Coordinator routing decision.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteReply {
    pub status: StatusCode,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<RouteData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RouteData {
    #[serde(default, rename = "hostNames")]
    pub host_names: Vec<String>,
}

impl RouteReply {
    pub fn ok(host_names: Vec<String>) -> Self {
        Self {
            status: StatusCode::OK,
            message: "OK".to_string(),
            data: Some(RouteData { host_names }),
        }
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode(status),
            message: message.into(),
            data: Some(RouteData::default()),
        }
    }

    /// Owner host identifiers; empty when the coordinator sent none.
    pub fn owners(&self) -> &[String] {
        self.data
            .as_ref()
            .map(|data| data.host_names.as_slice())
            .unwrap_or(&[])
    }
}

/// Body of a storage-node execution call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRequest {
    pub sql: String,
    #[serde(rename = "tableName")]
    pub table_name: String,
}

/// Flat storage-node reply. QUERY replies carry result fields next to the
/// status and message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StorageReply {
    pub status: StatusCode,
    #[serde(default)]
    pub msg: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl StorageReply {
    pub fn ok(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            msg: msg.into(),
            fields: Map::new(),
        }
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode(500),
            msg: msg.into(),
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), Value::String(value.into()));
        self
    }
}

/// Coordinator metadata view used for catalog listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogReply {
    #[serde(default)]
    pub data: Option<CatalogData>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogData {
    pub meta: CatalogMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogMeta {
    #[serde(default)]
    pub regions: Vec<CatalogRegion>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogRegion {
    #[serde(default)]
    pub tables: Vec<String>,
}

impl CatalogReply {
    pub fn from_regions(regions: Vec<Vec<String>>) -> Self {
        Self {
            data: Some(CatalogData {
                meta: CatalogMeta {
                    regions: regions
                        .into_iter()
                        .map(|tables| CatalogRegion { tables })
                        .collect(),
                },
            }),
        }
    }

    /// All tables across regions, in region order. `None` when the reply
    /// carries no metadata block.
    pub fn tables(&self) -> Option<Vec<String>> {
        let data = self.data.as_ref()?;
        Some(
            data.meta
                .regions
                .iter()
                .flat_map(|region| region.tables.iter().cloned())
                .collect(),
        )
    }
}

/// The network seam between the dispatcher and the cluster.
#[async_trait]
pub trait ClusterTransport: Send + Sync {
    /// Asks a coordinator which storage nodes own (or will own) a table.
    async fn route(
        &self,
        coordinator: &NodeEndpoint,
        request: &RouteRequest,
    ) -> Result<RouteReply, TransportError>;

    /// Runs a statement on one storage node.
    async fn execute(
        &self,
        node: &NodeEndpoint,
        kind: OperationKind,
        request: &StorageRequest,
    ) -> Result<StorageReply, TransportError>;

    /// Fetches a coordinator's view of cluster metadata.
    async fn catalog(&self, coordinator: &NodeEndpoint) -> Result<CatalogReply, TransportError>;
}

/// JSON-over-HTTP transport shared by all calls of a session.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::from_builder(
            reqwest::Client::builder().connect_timeout(std::time::Duration::from_secs(2)),
        )
    }

    /// Builds the transport from a caller-configured client builder.
    pub fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        let http_client = builder
            .build()
            .map_err(|e| TransportError::Setup(e.to_string()))?;
        Ok(Self { http_client })
    }

    async fn post_json<B, R>(&self, url: String, query: &[(&str, &str)], body: &B) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized + Sync,
        R: serde::de::DeserializeOwned,
    {
        let result = self
            .http_client
            .post(&url)
            .query(query)
            .json(body)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => resp
                .json::<R>()
                .await
                .map_err(|e| TransportError::Decode(e.to_string())),
            Ok(resp) => Err(TransportError::Server(resp.status().to_string())),
            Err(e) => Err(TransportError::Network(e.to_string())),
        }
    }
}

#[async_trait]
impl ClusterTransport for HttpTransport {
    async fn route(
        &self,
        coordinator: &NodeEndpoint,
        request: &RouteRequest,
    ) -> Result<RouteReply, TransportError> {
        let url = format!("{}/{}", coordinator.base_url(), request.kind.coordinator_path());
        let mut query = vec![("tableName", request.table.as_str())];
        if let Some(pk) = request.primary_key.as_deref() {
            query.push(("pkValue", pk));
        }
        let body = RouteBody {
            text: request.text.as_deref(),
        };
        self.post_json(url, &query, &body).await
    }

    async fn execute(
        &self,
        node: &NodeEndpoint,
        kind: OperationKind,
        request: &StorageRequest,
    ) -> Result<StorageReply, TransportError> {
        let url = format!("{}/{}", node.base_url(), kind.storage_path());
        self.post_json(url, &[], request).await
    }

    async fn catalog(&self, coordinator: &NodeEndpoint) -> Result<CatalogReply, TransportError> {
        let url = format!("{}/meta_info", coordinator.base_url());
        self.post_json(url, &[], &serde_json::json!({})).await
    }
}
