use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::{Json, Router};
use minisql_router::config::{ResolutionMode, RouterConfig};
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;

/// One routing call as seen by a mock coordinator.
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct RouteCall {
    pub path: String,
    pub params: HashMap<String, String>,
    pub body: Value,
}

pub struct CoordinatorState {
    pub status: u16,
    pub message: String,
    pub owners: Mutex<Vec<String>>,
    pub delay: Option<Duration>,
    pub regions: Vec<Vec<String>>,
    pub calls: Mutex<Vec<RouteCall>>,
}

#[allow(dead_code)]
impl CoordinatorState {
    pub fn owning(owners: Vec<String>) -> Self {
        Self {
            status: 200,
            message: "OK".to_string(),
            owners: Mutex::new(owners),
            delay: None,
            regions: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(status: u16, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
            ..Self::owning(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_regions(mut self, regions: Vec<Vec<String>>) -> Self {
        self.regions = regions;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<RouteCall> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct StorageState {
    pub status: Mutex<String>,
    pub msg: String,
    pub result_fields: Map<String, Value>,
    pub requests: Mutex<Vec<(String, Value)>>,
    pub hits: AtomicUsize,
}

#[allow(dead_code)]
impl StorageState {
    pub fn healthy(result_fields: Value) -> Self {
        let result_fields = match result_fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            status: Mutex::new("200".to_string()),
            msg: "Success".to_string(),
            result_fields,
            requests: Mutex::new(Vec::new()),
            hits: AtomicUsize::new(0),
        }
    }

    pub fn set_status(&self, status: &str) {
        *self.status.lock().unwrap() = status.to_string();
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve(router: Router) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("mock server");
    });
    Ok((addr, handle))
}

async fn route_handler(
    path: &'static str,
    state: Arc<CoordinatorState>,
    params: HashMap<String, String>,
    body: Value,
) -> Json<Value> {
    state.calls.lock().unwrap().push(RouteCall {
        path: path.to_string(),
        params,
        body,
    });
    if let Some(delay) = state.delay {
        tokio::time::sleep(delay).await;
    }
    let owners = state.owners.lock().unwrap().clone();
    Json(json!({
        "status": state.status,
        "message": state.message,
        "data": { "hostNames": owners },
    }))
}

macro_rules! route {
    ($path:literal) => {
        post(
            |State(state): State<Arc<CoordinatorState>>,
             Query(params): Query<HashMap<String, String>>,
             Json(body): Json<Value>| async move {
                route_handler($path, state, params, body).await
            },
        )
    };
}

/// Spawns a coordinator serving every routing path plus `meta_info`.
#[allow(dead_code)]
pub async fn spawn_coordinator(
    state: Arc<CoordinatorState>,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let router = Router::new()
        .route("/create_table", route!("create_table"))
        .route("/query_table", route!("query_table"))
        .route("/insert", route!("insert"))
        .route("/update", route!("update"))
        .route("/delete", route!("delete"))
        .route("/drop_table", route!("drop_table"))
        .route(
            "/meta_info",
            post(|State(state): State<Arc<CoordinatorState>>| async move {
                if let Some(delay) = state.delay {
                    tokio::time::sleep(delay).await;
                }
                let regions: Vec<Value> = state
                    .regions
                    .iter()
                    .map(|tables| json!({ "tables": tables }))
                    .collect();
                Json(json!({
                    "status": 200,
                    "message": "success",
                    "data": { "meta": { "regions": regions } },
                }))
            }),
        )
        .with_state(state);
    serve(router).await
}

async fn storage_handler(path: &'static str, state: Arc<StorageState>, body: Value) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().unwrap().push((path.to_string(), body));
    let status = state.status.lock().unwrap().clone();
    let mut reply = Map::new();
    reply.insert("status".to_string(), Value::String(status.clone()));
    if status == "200" {
        reply.insert("msg".to_string(), Value::String(state.msg.clone()));
        if path == "query" {
            reply.extend(state.result_fields.clone());
        }
    } else {
        reply.insert("msg".to_string(), Value::String(format!("{path} failed")));
    }
    Json(Value::Object(reply))
}

macro_rules! storage_route {
    ($path:literal) => {
        post(
            |State(state): State<Arc<StorageState>>, Json(body): Json<Value>| async move {
                storage_handler($path, state, body).await
            },
        )
    };
}

/// Spawns a storage node answering `create`, `query`, `drop` and `update`.
#[allow(dead_code)]
pub async fn spawn_storage(
    state: Arc<StorageState>,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    let router = Router::new()
        .route("/create", storage_route!("create"))
        .route("/query", storage_route!("query"))
        .route("/drop", storage_route!("drop"))
        .route("/update", storage_route!("update"))
        .with_state(state);
    serve(router).await
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn dead_addr() -> anyhow::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Fast-deadline config pointing at the given coordinators; storage owners
/// are reached on the port the coordinator reports.
#[allow(dead_code)]
pub fn test_config(coordinators: &[SocketAddr], resolution: ResolutionMode) -> RouterConfig {
    let mut config = RouterConfig::default();
    config.router.coordinators = coordinators
        .iter()
        .map(|addr| format!("http://{addr}"))
        .collect();
    config.router.resolution = resolution;
    config.timeouts.warmup_ms = 10;
    config.timeouts.coordinator_ms = 400;
    config.timeouts.storage_ms = 1_000;
    config.timeouts.catalog_ms = 400;
    config.storage.keep_owner_port = true;
    config
}
