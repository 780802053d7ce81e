//! Loopback discovery service and data servers for the HTTP client tests.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rimlog_client::types::wire::{
    APPEND_PATH, AppendRequest, AppendResponse, DiscoverResponse, NDJSON_CONTENT_TYPE,
    ReadResponse, SERVERS_PATH, SUBSCRIBE_PATH, SubscribeFrame, SubscribeQuery, TRIM_PATH,
    TrimRequest,
};
use rimlog_client::{ClientConfig, Gsn, ServerDescriptor, ShardId};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rimlog_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

/// Hands out gsns shared by every data server of one fake cluster.
#[derive(Clone, Default)]
pub struct GsnSequencer {
    last: Arc<AtomicU64>,
}

impl GsnSequencer {
    fn next(&self) -> Gsn {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Default)]
struct DataServerLog {
    records: BTreeMap<Gsn, String>,
    appends: Vec<AppendRequest>,
    trims: Vec<Gsn>,
}

#[derive(Clone)]
struct DataServerState {
    gsns: GsnSequencer,
    log: Arc<Mutex<DataServerLog>>,
    trimmed: Arc<Notify>,
}

pub struct FakeDataServer {
    pub descriptor: ServerDescriptor,
    state: DataServerState,
}

impl FakeDataServer {
    pub async fn start(shard_id: ShardId, gsns: GsnSequencer) -> Self {
        let state = DataServerState {
            gsns,
            log: Arc::new(Mutex::new(DataServerLog::default())),
            trimmed: Arc::new(Notify::new()),
        };

        let app = Router::new()
            .route(APPEND_PATH, post(append))
            .route(SUBSCRIBE_PATH, get(subscribe))
            .route(TRIM_PATH, post(trim))
            .route("/api/v1/records/:gsn", get(read_record))
            .with_state(state.clone());
        let addr = serve(app).await;

        Self {
            descriptor: ServerDescriptor::new(addr.ip().to_string(), addr.port(), shard_id),
            state,
        }
    }

    /// Stores a record as if it had been committed at `gsn`.
    pub fn preload(&self, gsn: Gsn, record: &str) {
        self.state
            .log
            .lock()
            .expect("log lock")
            .records
            .insert(gsn, record.to_string());
    }

    pub fn appends(&self) -> Vec<AppendRequest> {
        self.state.log.lock().expect("log lock").appends.clone()
    }

    pub async fn wait_for_trim(&self, timeout: Duration) -> Vec<Gsn> {
        tokio::time::timeout(timeout, async {
            loop {
                let notified = self.state.trimmed.notified();
                {
                    let log = self.state.log.lock().expect("log lock");
                    if !log.trims.is_empty() {
                        return log.trims.clone();
                    }
                }
                notified.await;
            }
        })
        .await
        .expect("trim arrives")
    }
}

async fn append(
    State(state): State<DataServerState>,
    Json(request): Json<AppendRequest>,
) -> Json<AppendResponse> {
    let gsn = state.gsns.next();
    let mut log = state.log.lock().expect("log lock");
    log.records.insert(gsn, request.record.clone());
    log.appends.push(request);
    Json(AppendResponse { gsn })
}

async fn subscribe(
    State(state): State<DataServerState>,
    Query(query): Query<SubscribeQuery>,
) -> Response {
    let log = state.log.lock().expect("log lock");
    let mut body = String::new();
    for (gsn, record) in log.records.range(query.from_gsn..) {
        let frame = SubscribeFrame {
            gsn: *gsn,
            record: record.clone(),
        };
        body.push_str(&serde_json::to_string(&frame).expect("encode frame"));
        body.push('\n');
    }

    ([(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)], body).into_response()
}

async fn trim(
    State(state): State<DataServerState>,
    Json(request): Json<TrimRequest>,
) -> StatusCode {
    {
        let mut log = state.log.lock().expect("log lock");
        log.records.retain(|gsn, _| *gsn >= request.gsn);
        log.trims.push(request.gsn);
    }
    state.trimmed.notify_waiters();
    StatusCode::OK
}

async fn read_record(
    State(state): State<DataServerState>,
    Path(gsn): Path<Gsn>,
) -> Result<Json<ReadResponse>, StatusCode> {
    let log = state.log.lock().expect("log lock");
    log.records
        .get(&gsn)
        .map(|record| {
            Json(ReadResponse {
                gsn,
                record: record.clone(),
            })
        })
        .ok_or(StatusCode::NOT_FOUND)
}

#[derive(Clone)]
struct DiscoveryState {
    servers: Arc<Mutex<Vec<ServerDescriptor>>>,
    calls: Arc<AtomicU64>,
}

pub struct FakeDiscoveryService {
    pub addr: SocketAddr,
    state: DiscoveryState,
}

impl FakeDiscoveryService {
    pub async fn start(servers: Vec<ServerDescriptor>) -> Self {
        let state = DiscoveryState {
            servers: Arc::new(Mutex::new(servers)),
            calls: Arc::new(AtomicU64::new(0)),
        };
        let app = Router::new()
            .route(SERVERS_PATH, get(list_servers))
            .with_state(state.clone());
        let addr = serve(app).await;

        Self { addr, state }
    }

    pub fn calls(&self) -> u64 {
        self.state.calls.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::new(self.addr.to_string())
    }
}

async fn list_servers(State(state): State<DiscoveryState>) -> Json<DiscoverResponse> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    Json(DiscoverResponse {
        servers: state.servers.lock().expect("servers lock").clone(),
    })
}

/// A discovery service plus `shards` data servers sharing one gsn sequencer.
pub async fn start_cluster(shards: u32) -> (FakeDiscoveryService, Vec<FakeDataServer>) {
    let gsns = GsnSequencer::default();
    let mut servers = Vec::new();
    for shard_id in 0..shards {
        servers.push(FakeDataServer::start(shard_id, gsns.clone()).await);
    }
    let discovery =
        FakeDiscoveryService::start(servers.iter().map(|s| s.descriptor.clone()).collect()).await;
    (discovery, servers)
}
