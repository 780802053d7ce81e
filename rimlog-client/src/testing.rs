//! Scripted fakes shared by the unit tests.

use crate::discovery::Discovery;
use crate::error::{Result, RimlogError};
use crate::transport::{DataClient, RecordStream};
use crate::types::wire::AppendRequest;
use crate::types::{CommittedRecord, Gsn, ServerDescriptor};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

pub(crate) fn server(port: u16, shard_id: u32) -> ServerDescriptor {
    ServerDescriptor::new("127.0.0.1", port, shard_id)
}

/// Discovery fake that counts calls and can be switched to failing.
#[derive(Default)]
pub(crate) struct FakeDiscovery {
    servers: Mutex<Vec<ServerDescriptor>>,
    pub(crate) calls: AtomicUsize,
    pub(crate) fail: AtomicBool,
}

impl FakeDiscovery {
    pub(crate) fn new(servers: Vec<ServerDescriptor>) -> Self {
        Self {
            servers: Mutex::new(servers),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Discovery for FakeDiscovery {
    async fn discover_servers(&self) -> Result<Vec<ServerDescriptor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RimlogError::Discovery("discovery offline".to_string()));
        }
        Ok(self.servers.lock().expect("servers lock").clone())
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Record(Gsn, String),
    Delay(Duration),
    Fail,
}

pub(crate) fn record(gsn: Gsn) -> Step {
    Step::Record(gsn, format!("record-{}", gsn))
}

pub(crate) fn delay(ms: u64) -> Step {
    Step::Delay(Duration::from_millis(ms))
}

#[derive(Debug, Clone, Default)]
struct Script {
    steps: Vec<Step>,
    hang: bool,
}

/// Data server fake: records every RPC and replays scripted subscribe streams.
#[derive(Default)]
pub(crate) struct FakeDataClient {
    pub(crate) appends: Mutex<Vec<(ServerDescriptor, AppendRequest)>>,
    pub(crate) subscribes: Mutex<Vec<(String, Gsn)>>,
    pub(crate) trims: Mutex<Vec<(String, Gsn)>>,
    pub(crate) reads: AtomicUsize,
    pub(crate) fail_appends: AtomicBool,
    pub(crate) block_trims: AtomicBool,
    last_gsn: AtomicU64,
    trim_notify: Notify,
    scripts: Mutex<HashMap<String, Script>>,
    records: Mutex<HashMap<(String, Gsn), String>>,
    yielded: Arc<Mutex<HashMap<String, usize>>>,
}

impl FakeDataClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Scripted stream that ends after its last step.
    pub(crate) fn script(&self, server: &ServerDescriptor, steps: Vec<Step>) {
        self.insert_script(server, steps, false);
    }

    /// Scripted stream that stays open after its last step.
    pub(crate) fn script_open(&self, server: &ServerDescriptor, steps: Vec<Step>) {
        self.insert_script(server, steps, true);
    }

    fn insert_script(&self, server: &ServerDescriptor, steps: Vec<Step>, hang: bool) {
        self.scripts
            .lock()
            .expect("scripts lock")
            .insert(server.address(), Script { steps, hang });
    }

    pub(crate) fn store(&self, server: &ServerDescriptor, gsn: Gsn, record: &str) {
        self.records
            .lock()
            .expect("records lock")
            .insert((server.address(), gsn), record.to_string());
    }

    pub(crate) fn appended_csns(&self) -> Vec<u64> {
        self.appends
            .lock()
            .expect("appends lock")
            .iter()
            .map(|(_, request)| request.csn)
            .collect()
    }

    /// Records a server's subscribe stream has handed out so far.
    pub(crate) fn yielded(&self, server: &ServerDescriptor) -> usize {
        self.yielded
            .lock()
            .expect("yielded lock")
            .get(&server.address())
            .copied()
            .unwrap_or(0)
    }

    pub(crate) async fn wait_for_trims(&self, count: usize) -> Vec<(String, Gsn)> {
        loop {
            {
                let trims = self.trims.lock().expect("trims lock");
                if trims.len() >= count {
                    return trims.clone();
                }
            }
            self.trim_notify.notified().await;
        }
    }
}

#[async_trait]
impl DataClient for FakeDataClient {
    async fn append(&self, server: &ServerDescriptor, request: AppendRequest) -> Result<Gsn> {
        tokio::task::yield_now().await;
        self.appends
            .lock()
            .expect("appends lock")
            .push((server.clone(), request));

        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(RimlogError::transport(server.address(), "append rejected"));
        }

        Ok(self.last_gsn.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn subscribe(&self, server: &ServerDescriptor, from_gsn: Gsn) -> Result<RecordStream> {
        self.subscribes
            .lock()
            .expect("subscribes lock")
            .push((server.address(), from_gsn));

        let script = self
            .scripts
            .lock()
            .expect("scripts lock")
            .get(&server.address())
            .cloned()
            .ok_or_else(|| RimlogError::transport(server.address(), "connection refused"))?;

        let address = server.address();
        let yielded = self.yielded.clone();
        let steps = stream::iter(script.steps)
            .then(move |step| {
                let address = address.clone();
                let yielded = yielded.clone();
                async move {
                    match step {
                        Step::Record(gsn, record) => {
                            *yielded
                                .lock()
                                .expect("yielded lock")
                                .entry(address)
                                .or_default() += 1;
                            Some(Ok(CommittedRecord { gsn, record }))
                        }
                        Step::Delay(duration) => {
                            tokio::time::sleep(duration).await;
                            None
                        }
                        Step::Fail => Some(Err(RimlogError::transport(address, "stream reset"))),
                    }
                }
            })
            .filter_map(|item| async move { item });

        if script.hang {
            Ok(steps.chain(stream::pending()).boxed())
        } else {
            Ok(steps.boxed())
        }
    }

    async fn trim(&self, server: &ServerDescriptor, gsn: Gsn) -> Result<()> {
        self.trims
            .lock()
            .expect("trims lock")
            .push((server.address(), gsn));
        self.trim_notify.notify_one();

        if self.block_trims.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn read(&self, server: &ServerDescriptor, gsn: Gsn) -> Result<CommittedRecord> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.records
            .lock()
            .expect("records lock")
            .get(&(server.address(), gsn))
            .map(|record| CommittedRecord::new(gsn, record.clone()))
            .ok_or(RimlogError::RecordNotFound {
                gsn,
                shard_id: server.shard_id,
            })
    }
}
