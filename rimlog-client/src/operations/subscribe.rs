//! Subscribe: one listener task per data server feeding a single reassembler.
//!
//! Listeners only forward what their server streams. The reassembler task
//! owns the [`ReorderBuffer`], so ordering state is never shared between
//! tasks. It publishes the delivery cursor on a watch channel, which the
//! listeners consult when a skew bound is configured.

use crate::config::SubscriptionConfig;
use crate::discovery::Discovery;
use crate::error::Result;
use crate::reassembly::{IngestDecision, ReorderBuffer};
use crate::subscription::Subscription;
use crate::transport::DataClient;
use crate::types::{CommittedRecord, Gsn, ServerDescriptor};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct SubscribeOperation {
    discovery: Arc<dyn Discovery>,
    client: Arc<dyn DataClient>,
    config: SubscriptionConfig,
}

#[derive(Debug, Clone, Copy)]
pub struct SubscribeOperationRequest {
    pub from_gsn: Gsn,
}

impl SubscribeOperation {
    pub fn new(
        discovery: Arc<dyn Discovery>,
        client: Arc<dyn DataClient>,
        config: SubscriptionConfig,
    ) -> Self {
        Self {
            discovery,
            client,
            config,
        }
    }

    pub async fn run(&self, request: SubscribeOperationRequest) -> Result<Subscription> {
        let SubscribeOperationRequest { from_gsn } = request;
        let servers = self.discovery.discover_servers().await?;

        let cancel = CancellationToken::new();
        let (arrivals_tx, arrivals_rx) = mpsc::unbounded_channel();
        let (output_tx, output_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let (cursor_tx, cursor_rx) = watch::channel(from_gsn);
        let mut tasks = JoinSet::new();

        if servers.is_empty() {
            tracing::info!(
                "subscription has no data servers, closing: from_gsn={}",
                from_gsn
            );
        }

        for server in &servers {
            let listener = Listener {
                server: server.clone(),
                client: self.client.clone(),
                from_gsn,
                max_skew: self.config.max_skew,
                arrivals: arrivals_tx.clone(),
                cursor: cursor_rx.clone(),
                cancel: cancel.clone(),
            };
            tasks.spawn(listener.run());
        }
        // The arrivals channel closes once the last listener is gone.
        drop(arrivals_tx);

        let reassembler = Reassembler {
            buffer: ReorderBuffer::new(from_gsn),
            arrivals: arrivals_rx,
            output: output_tx,
            cursor: cursor_tx,
            cancel: cancel.clone(),
        };
        tasks.spawn(reassembler.run());

        tracing::info!(
            "subscription opened: from_gsn={} servers={} max_skew={:?}",
            from_gsn,
            servers.len(),
            self.config.max_skew
        );

        Ok(Subscription::new(
            from_gsn,
            servers.len(),
            output_rx,
            cursor_rx,
            cancel,
            tasks,
        ))
    }
}

struct Listener {
    server: ServerDescriptor,
    client: Arc<dyn DataClient>,
    from_gsn: Gsn,
    max_skew: Option<u64>,
    arrivals: mpsc::UnboundedSender<CommittedRecord>,
    cursor: watch::Receiver<Gsn>,
    cancel: CancellationToken,
}

impl Listener {
    async fn run(mut self) {
        let address = self.server.address();

        let opened = tokio::select! {
            _ = self.cancel.cancelled() => return,
            opened = self.client.subscribe(&self.server, self.from_gsn) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(error) => {
                tracing::warn!(
                    "listener failed to open stream: server={} from_gsn={} error={}",
                    address,
                    self.from_gsn,
                    error
                );
                return;
            }
        };
        tracing::debug!(
            "listener started: server={} from_gsn={}",
            address,
            self.from_gsn
        );

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break,
                next = stream.next() => next,
            };

            let record = match next {
                Some(Ok(record)) => record,
                Some(Err(error)) => {
                    tracing::warn!("listener stream failed: server={} error={}", address, error);
                    break;
                }
                None => {
                    tracing::debug!("listener stream ended: server={}", address);
                    break;
                }
            };

            if let Some(max_skew) = self.max_skew
                && !self.wait_within_skew(record.gsn, max_skew).await
            {
                break;
            }

            if self.arrivals.send(record).is_err() {
                break;
            }
        }

        tracing::debug!("listener stopped: server={}", address);
    }

    /// Holds the listener until `gsn` is less than `max_skew` ahead of the
    /// cursor. Returns false if the session ended while waiting.
    async fn wait_within_skew(&mut self, gsn: Gsn, max_skew: u64) -> bool {
        let cursor = &mut self.cursor;
        let within = async {
            cursor
                .wait_for(|next| gsn < next.saturating_add(max_skew))
                .await
                .map(|_| ())
        };

        tokio::select! {
            _ = self.cancel.cancelled() => false,
            within = within => within.is_ok(),
        }
    }
}

struct Reassembler {
    buffer: ReorderBuffer,
    arrivals: mpsc::UnboundedReceiver<CommittedRecord>,
    output: mpsc::Sender<CommittedRecord>,
    cursor: watch::Sender<Gsn>,
    cancel: CancellationToken,
}

impl Reassembler {
    async fn run(mut self) {
        'session: loop {
            let arrival = tokio::select! {
                _ = self.cancel.cancelled() => break,
                arrival = self.arrivals.recv() => arrival,
            };
            let Some(record) = arrival else {
                tracing::debug!(
                    "all listeners ended: next_gsn={}",
                    self.buffer.next_gsn()
                );
                break;
            };

            match self.buffer.ingest(record) {
                IngestDecision::Ready => {}
                IngestDecision::OutOfRange => {
                    tracing::warn!("dropping record with reserved gsn {}", Gsn::MAX);
                    continue;
                }
                IngestDecision::Duplicate | IngestDecision::Buffered => continue,
            }

            while let Some(ready) = self.buffer.pop_ready() {
                // Blocks while the consumer is behind.
                let sent = tokio::select! {
                    _ = self.cancel.cancelled() => break 'session,
                    sent = self.output.send(ready) => sent,
                };
                if sent.is_err() {
                    tracing::debug!("subscription consumer gone, cancelling session");
                    self.cancel.cancel();
                    break 'session;
                }
                self.cursor.send_replace(self.buffer.next_gsn());
            }
        }

        if !self.buffer.is_empty() {
            tracing::warn!(
                "subscription closed with undeliverable records: next_gsn={} pending={} lowest_pending={:?}",
                self.buffer.next_gsn(),
                self.buffer.pending_len(),
                self.buffer.lowest_pending()
            );
        }
        tracing::info!(
            "subscription closed: next_gsn={}",
            *self.cursor.borrow()
        );
    }
}
