use crate::types::{CommittedRecord, Gsn};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Live, ordered stream of committed records.
///
/// Records arrive strictly increasing and gap-free starting at the gsn the
/// subscription was opened from. Backend failures are never reported here:
/// a data server whose stream breaks simply stops contributing. Once every
/// data server stream has ended the channel closes and [`recv`] returns
/// `None`.
///
/// Dropping the subscription, or calling [`cancel`], stops all background
/// tasks of the session.
///
/// [`recv`]: Subscription::recv
/// [`cancel`]: Subscription::cancel
pub struct Subscription {
    from_gsn: Gsn,
    listeners: usize,
    records: mpsc::Receiver<CommittedRecord>,
    cursor: watch::Receiver<Gsn>,
    cancel: CancellationToken,
    _tasks: JoinSet<()>,
}

impl Subscription {
    pub(crate) fn new(
        from_gsn: Gsn,
        listeners: usize,
        records: mpsc::Receiver<CommittedRecord>,
        cursor: watch::Receiver<Gsn>,
        cancel: CancellationToken,
        tasks: JoinSet<()>,
    ) -> Self {
        Self {
            from_gsn,
            listeners,
            records,
            cursor,
            cancel,
            _tasks: tasks,
        }
    }

    /// Waits for the next record in gsn order.
    pub async fn recv(&mut self) -> Option<CommittedRecord> {
        self.records.recv().await
    }

    pub fn from_gsn(&self) -> Gsn {
        self.from_gsn
    }

    /// Number of data servers this session listens to.
    pub fn listener_count(&self) -> usize {
        self.listeners
    }

    /// Smallest gsn that has not been handed to the output channel yet.
    pub fn next_gsn(&self) -> Gsn {
        *self.cursor.borrow()
    }

    /// Stops every listener and the reassembler. Records already queued on
    /// the output channel can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for Subscription {
    type Item = CommittedRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().records.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("from_gsn", &self.from_gsn)
            .field("next_gsn", &self.next_gsn())
            .field("listeners", &self.listeners)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
