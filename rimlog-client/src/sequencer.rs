use crate::types::{ClientId, Csn};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-client identity and append sequence counter.
///
/// The client id is drawn at random and is not coordinated with any other
/// client, so uniqueness is best-effort only.
#[derive(Debug)]
pub struct ClientSequencer {
    client_id: ClientId,
    next_csn: AtomicU64,
}

impl ClientSequencer {
    pub fn new() -> Self {
        Self::with_client_id(assign_client_id())
    }

    pub fn with_client_id(client_id: ClientId) -> Self {
        Self {
            client_id,
            next_csn: AtomicU64::new(0),
        }
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Snapshots `(client_id, csn)` and advances the counter in one step.
    ///
    /// A csn handed out here is never reused, even if the append it was
    /// taken for fails.
    pub fn next(&self) -> (ClientId, Csn) {
        let csn = self.next_csn.fetch_add(1, Ordering::AcqRel);
        (self.client_id, csn)
    }

    /// The csn the next append will carry.
    pub fn peek(&self) -> Csn {
        self.next_csn.load(Ordering::Acquire)
    }
}

impl Default for ClientSequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// Random 31-bit client id.
fn assign_client_id() -> ClientId {
    rand::random::<u32>() & 0x7fff_ffff
}
