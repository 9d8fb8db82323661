//! Realtime change feed: hub, subscription handle, and idempotent merge.
//!
//! The durable store echoes every committed message row into the hub,
//! standing in for the external change feed (a deployment bridging a remote
//! feed publishes into the same hub). Subscribers therefore see their own
//! writes back; the id-based idempotent merge absorbs those echoes.

pub mod subscription;

pub use subscription::FeedSubscription;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::Message;

/// Default hub capacity. Slow consumers past this lag drop oldest events;
/// the merge is idempotent so a re-delivered row is harmless, and a dropped
/// one is recovered when the patient is next activated and the record is
/// reconciled against the store.
const FEED_CAPACITY: usize = 256;

/// One INSERT on the messages table, carrying the full row.
#[derive(Debug, Clone)]
pub struct FeedEvent {
    pub patient_id: Uuid,
    pub message: Message,
}

/// Broadcast hub for message-row INSERT events.
///
/// Cheap to clone; all clones publish into and subscribe to the same channel.
#[derive(Clone)]
pub struct FeedHub {
    tx: broadcast::Sender<FeedEvent>,
}

impl FeedHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        Self { tx }
    }

    /// Publish an INSERT event. Fine to call with no subscribers.
    pub fn publish(&self, event: FeedEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.tx.subscribe()
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new()
    }
}
