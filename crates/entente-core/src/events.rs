//! Internal fan-out of inbound protocol events.
//!
//! The underlying protocol clients historically exposed one overwritable
//! handler per event kind, so a second subscriber clobbered the first.  Here
//! a broadcast channel replaces that single slot: the client implementation
//! publishes through an [`EventPublisher`] and any number of internal
//! subscribers (the engine router, tests, future consumers) coexist.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use entente_shared::constants::CLIENT_EVENT_CAPACITY;
use entente_shared::identity::RemoteIdentity;
use entente_shared::types::{ContactId, GroupId};

/// One inbound group-invitation event as decoded by the protocol client.
#[derive(Debug, Clone)]
pub struct GroupInvite {
    pub group_id: GroupId,
    /// Opaque group handle to persist for later protocol operations.
    pub serialized: Bytes,
    /// Membership list; the first entry is the leader.
    pub members: Vec<ContactId>,
    /// Optional welcome-message bytes carried by the invitation.
    pub welcome: Option<Bytes>,
    /// Group display name, when the protocol layer could decode one.
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Inbound events decoded and decrypted by the protocol client.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A peer requested an authenticated channel with us.
    RequestReceived(RemoteIdentity),
    /// A peer confirmed a request we sent.
    ConfirmationReceived(RemoteIdentity),
    /// A peer restored their identity from backup.
    ResetReceived(RemoteIdentity),
    /// We were invited into a group.
    GroupInvitation(GroupInvite),
}

/// Fan-out hub for [`ClientEvent`]s.
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CLIENT_EVENT_CAPACITY);
        Self { tx }
    }

    /// A cheap clonable handle for the protocol client to publish through.
    pub fn publisher(&self) -> EventPublisher {
        EventPublisher {
            tx: self.tx.clone(),
        }
    }

    /// Attach a new subscriber.  Each subscriber sees every event published
    /// after the call; a lagged subscriber loses the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishing half of the [`EventBus`].
#[derive(Clone)]
pub struct EventPublisher {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventPublisher {
    /// Publish one event to all current subscribers.
    ///
    /// Dropped silently when nobody is subscribed (e.g. during shutdown).
    pub fn publish(&self, event: ClientEvent) {
        if let Err(e) = self.tx.send(event) {
            tracing::debug!(error = %e, "client event dropped, no subscribers");
        }
    }
}
