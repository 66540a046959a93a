//! Reactive store-event broadcast.
//!
//! Every successful write emits one [`StoreEvent`] on a `tokio::sync::broadcast`
//! channel.  Orchestration operations deliberately return no state; callers
//! observe handshake progress by subscribing here and re-querying the store.

use uuid::Uuid;

use entente_shared::types::{ContactId, GroupId};

/// Notification of a completed store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A contact row was inserted or updated.
    ContactSaved(ContactId),
    /// A contact row was deleted.
    ContactDeleted(ContactId),
    /// A group row was inserted or updated.
    GroupSaved(GroupId),
    /// A group row (and its memberships) was deleted.
    GroupDeleted(GroupId),
    /// A membership row was inserted.
    MemberSaved(GroupId, ContactId),
    /// A message row was inserted.
    MessageSaved(Uuid),
}
