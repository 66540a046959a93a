//! Domain model structs persisted in the local database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the presentation layer over IPC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use entente_shared::types::{AuthStatus, ContactId, GroupId, GroupStatus, MessageStatus};

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A known peer identity and its authorization lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    /// Ed25519 public key (32 bytes), stored as hex in SQLite.
    pub id: ContactId,
    /// Opaque marshaled identity envelope; empty for unresolved placeholders.
    pub marshaled: Vec<u8>,
    /// Display username derived from the identity envelope.
    pub username: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Locally chosen nickname, set when a request is sent or accepted.
    pub nickname: Option<String>,
    /// Avatar image bytes, if any.
    pub photo: Option<Vec<u8>>,
    /// BLAKE3 hash of the avatar bytes, for cheap change detection over IPC.
    pub photo_hash: Option<String>,
    /// Where this contact sits in the two-sided handshake.
    pub status: AuthStatus,
    pub is_recent: bool,
    pub is_blocked: bool,
    pub is_banned: bool,
    /// When this contact was first seen locally.
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// A minimal record for a freshly seen identity.
    pub fn new(id: ContactId, username: String, status: AuthStatus) -> Self {
        Self {
            id,
            marshaled: Vec::new(),
            username,
            email: None,
            phone: None,
            nickname: None,
            photo: None,
            photo_hash: None,
            status,
            is_recent: false,
            is_blocked: false,
            is_banned: false,
            created_at: Utc::now(),
        }
    }

    /// Attach an avatar, recording its BLAKE3 content hash.
    pub fn with_photo(mut self, photo: Vec<u8>) -> Self {
        self.photo_hash = Some(blake3::hash(&photo).to_hex().to_string());
        self.photo = Some(photo);
        self
    }
}

// ---------------------------------------------------------------------------
// Group
// ---------------------------------------------------------------------------

/// A group conversation the local user was invited to or created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    /// Identifier assigned by the protocol layer.
    pub id: GroupId,
    pub name: String,
    /// The contact leading the group; first membership entry on admission.
    pub leader_id: ContactId,
    /// Pending until the local user explicitly joins.
    pub status: GroupStatus,
    /// Opaque protocol handle needed to later operate on the group.
    pub serialized: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// GroupMember
// ---------------------------------------------------------------------------

/// One membership row; unique per `(group_id, contact_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupMember {
    pub group_id: GroupId,
    pub contact_id: ContactId,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message.  Only the fields the sync core touches; richer
/// chat semantics live elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: ContactId,
    pub recipient_id: Option<ContactId>,
    pub group_id: Option<GroupId>,
    pub date: DateTime<Utc>,
    pub status: MessageStatus,
    pub is_unread: bool,
    pub text: String,
}
