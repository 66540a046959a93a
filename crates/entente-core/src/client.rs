//! The opaque protocol-client contract.
//!
//! Everything cryptographic (key exchange, message encryption, round
//! scheduling, retries and timeouts) lives behind [`NetworkClient`]; the
//! orchestration layer only sees blocking-per-call async primitives.  A retry
//! is always a new call: there is no cancellation of an issued one.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

use entente_shared::identity::RemoteIdentity;
use entente_shared::types::{ContactId, Fact, GroupId};

/// Errors a protocol-client call can fail with.
///
/// Both variants are converted into a persisted `*Failed` status at the
/// orchestrator boundary; the retry affordance is state-driven, not
/// exception-driven.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The network is not reachable (or not yet healthy).
    #[error("Network unavailable")]
    Unavailable,

    /// The remote side rejected or could not process the handshake step.
    #[error("Rejected by remote: {0}")]
    Rejected(String),
}

/// Bookkeeping returned by a successful send primitive.
#[derive(Debug, Clone)]
pub struct SendReport {
    /// Protocol round the payload was scheduled into.
    pub round: u64,
    pub sent_at: DateTime<Utc>,
}

/// Result of a successful `make_group` call: the protocol-assigned group id
/// plus the serialized group handle needed to later operate on the group.
/// The client encodes the handle before returning; an encode failure surfaces
/// as the call's error.
#[derive(Debug, Clone)]
pub struct GroupReport {
    pub id: GroupId,
    pub serialized: Bytes,
}

/// Result of a batch identity lookup.  The call itself never fails; each id
/// either resolves or contributes an error.
#[derive(Debug, Clone, Default)]
pub struct LookupOutcome {
    pub resolved: Vec<RemoteIdentity>,
    pub errors: Vec<ClientError>,
}

/// The cryptographic messaging protocol, consumed not implemented.
///
/// Implementations publish inbound events through an
/// [`EventPublisher`](crate::events::EventPublisher) instead of the
/// single-slot callback registration older clients exposed; see
/// [`crate::events`].
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Block until the network is healthy enough to send.
    async fn wait_for_network(&self) -> Result<(), ClientError>;

    /// Open an authenticated channel to `partner`, sharing the given facts.
    async fn request_authenticated_channel(
        &self,
        partner: &RemoteIdentity,
        facts: &[Fact],
    ) -> Result<SendReport, ClientError>;

    /// Confirm a request previously received from `partner`.
    async fn confirm_received_request(
        &self,
        partner: &RemoteIdentity,
    ) -> Result<SendReport, ClientError>;

    /// Check that `partner` actually owns the identity it advertises.
    async fn verify_contact(&self, partner: &RemoteIdentity) -> Result<bool, ClientError>;

    /// Resolve identities for a batch of contact ids, best effort.
    async fn lookup_contacts(&self, ids: &[ContactId]) -> LookupOutcome;

    /// Create a new group with the given membership, optional welcome
    /// message and display name.
    async fn make_group(
        &self,
        membership: &[ContactId],
        welcome: Option<&[u8]>,
        name: &[u8],
    ) -> Result<GroupReport, ClientError>;
}
