use thiserror::Error;

use entente_shared::IdentityError;
use entente_store::StoreError;

use crate::client::ClientError;

/// Errors surfaced by the orchestration layer.
///
/// Handshake failures (`Client`) are normally converted into a persisted
/// `*Failed` status at the orchestrator boundary rather than returned; they
/// only propagate from operations with no failure state to park in, such as
/// outbound group creation.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A protocol-client call failed (network unavailable or remote rejection).
    #[error("Handshake error: {0}")]
    Client(#[from] ClientError),

    /// A primary-path store write failed; fatal for the operation.
    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    /// An identity blob or fact set could not be parsed or verified.
    #[error("Malformed identity: {0}")]
    Identity(#[from] IdentityError),

    /// A group invitation arrived with no members.
    #[error("Group invitation carried no members")]
    EmptyMembership,

    /// The store mutex was poisoned by a panicking writer.
    #[error("Store lock poisoned")]
    StorePoisoned,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoreError>;
