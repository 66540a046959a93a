//! # entente-shared
//!
//! Types shared between the store and orchestration layers: typed
//! identifiers, the contact authorization lifecycle, shareable identity
//! facts, and the signed identity envelope exchanged during the handshake.
//!
//! This crate performs no I/O.

pub mod constants;
pub mod identity;
pub mod types;

mod error;

pub use error::IdentityError;
pub use identity::{Identity, RemoteIdentity};
pub use types::*;
