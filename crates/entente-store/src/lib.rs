//! # entente-store
//!
//! Local storage for contact, group, membership and message records, backed
//! by SQLite.  The crate exposes a synchronous [`Database`] handle that wraps
//! a `rusqlite::Connection`, provides typed CRUD helpers for every domain
//! model, and broadcasts a [`StoreEvent`] after each successful write so the
//! presentation layer can observe handshake progress reactively.

pub mod contacts;
pub mod database;
pub mod events;
pub mod groups;
pub mod members;
pub mod messages;
pub mod migrations;
pub mod models;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use events::StoreEvent;
pub use models::*;
