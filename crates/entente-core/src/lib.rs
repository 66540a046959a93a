//! # entente-core
//!
//! The contact-relationship and group-membership synchronization core of a
//! messenger client.  It reconciles locally persisted identity records with
//! the multi-step, asynchronous remote confirmation handshake, admits inbound
//! group invitations whose members may be locally unknown, and classifies
//! inbound delivery reports for user alerting.
//!
//! The cryptographic messaging protocol itself sits behind the opaque
//! [`NetworkClient`] trait; persistence sits in `entente-store`.  Screens,
//! navigation, push registration and backup are someone else's problem.
//!
//! Entry points:
//! - [`Engine::start`] wires a store and a client together and routes inbound
//!   [`ClientEvent`]s to the orchestrators.
//! - [`RequestOrchestrator`] drives the two-sided contact handshake.
//! - [`GroupAdmissionHandler`] admits inbound group invitations.
//! - [`GroupCreationOrchestrator`] creates outbound groups.
//! - [`notifications::classify`] decides whether a delivery-report batch
//!   should alert the user.

pub mod admission;
pub mod client;
pub mod engine;
pub mod events;
pub mod groups;
pub mod locks;
pub mod logging;
pub mod notifications;
pub mod requests;

mod error;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::{Arc, Mutex};

use entente_store::Database;

pub use admission::{AdmissionOutcome, GroupAdmissionHandler};
pub use client::{ClientError, GroupReport, LookupOutcome, NetworkClient, SendReport};
pub use engine::{Engine, EngineConfig, EngineNotification};
pub use error::{CoreError, Result};
pub use events::{ClientEvent, EventBus, EventPublisher, GroupInvite};
pub use groups::{GroupCreationOrchestrator, GroupInfo};
pub use requests::RequestOrchestrator;

/// The store handle shared between orchestrators.
///
/// The store serializes individual row writes behind this mutex; the lock is
/// never held across a network call, so a write after a network step is not
/// atomic with respect to concurrent writers (see the per-entity locks in
/// [`locks`] for the serialization that matters).
pub type SharedStore = Arc<Mutex<Database>>;

/// The opaque protocol client handle shared between orchestrators.
pub type SharedClient = Arc<dyn NetworkClient>;
