//! Wiring between the protocol client's event stream and the orchestrators.
//!
//! [`Engine::start`] builds the event bus, spawns the router task and returns
//! a notification channel for the presentation layer.  The router dispatches
//! each inbound event on its own task; the per-entity locks inside the
//! orchestrators keep same-id work serialized while unrelated events proceed
//! in parallel.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use entente_shared::constants::ENGINE_NOTIFICATION_CAPACITY;
use entente_shared::types::{ContactId, Fact, GroupId};
use entente_store::Contact;

use crate::admission::{AdmissionOutcome, GroupAdmissionHandler};
use crate::events::{ClientEvent, EventBus, EventPublisher};
use crate::groups::GroupCreationOrchestrator;
use crate::locks::EntityLocks;
use crate::requests::RequestOrchestrator;
use crate::{SharedClient, SharedStore};

/// User-facing notices the router forwards out of band.
#[derive(Debug, Clone)]
pub enum EngineNotification {
    /// A known peer restored their identity from backup.
    ContactReset(Contact),
    /// A new group invitation was admitted into the store.
    GroupAdmitted(GroupId),
}

/// Static configuration for [`Engine::start`].
pub struct EngineConfig {
    /// The local user's contact id.
    pub self_id: ContactId,
    /// The local user's shareable facts, replayed on request resend.
    pub local_facts: Vec<Fact>,
}

/// The assembled orchestration core.
pub struct Engine {
    pub requests: Arc<RequestOrchestrator>,
    pub admission: Arc<GroupAdmissionHandler>,
    pub groups: Arc<GroupCreationOrchestrator>,
    bus: EventBus,
    router: JoinHandle<()>,
}

impl Engine {
    /// Wire a store and a protocol client together and start the router.
    ///
    /// Returns the engine plus the receiving half of the notification
    /// channel.  Connect the protocol client's inbound events through
    /// [`Engine::publisher`].
    pub fn start(
        store: SharedStore,
        client: SharedClient,
        config: EngineConfig,
    ) -> (Self, mpsc::Receiver<EngineNotification>) {
        let bus = EventBus::new();
        let contact_locks = EntityLocks::new();
        let group_locks = EntityLocks::new();

        let requests = Arc::new(RequestOrchestrator::new(
            store.clone(),
            client.clone(),
            contact_locks,
            config.local_facts,
        ));
        let admission = Arc::new(GroupAdmissionHandler::new(
            store.clone(),
            client.clone(),
            group_locks.clone(),
        ));
        let groups = Arc::new(GroupCreationOrchestrator::new(
            store,
            client,
            group_locks,
            config.self_id,
        ));

        let (notif_tx, notif_rx) = mpsc::channel(ENGINE_NOTIFICATION_CAPACITY);
        let router = tokio::spawn(event_loop(
            bus.subscribe(),
            requests.clone(),
            admission.clone(),
            notif_tx,
        ));

        (
            Self {
                requests,
                admission,
                groups,
                bus,
                router,
            },
            notif_rx,
        )
    }

    /// Handle for the protocol client to publish inbound events through.
    pub fn publisher(&self) -> EventPublisher {
        self.bus.publisher()
    }

    /// Attach a further internal subscriber to the raw event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.bus.subscribe()
    }

    /// Stop the router.  In-flight event handlers run to completion.
    pub fn shutdown(&self) {
        self.router.abort();
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.router.abort();
    }
}

/// Receive inbound events and dispatch each on its own task.
async fn event_loop(
    mut rx: broadcast::Receiver<ClientEvent>,
    requests: Arc<RequestOrchestrator>,
    admission: Arc<GroupAdmissionHandler>,
    notif_tx: mpsc::Sender<EngineNotification>,
) {
    info!("client event router started");

    loop {
        match rx.recv().await {
            Ok(ClientEvent::RequestReceived(identity)) => {
                let requests = requests.clone();
                tokio::spawn(async move {
                    if let Err(e) = requests.handle_incoming_request(identity).await {
                        warn!(error = %e, "incoming request handling failed");
                    }
                });
            }

            Ok(ClientEvent::ConfirmationReceived(identity)) => {
                let requests = requests.clone();
                tokio::spawn(async move {
                    if let Err(e) = requests.handle_incoming_confirmation(identity).await {
                        warn!(error = %e, "incoming confirmation handling failed");
                    }
                });
            }

            Ok(ClientEvent::ResetReceived(identity)) => {
                let requests = requests.clone();
                let notif_tx = notif_tx.clone();
                tokio::spawn(async move {
                    match requests.handle_incoming_reset(identity).await {
                        Ok(Some(contact)) => {
                            let _ = notif_tx
                                .send(EngineNotification::ContactReset(contact))
                                .await;
                        }
                        Ok(None) => {}
                        Err(e) => warn!(error = %e, "reset handling failed"),
                    }
                });
            }

            Ok(ClientEvent::GroupInvitation(invite)) => {
                let admission = admission.clone();
                let notif_tx = notif_tx.clone();
                let group_id = invite.group_id;
                tokio::spawn(async move {
                    match admission.admit(invite).await {
                        Ok(AdmissionOutcome::Admitted) => {
                            let _ = notif_tx
                                .send(EngineNotification::GroupAdmitted(group_id))
                                .await;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            warn!(group = %group_id.short(), error = %e, "group admission failed")
                        }
                    }
                });
            }

            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event router lagged, events lost");
            }

            Err(broadcast::error::RecvError::Closed) => break,
        }
    }

    info!("client event router ended");
}
