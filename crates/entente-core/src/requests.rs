//! The contact handshake state machine.
//!
//! Outbound path: `stranger -> requesting -> requested -> friend` (the remote
//! side confirms).  Inbound path: `stranger -> requested -> confirming ->
//! friend` (we confirm).  The verify-then-trust variant inserts
//! `verificationInProgress -> verified` between `requested` and the mutual
//! confirmation.  Every `*Failed` state is resumable, not terminal.
//!
//! Failure semantics: a protocol-client error is never returned to the
//! caller; the orchestrator persists the matching `*Failed` status and the
//! presentation layer offers retry based on what it observes in the store.
//! Only primary-path persistence failures propagate.

use std::sync::MutexGuard;

use tracing::{debug, info, warn};

use entente_shared::identity::RemoteIdentity;
use entente_shared::types::{AuthStatus, ContactId, Fact};
use entente_store::{Contact, Database};

use crate::client::{ClientError, SendReport};
use crate::error::{CoreError, Result};
use crate::locks::EntityLocks;
use crate::{SharedClient, SharedStore};

/// Drives the two-sided contact handshake.
pub struct RequestOrchestrator {
    store: SharedStore,
    client: SharedClient,
    locks: EntityLocks,
    /// The local user's shareable facts, replayed on `resend`.
    local_facts: Vec<Fact>,
}

impl RequestOrchestrator {
    pub fn new(
        store: SharedStore,
        client: SharedClient,
        locks: EntityLocks,
        local_facts: Vec<Fact>,
    ) -> Self {
        Self {
            store,
            client,
            locks,
            local_facts,
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Database>> {
        self.store.lock().map_err(|_| CoreError::StorePoisoned)
    }

    fn set_status(&self, id: ContactId, status: AuthStatus) -> Result<()> {
        self.store()?.update_contact_status(id, status)?;
        Ok(())
    }

    /// Persist `Friend` plus the recency flag in one write.
    fn mark_friend(&self, id: ContactId) -> Result<()> {
        let store = self.store()?;
        let mut contact = store.get_contact(id)?;
        contact.status = AuthStatus::Friend;
        contact.is_recent = true;
        store.upsert_contact(&contact)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Outbound path
    // ------------------------------------------------------------------

    /// Open an authenticated channel to a contact, sharing the given facts.
    ///
    /// Persists `Requesting` (with the chosen nickname) before any network
    /// step; callers observe progress through the store subscription, not a
    /// return value.
    pub async fn send_request(
        &self,
        contact_id: ContactId,
        nickname: String,
        facts: Vec<Fact>,
    ) -> Result<()> {
        let _guard = self.locks.acquire(contact_id.0).await;

        let contact = {
            let store = self.store()?;
            let mut contact = store.get_contact(contact_id)?;
            contact.status = AuthStatus::Requesting;
            contact.nickname = Some(nickname);
            store.upsert_contact(&contact)?;
            contact
        };

        debug!(contact = %contact_id.short(), "contact request started");
        self.run_request(contact, &facts).await
    }

    /// Retry a request with the contact's previously chosen nickname.
    ///
    /// Permitted from `requestFailed` and `stranger` (first attempt);
    /// re-entering `requesting` is idempotent.  Any other state is a logged
    /// no-op.
    pub async fn resend(&self, contact_id: ContactId) -> Result<()> {
        let _guard = self.locks.acquire(contact_id.0).await;

        let contact = {
            let store = self.store()?;
            let mut contact = store.get_contact(contact_id)?;
            if !contact.status.can_resend() {
                debug!(
                    contact = %contact_id.short(),
                    status = %contact.status,
                    "resend ignored outside a resumable state"
                );
                return Ok(());
            }
            contact.status = AuthStatus::Requesting;
            store.upsert_contact(&contact)?;
            contact
        };

        debug!(contact = %contact_id.short(), "contact request resent");
        let facts = self.local_facts.clone();
        self.run_request(contact, &facts).await
    }

    async fn run_request(&self, contact: Contact, facts: &[Fact]) -> Result<()> {
        let partner = match RemoteIdentity::unmarshal(&contact.marshaled) {
            Ok(partner) => partner,
            Err(e) => {
                warn!(
                    contact = %contact.id.short(),
                    error = %e,
                    "stored identity unparseable, request failed"
                );
                return self.set_status(contact.id, AuthStatus::RequestFailed);
            }
        };

        match self.open_channel(&partner, facts).await {
            Ok(report) => {
                info!(
                    contact = %contact.id.short(),
                    round = report.round,
                    "contact request sent"
                );
                self.set_status(contact.id, AuthStatus::Requested)
            }
            Err(e) => {
                warn!(contact = %contact.id.short(), error = %e, "contact request failed");
                self.set_status(contact.id, AuthStatus::RequestFailed)
            }
        }
    }

    async fn open_channel(
        &self,
        partner: &RemoteIdentity,
        facts: &[Fact],
    ) -> std::result::Result<SendReport, ClientError> {
        self.client.wait_for_network().await?;
        self.client
            .request_authenticated_channel(partner, facts)
            .await
    }

    // ------------------------------------------------------------------
    // Inbound path
    // ------------------------------------------------------------------

    /// Confirm a request previously received from this contact.
    pub async fn accept_request(&self, contact_id: ContactId, nickname: String) -> Result<()> {
        let _guard = self.locks.acquire(contact_id.0).await;

        let contact = {
            let store = self.store()?;
            let mut contact = store.get_contact(contact_id)?;
            contact.status = AuthStatus::Confirming;
            contact.nickname = Some(nickname);
            store.upsert_contact(&contact)?;
            contact
        };

        let partner = match RemoteIdentity::unmarshal(&contact.marshaled) {
            Ok(partner) => partner,
            Err(e) => {
                warn!(
                    contact = %contact_id.short(),
                    error = %e,
                    "stored identity unparseable, confirmation failed"
                );
                return self.set_status(contact_id, AuthStatus::ConfirmationFailed);
            }
        };

        match self.confirm_channel(&partner).await {
            Ok(report) => {
                info!(
                    contact = %contact_id.short(),
                    round = report.round,
                    "contact request accepted"
                );
                self.mark_friend(contact_id)
            }
            Err(e) => {
                warn!(contact = %contact_id.short(), error = %e, "confirmation failed");
                self.set_status(contact_id, AuthStatus::ConfirmationFailed)
            }
        }
    }

    async fn confirm_channel(
        &self,
        partner: &RemoteIdentity,
    ) -> std::result::Result<SendReport, ClientError> {
        self.client.wait_for_network().await?;
        self.client.confirm_received_request(partner).await
    }

    /// Delete the contact record outright.  There is no soft-reject state.
    pub async fn reject_request(&self, contact_id: ContactId) -> Result<()> {
        let _guard = self.locks.acquire(contact_id.0).await;

        if self.store()?.delete_contact(contact_id)? {
            info!(contact = %contact_id.short(), "contact request rejected");
        } else {
            debug!(contact = %contact_id.short(), "rejecting unknown contact, nothing to do");
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Verify-then-trust variant
    // ------------------------------------------------------------------

    /// Check that the contact owns the identity it advertises.
    ///
    /// `verificationInProgress` is persisted first; an ownership mismatch and
    /// a network failure both park the contact in `verificationFailed`.
    pub async fn verify(&self, contact_id: ContactId) -> Result<()> {
        let _guard = self.locks.acquire(contact_id.0).await;

        let contact = {
            let store = self.store()?;
            let contact = store.get_contact(contact_id)?;
            store.update_contact_status(contact_id, AuthStatus::VerificationInProgress)?;
            contact
        };

        let partner = match RemoteIdentity::unmarshal(&contact.marshaled) {
            Ok(partner) => partner,
            Err(e) => {
                warn!(
                    contact = %contact_id.short(),
                    error = %e,
                    "stored identity unparseable, verification failed"
                );
                return self.set_status(contact_id, AuthStatus::VerificationFailed);
            }
        };

        let outcome = async {
            self.client.wait_for_network().await?;
            self.client.verify_contact(&partner).await
        }
        .await;

        match outcome {
            Ok(true) => {
                info!(contact = %contact_id.short(), "contact verified");
                self.set_status(contact_id, AuthStatus::Verified)
            }
            Ok(false) => {
                warn!(contact = %contact_id.short(), "contact identity mismatch");
                self.set_status(contact_id, AuthStatus::VerificationFailed)
            }
            Err(e) => {
                warn!(contact = %contact_id.short(), error = %e, "verification failed");
                self.set_status(contact_id, AuthStatus::VerificationFailed)
            }
        }
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Mark a former friend `hidden` so group rosters keep rendering.
    pub async fn hide_contact(&self, contact_id: ContactId) -> Result<()> {
        let _guard = self.locks.acquire(contact_id.0).await;
        self.set_status(contact_id, AuthStatus::Hidden)?;
        info!(contact = %contact_id.short(), "contact hidden");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Inbound event handlers (driven by the engine router)
    // ------------------------------------------------------------------

    /// A peer requested an authenticated channel with us.
    ///
    /// Creates or updates the contact with `requested`, unless the peer is
    /// already a friend.
    pub async fn handle_incoming_request(&self, identity: RemoteIdentity) -> Result<()> {
        let contact_id = identity.contact_id();
        let _guard = self.locks.acquire(contact_id.0).await;

        let store = self.store()?;
        match store.try_get_contact(contact_id)? {
            Some(existing) if existing.status == AuthStatus::Friend => {
                debug!(contact = %contact_id.short(), "request from existing friend ignored");
            }
            Some(mut existing) => {
                apply_identity(&mut existing, &identity);
                existing.status = AuthStatus::Requested;
                existing.is_recent = true;
                store.upsert_contact(&existing)?;
                info!(contact = %contact_id.short(), "contact request received");
            }
            None => {
                let mut contact = Contact::new(
                    contact_id,
                    identity.username().to_string(),
                    AuthStatus::Requested,
                );
                apply_identity(&mut contact, &identity);
                contact.is_recent = true;
                store.upsert_contact(&contact)?;
                info!(contact = %contact_id.short(), "contact request received from new peer");
            }
        }
        Ok(())
    }

    /// A peer confirmed a request we sent.
    ///
    /// Promotes any in-flight handshake state to `friend`.  A second delivery
    /// of the same confirmation is a no-op; a confirmation we never solicited
    /// is dropped.
    pub async fn handle_incoming_confirmation(&self, identity: RemoteIdentity) -> Result<()> {
        let contact_id = identity.contact_id();
        let _guard = self.locks.acquire(contact_id.0).await;

        let store = self.store()?;
        let Some(contact) = store.try_get_contact(contact_id)? else {
            warn!(contact = %contact_id.short(), "confirmation for unknown contact dropped");
            return Ok(());
        };

        match contact.status {
            AuthStatus::Friend => {
                debug!(contact = %contact_id.short(), "duplicate confirmation ignored");
            }
            AuthStatus::Stranger | AuthStatus::Hidden => {
                warn!(
                    contact = %contact_id.short(),
                    status = %contact.status,
                    "unsolicited confirmation dropped"
                );
            }
            _ => {
                let mut contact = contact;
                apply_identity(&mut contact, &identity);
                contact.status = AuthStatus::Friend;
                contact.is_recent = true;
                store.upsert_contact(&contact)?;
                info!(contact = %contact_id.short(), "contact confirmed, now a friend");
            }
        }
        Ok(())
    }

    /// A peer restored their identity from backup.
    ///
    /// Authorization state is untouched; the known contact (if any) is
    /// returned so the caller can surface a notice.  Never fails on an
    /// unknown id.
    pub async fn handle_incoming_reset(
        &self,
        identity: RemoteIdentity,
    ) -> Result<Option<Contact>> {
        let contact_id = identity.contact_id();
        let _guard = self.locks.acquire(contact_id.0).await;

        let contact = self.store()?.try_get_contact(contact_id)?;
        match &contact {
            Some(known) => info!(
                contact = %contact_id.short(),
                username = %known.username,
                "peer restored their identity"
            ),
            None => debug!(
                contact = %contact_id.short(),
                "reset notice for unknown contact ignored"
            ),
        }
        Ok(contact)
    }
}

/// Copy the envelope's derived facts onto a contact record.
fn apply_identity(contact: &mut Contact, identity: &RemoteIdentity) {
    contact.username = identity.username().to_string();
    contact.email = identity.payload.email.clone();
    contact.phone = identity.payload.phone.clone();
    contact.marshaled = identity.marshal().to_vec();
}
