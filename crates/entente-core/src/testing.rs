//! Shared fixtures for the crate's tests: an on-disk store and a scripted
//! protocol client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;

use entente_shared::identity::{Identity, RemoteIdentity};
use entente_shared::types::{AuthStatus, ContactId, Fact, GroupId};
use entente_store::{Contact, Database};

use crate::client::{ClientError, GroupReport, LookupOutcome, NetworkClient, SendReport};
use crate::SharedStore;

pub(crate) fn open_store() -> (tempfile::TempDir, SharedStore) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_at(&dir.path().join("test.db"), &[0u8; 32]).unwrap();
    (dir, Arc::new(StdMutex::new(db)))
}

/// A freshly generated peer identity envelope.
pub(crate) fn remote_identity(name: &str) -> RemoteIdentity {
    Identity::generate().to_remote(name.to_string())
}

/// Persist a contact for the given envelope and return its id.
pub(crate) fn seed_contact(
    store: &SharedStore,
    remote: &RemoteIdentity,
    status: AuthStatus,
) -> ContactId {
    let mut contact = Contact::new(remote.contact_id(), remote.username().to_string(), status);
    contact.marshaled = remote.marshal().to_vec();
    store.lock().unwrap().upsert_contact(&contact).unwrap();
    contact.id
}

/// Scripted [`NetworkClient`]: failure flags per primitive, a configurable
/// lookup result, and a call log for no-extra-side-effect assertions.
pub(crate) struct MockClient {
    pub fail_network: AtomicBool,
    pub fail_request: AtomicBool,
    pub fail_confirm: AtomicBool,
    pub fail_verify: AtomicBool,
    /// `verify_contact` returns `Ok(false)` when set.
    pub verify_mismatch: AtomicBool,
    pub fail_lookup: AtomicBool,
    pub fail_make_group: AtomicBool,
    /// Identities returned by `lookup_contacts` (when not failing).
    pub lookup_identities: StdMutex<Vec<RemoteIdentity>>,
    /// Group id handed out by `make_group`.
    pub next_group_id: StdMutex<GroupId>,
    calls: StdMutex<Vec<&'static str>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self {
            fail_network: AtomicBool::new(false),
            fail_request: AtomicBool::new(false),
            fail_confirm: AtomicBool::new(false),
            fail_verify: AtomicBool::new(false),
            verify_mismatch: AtomicBool::new(false),
            fail_lookup: AtomicBool::new(false),
            fail_make_group: AtomicBool::new(false),
            lookup_identities: StdMutex::new(Vec::new()),
            next_group_id: StdMutex::new(GroupId([0xEEu8; 32])),
            calls: StdMutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    fn report() -> SendReport {
        SendReport {
            round: 42,
            sent_at: Utc::now(),
        }
    }
}

#[async_trait]
impl NetworkClient for MockClient {
    async fn wait_for_network(&self) -> Result<(), ClientError> {
        self.record("wait_for_network");
        if self.fail_network.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable);
        }
        Ok(())
    }

    async fn request_authenticated_channel(
        &self,
        _partner: &RemoteIdentity,
        _facts: &[Fact],
    ) -> Result<SendReport, ClientError> {
        self.record("request_authenticated_channel");
        if self.fail_request.load(Ordering::SeqCst) {
            return Err(ClientError::Rejected("request refused".to_string()));
        }
        Ok(Self::report())
    }

    async fn confirm_received_request(
        &self,
        _partner: &RemoteIdentity,
    ) -> Result<SendReport, ClientError> {
        self.record("confirm_received_request");
        if self.fail_confirm.load(Ordering::SeqCst) {
            return Err(ClientError::Rejected("confirmation refused".to_string()));
        }
        Ok(Self::report())
    }

    async fn verify_contact(&self, _partner: &RemoteIdentity) -> Result<bool, ClientError> {
        self.record("verify_contact");
        if self.fail_verify.load(Ordering::SeqCst) {
            return Err(ClientError::Unavailable);
        }
        Ok(!self.verify_mismatch.load(Ordering::SeqCst))
    }

    async fn lookup_contacts(&self, ids: &[ContactId]) -> LookupOutcome {
        self.record("lookup_contacts");
        if self.fail_lookup.load(Ordering::SeqCst) {
            return LookupOutcome {
                resolved: Vec::new(),
                errors: vec![ClientError::Unavailable; ids.len()],
            };
        }
        let resolved = self
            .lookup_identities
            .lock()
            .unwrap()
            .iter()
            .filter(|identity| ids.contains(&identity.contact_id()))
            .cloned()
            .collect();
        LookupOutcome {
            resolved,
            errors: Vec::new(),
        }
    }

    async fn make_group(
        &self,
        _membership: &[ContactId],
        _welcome: Option<&[u8]>,
        _name: &[u8],
    ) -> Result<GroupReport, ClientError> {
        self.record("make_group");
        if self.fail_make_group.load(Ordering::SeqCst) {
            return Err(ClientError::Rejected("group refused".to_string()));
        }
        Ok(GroupReport {
            id: *self.next_group_id.lock().unwrap(),
            serialized: Bytes::from_static(b"serialized-group-handle"),
        })
    }
}
