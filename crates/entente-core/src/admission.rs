//! Inbound group-invitation admission.
//!
//! An invitation may reference members we have never seen.  Admission
//! persists the group, the welcome message and every membership row
//! synchronously — creating `stranger` placeholder contacts so the roster is
//! immediately renderable — then resolves the unknown identities in a
//! background task.  The invitation counts as admitted once the membership
//! rows exist, whether or not the backfill ever succeeds.

use std::sync::MutexGuard;

use tracing::{debug, info, warn};
use uuid::Uuid;

use entente_shared::constants::PLACEHOLDER_USERNAME;
use entente_shared::types::{AuthStatus, ContactId, GroupId, GroupStatus, MessageStatus};
use entente_store::{Contact, Database, Group, Message};

use crate::error::{CoreError, Result};
use crate::events::GroupInvite;
use crate::locks::EntityLocks;
use crate::{SharedClient, SharedStore};

/// What `admit` did with an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Group, welcome message and membership rows were persisted.
    Admitted,
    /// A group with this id already existed; nothing was written.
    Duplicate,
    /// The invitation was malformed (no members); nothing was written.
    Dropped,
}

/// Processes inbound group invitations.
pub struct GroupAdmissionHandler {
    store: SharedStore,
    client: SharedClient,
    locks: EntityLocks,
}

impl GroupAdmissionHandler {
    pub fn new(store: SharedStore, client: SharedClient, locks: EntityLocks) -> Self {
        Self {
            store,
            client,
            locks,
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Database>> {
        self.store.lock().map_err(|_| CoreError::StorePoisoned)
    }

    /// Admit one inbound invitation.
    ///
    /// Idempotent against duplicate delivery; a replay of an already admitted
    /// group id returns [`AdmissionOutcome::Duplicate`] without side effects.
    /// `LocalPersistenceFailure` on the primary writes propagates; backfill
    /// failures never do.
    pub async fn admit(&self, invite: GroupInvite) -> Result<AdmissionOutcome> {
        let _guard = self.locks.acquire(invite.group_id.0).await;

        let leader = match leader_of(&invite) {
            Ok(leader) => leader,
            Err(CoreError::EmptyMembership) => {
                warn!(
                    group = %invite.group_id.short(),
                    "group invitation carried no members, dropping"
                );
                return Ok(AdmissionOutcome::Dropped);
            }
            Err(e) => return Err(e),
        };

        let strangers = {
            let store = self.store()?;

            if store.group_exists(invite.group_id)? {
                debug!(
                    group = %invite.group_id.short(),
                    "duplicate group invitation ignored"
                );
                return Ok(AdmissionOutcome::Duplicate);
            }

            store.insert_group(&Group {
                id: invite.group_id,
                name: invite
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("Group {}", invite.group_id.short())),
                leader_id: leader,
                status: GroupStatus::Pending,
                serialized: invite.serialized.to_vec(),
                created_at: invite.created_at,
            })?;

            if let Some(welcome) = &invite.welcome {
                store.insert_message(&Message {
                    id: Uuid::new_v4(),
                    sender_id: leader,
                    recipient_id: None,
                    group_id: Some(invite.group_id),
                    date: invite.created_at,
                    status: MessageStatus::Received,
                    is_unread: true,
                    text: String::from_utf8_lossy(welcome).into_owned(),
                })?;
            }

            // Partition members into known contacts and strangers, creating
            // placeholder records so the roster renders before any lookup.
            let mut strangers = Vec::new();
            for member in &invite.members {
                match store.try_get_contact(*member)? {
                    Some(contact) if contact.status.is_engaged() => {}
                    Some(_) => strangers.push(*member),
                    None => {
                        store.upsert_contact(&Contact::new(
                            *member,
                            PLACEHOLDER_USERNAME.to_string(),
                            AuthStatus::Stranger,
                        ))?;
                        strangers.push(*member);
                    }
                }
            }

            for member in &invite.members {
                store.insert_group_member(invite.group_id, *member)?;
            }

            strangers
        };

        info!(
            group = %invite.group_id.short(),
            members = invite.members.len(),
            strangers = strangers.len(),
            "group invitation admitted"
        );

        if !strangers.is_empty() {
            let client = self.client.clone();
            let store = self.store.clone();
            let group_id = invite.group_id;
            tokio::spawn(async move {
                backfill_strangers(client, store, group_id, strangers).await;
            });
        }

        Ok(AdmissionOutcome::Admitted)
    }

    /// Flip an admitted group from `pending` to `participating`.
    pub async fn join(&self, group_id: GroupId) -> Result<()> {
        let _guard = self.locks.acquire(group_id.0).await;
        self.store()?
            .update_group_status(group_id, GroupStatus::Participating)?;
        info!(group = %group_id.short(), "group joined");
        Ok(())
    }
}

/// The first membership entry leads the group.
fn leader_of(invite: &GroupInvite) -> Result<ContactId> {
    invite
        .members
        .first()
        .copied()
        .ok_or(CoreError::EmptyMembership)
}

/// Resolve stranger identities and fill in their placeholder records.
///
/// Best effort: lookup errors and write failures leave the placeholder as
/// is — this task is never retried by the admission handler.
async fn backfill_strangers(
    client: SharedClient,
    store: SharedStore,
    group_id: GroupId,
    strangers: Vec<ContactId>,
) {
    info!(
        group = %group_id.short(),
        count = strangers.len(),
        "resolving stranger identities"
    );

    let outcome = client.lookup_contacts(&strangers).await;

    for error in &outcome.errors {
        warn!(group = %group_id.short(), error = %error, "stranger lookup failed");
    }

    for identity in outcome.resolved {
        let contact_id = identity.contact_id();
        let updated = match store.lock() {
            Ok(store) => store.update_contact_identity(
                contact_id,
                identity.username(),
                &identity.marshal(),
            ),
            Err(_) => {
                warn!("store lock poisoned during backfill, giving up");
                return;
            }
        };

        match updated {
            Ok(()) => debug!(
                contact = %contact_id.short(),
                username = %identity.username(),
                "stranger identity resolved"
            ),
            // Swallowed: the placeholder simply stays unresolved.
            Err(e) => debug!(
                contact = %contact_id.short(),
                error = %e,
                "stranger backfill write failed"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::Utc;

    use crate::testing::{open_store, remote_identity, seed_contact, MockClient};

    fn handler(store: SharedStore, client: Arc<MockClient>) -> GroupAdmissionHandler {
        GroupAdmissionHandler::new(store, client, EntityLocks::new())
    }

    fn invite(group_id: GroupId, members: Vec<ContactId>, welcome: Option<&str>) -> GroupInvite {
        GroupInvite {
            group_id,
            serialized: Bytes::from_static(b"group-handle"),
            members,
            welcome: welcome.map(|text| Bytes::from(text.as_bytes().to_vec())),
            name: Some("book club".to_string()),
            created_at: Utc::now(),
        }
    }

    /// Wait until the spawned backfill has resolved a username, bounded.
    async fn wait_for_username(store: &SharedStore, id: ContactId, expected: &str) -> bool {
        for _ in 0..100 {
            let username = store.lock().unwrap().get_contact(id).unwrap().username;
            if username == expected {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn admits_group_with_known_and_stranger_members() {
        let (_dir, store) = open_store();
        let client = Arc::new(MockClient::new());
        let handler = handler(store.clone(), client.clone());

        let leader = remote_identity("leader");
        let leader_id = seed_contact(&store, &leader, AuthStatus::Friend);
        let stranger_id = ContactId([0x33u8; 32]);

        let group_id = GroupId([0x44u8; 32]);
        let outcome = handler
            .admit(invite(group_id, vec![leader_id, stranger_id], Some("hello")))
            .await
            .unwrap();
        assert_eq!(outcome, AdmissionOutcome::Admitted);

        let store_guard = store.lock().unwrap();
        let group = store_guard.get_group(group_id).unwrap();
        assert_eq!(group.leader_id, leader_id);
        assert_eq!(group.status, GroupStatus::Pending);
        assert_eq!(group.name, "book club");

        // Placeholder is queryable immediately, before any lookup resolves.
        let placeholder = store_guard.get_contact(stranger_id).unwrap();
        assert_eq!(placeholder.username, PLACEHOLDER_USERNAME);
        assert_eq!(placeholder.status, AuthStatus::Stranger);

        assert_eq!(
            store_guard.list_member_ids(group_id).unwrap(),
            vec![leader_id, stranger_id]
        );

        let messages = store_guard.list_group_messages(group_id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello");
        assert_eq!(messages[0].sender_id, leader_id);
        assert!(messages[0].is_unread);
    }

    #[tokio::test]
    async fn duplicate_invitation_is_a_noop() {
        let (_dir, store) = open_store();
        let client = Arc::new(MockClient::new());
        let handler = handler(store.clone(), client.clone());

        let leader = remote_identity("leader");
        let leader_id = seed_contact(&store, &leader, AuthStatus::Friend);
        let group_id = GroupId([0x55u8; 32]);

        let first = invite(group_id, vec![leader_id], Some("hi"));
        assert_eq!(
            handler.admit(first.clone()).await.unwrap(),
            AdmissionOutcome::Admitted
        );
        assert_eq!(
            handler.admit(first).await.unwrap(),
            AdmissionOutcome::Duplicate
        );

        let store_guard = store.lock().unwrap();
        assert_eq!(store_guard.list_groups().unwrap().len(), 1);
        assert_eq!(store_guard.list_group_messages(group_id).unwrap().len(), 1);
        assert_eq!(store_guard.list_member_ids(group_id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_membership_is_dropped_silently() {
        let (_dir, store) = open_store();
        let client = Arc::new(MockClient::new());
        let handler = handler(store.clone(), client);

        let group_id = GroupId([0x66u8; 32]);
        let outcome = handler
            .admit(invite(group_id, Vec::new(), Some("hi")))
            .await
            .unwrap();

        assert_eq!(outcome, AdmissionOutcome::Dropped);
        let store_guard = store.lock().unwrap();
        assert!(store_guard.list_groups().unwrap().is_empty());
        assert!(store_guard.list_group_messages(group_id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn backfill_resolves_placeholder_usernames() {
        let (_dir, store) = open_store();
        let client = Arc::new(MockClient::new());

        let stranger = remote_identity("zara");
        let stranger_id = stranger.contact_id();
        client.lookup_identities.lock().unwrap().push(stranger);

        let handler = handler(store.clone(), client.clone());
        let leader = remote_identity("leader");
        let leader_id = seed_contact(&store, &leader, AuthStatus::Friend);

        handler
            .admit(invite(
                GroupId([0x77u8; 32]),
                vec![leader_id, stranger_id],
                None,
            ))
            .await
            .unwrap();

        assert!(wait_for_username(&store, stranger_id, "zara").await);
        let resolved = store.lock().unwrap().get_contact(stranger_id).unwrap();
        assert!(!resolved.marshaled.is_empty());
        assert_eq!(resolved.status, AuthStatus::Stranger);
    }

    #[tokio::test]
    async fn failed_lookup_leaves_placeholder_intact() {
        let (_dir, store) = open_store();
        let client = Arc::new(MockClient::new());
        client.fail_lookup.store(true, Ordering::SeqCst);

        let handler = handler(store.clone(), client.clone());
        let leader = remote_identity("leader");
        let leader_id = seed_contact(&store, &leader, AuthStatus::Friend);
        let stranger_id = ContactId([0x88u8; 32]);

        handler
            .admit(invite(
                GroupId([0x99u8; 32]),
                vec![leader_id, stranger_id],
                None,
            ))
            .await
            .unwrap();

        // Give the backfill task a chance to run (and fail).
        for _ in 0..20 {
            if client.calls().contains(&"lookup_contacts") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let placeholder = store.lock().unwrap().get_contact(stranger_id).unwrap();
        assert_eq!(placeholder.username, PLACEHOLDER_USERNAME);
    }

    #[tokio::test]
    async fn known_members_are_not_looked_up() {
        let (_dir, store) = open_store();
        let client = Arc::new(MockClient::new());
        let handler = handler(store.clone(), client.clone());

        let leader = remote_identity("leader");
        let member = remote_identity("member");
        let leader_id = seed_contact(&store, &leader, AuthStatus::Friend);
        let member_id = seed_contact(&store, &member, AuthStatus::RequestFailed);

        handler
            .admit(invite(GroupId([0xAAu8; 32]), vec![leader_id, member_id], None))
            .await
            .unwrap();

        // All members were engaged; no backfill task was spawned.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn join_moves_group_to_participating() {
        let (_dir, store) = open_store();
        let client = Arc::new(MockClient::new());
        let handler = handler(store.clone(), client);

        let leader = remote_identity("leader");
        let leader_id = seed_contact(&store, &leader, AuthStatus::Friend);
        let group_id = GroupId([0xBBu8; 32]);

        handler
            .admit(invite(group_id, vec![leader_id], None))
            .await
            .unwrap();
        handler.join(group_id).await.unwrap();

        assert_eq!(
            store.lock().unwrap().get_group(group_id).unwrap().status,
            GroupStatus::Participating
        );
    }
}
