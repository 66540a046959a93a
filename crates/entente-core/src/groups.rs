//! Outbound group creation.

use std::sync::MutexGuard;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use entente_shared::types::{ContactId, GroupStatus, MessageStatus};
use entente_store::{Contact, Database, Group, Message};

use crate::error::{CoreError, Result};
use crate::locks::EntityLocks;
use crate::{SharedClient, SharedStore};

/// A freshly created (or read-back) group with its resolved member records.
#[derive(Debug, Clone)]
pub struct GroupInfo {
    pub group: Group,
    pub members: Vec<Contact>,
}

/// Creates groups led by the local user.
pub struct GroupCreationOrchestrator {
    store: SharedStore,
    client: SharedClient,
    locks: EntityLocks,
    /// The local user's contact id; leader of every group created here.
    self_id: ContactId,
}

impl GroupCreationOrchestrator {
    pub fn new(
        store: SharedStore,
        client: SharedClient,
        locks: EntityLocks,
        self_id: ContactId,
    ) -> Self {
        Self {
            store,
            client,
            locks,
            self_id,
        }
    }

    fn store(&self) -> Result<MutexGuard<'_, Database>> {
        self.store.lock().map_err(|_| CoreError::StorePoisoned)
    }

    /// Create a group, persist it and read back the assembled [`GroupInfo`].
    ///
    /// The protocol call comes first; each persistence step follows
    /// sequentially.  A persistence failure after the protocol call succeeded
    /// is surfaced to the caller and **not rolled back** — the group exists
    /// on the network either way.
    pub async fn create(
        &self,
        name: &str,
        welcome: Option<&str>,
        members: &[ContactId],
    ) -> Result<GroupInfo> {
        let report = {
            self.client.wait_for_network().await?;
            self.client
                .make_group(members, welcome.map(str::as_bytes), name.as_bytes())
                .await?
        };

        let _guard = self.locks.acquire(report.id.0).await;
        let created_at = Utc::now();

        let store = self.store()?;
        store.insert_group(&Group {
            id: report.id,
            name: name.to_string(),
            leader_id: self.self_id,
            status: GroupStatus::Participating,
            serialized: report.serialized.to_vec(),
            created_at,
        })?;

        if let Some(text) = welcome {
            store.insert_message(&Message {
                id: Uuid::new_v4(),
                sender_id: self.self_id,
                recipient_id: None,
                group_id: Some(report.id),
                date: created_at,
                status: MessageStatus::Sent,
                is_unread: false,
                text: text.to_string(),
            })?;
        }

        store.insert_group_member(report.id, self.self_id)?;
        for member in members {
            store.insert_group_member(report.id, *member)?;
        }

        let group = store.get_group(report.id)?;
        let members = store.list_group_contacts(report.id)?;

        info!(
            group = %group.id.short(),
            name = %group.name,
            members = members.len(),
            "group created"
        );

        Ok(GroupInfo { group, members })
    }
}
