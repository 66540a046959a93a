//! CRUD operations for [`GroupMember`] rows.

use rusqlite::params;

use entente_shared::types::{ContactId, GroupId};

use crate::database::Database;
use crate::error::Result;
use crate::events::StoreEvent;
use crate::models::{Contact, GroupMember};

impl Database {
    /// Insert a membership row.  Idempotent: re-inserting an existing
    /// `(group_id, contact_id)` pair is a no-op.
    pub fn insert_group_member(&self, group_id: GroupId, contact_id: ContactId) -> Result<()> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO group_members (group_id, contact_id) VALUES (?1, ?2)",
            params![group_id.to_hex(), contact_id.to_hex()],
        )?;

        if affected > 0 {
            self.emit(StoreEvent::MemberSaved(group_id, contact_id));
        }
        Ok(())
    }

    /// List member ids of a group, in insertion (rowid) order.
    pub fn list_member_ids(&self, group_id: GroupId) -> Result<Vec<ContactId>> {
        let mut stmt = self.conn().prepare(
            "SELECT contact_id FROM group_members WHERE group_id = ?1 ORDER BY rowid",
        )?;

        let rows = stmt.query_map(params![group_id.to_hex()], |row| {
            let id_str: String = row.get(0)?;
            ContactId::from_hex(&id_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })
        })?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    /// List the contact records of a group's members (join to `contacts`).
    ///
    /// Members whose contact row was deleted are skipped; placeholders are
    /// returned like any other contact.
    pub fn list_group_contacts(&self, group_id: GroupId) -> Result<Vec<Contact>> {
        let mut contacts = Vec::new();
        for id in self.list_member_ids(group_id)? {
            if let Some(contact) = self.try_get_contact(id)? {
                contacts.push(contact);
            }
        }
        Ok(contacts)
    }

    /// All membership rows for a contact, across groups.
    pub fn list_memberships_for_contact(&self, contact_id: ContactId) -> Result<Vec<GroupMember>> {
        let mut stmt = self.conn().prepare(
            "SELECT group_id, contact_id FROM group_members WHERE contact_id = ?1",
        )?;

        let rows = stmt.query_map(params![contact_id.to_hex()], |row| {
            let group_str: String = row.get(0)?;
            let contact_str: String = row.get(1)?;
            let group_id = GroupId::from_hex(&group_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            let contact_id = ContactId::from_hex(&contact_str).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            Ok(GroupMember {
                group_id,
                contact_id,
            })
        })?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Group;
    use chrono::Utc;
    use entente_shared::types::{AuthStatus, GroupStatus};

    fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db"), &[0u8; 32]).unwrap();
        (dir, db)
    }

    fn insert_group(db: &Database, id: u8) -> GroupId {
        let group = Group {
            id: GroupId([id; 32]),
            name: "g".to_string(),
            leader_id: ContactId([1u8; 32]),
            status: GroupStatus::Pending,
            serialized: Vec::new(),
            created_at: Utc::now(),
        };
        db.insert_group(&group).unwrap();
        group.id
    }

    #[test]
    fn insert_is_idempotent_per_pair() {
        let (_dir, db) = open_db();
        let group_id = insert_group(&db, 1);
        let member = ContactId([2u8; 32]);

        db.insert_group_member(group_id, member).unwrap();
        db.insert_group_member(group_id, member).unwrap();

        assert_eq!(db.list_member_ids(group_id).unwrap(), vec![member]);
    }

    #[test]
    fn join_returns_contact_records() {
        let (_dir, db) = open_db();
        let group_id = insert_group(&db, 2);

        let contact = Contact::new(ContactId([3u8; 32]), "zoe".to_string(), AuthStatus::Friend);
        db.upsert_contact(&contact).unwrap();
        db.insert_group_member(group_id, contact.id).unwrap();
        // Membership row without a contact record is skipped by the join.
        db.insert_group_member(group_id, ContactId([4u8; 32]))
            .unwrap();

        let contacts = db.list_group_contacts(group_id).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].username, "zoe");
    }
}
