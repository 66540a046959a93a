//! CRUD operations for [`Contact`] records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;

use entente_shared::types::{AuthStatus, ContactId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::Contact;

const CONTACT_COLUMNS: &str = "id, marshaled, username, email, phone, nickname, \
     photo, photo_hash, status, is_recent, is_blocked, is_banned, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create / update
    // ------------------------------------------------------------------

    /// Insert a contact, or update every mutable field if the id exists.
    pub fn upsert_contact(&self, contact: &Contact) -> Result<()> {
        self.conn().execute(
            "INSERT INTO contacts (id, marshaled, username, email, phone, nickname,
                                   photo, photo_hash, status, is_recent, is_blocked,
                                   is_banned, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
             ON CONFLICT(id) DO UPDATE SET
                 marshaled  = excluded.marshaled,
                 username   = excluded.username,
                 email      = excluded.email,
                 phone      = excluded.phone,
                 nickname   = excluded.nickname,
                 photo      = excluded.photo,
                 photo_hash = excluded.photo_hash,
                 status     = excluded.status,
                 is_recent  = excluded.is_recent,
                 is_blocked = excluded.is_blocked,
                 is_banned  = excluded.is_banned",
            params![
                contact.id.to_hex(),
                contact.marshaled,
                contact.username,
                contact.email,
                contact.phone,
                contact.nickname,
                contact.photo,
                contact.photo_hash,
                contact.status.as_str(),
                contact.is_recent,
                contact.is_blocked,
                contact.is_banned,
                contact.created_at.to_rfc3339(),
            ],
        )?;

        self.emit(StoreEvent::ContactSaved(contact.id));
        Ok(())
    }

    /// Move a contact to a new point in the handshake lifecycle.
    pub fn update_contact_status(&self, id: ContactId, status: AuthStatus) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE contacts SET status = ?2 WHERE id = ?1",
            params![id.to_hex(), status.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.emit(StoreEvent::ContactSaved(id));
        Ok(())
    }

    /// Replace a placeholder's resolved identity fields in place.
    ///
    /// Used by the group-admission backfill once a stranger's identity has
    /// been looked up.
    pub fn update_contact_identity(
        &self,
        id: ContactId,
        username: &str,
        marshaled: &[u8],
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE contacts SET username = ?2, marshaled = ?3 WHERE id = ?1",
            params![id.to_hex(), username, marshaled],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.emit(StoreEvent::ContactSaved(id));
        Ok(())
    }

    /// Set or clear the blocked flag.
    pub fn set_contact_blocked(&self, id: ContactId, blocked: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE contacts SET is_blocked = ?2 WHERE id = ?1",
            params![id.to_hex(), blocked],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.emit(StoreEvent::ContactSaved(id));
        Ok(())
    }

    /// Set or clear the banned flag.
    pub fn set_contact_banned(&self, id: ContactId, banned: bool) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE contacts SET is_banned = ?2 WHERE id = ?1",
            params![id.to_hex(), banned],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.emit(StoreEvent::ContactSaved(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single contact by id.
    pub fn get_contact(&self, id: ContactId) -> Result<Contact> {
        self.conn()
            .query_row(
                &format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = ?1"),
                params![id.to_hex()],
                row_to_contact,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a contact by id, returning `None` instead of an error on a miss.
    pub fn try_get_contact(&self, id: ContactId) -> Result<Option<Contact>> {
        match self.get_contact(id) {
            Ok(contact) => Ok(Some(contact)),
            Err(StoreError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List all contacts, ordered by creation date descending.
    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY created_at DESC"
        ))?;

        let rows = stmt.query_map([], row_to_contact)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }

    /// List contacts whose status is in the given set.
    pub fn list_contacts_with_status(&self, statuses: &[AuthStatus]) -> Result<Vec<Contact>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (1..=statuses.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CONTACT_COLUMNS} FROM contacts
             WHERE status IN ({placeholders})
             ORDER BY created_at DESC"
        ))?;

        let values: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let rows = stmt.query_map(rusqlite::params_from_iter(values), row_to_contact)?;

        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a contact by id.  Returns `true` if a row was deleted.
    pub fn delete_contact(&self, id: ContactId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM contacts WHERE id = ?1", params![id.to_hex()])?;

        if affected > 0 {
            self.emit(StoreEvent::ContactDeleted(id));
        }
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Contact`].
fn row_to_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
    let id_str: String = row.get(0)?;
    let marshaled: Vec<u8> = row.get(1)?;
    let username: String = row.get(2)?;
    let email: Option<String> = row.get(3)?;
    let phone: Option<String> = row.get(4)?;
    let nickname: Option<String> = row.get(5)?;
    let photo: Option<Vec<u8>> = row.get(6)?;
    let photo_hash: Option<String> = row.get(7)?;
    let status_str: String = row.get(8)?;
    let is_recent: bool = row.get(9)?;
    let is_blocked: bool = row.get(10)?;
    let is_banned: bool = row.get(11)?;
    let created_str: String = row.get(12)?;

    let id = ContactId::from_hex(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status = AuthStatus::from_str(&status_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            rusqlite::types::Type::Text,
            e.into(),
        )
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(12, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Contact {
        id,
        marshaled,
        username,
        email,
        phone,
        nickname,
        photo,
        photo_hash,
        status,
        is_recent,
        is_blocked,
        is_banned,
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db"), &[0u8; 32]).unwrap();
        (dir, db)
    }

    #[test]
    fn upsert_and_get_round_trip() {
        let (_dir, db) = open_db();

        let contact = Contact {
            nickname: Some("Ali".to_string()),
            email: Some("alice@example.org".to_string()),
            ..Contact::new(
                ContactId([1u8; 32]),
                "alice".to_string(),
                AuthStatus::Requested,
            )
        };
        db.upsert_contact(&contact).unwrap();

        let loaded = db.get_contact(contact.id).unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.nickname.as_deref(), Some("Ali"));
        assert_eq!(loaded.status, AuthStatus::Requested);
    }

    #[test]
    fn upsert_twice_keeps_one_row() {
        let (_dir, db) = open_db();

        let mut contact =
            Contact::new(ContactId([2u8; 32]), "bob".to_string(), AuthStatus::Stranger);
        db.upsert_contact(&contact).unwrap();

        contact.username = "bobby".to_string();
        contact.status = AuthStatus::Requesting;
        db.upsert_contact(&contact).unwrap();

        let all = db.list_contacts().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].username, "bobby");
        assert_eq!(all[0].status, AuthStatus::Requesting);
    }

    #[test]
    fn status_update_emits_event() {
        let (_dir, db) = open_db();

        let contact = Contact::new(
            ContactId([3u8; 32]),
            "carol".to_string(),
            AuthStatus::Requesting,
        );
        db.upsert_contact(&contact).unwrap();

        let mut rx = db.subscribe();
        db.update_contact_status(contact.id, AuthStatus::Requested)
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            StoreEvent::ContactSaved(contact.id)
        );
        assert_eq!(
            db.get_contact(contact.id).unwrap().status,
            AuthStatus::Requested
        );
    }

    #[test]
    fn status_update_unknown_id_is_not_found() {
        let (_dir, db) = open_db();
        assert!(matches!(
            db.update_contact_status(ContactId([9u8; 32]), AuthStatus::Friend),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn list_with_status_filters() {
        let (_dir, db) = open_db();

        db.upsert_contact(&Contact::new(
            ContactId([1u8; 32]),
            "a".to_string(),
            AuthStatus::Friend,
        ))
        .unwrap();
        db.upsert_contact(&Contact::new(
            ContactId([2u8; 32]),
            "b".to_string(),
            AuthStatus::Stranger,
        ))
        .unwrap();
        db.upsert_contact(&Contact::new(
            ContactId([3u8; 32]),
            "c".to_string(),
            AuthStatus::RequestFailed,
        ))
        .unwrap();

        let engaged = db
            .list_contacts_with_status(&[AuthStatus::Friend, AuthStatus::RequestFailed])
            .unwrap();
        assert_eq!(engaged.len(), 2);
        assert!(engaged.iter().all(|c| c.status != AuthStatus::Stranger));
    }

    #[test]
    fn delete_contact_round_trip() {
        let (_dir, db) = open_db();

        let contact = Contact::new(
            ContactId([4u8; 32]),
            "dave".to_string(),
            AuthStatus::Requested,
        );
        db.upsert_contact(&contact).unwrap();

        assert!(db.delete_contact(contact.id).unwrap());
        assert!(db.try_get_contact(contact.id).unwrap().is_none());
        assert!(!db.delete_contact(contact.id).unwrap());
    }

    #[test]
    fn backfill_identity_update() {
        let (_dir, db) = open_db();

        let placeholder = Contact::new(
            ContactId([5u8; 32]),
            entente_shared::constants::PLACEHOLDER_USERNAME.to_string(),
            AuthStatus::Stranger,
        );
        db.upsert_contact(&placeholder).unwrap();

        db.update_contact_identity(placeholder.id, "eve", b"envelope")
            .unwrap();

        let loaded = db.get_contact(placeholder.id).unwrap();
        assert_eq!(loaded.username, "eve");
        assert_eq!(loaded.marshaled, b"envelope");
        assert_eq!(loaded.status, AuthStatus::Stranger);
    }
}
