//! CRUD operations for [`Group`] records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;

use entente_shared::types::{ContactId, GroupId, GroupStatus};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::models::Group;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new group.
    pub fn insert_group(&self, group: &Group) -> Result<()> {
        self.conn().execute(
            "INSERT INTO groups (id, name, leader_id, status, serialized, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                group.id.to_hex(),
                group.name,
                group.leader_id.to_hex(),
                group.status.as_str(),
                group.serialized,
                group.created_at.to_rfc3339(),
            ],
        )?;

        self.emit(StoreEvent::GroupSaved(group.id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single group by id.
    pub fn get_group(&self, id: GroupId) -> Result<Group> {
        self.conn()
            .query_row(
                "SELECT id, name, leader_id, status, serialized, created_at
                 FROM groups
                 WHERE id = ?1",
                params![id.to_hex()],
                row_to_group,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Whether a group with this id is already persisted.
    ///
    /// Group admission uses this for its idempotency check against duplicate
    /// invitation delivery.
    pub fn group_exists(&self, id: GroupId) -> Result<bool> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM groups WHERE id = ?1",
            params![id.to_hex()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// List all groups, ordered by creation date descending.
    pub fn list_groups(&self) -> Result<Vec<Group>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, leader_id, status, serialized, created_at
             FROM groups
             ORDER BY created_at DESC",
        )?;

        let rows = stmt.query_map([], row_to_group)?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Move a group between `pending` and `participating`.
    pub fn update_group_status(&self, id: GroupId, status: GroupStatus) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE groups SET status = ?2 WHERE id = ?1",
            params![id.to_hex(), status.as_str()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }

        self.emit(StoreEvent::GroupSaved(id));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a group by id, its membership rows (FK cascade) and its
    /// messages.  Returns `true` if a row was deleted.
    pub fn delete_group(&self, id: GroupId) -> Result<bool> {
        self.delete_group_messages(id)?;

        let affected = self
            .conn()
            .execute("DELETE FROM groups WHERE id = ?1", params![id.to_hex()])?;

        if affected > 0 {
            self.emit(StoreEvent::GroupDeleted(id));
        }
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Group`].
fn row_to_group(row: &rusqlite::Row<'_>) -> rusqlite::Result<Group> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let leader_str: String = row.get(2)?;
    let status_str: String = row.get(3)?;
    let serialized: Vec<u8> = row.get(4)?;
    let created_str: String = row.get(5)?;

    let id = GroupId::from_hex(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let leader_id = ContactId::from_hex(&leader_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status = GroupStatus::from_str(&status_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Group {
        id,
        name,
        leader_id,
        status,
        serialized,
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

    fn sample_group(id: u8) -> Group {
        Group {
            id: GroupId([id; 32]),
            name: "book club".to_string(),
            leader_id: ContactId([1u8; 32]),
            status: GroupStatus::Pending,
            serialized: vec![0xDE, 0xAD],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn insert_and_get_round_trip() {
        let (_dir, db) = open_db();

        let group = sample_group(7);
        db.insert_group(&group).unwrap();

        let loaded = db.get_group(group.id).unwrap();
        assert_eq!(loaded.name, "book club");
        assert_eq!(loaded.status, GroupStatus::Pending);
        assert_eq!(loaded.serialized, vec![0xDE, 0xAD]);
    }

    #[test]
    fn group_exists_reflects_inserts() {
        let (_dir, db) = open_db();

        let group = sample_group(8);
        assert!(!db.group_exists(group.id).unwrap());
        db.insert_group(&group).unwrap();
        assert!(db.group_exists(group.id).unwrap());
    }

    #[test]
    fn status_update_round_trip() {
        let (_dir, db) = open_db();

        let group = sample_group(9);
        db.insert_group(&group).unwrap();
        db.update_group_status(group.id, GroupStatus::Participating)
            .unwrap();

        assert_eq!(
            db.get_group(group.id).unwrap().status,
            GroupStatus::Participating
        );
    }

    #[test]
    fn delete_cascades_members() {
        let (_dir, db) = open_db();

        let group = sample_group(10);
        db.insert_group(&group).unwrap();
        db.insert_group_member(group.id, ContactId([2u8; 32]))
            .unwrap();

        assert!(db.delete_group(group.id).unwrap());
        assert!(db.list_member_ids(group.id).unwrap().is_empty());
        assert!(matches!(db.get_group(group.id), Err(StoreError::NotFound)));
    }
}
