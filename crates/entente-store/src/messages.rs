//! CRUD operations for [`Message`] records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use entente_shared::types::{ContactId, GroupId, MessageStatus};

use crate::database::Database;
use crate::error::Result;
use crate::events::StoreEvent;
use crate::models::Message;

impl Database {
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, sender_id, recipient_id, group_id, date, status,
                                   is_unread, text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id.to_string(),
                message.sender_id.to_hex(),
                message.recipient_id.map(|id| id.to_hex()),
                message.group_id.map(|id| id.to_hex()),
                message.date.to_rfc3339(),
                message.status.as_str(),
                message.is_unread,
                message.text,
            ],
        )?;

        self.emit(StoreEvent::MessageSaved(message.id));
        Ok(())
    }

    /// Messages of one group, newest first.
    pub fn list_group_messages(&self, group_id: GroupId) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender_id, recipient_id, group_id, date, status, is_unread, text
             FROM messages
             WHERE group_id = ?1
             ORDER BY date DESC",
        )?;

        let rows = stmt.query_map(params![group_id.to_hex()], row_to_message)?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Delete all messages of one group.  Returns the number of rows removed.
    pub fn delete_group_messages(&self, group_id: GroupId) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM messages WHERE group_id = ?1",
            params![group_id.to_hex()],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let recipient_str: Option<String> = row.get(2)?;
    let group_str: Option<String> = row.get(3)?;
    let date_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let is_unread: bool = row.get(6)?;
    let text: String = row.get(7)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let sender_id = ContactId::from_hex(&sender_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let recipient_id = recipient_str
        .map(|s| ContactId::from_hex(&s))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let group_id = group_str
        .map(|s| GroupId::from_hex(&s))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let date: DateTime<Utc> = DateTime::parse_from_rfc3339(&date_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let status = MessageStatus::from_str(&status_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, e.into())
    })?;

    Ok(Message {
        id,
        sender_id,
        recipient_id,
        group_id,
        date,
        status,
        is_unread,
        text,
    })
}
