//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `contacts`, `groups`, `group_members`,
//! and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Contacts
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS contacts (
    id         TEXT PRIMARY KEY NOT NULL,   -- hex-encoded 32-byte Ed25519 pubkey
    marshaled  BLOB NOT NULL,               -- opaque identity envelope
    username   TEXT NOT NULL,
    email      TEXT,
    phone      TEXT,
    nickname   TEXT,
    photo      BLOB,
    photo_hash TEXT,
    status     TEXT NOT NULL,               -- AuthStatus
    is_recent  INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    is_blocked INTEGER NOT NULL DEFAULT 0,
    is_banned  INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL                -- ISO-8601 / RFC-3339
);

CREATE INDEX IF NOT EXISTS idx_contacts_status ON contacts(status);

-- ----------------------------------------------------------------
-- Groups
-- ----------------------------------------------------------------
-- leader_id is intentionally not a foreign key: contacts may be deleted
-- (explicit rejection) while the group record survives.
CREATE TABLE IF NOT EXISTS groups (
    id         TEXT PRIMARY KEY NOT NULL,   -- hex-encoded protocol group id
    name       TEXT NOT NULL,
    leader_id  TEXT NOT NULL,               -- hex-encoded contact id
    status     TEXT NOT NULL,               -- GroupStatus
    serialized BLOB NOT NULL,               -- opaque protocol handle
    created_at TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Group members
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS group_members (
    group_id   TEXT NOT NULL,               -- FK -> groups(id)
    contact_id TEXT NOT NULL,               -- hex-encoded contact id

    PRIMARY KEY (group_id, contact_id),
    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_group_members_contact ON group_members(contact_id);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id           TEXT PRIMARY KEY NOT NULL, -- UUID v4
    sender_id    TEXT NOT NULL,             -- hex-encoded contact id
    recipient_id TEXT,                      -- direct messages
    group_id     TEXT,                      -- group messages
    date         TEXT NOT NULL,             -- ISO-8601
    status       TEXT NOT NULL,             -- MessageStatus
    is_unread    INTEGER NOT NULL DEFAULT 1,
    text         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_group_date
    ON messages(group_id, date DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
