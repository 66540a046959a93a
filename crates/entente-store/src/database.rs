//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.  A broadcast sender fans
//! out a [`StoreEvent`] after each successful write (the store's reactive
//! subscription surface).
//!
//! Note: SQLCipher (encrypted SQLite) requires OpenSSL at build time. For
//! environments where OpenSSL is unavailable, we fall back to plain SQLite.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::Connection;
use tokio::sync::broadcast;

use entente_shared::constants::STORE_EVENT_CAPACITY;

use crate::error::{Result, StoreError};
use crate::events::StoreEvent;
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
    events: broadcast::Sender<StoreEvent>,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/entente/entente.db`
    /// - macOS:   `~/Library/Application Support/org.entente.entente/entente.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\entente\entente\data\entente.db`
    ///
    /// # Arguments
    /// * `_db_key` -- reserved for future SQLCipher support.
    pub fn new(_db_key: &[u8; 32]) -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "entente", "entente").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("entente.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path, _db_key)
    }

    /// Open (or create) a database at an explicit path.
    ///
    /// This is useful for tests and for embedding the store inside custom
    /// directory layouts.
    pub fn open_at(path: &Path, _db_key: &[u8; 32]) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Recommended SQLite settings.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        // Run schema migrations.
        migrations::run_migrations(&conn)?;

        let (events, _) = broadcast::channel(STORE_EVENT_CAPACITY);

        Ok(Self { conn, events })
    }

    /// Subscribe to write notifications.
    ///
    /// Broadcast semantics: a lagged subscriber loses events rather than
    /// blocking writers.  Subscribers should re-query on lag.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Emit a write notification.  Dropped silently when nobody listens.
    pub(crate) fn emit(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    ///
    /// Callers should prefer the typed CRUD helpers, but direct access is
    /// occasionally needed for transactions or ad-hoc queries.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return a mutable reference to the underlying connection.
    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let key = [0xABu8; 32];

        let db = Database::open_at(&path, &key).expect("should open");
        assert!(db.path().is_some());
    }

    #[test]
    fn subscribe_sees_emitted_events() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db"), &[0u8; 32]).unwrap();

        let mut rx = db.subscribe();
        let id = entente_shared::types::ContactId([7u8; 32]);
        db.emit(StoreEvent::ContactSaved(id));

        assert_eq!(rx.try_recv().unwrap(), StoreEvent::ContactSaved(id));
    }
}
