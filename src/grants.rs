//! Persisted folder grants.
//!
//! A grant is the user's explicit "yes, read this folder" and survives across
//! sessions. Listing a folder without one is refused by the front end; the
//! enumerator itself never checks.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

/// Messaging app's status cache, relative to the home directory.
pub const DEFAULT_STATUS_FOLDER: &str = "Android/media/com.whatsapp/WhatsApp/Media/.Statuses";

#[derive(Clone)]
pub struct Grants(Arc<Mutex<Connection>>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub path: String,
    pub read: bool,
    pub granted_at: String,
}

impl Grants {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        debug!("grants: {}", path.display());
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        let g = Grants(Arc::new(Mutex::new(conn)));
        g.ensure_schema()?;
        Ok(g)
    }

    pub fn open_default() -> rusqlite::Result<Self> {
        let path = default_db_path();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).ok();
        }
        Self::open(&path)
    }

    #[cfg(test)]
    pub fn open_memory() -> Self {
        let g = Grants(Arc::new(Mutex::new(Connection::open_in_memory().unwrap())));
        g.ensure_schema().unwrap();
        g
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.0.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn ensure_schema(&self) -> rusqlite::Result<()> {
        self.conn().execute_batch(
            "CREATE TABLE IF NOT EXISTS grants (
                id          INTEGER PRIMARY KEY,
                path        TEXT NOT NULL UNIQUE,
                read        INTEGER NOT NULL DEFAULT 1,
                granted_at  TEXT DEFAULT (datetime('now'))
            );",
        )
    }

    /// Persist read access to `path`. Re-granting refreshes the timestamp.
    pub fn grant(&self, path: &str) -> rusqlite::Result<()> {
        self.conn().execute(
            "INSERT INTO grants (path, read) VALUES (?1, 1)
             ON CONFLICT(path) DO UPDATE SET read = 1, granted_at = datetime('now')",
            [path],
        )?;
        info!("grants: +{}", path);
        Ok(())
    }

    /// Drop the grant. Returns whether one existed.
    pub fn revoke(&self, path: &str) -> rusqlite::Result<bool> {
        let n = self
            .conn()
            .execute("DELETE FROM grants WHERE path = ?1", [path])?;
        if n > 0 {
            info!("grants: -{}", path);
        }
        Ok(n > 0)
    }

    pub fn has_read(&self, path: &str) -> rusqlite::Result<bool> {
        let read: Option<i64> = self
            .conn()
            .query_row(
                "SELECT read FROM grants WHERE path = ?1",
                params![path],
                |r| r.get(0),
            )
            .optional()?;
        Ok(read == Some(1))
    }

    pub fn list(&self) -> rusqlite::Result<Vec<Grant>> {
        let db = self.conn();
        let mut stmt =
            db.prepare("SELECT path, read, COALESCE(granted_at, '') FROM grants ORDER BY id")?;
        let rows = stmt.query_map([], |r| {
            Ok(Grant {
                path: r.get(0)?,
                read: r.get::<_, i64>(1)? != 0,
                granted_at: r.get(2)?,
            })
        })?;
        rows.collect()
    }
}

fn default_db_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("dev", "ssv", "ssv") {
        dirs.data_dir().join("grants.db")
    } else {
        PathBuf::from("ssv-grants.db")
    }
}

/// The well-known status folder under the user's home, if a home exists.
pub fn default_status_folder() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(DEFAULT_STATUS_FOLDER))
}
