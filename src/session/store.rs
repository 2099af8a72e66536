// Token persistence
// A single access token stored under a well-known key in a local SQLite table

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// Well-known key the access token is stored under
const TOKEN_KEY: &str = "accessToken";

/// Persistent store for the current access token.
///
/// At most one token exists at a time; `save` fully overwrites any prior
/// value. No validation happens at write time - validity is the session
/// oracle's concern. The backing file survives process restarts and is
/// scoped to one local profile directory.
pub struct TokenStore {
    conn: Mutex<Connection>,
}

impl TokenStore {
    /// Open (creating if needed) the token database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open token database: {}", path.display()))?;
        Self::init(conn)
    }

    /// In-memory store for tests - nothing touches the filesystem.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .context("Failed to initialize token table")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Persist the access token, overwriting any prior value.
    pub fn save(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO auth_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![TOKEN_KEY, token],
        )
        .context("Failed to save access token")?;
        Ok(())
    }

    /// Current access token, if one is stored.
    pub fn read(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM auth_kv WHERE key = ?1",
            [TOKEN_KEY],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to read access token")
    }

    /// Remove the stored token.
    pub fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM auth_kv WHERE key = ?1", [TOKEN_KEY])
            .context("Failed to clear access token")?;
        Ok(())
    }
}
