//! Sqlite store backend.
//!
//! Durable counterpart of [`MemoryStore`](super::MemoryStore): named caches
//! and the deferred-action table live in one sqlite database that survives
//! process restarts. Database work runs on tokio-rusqlite's background
//! thread; WAL mode keeps concurrent readers cheap.
//!
//! Insertion order is tracked with an `AUTOINCREMENT` sequence column; an
//! overwrite deletes and re-inserts inside one transaction, so a refreshed
//! entry moves to the back of the FIFO order, matching the in-memory
//! backend.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_rusqlite::rusqlite::OptionalExtension;
use tokio_rusqlite::{Connection, params};

use super::{ActionStore, CacheStore};
use crate::error::FafnirError;
use crate::types::{DeferredAction, StoredResponse};
use crate::Result;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS caches (
        name TEXT PRIMARY KEY
    );
    CREATE TABLE IF NOT EXISTS entries (
        seq         INTEGER PRIMARY KEY AUTOINCREMENT,
        cache_name  TEXT NOT NULL,
        request_key TEXT NOT NULL,
        status      INTEGER NOT NULL,
        headers     TEXT NOT NULL,
        body        BLOB NOT NULL,
        captured_at TEXT NOT NULL,
        UNIQUE (cache_name, request_key)
    );
    CREATE TABLE IF NOT EXISTS deferred_actions (
        tag        TEXT PRIMARY KEY,
        payload    TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
";

/// Sqlite-backed [`CacheStore`] + [`ActionStore`].
#[derive(Clone)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FafnirError::Storage(e.to_string()))?;
        }
        let conn = Connection::open(path.to_path_buf()).await?;
        Self::init(conn).await
    }

    /// Open an in-memory database (used in tests).
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    /// Default on-disk location: `{cache_dir}/fafnir/store.db`.
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("fafnir")
            .join("store.db")
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| -> std::result::Result<(), tokio_rusqlite::rusqlite::Error> {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;",
            )?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FafnirError::Storage(format!("bad timestamp in store: {e}")))
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn open(&self, cache: &str) -> Result<()> {
        let cache = cache.to_owned();
        self.conn
            .call(move |conn| -> std::result::Result<(), tokio_rusqlite::rusqlite::Error> {
                conn.execute("INSERT OR IGNORE INTO caches (name) VALUES (?1)", params![cache])?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get(&self, cache: &str, key: &str) -> Result<Option<StoredResponse>> {
        let cache = cache.to_owned();
        let key = key.to_owned();
        let row = self
            .conn
            .call(
                move |conn| -> std::result::Result<Option<(u16, String, Vec<u8>, String)>, tokio_rusqlite::rusqlite::Error> {
                    let row = conn
                        .query_row(
                            "SELECT status, headers, body, captured_at FROM entries
                             WHERE cache_name = ?1 AND request_key = ?2",
                            params![cache, key],
                            |row| {
                                Ok((
                                    row.get::<_, i64>(0)? as u16,
                                    row.get(1)?,
                                    row.get(2)?,
                                    row.get(3)?,
                                ))
                            },
                        )
                        .optional()?;
                    Ok(row)
                },
            )
            .await?;

        match row {
            None => Ok(None),
            Some((status, headers, body, captured_at)) => Ok(Some(StoredResponse {
                status,
                headers: serde_json::from_str(&headers)?,
                body,
                captured_at: parse_timestamp(&captured_at)?,
            })),
        }
    }

    async fn put(&self, cache: &str, key: &str, response: StoredResponse) -> Result<()> {
        let cache = cache.to_owned();
        let key = key.to_owned();
        let headers = serde_json::to_string(&response.headers)?;
        let captured_at = response.captured_at.to_rfc3339();
        let StoredResponse { status, body, .. } = response;

        self.conn
            .call(move |conn| -> std::result::Result<(), tokio_rusqlite::rusqlite::Error> {
                let tx = conn.transaction()?;
                tx.execute("INSERT OR IGNORE INTO caches (name) VALUES (?1)", params![cache])?;
                // Delete-then-insert so an overwrite takes a fresh sequence
                // number (re-insertion refreshes FIFO position).
                tx.execute(
                    "DELETE FROM entries WHERE cache_name = ?1 AND request_key = ?2",
                    params![cache, key],
                )?;
                tx.execute(
                    "INSERT INTO entries (cache_name, request_key, status, headers, body, captured_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![cache, key, i64::from(status), headers, body, captured_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn delete(&self, cache: &str, key: &str) -> Result<bool> {
        let cache = cache.to_owned();
        let key = key.to_owned();
        let deleted = self
            .conn
            .call(move |conn| -> std::result::Result<usize, tokio_rusqlite::rusqlite::Error> {
                Ok(conn.execute(
                    "DELETE FROM entries WHERE cache_name = ?1 AND request_key = ?2",
                    params![cache, key],
                )?)
            })
            .await?;
        Ok(deleted > 0)
    }

    async fn keys(&self, cache: &str) -> Result<Vec<String>> {
        let cache = cache.to_owned();
        let keys = self
            .conn
            .call(move |conn| -> std::result::Result<Vec<String>, tokio_rusqlite::rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT request_key FROM entries WHERE cache_name = ?1 ORDER BY seq ASC",
                )?;
                let keys = stmt
                    .query_map(params![cache], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await?;
        Ok(keys)
    }

    async fn delete_cache(&self, cache: &str) -> Result<bool> {
        let cache = cache.to_owned();
        let existed = self
            .conn
            .call(move |conn| -> std::result::Result<bool, tokio_rusqlite::rusqlite::Error> {
                let tx = conn.transaction()?;
                let entries =
                    tx.execute("DELETE FROM entries WHERE cache_name = ?1", params![cache])?;
                let names = tx.execute("DELETE FROM caches WHERE name = ?1", params![cache])?;
                tx.commit()?;
                Ok(entries > 0 || names > 0)
            })
            .await?;
        Ok(existed)
    }

    async fn cache_names(&self) -> Result<Vec<String>> {
        let names = self
            .conn
            .call(|conn| -> std::result::Result<Vec<String>, tokio_rusqlite::rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<std::result::Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await?;
        Ok(names)
    }
}

#[async_trait]
impl ActionStore for SqliteStore {
    async fn put_action(&self, action: DeferredAction) -> Result<()> {
        let payload = serde_json::to_string(&action.payload)?;
        let created_at = action.created_at.to_rfc3339();
        let tag = action.tag;
        self.conn
            .call(move |conn| -> std::result::Result<(), tokio_rusqlite::rusqlite::Error> {
                conn.execute(
                    "INSERT INTO deferred_actions (tag, payload, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT (tag) DO UPDATE SET payload = ?2, created_at = ?3",
                    params![tag, payload, created_at],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn get_action(&self, tag: &str) -> Result<Option<DeferredAction>> {
        let tag_owned = tag.to_owned();
        let row = self
            .conn
            .call(move |conn| -> std::result::Result<Option<(String, String)>, tokio_rusqlite::rusqlite::Error> {
                let row = conn
                    .query_row(
                        "SELECT payload, created_at FROM deferred_actions WHERE tag = ?1",
                        params![tag_owned],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                Ok(row)
            })
            .await?;

        match row {
            None => Ok(None),
            Some((payload, created_at)) => Ok(Some(DeferredAction {
                tag: tag.to_owned(),
                payload: serde_json::from_str(&payload)?,
                created_at: parse_timestamp(&created_at)?,
            })),
        }
    }

    async fn delete_action(&self, tag: &str) -> Result<bool> {
        let tag = tag.to_owned();
        let deleted = self
            .conn
            .call(move |conn| -> std::result::Result<usize, tokio_rusqlite::rusqlite::Error> {
                Ok(conn.execute("DELETE FROM deferred_actions WHERE tag = ?1", params![tag])?)
            })
            .await?;
        Ok(deleted > 0)
    }

    async fn list_actions(&self) -> Result<Vec<DeferredAction>> {
        let rows = self
            .conn
            .call(|conn| -> std::result::Result<Vec<(String, String, String)>, tokio_rusqlite::rusqlite::Error> {
                let mut stmt =
                    conn.prepare("SELECT tag, payload, created_at FROM deferred_actions")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        let mut actions = Vec::with_capacity(rows.len());
        for (tag, payload, created_at) in rows {
            actions.push(DeferredAction {
                tag,
                payload: serde_json::from_str(&payload)?,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        actions.sort_by_key(|a| a.created_at);
        Ok(actions)
    }
}
