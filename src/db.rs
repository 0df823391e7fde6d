use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use log::{error, warn};
use rand::distr::Alphanumeric;
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;

use crate::store::{merge_fields, Document, DocumentStore, Listeners, Subscription, SubscriptionId};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    seq         INTEGER PRIMARY KEY,
    collection  TEXT NOT NULL CHECK(length(collection) > 0),
    id          TEXT NOT NULL CHECK(length(id) > 0),
    data        TEXT NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now')),
    UNIQUE(collection, id)
);

CREATE INDEX IF NOT EXISTS documents_by_collection ON documents(collection, seq);
";

const ID_LEN: usize = 20;

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &str) -> Result<Connection> {
    let conn = Connection::open(path).with_context(|| format!("failed to open {path}"))?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}

fn new_document_id() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(ID_LEN)
        .map(char::from)
        .collect()
}

fn load_collection(conn: &Connection, collection: &str) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, data FROM documents WHERE collection = ?1 ORDER BY seq",
    )?;
    let rows = stmt.query_map([collection], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    let mut docs = Vec::new();
    for row in rows {
        let (id, data) = row?;
        match serde_json::from_str(&data) {
            Ok(data) => docs.push(Document { id, data }),
            Err(e) => warn!("skipping document '{id}' in '{collection}': not valid JSON: {e}"),
        }
    }
    Ok(docs)
}

/// Document store persisted in a single SQLite table.
///
/// Subscribers are notified after each write made through this handle.
/// Writes from other processes are picked up by calling [`SqliteStore::refresh`],
/// typically when the file watcher reports a change.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    listeners: Mutex<Listeners>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            listeners: Mutex::new(Listeners::default()),
        }
    }

    pub fn open(path: &str) -> Result<Self> {
        let conn = open(path)?;
        init(&conn)?;
        Ok(Self::new(conn))
    }

    pub fn open_memory() -> Result<Self> {
        Ok(Self::new(open_memory()?))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("database connection lock poisoned"))
    }

    fn listeners(&self) -> Result<MutexGuard<'_, Listeners>> {
        self.listeners
            .lock()
            .map_err(|_| anyhow!("subscriber lock poisoned"))
    }

    fn publish(&self, collection: &str) -> Result<()> {
        let mut listeners = self.listeners()?;
        if !listeners.is_watched(collection) {
            return Ok(());
        }
        let snapshot = load_collection(&*self.conn()?, collection)?;
        listeners.publish(collection, &snapshot);
        Ok(())
    }

    /// Publish after a committed write. The write stands even if the
    /// snapshot cannot be built, so the failure is only logged.
    fn publish_committed(&self, collection: &str) {
        if let Err(e) = self.publish(collection) {
            error!("error publishing '{collection}' after write: {e:#}");
        }
    }

    /// Push a fresh snapshot of every subscribed collection.
    pub fn refresh(&self) -> Result<()> {
        let collections = self.listeners()?.collections();
        for collection in collections {
            self.publish(&collection)?;
        }
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn subscribe(&self, collection: &str) -> Result<Subscription> {
        let snapshot = load_collection(&*self.conn()?, collection)?;
        Ok(self.listeners()?.register(collection, snapshot))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.remove(id);
        }
    }

    fn insert(&self, collection: &str, data: Value) -> Result<String> {
        let id = new_document_id();
        self.conn()?.execute(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
            rusqlite::params![collection, id, data.to_string()],
        )?;
        self.publish_committed(collection);
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        {
            let conn = self.conn()?;
            let current: Option<String> = conn
                .query_row(
                    "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                    [collection, id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                bail!("document '{id}' not found in '{collection}'");
            };
            let mut merged: Value = serde_json::from_str(&current)
                .with_context(|| format!("document '{id}' in '{collection}' is not valid JSON"))?;
            merge_fields(&mut merged, data);
            conn.execute(
                "UPDATE documents SET data = ?1, updated_at = strftime('%Y-%m-%dT%H:%M:%SZ', 'now') WHERE collection = ?2 AND id = ?3",
                rusqlite::params![merged.to_string(), collection, id],
            )?;
        }
        self.publish_committed(collection);
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        self.conn()?.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            [collection, id],
        )?;
        self.publish_committed(collection);
        Ok(())
    }
}
