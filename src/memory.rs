use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use serde_json::Value;

use crate::store::{merge_fields, Document, DocumentStore, Listeners, StoreOp, Subscription, SubscriptionId};

#[derive(Default)]
struct Inner {
    collections: HashMap<String, Vec<Document>>,
    next_id: u64,
    listeners: Listeners,
    failures: Vec<(StoreOp, String)>,
}

impl Inner {
    /// Consumes a pending injected failure for `op` on `collection`, if any.
    fn take_failure(&mut self, op: StoreOp, collection: &str) -> bool {
        match self
            .failures
            .iter()
            .position(|(o, c)| *o == op && c == collection)
        {
            Some(pos) => {
                self.failures.remove(pos);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.collections.get(collection).cloned().unwrap_or_default()
    }

    fn publish(&mut self, collection: &str) {
        let snapshot = self.snapshot(collection);
        self.listeners.publish(collection, &snapshot);
    }
}

/// In-process document store. Ids are assigned sequentially (`doc-1`,
/// `doc-2`, ...). Failures can be injected per operation and collection.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Make the next `op` against `collection` fail once.
    pub fn fail_next(&self, op: StoreOp, collection: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.failures.push((op, collection.to_string()));
        }
    }

    /// Current contents of a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .lock()
            .map(|inner| inner.snapshot(collection))
            .unwrap_or_default()
    }
}

impl DocumentStore for MemoryStore {
    fn subscribe(&self, collection: &str) -> Result<Subscription> {
        let mut inner = self.lock()?;
        let snapshot = inner.snapshot(collection);
        Ok(inner.listeners.register(collection, snapshot))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.listeners.remove(id);
        }
    }

    fn insert(&self, collection: &str, data: Value) -> Result<String> {
        let mut inner = self.lock()?;
        if inner.take_failure(StoreOp::Insert, collection) {
            bail!("insert into '{collection}' rejected");
        }
        inner.next_id += 1;
        let id = format!("doc-{}", inner.next_id);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                data,
            });
        inner.publish(collection);
        Ok(id)
    }

    fn update(&self, collection: &str, id: &str, data: Value) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.take_failure(StoreOp::Update, collection) {
            bail!("update of '{id}' in '{collection}' rejected");
        }
        let doc = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id));
        match doc {
            Some(doc) => merge_fields(&mut doc.data, data),
            None => bail!("document '{id}' not found in '{collection}'"),
        }
        inner.publish(collection);
        Ok(())
    }

    fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let mut inner = self.lock()?;
        if inner.take_failure(StoreOp::Delete, collection) {
            bail!("delete of '{id}' in '{collection}' rejected");
        }
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        inner.publish(collection);
        Ok(())
    }
}
