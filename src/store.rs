//! Document store contract consumed by the repositories.
//!
//! A store holds named collections of JSON documents. Writes are plain
//! request/response calls; reads happen through live subscriptions that push
//! the whole collection after every change.

use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::Result;
use serde_json::Value;

pub const TODO: &str = "todo";
pub const IN_PROGRESS: &str = "inprogress";
pub const FEEDBACK: &str = "feedback";
pub const DONE: &str = "done";
pub const CONTACTS: &str = "contacts";

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Insert,
    Update,
    Delete,
}

pub trait DocumentStore: Send + Sync {
    /// Start a live subscription. The current snapshot is delivered right
    /// away, then a fresh one after every write to `collection`.
    fn subscribe(&self, collection: &str) -> Result<Subscription>;

    /// Release a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);

    /// Insert a new document and return the id the store assigned to it.
    fn insert(&self, collection: &str, data: Value) -> Result<String>;

    /// Merge the top-level fields of `data` into an existing document.
    fn update(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    /// Remove a document. Removing an id that does not exist succeeds.
    fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// Receiving end of a live subscription.
pub struct Subscription {
    id: SubscriptionId,
    collection: String,
    rx: Receiver<Vec<Document>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Drains pending snapshots and returns only the most recent one.
    pub fn latest(&self) -> Option<Vec<Document>> {
        let mut last = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            last = Some(snapshot);
        }
        last
    }
}

struct Listener {
    id: SubscriptionId,
    collection: String,
    tx: Sender<Vec<Document>>,
}

/// Subscriber bookkeeping shared by the store backends.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<Listener>,
}

impl Listeners {
    pub(crate) fn register(&mut self, collection: &str, snapshot: Vec<Document>) -> Subscription {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        let (tx, rx) = mpsc::channel();
        // Receiver is alive, the send cannot fail.
        let _ = tx.send(snapshot);
        self.entries.push(Listener {
            id,
            collection: collection.to_string(),
            tx,
        });
        Subscription {
            id,
            collection: collection.to_string(),
            rx,
        }
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) {
        self.entries.retain(|l| l.id != id);
    }

    pub(crate) fn is_watched(&self, collection: &str) -> bool {
        self.entries.iter().any(|l| l.collection == collection)
    }

    pub(crate) fn collections(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for l in &self.entries {
            if !out.contains(&l.collection) {
                out.push(l.collection.clone());
            }
        }
        out
    }

    /// Push a snapshot to every subscriber of `collection`, dropping any
    /// whose receiver has gone away.
    pub(crate) fn publish(&mut self, collection: &str, snapshot: &[Document]) {
        self.entries
            .retain(|l| l.collection != collection || l.tx.send(snapshot.to_vec()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Shallow merge of `patch` into `target`; non-object patches replace the
/// whole value.
pub(crate) fn merge_fields(target: &mut Value, patch: Value) {
    match (target.as_object_mut(), patch) {
        (Some(fields), Value::Object(patch)) => {
            for (k, v) in patch {
                fields.insert(k, v);
            }
        }
        (_, patch) => *target = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            data: json!({}),
        }
    }

    #[test]
    fn register_delivers_initial_snapshot() {
        let mut listeners = Listeners::default();
        let sub = listeners.register("todo", vec![doc("a")]);
        assert_eq!(sub.collection(), "todo");
        assert_eq!(sub.latest().unwrap().len(), 1);
        assert!(sub.latest().is_none());
    }

    #[test]
    fn latest_keeps_only_newest_snapshot() {
        let mut listeners = Listeners::default();
        let sub = listeners.register("todo", vec![]);
        listeners.publish("todo", &[doc("a")]);
        listeners.publish("todo", &[doc("a"), doc("b")]);
        listeners.publish("done", &[doc("z")]);
        assert_eq!(sub.latest().unwrap().len(), 2);
    }

    #[test]
    fn publish_prunes_dropped_receivers() {
        let mut listeners = Listeners::default();
        let sub = listeners.register("todo", vec![]);
        let _keep = listeners.register("done", vec![]);
        drop(sub);
        listeners.publish("todo", &[]);
        assert_eq!(listeners.len(), 1);
        assert!(!listeners.is_watched("todo"));
        assert_eq!(listeners.collections(), vec!["done".to_string()]);
    }

    #[test]
    fn merge_overwrites_only_given_fields() {
        let mut target = json!({"name": "Anna", "email": "a@x.de"});
        merge_fields(&mut target, json!({"email": "b@x.de"}));
        assert_eq!(target, json!({"name": "Anna", "email": "b@x.de"}));
    }
}
