use std::sync::Arc;

use anyhow::Result;
use log::{debug, error, info, warn};
use serde_json::{json, Value};

use crate::model::{Priority, Status, Subtask, Task, TaskKind};
use crate::store::{Document, DocumentStore, Subscription};

/// Result of relocating a task between two columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Added to the destination and removed from the source.
    Moved { id: String },
    /// Source and destination are the same column; nothing was written.
    SameColumn,
    /// The insert into the destination failed. The source is untouched.
    AddFailed,
    /// The task had no id yet, so the source copy could not be removed.
    Copied { id: String },
    /// The insert succeeded but the delete did not: the task now exists in
    /// both columns.
    Duplicated { id: String },
}

/// Replacement values for an existing task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskUpdate {
    pub title: String,
    pub description: String,
    pub assigned_to: Vec<String>,
    pub date: String,
    pub prio: Priority,
    pub category: TaskKind,
    pub subtasks: Vec<Subtask>,
}

/// The four board columns, each mirrored from its store collection.
///
/// Lists only change when [`TaskRepository::sync`] applies a pushed snapshot
/// (whole-list replacement) or through the session-local helpers
/// [`TaskRepository::reorder_within`] and [`TaskRepository::push_local`].
pub struct TaskRepository {
    store: Arc<dyn DocumentStore>,
    lists: [Vec<Task>; 4],
    subscriptions: Vec<(Status, Subscription)>,
}

fn decode(status: Status, doc: &Document) -> Option<Task> {
    match serde_json::from_value::<Task>(doc.data.clone()) {
        Ok(mut task) => {
            task.id = Some(doc.id.clone());
            Some(task)
        }
        Err(e) => {
            warn!("skipping task '{}' in '{status}': {e}", doc.id);
            None
        }
    }
}

impl TaskRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            lists: Default::default(),
            subscriptions: Vec::new(),
        }
    }

    /// Subscribe to a column's collection, replacing any earlier
    /// subscription for the same column.
    pub fn subscribe(&mut self, status: Status) -> Result<()> {
        let sub = self.store.subscribe(status.collection())?;
        if let Some(pos) = self.subscriptions.iter().position(|(s, _)| *s == status) {
            let (_, old) = self.subscriptions.remove(pos);
            self.store.unsubscribe(old.id());
        }
        self.subscriptions.push((status, sub));
        Ok(())
    }

    pub fn subscribe_all(&mut self) -> Result<()> {
        for status in Status::ALL {
            self.subscribe(status)?;
        }
        Ok(())
    }

    /// Apply pending snapshots. Each column with news is cleared and
    /// repopulated from its newest snapshot. Returns true if any list changed.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        for (status, sub) in &self.subscriptions {
            if let Some(snapshot) = sub.latest() {
                self.lists[status.index()] =
                    snapshot.iter().filter_map(|d| decode(*status, d)).collect();
                changed = true;
            }
        }
        changed
    }

    /// Release every subscription.
    pub fn close(&mut self) {
        for (_, sub) in self.subscriptions.drain(..) {
            self.store.unsubscribe(sub.id());
        }
    }

    pub fn list(&self, status: Status) -> &[Task] {
        &self.lists[status.index()]
    }

    pub fn lists(&self) -> impl Iterator<Item = (Status, &[Task])> + '_ {
        Status::ALL.into_iter().map(move |s| (s, self.list(s)))
    }

    pub fn find(&self, id: &str) -> Option<(Status, &Task)> {
        self.lists().find_map(|(status, list)| {
            list.iter()
                .find(|t| t.id.as_deref() == Some(id))
                .map(|t| (status, t))
        })
    }

    /// Insert a task into a column's collection. The id on `task` is ignored;
    /// the store assigns a new one, which shows up in the list with the next
    /// snapshot. Failures are logged and reported as `None`.
    pub fn add_task(&self, status: Status, task: &Task) -> Option<String> {
        let data = match serde_json::to_value(task) {
            Ok(v) => v,
            Err(e) => {
                error!("error encoding task '{}': {e}", task.title);
                return None;
            }
        };
        match self.store.insert(status.collection(), data) {
            Ok(id) => {
                info!("added task '{id}' to '{status}'");
                Some(id)
            }
            Err(e) => {
                error!("error adding task to '{status}': {e:#}");
                None
            }
        }
    }

    /// Remove a task document. An empty id is a no-op. Returns true if the
    /// store accepted the delete.
    pub fn delete_task(&self, status: Status, id: &str) -> bool {
        if id.is_empty() {
            return false;
        }
        match self.store.delete(status.collection(), id) {
            Ok(()) => {
                info!("deleted task '{id}' from '{status}'");
                true
            }
            Err(e) => {
                error!("error deleting task '{id}' from '{status}': {e:#}");
                false
            }
        }
    }

    /// Relocate a task: insert into `to`, then delete from `from` only if the
    /// insert succeeded. The two steps are not atomic.
    pub fn move_task(&self, task: &Task, from: Status, to: Status) -> MoveOutcome {
        if from == to {
            return MoveOutcome::SameColumn;
        }
        let Some(id) = self.add_task(to, task) else {
            return MoveOutcome::AddFailed;
        };
        match task.id.as_deref() {
            Some(old) if !old.is_empty() => {
                if self.delete_task(from, old) {
                    MoveOutcome::Moved { id }
                } else {
                    warn!("task '{old}' now exists in both '{from}' and '{to}' (as '{id}')");
                    MoveOutcome::Duplicated { id }
                }
            }
            _ => {
                debug!("moved unsaved task '{}' to '{to}'; source copy kept", task.title);
                MoveOutcome::Copied { id }
            }
        }
    }

    /// Reposition within one column. Local only: the next snapshot for the
    /// column restores store order.
    pub fn reorder_within(&mut self, status: Status, from: usize, to: usize) {
        let list = &mut self.lists[status.index()];
        if list.is_empty() {
            return;
        }
        let from = from.min(list.len() - 1);
        let to = to.min(list.len() - 1);
        if from == to {
            return;
        }
        let task = list.remove(from);
        list.insert(to, task);
    }

    /// Append a task that has not been persisted yet to a column.
    /// It disappears with the column's next snapshot.
    pub fn push_local(&mut self, status: Status, task: Task) {
        self.lists[status.index()].push(task);
    }

    /// Replace every field of a task. A blank title or date makes this a
    /// no-op; a blank description keeps the stored one. Returns true if the
    /// store accepted the write.
    pub fn update_task(&self, status: Status, id: &str, update: TaskUpdate) -> bool {
        if id.is_empty() || update.title.trim().is_empty() || update.date.trim().is_empty() {
            debug!("ignoring update of task '{id}': required field is blank");
            return false;
        }
        let mut data = json!({
            "title": update.title,
            "assignedTo": update.assigned_to,
            "date": update.date,
            "prio": update.prio,
            "category": update.category,
            "subtasks": update.subtasks,
        });
        if !update.description.trim().is_empty() {
            data["description"] = Value::String(update.description);
        }
        self.write_update(status, id, data)
    }

    /// Flip one subtask's completion flag and persist the subtask list.
    pub fn toggle_subtask(&self, status: Status, id: &str, index: usize) -> bool {
        let Some(task) = self.list(status).iter().find(|t| t.id.as_deref() == Some(id)) else {
            debug!("toggle on unknown task '{id}' in '{status}'");
            return false;
        };
        let mut subtasks = task.subtasks.clone();
        if !toggle_completed(&mut subtasks, index) {
            return false;
        }
        self.write_update(status, id, json!({ "subtasks": subtasks }))
    }

    fn write_update(&self, status: Status, id: &str, data: Value) -> bool {
        match self.store.update(status.collection(), id, data) {
            Ok(()) => {
                info!("updated task '{id}' in '{status}'");
                true
            }
            Err(e) => {
                error!("error updating task '{id}' in '{status}': {e:#}");
                false
            }
        }
    }
}

impl Drop for TaskRepository {
    fn drop(&mut self) {
        self.close();
    }
}

/// Flip the completion flag of `subtasks[index]`. Returns false when the
/// index is out of range.
pub fn toggle_completed(subtasks: &mut [Subtask], index: usize) -> bool {
    match subtasks.get_mut(index) {
        Some(s) => {
            s.is_completed = !s.is_completed;
            true
        }
        None => false,
    }
}
