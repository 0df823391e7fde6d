//! Add/edit task form: field state, validation and submission.
//!
//! Submission checks run in a fixed order and stop at the first failure:
//! required fields, then the due date, then the priority and category labels.
//! A rejected submission only sets error flags; nothing is thrown or shown
//! beyond a debug log line.

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use log::debug;

use crate::model::{Contact, Priority, Status, Subtask, Task, TaskKind};
use crate::tasks::{TaskRepository, TaskUpdate};
use crate::validate::{is_blank, is_not_past};

/// How long the success toast stays up before the form resets.
pub const TOAST_DURATION: Duration = Duration::from_millis(2000);

pub const DEFAULT_PRIORITY: &str = "Medium";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: bool,
    pub date: bool,
    pub category: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingFields,
    PastDate,
    InvalidPriority,
    InvalidCategory,
    NotEditing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Rejected(Rejection),
    Created(String),
    Updated,
    /// Validation passed but the store write failed (already logged).
    StoreFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskDraft {
    pub text: String,
    pub is_editing: bool,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtaskEditor {
    Idle,
    Editing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct EditTarget {
    id: String,
    status: Status,
}

#[derive(Debug, Clone)]
pub struct TaskForm {
    title: String,
    description: String,
    date: String,
    prio: String,
    category: String,
    selected_contacts: Vec<Contact>,
    subtasks: Vec<SubtaskDraft>,
    new_subtask: String,
    editor: SubtaskEditor,
    errors: FieldErrors,
    editing: Option<EditTarget>,
    toast_until: Option<Instant>,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            date: String::new(),
            prio: DEFAULT_PRIORITY.to_string(),
            category: String::new(),
            selected_contacts: Vec::new(),
            subtasks: Vec::new(),
            new_subtask: String::new(),
            editor: SubtaskEditor::Idle,
            errors: FieldErrors::default(),
            editing: None,
            toast_until: None,
        }
    }
}

impl TaskForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Form pre-filled from a stored task. Assignee ids that do not match a
    /// known contact are dropped; subtask completion flags are kept.
    pub fn edit(task: &Task, status: Status, contacts: &[Contact]) -> Self {
        let selected_contacts = contacts
            .iter()
            .filter(|c| {
                c.id
                    .as_ref()
                    .is_some_and(|id| task.assigned_to.contains(id))
            })
            .cloned()
            .collect();
        let subtasks = task
            .subtasks
            .iter()
            .map(|s| SubtaskDraft {
                text: s.text.clone(),
                is_editing: false,
                is_completed: s.is_completed,
            })
            .collect();
        Self {
            title: task.title.clone(),
            description: task.description.clone(),
            date: task.date.clone(),
            prio: task.prio.as_str().to_string(),
            category: task.category.as_str().to_string(),
            selected_contacts,
            subtasks,
            editing: task.id.clone().map(|id| EditTarget { id, status }),
            ..Self::default()
        }
    }

    pub fn is_edit_mode(&self) -> bool {
        self.editing.is_some()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn priority(&self) -> &str {
        &self.prio
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn errors(&self) -> FieldErrors {
        self.errors
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.errors.title = false;
    }

    pub fn set_description(&mut self, description: &str) {
        self.description = description.to_string();
    }

    pub fn set_date(&mut self, date: &str) {
        self.date = date.to_string();
        self.errors.date = false;
    }

    pub fn set_priority(&mut self, prio: &str) {
        self.prio = prio.to_string();
    }

    /// Picking the already selected category clears it and flags the field.
    pub fn toggle_category(&mut self, category: &str) {
        if self.category == category {
            self.category.clear();
            self.errors.category = true;
        } else {
            self.category = category.to_string();
            self.errors.category = false;
        }
    }

    // Assignees are matched by email.

    pub fn is_selected(&self, contact: &Contact) -> bool {
        self.selected_contacts.iter().any(|c| c.email == contact.email)
    }

    pub fn toggle_contact(&mut self, contact: &Contact) {
        if self.is_selected(contact) {
            self.selected_contacts.retain(|c| c.email != contact.email);
        } else {
            self.selected_contacts.push(contact.clone());
        }
    }

    pub fn selected_contacts(&self) -> &[Contact] {
        &self.selected_contacts
    }

    pub fn assignee_ids(&self) -> Vec<String> {
        self.selected_contacts
            .iter()
            .filter_map(|c| c.id.clone())
            .collect()
    }

    // Subtask micro-editor: Idle -> Editing -> (saved | discarded) -> Idle.

    pub fn subtask_editor(&self) -> SubtaskEditor {
        self.editor
    }

    pub fn subtasks(&self) -> &[SubtaskDraft] {
        &self.subtasks
    }

    pub fn start_subtask(&mut self) {
        self.editor = SubtaskEditor::Editing;
    }

    pub fn set_new_subtask(&mut self, text: &str) {
        self.new_subtask = text.to_string();
    }

    pub fn cancel_subtask(&mut self) {
        self.editor = SubtaskEditor::Idle;
        self.new_subtask.clear();
    }

    /// Commit the pending subtask text if it is not blank, then go idle.
    pub fn save_subtask(&mut self) {
        if !is_blank(&self.new_subtask) {
            self.subtasks.push(SubtaskDraft {
                text: std::mem::take(&mut self.new_subtask),
                is_editing: false,
                is_completed: false,
            });
        }
        self.cancel_subtask();
    }

    /// Enter key: same as save, but only while editing non-blank text.
    pub fn handle_enter(&mut self) {
        if self.editor == SubtaskEditor::Editing && !is_blank(&self.new_subtask) {
            self.save_subtask();
        }
    }

    pub fn delete_subtask(&mut self, index: usize) {
        if index < self.subtasks.len() {
            self.subtasks.remove(index);
        }
    }

    pub fn begin_subtask_edit(&mut self, index: usize) {
        if let Some(s) = self.subtasks.get_mut(index) {
            s.is_editing = true;
        }
    }

    /// Finish editing a listed subtask. Blank text keeps the previous text.
    pub fn finish_subtask_edit(&mut self, index: usize, text: &str) {
        if let Some(s) = self.subtasks.get_mut(index) {
            if !is_blank(text) {
                s.text = text.to_string();
            }
            s.is_editing = false;
        }
    }

    /// Recompute the required-field flags.
    pub fn validate(&mut self) -> bool {
        self.errors = FieldErrors {
            title: is_blank(&self.title),
            date: is_blank(&self.date),
            category: is_blank(&self.category),
        };
        self.errors == FieldErrors::default()
    }

    fn check(&mut self, today: NaiveDate) -> Result<(Priority, TaskKind), Rejection> {
        if !self.validate() {
            return Err(Rejection::MissingFields);
        }
        if !is_not_past(&self.date, today) {
            return Err(Rejection::PastDate);
        }
        let prio = Priority::parse(&self.prio).map_err(|_| Rejection::InvalidPriority)?;
        let category = TaskKind::parse(&self.category).map_err(|_| Rejection::InvalidCategory)?;
        Ok((prio, category))
    }

    fn drafts_to_subtasks(&self) -> Vec<Subtask> {
        self.subtasks
            .iter()
            .map(|d| Subtask {
                text: d.text.clone(),
                is_completed: d.is_completed,
            })
            .collect()
    }

    /// Build the task this form describes, or the reason it cannot.
    pub fn build(&mut self, today: NaiveDate) -> Result<Task, Rejection> {
        let (prio, category) = self.check(today)?;
        Ok(Task {
            id: None,
            title: self.title.clone(),
            description: self.description.clone(),
            assigned_to: self.assignee_ids(),
            date: self.date.clone(),
            prio,
            category,
            subtasks: self.drafts_to_subtasks(),
        })
    }

    /// Validate and insert a new task into `status`.
    pub fn submit_add(&mut self, tasks: &TaskRepository, status: Status, today: NaiveDate) -> SubmitOutcome {
        let task = match self.build(today) {
            Ok(t) => t,
            Err(r) => {
                debug!("add-task form rejected: {r:?}");
                return SubmitOutcome::Rejected(r);
            }
        };
        match tasks.add_task(status, &task) {
            Some(id) => {
                self.show_toast();
                SubmitOutcome::Created(id)
            }
            None => SubmitOutcome::StoreFailed,
        }
    }

    /// Validate and write the edited task back to its current column.
    pub fn submit_update(&mut self, tasks: &TaskRepository, today: NaiveDate) -> SubmitOutcome {
        let Some(target) = self.editing.clone() else {
            return SubmitOutcome::Rejected(Rejection::NotEditing);
        };
        let task = match self.build(today) {
            Ok(t) => t,
            Err(r) => {
                debug!("edit-task form rejected: {r:?}");
                return SubmitOutcome::Rejected(r);
            }
        };
        let update = TaskUpdate {
            title: task.title,
            description: task.description,
            assigned_to: task.assigned_to,
            date: task.date,
            prio: task.prio,
            category: task.category,
            subtasks: task.subtasks,
        };
        if tasks.update_task(target.status, &target.id, update) {
            self.show_toast();
            SubmitOutcome::Updated
        } else {
            SubmitOutcome::StoreFailed
        }
    }

    fn show_toast(&mut self) {
        self.toast_until = Some(Instant::now() + TOAST_DURATION);
    }

    pub fn toast_visible(&self, now: Instant) -> bool {
        self.toast_until.is_some_and(|until| now < until)
    }

    /// Advance time. Once the toast has expired the form goes back to its
    /// defaults; returns true on that transition.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.toast_until {
            Some(until) if now >= until => {
                self.reset();
                true
            }
            _ => false,
        }
    }

    /// Back to defaults: medium priority, everything else empty.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
