use std::borrow::Cow;

use log::debug;

use crate::model::{Status, Task};
use crate::tasks::{MoveOutcome, TaskRepository};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Same column: local reorder only.
    Reordered,
    /// Different columns: the result of the store move.
    Moved(MoveOutcome),
    /// The source index did not point at a card.
    Ignored,
}

/// Entries of `list` whose title or description contains `term`
/// (case-sensitive). A blank term borrows the list unchanged.
pub fn filter_by_text<'a>(list: &'a [Task], term: &str) -> Cow<'a, [Task]> {
    if term.trim().is_empty() {
        return Cow::Borrowed(list);
    }
    Cow::Owned(list.iter().filter(|t| t.matches(term)).cloned().collect())
}

/// True if any card in any column matches `term`. Recomputed on every call.
pub fn has_any_match(tasks: &TaskRepository, term: &str) -> bool {
    if term.trim().is_empty() {
        return tasks.lists().any(|(_, list)| !list.is_empty());
    }
    tasks
        .lists()
        .flat_map(|(_, list)| list.iter())
        .any(|t| t.matches(term))
}

/// Board view state: search, the card opened in the detail overlay, and the
/// column the add-task form was opened from.
#[derive(Debug, Clone)]
pub struct BoardController {
    search_text: String,
    search_term: String,
    selected_task: Option<String>,
    add_target: Status,
}

impl Default for BoardController {
    fn default() -> Self {
        Self {
            search_text: String::new(),
            search_term: String::new(),
            selected_task: None,
            add_target: Status::Todo,
        }
    }
}

impl BoardController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a card dropped from `from[from_index]` onto `to` at `to_index`.
    pub fn on_drop(
        &self,
        tasks: &mut TaskRepository,
        from: Status,
        to: Status,
        from_index: usize,
        to_index: usize,
    ) -> DropOutcome {
        if from == to {
            tasks.reorder_within(from, from_index, to_index);
            return DropOutcome::Reordered;
        }
        let Some(task) = tasks.list(from).get(from_index).cloned() else {
            debug!("drop from empty slot {from_index} in '{from}'");
            return DropOutcome::Ignored;
        };
        // Cross-column position is decided by store order on the next snapshot.
        DropOutcome::Moved(tasks.move_task(&task, from, to))
    }

    /// Text typed into the search box; not applied until `start_search`.
    pub fn set_search_text(&mut self, text: &str) {
        self.search_text = text.to_string();
    }

    pub fn start_search(&mut self) {
        self.search_term = self.search_text.clone();
    }

    pub fn clear_search(&mut self) {
        self.search_text.clear();
        self.search_term.clear();
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// A column's cards under the active search term.
    pub fn visible<'a>(&self, tasks: &'a TaskRepository, status: Status) -> Cow<'a, [Task]> {
        filter_by_text(tasks.list(status), &self.search_term)
    }

    /// True when a search is active and nothing on the board matches it.
    pub fn no_results(&self, tasks: &TaskRepository) -> bool {
        !self.search_term.trim().is_empty() && !has_any_match(tasks, &self.search_term)
    }

    pub fn open_task(&mut self, id: &str) {
        self.selected_task = Some(id.to_string());
    }

    pub fn close_task(&mut self) {
        self.selected_task = None;
    }

    /// The card shown in the overlay, if it still exists.
    pub fn selected_task<'a>(&self, tasks: &'a TaskRepository) -> Option<(Status, &'a Task)> {
        self.selected_task.as_deref().and_then(|id| tasks.find(id))
    }

    /// Remember which column's "+" opened the add-task form.
    pub fn open_add_form(&mut self, status: Status) {
        self.add_target = status;
    }

    pub fn add_target(&self) -> Status {
        self.add_target
    }
}
