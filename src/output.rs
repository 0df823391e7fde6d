use serde::Serialize;

use crate::contacts::ContactRepository;
use crate::model::{progress_percent, Contact, Status, Task};
use crate::summary::Summary;

#[derive(Serialize)]
pub struct TaskView<'a> {
    pub id: Option<&'a str>,
    pub status: &'a str,
    #[serde(flatten)]
    pub task: &'a Task,
}

impl<'a> TaskView<'a> {
    pub fn new(status: Status, task: &'a Task) -> Self {
        Self {
            id: task.id.as_deref(),
            status: status.collection(),
            task,
        }
    }
}

#[derive(Serialize)]
pub struct ContactView<'a> {
    pub id: Option<&'a str>,
    #[serde(flatten)]
    pub contact: &'a Contact,
}

impl<'a> From<&'a Contact> for ContactView<'a> {
    fn from(contact: &'a Contact) -> Self {
        Self {
            id: contact.id.as_deref(),
            contact,
        }
    }
}

fn short_id(task: &Task) -> &str {
    task.id.as_deref().unwrap_or("-")
}

fn assignee_names(task: &Task, contacts: &[Contact]) -> Vec<String> {
    task.assigned_to
        .iter()
        .map(|id| {
            contacts
                .iter()
                .find(|c| c.id.as_deref() == Some(id.as_str()))
                .map(|c| c.name.clone())
                .unwrap_or_else(|| format!("<{id}>"))
        })
        .collect()
}

fn card_line(task: &Task) -> String {
    let progress = if task.subtasks.is_empty() {
        String::new()
    } else {
        format!(
            " [{}/{} {:.0}%]",
            task.completed_subtasks(),
            task.subtasks.len(),
            progress_percent(&task.subtasks)
        )
    };
    format!(
        "  {} {}  {} ({}, due {}){}\n",
        task.prio.icon(),
        short_id(task),
        task.title,
        task.category,
        task.date,
        progress
    )
}

/// One section per column, cards in list order.
pub fn format_board<'a>(columns: impl IntoIterator<Item = (Status, &'a [Task])>) -> String {
    let mut out = String::new();
    for (status, list) in columns {
        out.push_str(&format!("{} ({})\n", status.title(), list.len()));
        if list.is_empty() {
            out.push_str("  (no tasks)\n");
        }
        for task in list {
            out.push_str(&card_line(task));
        }
    }
    out
}

pub fn format_task_detail(status: Status, task: &Task, contacts: &[Contact]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:          {}\n", short_id(task)));
    out.push_str(&format!("Title:       {}\n", task.title));
    out.push_str(&format!("Status:      {}\n", status.title()));
    out.push_str(&format!("Category:    {}\n", task.category));
    out.push_str(&format!("Priority:    {}\n", task.prio));
    out.push_str(&format!("Due:         {}\n", task.date));
    if !task.description.is_empty() {
        out.push_str(&format!("Description: {}\n", task.description));
    }
    let names = assignee_names(task, contacts);
    if !names.is_empty() {
        out.push_str(&format!("Assigned to: {}\n", names.join(", ")));
    }
    if !task.subtasks.is_empty() {
        out.push_str(&format!(
            "\nSubtasks ({:.0}% done):\n",
            progress_percent(&task.subtasks)
        ));
        for (i, s) in task.subtasks.iter().enumerate() {
            let mark = if s.is_completed { "x" } else { " " };
            out.push_str(&format!("  {i}. [{mark}] {}\n", s.text));
        }
    }
    out
}

/// Contact book grouped by first letter, with each contact's badge color.
pub fn format_contacts(contacts: &ContactRepository) -> String {
    let mut out = String::new();
    for group in contacts.group_by_first_letter() {
        out.push_str(&format!("{}\n", group.letter));
        for c in &group.contacts {
            out.push_str(&format!(
                "  [{} {}] {}  {}  {}  ({})\n",
                c.initials,
                contacts.badge(c),
                c.name,
                c.email,
                c.phone,
                c.id.as_deref().unwrap_or("-")
            ));
        }
    }
    out
}

pub fn format_summary(summary: &Summary) -> String {
    let deadline = summary
        .upcoming_deadline
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|| "none".to_string());
    format!(
        "To do:            {}\n\
         In progress:      {}\n\
         Awaiting feedback: {}\n\
         Done:             {}\n\
         Tasks in board:   {}\n\
         Urgent:           {}\n\
         Upcoming deadline: {}\n",
        summary.todo,
        summary.in_progress,
        summary.feedback,
        summary.done,
        summary.total,
        summary.urgent,
        deadline
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, Subtask, TaskKind};

    fn make_task(id: Option<&str>, title: &str) -> Task {
        Task {
            id: id.map(|s| s.to_string()),
            title: title.into(),
            description: "desc".into(),
            assigned_to: vec!["c1".into(), "c9".into()],
            date: "2030-01-02".into(),
            prio: Priority::Urgent,
            category: TaskKind::UserStory,
            subtasks: vec![
                Subtask {
                    text: "a".into(),
                    is_completed: true,
                },
                Subtask::new("b"),
            ],
        }
    }

    #[test]
    fn board_lists_every_column() {
        let todo = vec![make_task(Some("t1"), "Write docs")];
        let empty: Vec<Task> = vec![];
        let out = format_board([
            (Status::Todo, todo.as_slice()),
            (Status::Done, empty.as_slice()),
        ]);
        assert!(out.contains("To do (1)"));
        assert!(out.contains("! t1  Write docs (User Story, due 2030-01-02) [1/2 50%]"));
        assert!(out.contains("Done (0)\n  (no tasks)"));
    }

    #[test]
    fn detail_resolves_assignees() {
        let contacts = vec![Contact {
            id: Some("c1".into()),
            name: "Anton Mayer".into(),
            email: String::new(),
            phone: String::new(),
            bg_color: String::new(),
            initials: "AM".into(),
        }];
        let out = format_task_detail(Status::Feedback, &make_task(None, "x"), &contacts);
        assert!(out.contains("Status:      Await feedback"));
        assert!(out.contains("Assigned to: Anton Mayer, <c9>"));
        assert!(out.contains("  0. [x] a"));
        assert!(out.contains("  1. [ ] b"));
    }

    #[test]
    fn contacts_grouped_with_badges() {
        use std::sync::Arc;

        use crate::memory::MemoryStore;
        use crate::store::{DocumentStore, CONTACTS};

        let store = Arc::new(MemoryStore::new());
        let mut contacts = ContactRepository::new(store.clone());
        contacts.subscribe().unwrap();
        store
            .insert(
                CONTACTS,
                serde_json::json!({"name": "Anja Schulz", "email": "a@s.de", "initials": "AS", "bgColor": "#FF7A00"}),
            )
            .unwrap();
        store
            .insert(
                CONTACTS,
                serde_json::json!({"name": "Benedikt Ziegler", "email": "b@z.de", "initials": "BZ"}),
            )
            .unwrap();
        contacts.sync();

        let out = format_contacts(&contacts);
        assert!(out.starts_with("A\n  [AS #FF7A00] Anja Schulz  a@s.de"));
        let fallback = crate::contacts::badge_color(1);
        assert!(out.contains(&format!("B\n  [BZ {fallback}] Benedikt Ziegler  b@z.de")));
    }

    #[test]
    fn task_view_json_includes_id_and_status() {
        let task = make_task(Some("t1"), "x");
        let value = serde_json::to_value(TaskView::new(Status::Done, &task)).unwrap();
        assert_eq!(value["id"], "t1");
        assert_eq!(value["status"], "done");
        assert_eq!(value["prio"], "Urgent");
    }
}
