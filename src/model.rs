use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::store;

/// Board column a task lives in. Not stored on the task itself: a task's
/// status is the collection its document sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Status {
    Todo,
    InProgress,
    Feedback,
    Done,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Todo,
        Status::InProgress,
        Status::Feedback,
        Status::Done,
    ];

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "todo" => Ok(Self::Todo),
            "inprogress" | "inProgress" | "in-progress" => Ok(Self::InProgress),
            "feedback" => Ok(Self::Feedback),
            "done" => Ok(Self::Done),
            _ => bail!("invalid status '{s}': must be todo, inprogress, feedback, or done"),
        }
    }

    /// Name of the store collection backing this column.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Todo => store::TODO,
            Self::InProgress => store::IN_PROGRESS,
            Self::Feedback => store::FEEDBACK,
            Self::Done => store::DONE,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Todo => "To do",
            Self::InProgress => "In progress",
            Self::Feedback => "Await feedback",
            Self::Done => "Done",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Feedback => 2,
            Self::Done => 3,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Urgent,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Urgent" => Ok(Self::Urgent),
            "Medium" => Ok(Self::Medium),
            "Low" => Ok(Self::Low),
            _ => bail!("invalid priority '{s}': must be Urgent, Medium, or Low"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "Urgent",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Returns display icon: !=urgent, ==medium, _=low
    pub fn icon(self) -> &'static str {
        match self {
            Self::Urgent => "!",
            Self::Medium => "=",
            Self::Low => "_",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The task type label. Unrelated to the board column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskKind {
    #[serde(rename = "User Story")]
    UserStory,
    #[serde(rename = "Technical Task")]
    TechnicalTask,
}

impl TaskKind {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "User Story" => Ok(Self::UserStory),
            "Technical Task" => Ok(Self::TechnicalTask),
            _ => bail!("invalid category '{s}': must be 'User Story' or 'Technical Task'"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserStory => "User Story",
            Self::TechnicalTask => "Technical Task",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub text: String,
    #[serde(rename = "isCompleted", alias = "IsCompleted", default)]
    pub is_completed: bool,
}

impl Subtask {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_completed: false,
        }
    }
}

/// A board card. `id` is `None` until the store has assigned one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(skip)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "assignedTo", default)]
    pub assigned_to: Vec<String>,
    pub date: String,
    pub prio: Priority,
    pub category: TaskKind,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

impl Task {
    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|s| s.is_completed).count()
    }

    /// Case-sensitive substring match against title or description.
    pub fn matches(&self, term: &str) -> bool {
        self.title.contains(term) || self.description.contains(term)
    }
}

/// Percentage of completed subtasks; 0 for an empty list.
pub fn progress_percent(subtasks: &[Subtask]) -> f64 {
    if subtasks.is_empty() {
        return 0.0;
    }
    let done = subtasks.iter().filter(|s| s.is_completed).count();
    done as f64 / subtasks.len() as f64 * 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(skip)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "bgColor", default)]
    pub bg_color: String,
    #[serde(default)]
    pub initials: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_collections_roundtrip() {
        for status in Status::ALL {
            assert_eq!(Status::parse(status.collection()).unwrap(), status);
        }
        assert!(Status::parse("archived").is_err());
    }

    #[test]
    fn enums_reject_unknown_labels() {
        assert!(Priority::parse("High").is_err());
        assert!(Priority::parse("urgent").is_err());
        assert!(TaskKind::parse("Bug").is_err());
        assert_eq!(TaskKind::parse("User Story").unwrap(), TaskKind::UserStory);
    }

    #[test]
    fn task_encodes_with_document_field_names() {
        let task = Task {
            id: Some("abc".into()),
            title: "Write docs".into(),
            description: String::new(),
            assigned_to: vec!["c1".into()],
            date: "2030-01-01".into(),
            prio: Priority::Urgent,
            category: TaskKind::TechnicalTask,
            subtasks: vec![Subtask::new("outline")],
        };
        let value = serde_json::to_value(&task).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["assignedTo"], json!(["c1"]));
        assert_eq!(value["category"], json!("Technical Task"));
        assert_eq!(value["subtasks"][0]["isCompleted"], json!(false));
    }

    #[test]
    fn task_decodes_legacy_subtask_flag_and_missing_fields() {
        let value = json!({
            "title": "Legacy",
            "date": "2030-01-01",
            "prio": "Low",
            "category": "User Story",
            "subtasks": [{"text": "a", "IsCompleted": true}]
        });
        let task: Task = serde_json::from_value(value).unwrap();
        assert_eq!(task.description, "");
        assert!(task.assigned_to.is_empty());
        assert!(task.subtasks[0].is_completed);
    }

    #[test]
    fn progress_of_empty_list_is_zero() {
        assert_eq!(progress_percent(&[]), 0.0);
        let subtasks = vec![
            Subtask {
                text: "a".into(),
                is_completed: true,
            },
            Subtask::new("b"),
        ];
        assert_eq!(progress_percent(&subtasks), 50.0);
    }

    #[test]
    fn match_is_case_sensitive() {
        let task = Task {
            id: None,
            title: "Deploy".into(),
            description: "push to staging".into(),
            assigned_to: vec![],
            date: "2030-01-01".into(),
            prio: Priority::Medium,
            category: TaskKind::UserStory,
            subtasks: vec![],
        };
        assert!(task.matches("Dep"));
        assert!(task.matches("staging"));
        assert!(!task.matches("deploy"));
    }
}
