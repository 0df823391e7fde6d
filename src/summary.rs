use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Priority, Status};
use crate::tasks::TaskRepository;
use crate::validate::parse_date;

/// Board totals for the landing page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub todo: usize,
    pub in_progress: usize,
    pub feedback: usize,
    pub done: usize,
    pub total: usize,
    pub urgent: usize,
    /// Earliest due date among urgent tasks.
    pub upcoming_deadline: Option<NaiveDate>,
}

pub fn summarize(tasks: &TaskRepository) -> Summary {
    let mut summary = Summary::default();
    for (status, list) in tasks.lists() {
        let count = list.len();
        match status {
            Status::Todo => summary.todo = count,
            Status::InProgress => summary.in_progress = count,
            Status::Feedback => summary.feedback = count,
            Status::Done => summary.done = count,
        }
        summary.total += count;
        for task in list.iter().filter(|t| t.prio == Priority::Urgent) {
            summary.urgent += 1;
            // Unparseable dates are left out of the deadline.
            if let Ok(date) = parse_date(&task.date) {
                summary.upcoming_deadline = Some(match summary.upcoming_deadline {
                    Some(current) => current.min(date),
                    None => date,
                });
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::model::{Task, TaskKind};

    fn task(prio: Priority, date: &str) -> Task {
        Task {
            id: None,
            title: "t".into(),
            description: String::new(),
            assigned_to: vec![],
            date: date.into(),
            prio,
            category: TaskKind::UserStory,
            subtasks: vec![],
        }
    }

    #[test]
    fn empty_board() {
        let store = Arc::new(MemoryStore::new());
        let tasks = TaskRepository::new(store);
        assert_eq!(summarize(&tasks), Summary::default());
    }

    #[test]
    fn counts_and_deadline() {
        let store = Arc::new(MemoryStore::new());
        let mut tasks = TaskRepository::new(store);
        tasks.subscribe_all().unwrap();
        tasks.add_task(Status::Todo, &task(Priority::Urgent, "2030-09-01"));
        tasks.add_task(Status::Todo, &task(Priority::Low, "2030-01-01"));
        tasks.add_task(Status::Feedback, &task(Priority::Urgent, "2030-08-15"));
        tasks.add_task(Status::Done, &task(Priority::Urgent, "garbage"));
        tasks.sync();

        let s = summarize(&tasks);
        assert_eq!(s.todo, 2);
        assert_eq!(s.in_progress, 0);
        assert_eq!(s.feedback, 1);
        assert_eq!(s.done, 1);
        assert_eq!(s.total, 4);
        assert_eq!(s.urgent, 3);
        assert_eq!(s.upcoming_deadline, NaiveDate::from_ymd_opt(2030, 8, 15));
    }
}
