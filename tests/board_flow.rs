use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;

use join::board::{BoardController, DropOutcome};
use join::contacts::{ContactRepository, NewContact};
use join::db::SqliteStore;
use join::form::{SubmitOutcome, TaskForm};
use join::memory::MemoryStore;
use join::model::{progress_percent, Status};
use join::store::{DocumentStore, StoreOp};
use join::summary::summarize;
use join::tasks::{MoveOutcome, TaskRepository};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()
}

fn person(name: &str, email: &str) -> NewContact {
    NewContact {
        name: name.into(),
        email: email.into(),
        phone: String::new(),
    }
}

fn fill(form: &mut TaskForm, title: &str, date: &str, prio: &str) {
    form.set_title(title);
    form.set_date(date);
    form.set_priority(prio);
    form.toggle_category("User Story");
}

fn setup(store: Arc<dyn DocumentStore>) -> (TaskRepository, ContactRepository) {
    let mut tasks = TaskRepository::new(store.clone());
    let mut contacts = ContactRepository::new(store);
    tasks.subscribe_all().unwrap();
    contacts.subscribe().unwrap();
    tasks.sync();
    contacts.sync();
    (tasks, contacts)
}

#[test]
fn create_assign_move_and_search() {
    let store = Arc::new(MemoryStore::new());
    let (mut tasks, mut contacts) = setup(store.clone());

    contacts.add_contact(person("Anton Mayer", "antonm@gmail.com")).unwrap();
    contacts.add_contact(person("Benedikt Ziegler", "benedikt@gmail.com")).unwrap();
    contacts.sync();
    assert_eq!(contacts.contacts().len(), 2);
    assert_eq!(contacts.contacts()[0].initials, "AM");

    // Add a task from the "In progress" column's add button.
    let mut board = BoardController::new();
    board.open_add_form(Status::InProgress);
    let mut form = TaskForm::new();
    fill(&mut form, "Contact form", "2030-06-20", "Urgent");
    form.set_description("Build the contact form and imprint page");
    let anton = contacts.contacts()[0].clone();
    form.toggle_contact(&anton);
    for text in ["Markup", "Styling"] {
        form.start_subtask();
        form.set_new_subtask(text);
        form.handle_enter();
    }
    let outcome = form.submit_add(&tasks, board.add_target(), today());
    let SubmitOutcome::Created(id) = outcome else {
        panic!("expected the task to be created");
    };
    assert!(form.toast_visible(Instant::now()));
    assert!(form.tick(Instant::now() + Duration::from_millis(2001)));
    assert!(form.title().is_empty());

    tasks.sync();
    let card = &tasks.list(Status::InProgress)[0];
    assert_eq!(card.id.as_deref(), Some(id.as_str()));
    assert_eq!(card.assigned_to, vec![anton.id.clone().unwrap()]);
    assert_eq!(card.subtasks.len(), 2);

    // Tick off one subtask.
    assert!(tasks.toggle_subtask(Status::InProgress, &id, 0));
    tasks.sync();
    assert_eq!(progress_percent(&tasks.list(Status::InProgress)[0].subtasks), 50.0);

    // Drag to "Await feedback".
    let outcome = board.on_drop(&mut tasks, Status::InProgress, Status::Feedback, 0, 0);
    assert!(matches!(outcome, DropOutcome::Moved(MoveOutcome::Moved { .. })));
    tasks.sync();
    assert!(tasks.list(Status::InProgress).is_empty());
    let moved = &tasks.list(Status::Feedback)[0];
    assert_eq!(moved.title, "Contact form");
    assert_ne!(moved.id.as_deref(), Some(id.as_str()));
    assert!(moved.subtasks[0].is_completed);

    board.set_search_text("imprint");
    board.start_search();
    assert_eq!(board.visible(&tasks, Status::Feedback).len(), 1);
    assert!(board.visible(&tasks, Status::Todo).is_empty());
    board.set_search_text("Imprint");
    board.start_search();
    assert!(board.no_results(&tasks));

    let summary = summarize(&tasks);
    assert_eq!(summary.total, 1);
    assert_eq!(summary.feedback, 1);
    assert_eq!(summary.urgent, 1);
    assert_eq!(summary.upcoming_deadline, NaiveDate::from_ymd_opt(2030, 6, 20));
}

#[test]
fn failed_delete_during_move_duplicates_task() {
    let store = Arc::new(MemoryStore::new());
    let (mut tasks, _contacts) = setup(store.clone());

    let mut form = TaskForm::new();
    fill(&mut form, "Duplicate me", "2030-07-01", "Low");
    assert!(matches!(
        form.submit_add(&tasks, Status::Todo, today()),
        SubmitOutcome::Created(_)
    ));
    tasks.sync();

    store.fail_next(StoreOp::Delete, "todo");
    let board = BoardController::new();
    let outcome = board.on_drop(&mut tasks, Status::Todo, Status::Done, 0, 0);
    assert!(matches!(outcome, DropOutcome::Moved(MoveOutcome::Duplicated { .. })));
    tasks.sync();
    assert_eq!(tasks.list(Status::Todo).len(), 1);
    assert_eq!(tasks.list(Status::Done).len(), 1);
}

#[test]
fn past_date_is_rejected_without_writing() {
    let store = Arc::new(MemoryStore::new());
    let (mut tasks, _contacts) = setup(store.clone());

    let mut form = TaskForm::new();
    fill(&mut form, "Too late", "2030-05-31", "Medium");
    assert!(matches!(
        form.submit_add(&tasks, Status::Todo, today()),
        SubmitOutcome::Rejected(_)
    ));
    assert!(!form.toast_visible(Instant::now()));
    tasks.sync();
    assert!(tasks.list(Status::Todo).is_empty());
    assert!(store.documents("todo").is_empty());
}

#[test]
fn edit_round_trip_through_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("join.db");
    let path = path.to_str().unwrap();

    let store = Arc::new(SqliteStore::open(path).unwrap());
    let (mut tasks, mut contacts) = setup(store.clone());
    let eva = contacts.add_contact(person("Eva Fischer", "eva@gmail.com")).unwrap();
    contacts.sync();

    let mut form = TaskForm::new();
    fill(&mut form, "Kochwelt page", "2030-08-01", "Medium");
    form.start_subtask();
    form.set_new_subtask("Recipe list");
    form.save_subtask();
    let SubmitOutcome::Created(id) = form.submit_add(&tasks, Status::Todo, today()) else {
        panic!("add failed");
    };
    tasks.sync();

    let (status, task) = tasks.find(&id).unwrap();
    let mut edit = TaskForm::edit(task, status, contacts.contacts());
    assert!(edit.is_edit_mode());
    edit.set_title("Kochwelt page and recipe recommender");
    let contact = contacts.find(&eva).unwrap().clone();
    edit.toggle_contact(&contact);
    assert_eq!(edit.submit_update(&tasks, today()), SubmitOutcome::Updated);
    tasks.sync();

    // A second connection reads the stored change.
    let other = Arc::new(SqliteStore::open(path).unwrap());
    let (other_tasks, _) = setup(other);
    let (status, task) = other_tasks.find(&id).unwrap();
    assert_eq!(status, Status::Todo);
    assert_eq!(task.title, "Kochwelt page and recipe recommender");
    assert_eq!(task.assigned_to, vec![eva.clone()]);
    assert_eq!(task.subtasks[0].text, "Recipe list");

    assert!(contacts.delete_contact(&eva));
    contacts.sync();
    assert!(contacts.contacts().is_empty());
}
