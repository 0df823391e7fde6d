mod cli;

use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use cli::{Cli, Command, ContactCommand, TaskCommand};
use join::board::BoardController;
use join::contacts::{ContactRepository, ContactUpdate, NewContact};
use join::db::SqliteStore;
use join::form::{Rejection, SubmitOutcome, TaskForm};
use join::model::{Status, Task};
use join::output::{self, ContactView, TaskView};
use join::paths;
use join::summary;
use join::tasks::{MoveOutcome, TaskRepository};
use join::validate;
use join::watch::StoreWatcher;

fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("JOIN_LOG", "warn"))
        .format_timestamp_secs()
        .init();
}

fn main() {
    init_logging();
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn describe(rejection: Rejection) -> &'static str {
    match rejection {
        Rejection::MissingFields => "title, due date and category are required",
        Rejection::PastDate => "due date must be today or later",
        Rejection::InvalidPriority => "priority must be Urgent, Medium or Low",
        Rejection::InvalidCategory => "category must be 'User Story' or 'Technical Task'",
        Rejection::NotEditing => "no task is being edited",
    }
}

fn finish(outcome: SubmitOutcome) -> Result<Option<String>> {
    match outcome {
        SubmitOutcome::Rejected(r) => bail!("{}", describe(r)),
        SubmitOutcome::StoreFailed => bail!("failed to save task"),
        SubmitOutcome::Created(id) => Ok(Some(id)),
        SubmitOutcome::Updated => Ok(None),
    }
}

fn toggle_assignees(form: &mut TaskForm, contacts: &ContactRepository, ids: &[String]) -> Result<()> {
    for id in ids {
        let contact = contacts
            .find(id)
            .with_context(|| format!("contact '{id}' not found"))?;
        form.toggle_contact(contact);
    }
    Ok(())
}

fn add_subtasks(form: &mut TaskForm, texts: &[String]) {
    for text in texts {
        form.start_subtask();
        form.set_new_subtask(text);
        form.handle_enter();
    }
}

fn find_task<'a>(tasks: &'a TaskRepository, id: &str) -> Result<(Status, &'a Task)> {
    tasks
        .find(id)
        .with_context(|| format!("task '{id}' not found"))
}

fn print_board(tasks: &TaskRepository, board: &BoardController) {
    if board.no_results(tasks) {
        println!("No results found for '{}'", board.search_term());
        return;
    }
    let columns: Vec<(Status, Cow<'_, [Task]>)> = Status::ALL
        .into_iter()
        .map(|s| (s, board.visible(tasks, s)))
        .collect();
    print!(
        "{}",
        output::format_board(columns.iter().map(|(s, list)| (*s, list.as_ref())))
    );
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let db_path = paths::resolve_db_path(cli.db)?;
    paths::ensure_db_dir(&db_path)?;

    let store = Arc::new(SqliteStore::open(&db_path)?);
    let mut tasks = TaskRepository::new(store.clone());
    let mut contacts = ContactRepository::new(store.clone());
    tasks.subscribe_all()?;
    contacts.subscribe()?;
    tasks.sync();
    contacts.sync();

    match cli.command {
        Command::Task(TaskCommand::Add {
            title,
            date,
            category,
            status,
            desc,
            prio,
            assign,
            subtask,
        }) => {
            let status = Status::parse(&status)?;
            let mut board = BoardController::new();
            board.open_add_form(status);

            let mut form = TaskForm::new();
            form.set_title(&title);
            form.set_description(&desc);
            form.set_date(&date);
            form.set_priority(&prio);
            form.toggle_category(&category);
            toggle_assignees(&mut form, &contacts, &assign)?;
            add_subtasks(&mut form, &subtask);

            let outcome = form.submit_add(&tasks, board.add_target(), today());
            if let Some(id) = finish(outcome)? {
                println!("{id}");
                eprintln!("Added task '{title}' to {}", status.title());
            }
        }

        Command::Task(TaskCommand::Edit {
            id,
            title,
            desc,
            date,
            prio,
            category,
            assign,
            subtask,
            mut drop_subtask,
        }) => {
            let (status, task) = find_task(&tasks, &id)?;
            let mut form = TaskForm::edit(task, status, contacts.contacts());
            if let Some(t) = &title {
                form.set_title(t);
            }
            if let Some(d) = &desc {
                form.set_description(d);
            }
            if let Some(d) = &date {
                form.set_date(d);
            }
            if let Some(p) = &prio {
                form.set_priority(p);
            }
            if let Some(c) = &category {
                if form.category() != c {
                    form.toggle_category(c);
                }
            }
            toggle_assignees(&mut form, &contacts, &assign)?;
            // Highest index first so earlier removals don't shift later ones.
            drop_subtask.sort_unstable_by(|a, b| b.cmp(a));
            drop_subtask.dedup();
            for index in drop_subtask {
                form.delete_subtask(index);
            }
            add_subtasks(&mut form, &subtask);

            let outcome = form.submit_update(&tasks, today());
            finish(outcome)?;
            eprintln!("Updated task '{id}'");
        }

        Command::Task(TaskCommand::Rm { id }) => {
            let (status, _) = find_task(&tasks, &id)?;
            if !tasks.delete_task(status, &id) {
                bail!("failed to delete task '{id}'");
            }
            eprintln!("Deleted task '{id}'");
        }

        Command::Task(TaskCommand::Move { id, to }) => {
            let to = Status::parse(&to)?;
            let (from, task) = find_task(&tasks, &id)?;
            let task = task.clone();
            match tasks.move_task(&task, from, to) {
                MoveOutcome::Moved { id: new_id } => {
                    println!("{new_id}");
                    eprintln!("Moved '{}' to {}", task.title, to.title());
                }
                MoveOutcome::SameColumn => eprintln!("'{}' is already in {}", task.title, to.title()),
                MoveOutcome::AddFailed => bail!("failed to add '{}' to {}", task.title, to.title()),
                MoveOutcome::Copied { id: new_id } | MoveOutcome::Duplicated { id: new_id } => {
                    println!("{new_id}");
                    bail!(
                        "'{}' was copied to {} but could not be removed from {}",
                        task.title,
                        to.title(),
                        from.title()
                    );
                }
            }
        }

        Command::Task(TaskCommand::Show { id, json }) => {
            let mut board = BoardController::new();
            board.open_task(&id);
            let Some((status, task)) = board.selected_task(&tasks) else {
                bail!("task '{id}' not found");
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&TaskView::new(status, task))?);
            } else {
                print!("{}", output::format_task_detail(status, task, contacts.contacts()));
            }
        }

        Command::Task(TaskCommand::Toggle { id, index }) => {
            let (status, task) = find_task(&tasks, &id)?;
            if index >= task.subtasks.len() {
                bail!("task '{id}' has no subtask {index}");
            }
            if !tasks.toggle_subtask(status, &id, index) {
                bail!("failed to update task '{id}'");
            }
            eprintln!("Toggled subtask {index} of '{id}'");
        }

        Command::Board { search, json } => {
            let mut board = BoardController::new();
            if let Some(term) = &search {
                board.set_search_text(term);
                board.start_search();
            }
            if json {
                let views: Vec<_> = Status::ALL
                    .into_iter()
                    .flat_map(|s| {
                        board
                            .visible(&tasks, s)
                            .iter()
                            .map(|t| serde_json::to_value(TaskView::new(s, t)))
                            .collect::<Vec<_>>()
                    })
                    .collect::<serde_json::Result<Vec<_>>>()?;
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print_board(&tasks, &board);
            }
        }

        Command::Contact(ContactCommand::Add { name, email, phone }) => {
            let contact = NewContact { name, email, phone };
            let errors = validate::check_contact(&contact);
            if errors.name {
                validate::validate_name(&contact.name)?;
            }
            if errors.email {
                validate::validate_email(&contact.email)?;
            }
            if errors.phone {
                validate::validate_phone(&contact.phone)?;
            }
            let name = contact.name.clone();
            let Some(id) = contacts.add_contact(contact) else {
                bail!("failed to add contact '{name}'");
            };
            println!("{id}");
            eprintln!("Added contact '{name}'");
        }

        Command::Contact(ContactCommand::Edit {
            id,
            name,
            email,
            phone,
            color,
        }) => {
            if contacts.find(&id).is_none() {
                bail!("contact '{id}' not found");
            }
            if let Some(n) = name.as_deref().filter(|n| !validate::is_blank(n)) {
                validate::validate_name(n)?;
            }
            if let Some(e) = email.as_deref().filter(|e| !validate::is_blank(e)) {
                validate::validate_email(e)?;
            }
            let initials = name
                .as_deref()
                .map(join::contacts::initials)
                .unwrap_or_default();
            let update = ContactUpdate {
                name: name.unwrap_or_default(),
                email: email.unwrap_or_default(),
                phone: phone.unwrap_or_default(),
                bg_color: color.unwrap_or_default(),
                initials,
            };
            if !contacts.update_contact(&id, update) {
                bail!("failed to update contact '{id}'");
            }
            eprintln!("Updated contact '{id}'");
        }

        Command::Contact(ContactCommand::Rm { id }) => {
            if !contacts.delete_contact(&id) {
                bail!("contact '{id}' not found or could not be deleted");
            }
            eprintln!("Deleted contact '{id}'");
        }

        Command::Contact(ContactCommand::List { json }) => {
            if json {
                let views: Vec<ContactView<'_>> =
                    contacts.contacts().iter().map(ContactView::from).collect();
                println!("{}", serde_json::to_string_pretty(&views)?);
            } else {
                print!("{}", output::format_contacts(&contacts));
            }
        }

        Command::Contact(ContactCommand::Show { id }) => {
            contacts.select(&id);
            let Some(contact) = contacts.selected() else {
                bail!("contact '{id}' not found");
            };
            println!("{}", serde_json::to_string_pretty(&ContactView::from(contact))?);
        }

        Command::Summary { json } => {
            let s = summary::summarize(&tasks);
            if json {
                println!("{}", serde_json::to_string_pretty(&s)?);
            } else {
                print!("{}", output::format_summary(&s));
            }
        }

        Command::Watch {
            search,
            poll_interval,
        } => {
            let watcher = StoreWatcher::new(&db_path)?;
            let mut board = BoardController::new();
            if let Some(term) = &search {
                board.set_search_text(term);
                board.start_search();
            }
            print_board(&tasks, &board);
            let interval = Duration::from_millis(poll_interval);
            loop {
                let changed = watcher.wait(interval);
                watcher.drain();
                if !changed {
                    continue;
                }
                store.refresh()?;
                if tasks.sync() {
                    println!();
                    print_board(&tasks, &board);
                }
            }
        }
    }

    Ok(())
}
