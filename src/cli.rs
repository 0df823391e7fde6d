use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "join", about = "Kanban board and contact book")]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.join/join.db]
    #[arg(long, env = "JOIN_DB", global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create, edit, move and inspect tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Show the board, one section per column
    Board {
        /// Only show cards whose title or description contains TERM (case-sensitive)
        #[arg(short, long)]
        search: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the contact book
    #[command(subcommand)]
    Contact(ContactCommand),

    /// Board totals, urgent count and the next urgent deadline
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Redraw the board whenever the database changes
    Watch {
        /// Only show cards matching TERM
        #[arg(short, long)]
        search: Option<String>,
        /// How long to wait for a change event before checking again, in milliseconds
        #[arg(long, default_value = "1000")]
        poll_interval: u64,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task to a column
    Add {
        /// Task title
        title: String,
        /// Due date (YYYY-MM-DD, today or later)
        #[arg(short, long)]
        date: String,
        /// Category ("User Story" or "Technical Task")
        #[arg(short, long)]
        category: String,
        /// Column (todo, inprogress, feedback, done)
        #[arg(short, long, default_value = "todo")]
        status: String,
        /// Description
        #[arg(long, default_value = "")]
        desc: String,
        /// Priority (Urgent, Medium, Low)
        #[arg(short, long, default_value = "Medium")]
        prio: String,
        /// Assign a contact by id (repeatable)
        #[arg(short, long)]
        assign: Vec<String>,
        /// Add a subtask (repeatable)
        #[arg(long)]
        subtask: Vec<String>,
    },

    /// Edit a task in place
    Edit {
        /// Task id
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(long)]
        desc: Option<String>,
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long)]
        prio: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        /// Toggle a contact's assignment by id (repeatable)
        #[arg(short, long)]
        assign: Vec<String>,
        /// Append a subtask (repeatable)
        #[arg(long)]
        subtask: Vec<String>,
        /// Remove the subtask at this index (repeatable)
        #[arg(long)]
        drop_subtask: Vec<usize>,
    },

    /// Delete a task
    Rm {
        /// Task id
        id: String,
    },

    /// Move a task to another column
    Move {
        /// Task id
        id: String,
        /// Destination column
        to: String,
    },

    /// Show task details
    Show {
        /// Task id
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Flip a subtask's completion flag
    Toggle {
        /// Task id
        id: String,
        /// Subtask index (as listed by `task show`)
        index: usize,
    },
}

#[derive(Subcommand)]
pub enum ContactCommand {
    /// Add a contact
    Add {
        /// Full name
        name: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long, default_value = "")]
        phone: String,
    },

    /// Edit a contact; omitted fields keep their value
    Edit {
        /// Contact id
        id: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
        #[arg(short, long)]
        phone: Option<String>,
        /// Badge color (hex)
        #[arg(long)]
        color: Option<String>,
    },

    /// Delete a contact
    Rm {
        /// Contact id
        id: String,
    },

    /// List contacts grouped by first letter
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one contact
    Show {
        /// Contact id
        id: String,
    },
}
