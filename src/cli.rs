use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "notebox", about = "Notes and tasks with subtasks", version)]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.notebox/notebox.db]
    #[arg(long, env = "NOTEBOX_DB", global = true)]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Work with notes
    #[command(subcommand)]
    Note(NoteCommand),

    /// Work with tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Work with a task's subtasks
    #[command(subcommand)]
    Sub(SubCommand),

    /// Print a list again every time it changes (Ctrl-C to stop)
    Watch {
        #[command(subcommand)]
        target: WatchTarget,
    },
}

#[derive(Subcommand)]
pub enum NoteCommand {
    /// Create a note
    Add {
        title: String,
        /// Note body
        #[arg(default_value = "")]
        content: String,
    },
    /// Edit a note's title and/or content
    Edit {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        content: Option<String>,
    },
    /// Delete a note
    Rm { id: i64 },
    /// Show a note
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// List notes, newest first
    List {
        /// Sort by created or updated time
        #[arg(long, default_value = "updated")]
        by: String,
        #[arg(long)]
        json: bool,
    },
    /// Find notes whose title or content contains the query (any case)
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
pub struct TaskFields {
    /// Task description
    #[arg(short, long)]
    pub desc: Option<String>,
    /// Importance: low, medium, or high
    #[arg(short, long)]
    pub importance: Option<String>,
    /// Mark the task for today
    #[arg(long)]
    pub today: Option<bool>,
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Create a task
    Add {
        title: String,
        #[command(flatten)]
        fields: TaskFields,
        /// Initial subtask (repeatable)
        #[arg(short, long = "sub")]
        subtasks: Vec<String>,
    },
    /// Edit a task's title, description, importance, or today flag
    Edit {
        id: i64,
        #[arg(short, long)]
        title: Option<String>,
        #[command(flatten)]
        fields: TaskFields,
    },
    /// Mark a task completed
    Done { id: i64 },
    /// Mark a completed task active again
    Reopen { id: i64 },
    /// Delete a task and its subtasks
    Rm { id: i64 },
    /// Show a task with its subtasks
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// List tasks, newest first
    List {
        /// all, today, active, or completed
        #[arg(long, default_value = "all")]
        filter: String,
        #[arg(long)]
        json: bool,
    },
    /// Find tasks whose title or description contains the query (any case)
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum SubCommand {
    /// Add a subtask to a task
    Add { task_id: i64, title: String },
    /// Rename a subtask
    Rename { id: i64, title: String },
    /// Mark a subtask done
    Done { id: i64 },
    /// Mark a subtask not done
    Undo { id: i64 },
    /// Delete a subtask
    Rm { id: i64 },
}

#[derive(Subcommand)]
pub enum WatchTarget {
    /// Watch the note list
    Notes {
        #[arg(long, default_value = "updated")]
        by: String,
    },
    /// Watch the task list
    Tasks {
        #[arg(long, default_value = "all")]
        filter: String,
    },
}
