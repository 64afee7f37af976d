mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use cli::{Cli, Command, NoteCommand, SubCommand, TaskCommand, TaskFields, WatchTarget};
use notebox::actions::{self, ActionError};
use notebox::model::{Importance, NoteOrder, TaskFilter};
use notebox::store::Database;
use notebox::validate::{self, NoteInput, TaskInput};
use notebox::{output, paths};

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Overlay the flags that were given on top of `base`.
fn apply_task_fields(mut base: TaskInput, fields: TaskFields) -> Result<TaskInput, ActionError> {
    if let Some(desc) = fields.desc {
        base.description = desc;
    }
    if let Some(importance) = fields.importance {
        base.importance = validate::choice(Importance::parse(&importance))?;
    }
    if let Some(today) = fields.today {
        base.is_today = today;
    }
    Ok(base)
}

async fn run_note(db: &Database, command: NoteCommand) -> Result<(), ActionError> {
    let notes = db.notes();
    match command {
        NoteCommand::Add { title, content } => {
            let id = actions::create_note(&notes, &NoteInput::new(title, content)).await?;
            println!("{id}");
            eprintln!("Added note {id}");
        }
        NoteCommand::Edit { id, title, content } => {
            let Some(current) = notes.get_by_id(id).await? else {
                return Err(ActionError::NotFound { entity: "note", id });
            };
            let input = NoteInput::new(
                title.unwrap_or(current.title),
                content.unwrap_or(current.content),
            );
            actions::edit_note(&notes, id, &input).await?;
            eprintln!("Updated note {id}");
        }
        NoteCommand::Rm { id } => {
            actions::remove_note(&notes, id).await?;
            eprintln!("Removed note {id}");
        }
        NoteCommand::Show { id, json } => {
            let Some(note) = notes.get_by_id(id).await? else {
                return Err(ActionError::NotFound { entity: "note", id });
            };
            if json {
                print_json(&note)?;
            } else {
                print!("{}", output::format_note_detail(&note));
            }
        }
        NoteCommand::List { by, json } => {
            let list = notes.get_all(validate::choice(NoteOrder::parse(&by))?).await?;
            if json {
                print_json(&list)?;
            } else {
                print!("{}", output::format_note_list(&list));
            }
        }
        NoteCommand::Search { query, json } => {
            let list = notes.search(&query).await?;
            if json {
                print_json(&list)?;
            } else {
                print!("{}", output::format_note_list(&list));
            }
        }
    }
    Ok(())
}

async fn run_task(db: &Database, command: TaskCommand) -> Result<(), ActionError> {
    let tasks = db.tasks();
    match command {
        TaskCommand::Add {
            title,
            fields,
            subtasks,
        } => {
            let input = apply_task_fields(TaskInput::new(title), fields)?;
            let id = actions::create_task(&tasks, &input, &subtasks).await?;
            println!("{id}");
            eprintln!("Added task {id}");
        }
        TaskCommand::Edit { id, title, fields } => {
            let Some(current) = tasks.get_by_id(id).await? else {
                return Err(ActionError::NotFound { entity: "task", id });
            };
            let base = TaskInput {
                title: title.unwrap_or(current.title),
                description: current.description,
                importance: current.importance,
                is_today: current.is_today,
            };
            let input = apply_task_fields(base, fields)?;
            actions::edit_task(&tasks, id, &input).await?;
            eprintln!("Updated task {id}");
        }
        TaskCommand::Done { id } => {
            actions::set_task_completed(&tasks, id, true).await?;
            eprintln!("Marked task {id} completed");
        }
        TaskCommand::Reopen { id } => {
            actions::set_task_completed(&tasks, id, false).await?;
            eprintln!("Reopened task {id}");
        }
        TaskCommand::Rm { id } => {
            actions::remove_task(&tasks, id).await?;
            eprintln!("Removed task {id}");
        }
        TaskCommand::Show { id, json } => {
            let Some(task) = tasks.get_by_id(id).await? else {
                return Err(ActionError::NotFound { entity: "task", id });
            };
            if json {
                print_json(&task)?;
            } else {
                print!("{}", output::format_task_detail(&task));
            }
        }
        TaskCommand::List { filter, json } => {
            let list = tasks.get_all(validate::choice(TaskFilter::parse(&filter))?).await?;
            if json {
                print_json(&list)?;
            } else {
                print!("{}", output::format_task_list(&list));
            }
        }
        TaskCommand::Search { query, json } => {
            let list = tasks.search(&query).await?;
            if json {
                print_json(&list)?;
            } else {
                print!("{}", output::format_task_list(&list));
            }
        }
    }
    Ok(())
}

async fn run_sub(db: &Database, command: SubCommand) -> Result<(), ActionError> {
    let tasks = db.tasks();
    match command {
        SubCommand::Add { task_id, title } => {
            let id = actions::add_subtask(&tasks, task_id, &title).await?;
            println!("{id}");
            eprintln!("Added subtask {id} to task {task_id}");
        }
        SubCommand::Rename { id, title } => {
            actions::rename_subtask(&tasks, id, &title).await?;
            eprintln!("Renamed subtask {id}");
        }
        SubCommand::Done { id } => {
            actions::set_subtask_done(&tasks, id, true).await?;
            eprintln!("Marked subtask {id} done");
        }
        SubCommand::Undo { id } => {
            actions::set_subtask_done(&tasks, id, false).await?;
            eprintln!("Marked subtask {id} not done");
        }
        SubCommand::Rm { id } => {
            actions::remove_subtask(&tasks, id).await?;
            eprintln!("Removed subtask {id}");
        }
    }
    Ok(())
}

async fn run_watch(db: &Database, db_path: &str, target: WatchTarget) -> Result<()> {
    // Writes from other notebox processes arrive through the file watcher.
    let _watcher = db.watch_file(db_path)?;
    match target {
        WatchTarget::Notes { by } => {
            let mut live = db.notes().live_all(validate::choice(NoteOrder::parse(&by))?);
            loop {
                let list = live.next().await?;
                println!("--- {} notes", list.len());
                print!("{}", output::format_note_list(&list));
            }
        }
        WatchTarget::Tasks { filter } => {
            let mut live = db.tasks().live_all(validate::choice(TaskFilter::parse(&filter))?);
            loop {
                let list = live.next().await?;
                println!("--- {} tasks", list.len());
                print!("{}", output::format_task_list(&list));
            }
        }
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let db_path = paths::resolve_db_path(cli.db)?;
    paths::ensure_db_dir(&db_path)?;
    let db = Database::open(&db_path).with_context(|| format!("failed to open {db_path}"))?;

    let result = match cli.command {
        Command::Note(command) => run_note(&db, command).await,
        Command::Task(command) => run_task(&db, command).await,
        Command::Sub(command) => run_sub(&db, command).await,
        Command::Watch { target } => return run_watch(&db, &db_path, target).await,
    };
    result.map_err(anyhow::Error::from)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_fields_overlay_only_given_flags() {
        let base = TaskInput {
            title: "t".into(),
            description: "keep".into(),
            importance: Importance::Medium,
            is_today: true,
        };
        let fields = TaskFields {
            desc: None,
            importance: Some("HIGH".into()),
            today: None,
        };
        let input = apply_task_fields(base, fields).unwrap();
        assert_eq!(input.description, "keep");
        assert_eq!(input.importance, Importance::High);
        assert!(input.is_today);
    }

    #[test]
    fn bad_importance_is_an_error() {
        let fields = TaskFields {
            desc: None,
            importance: Some("urgent".into()),
            today: None,
        };
        let err = apply_task_fields(TaskInput::new("t"), fields).unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(err, ActionError::Invalid(_)));
    }

    #[test]
    fn cli_parses_repeated_subtasks() {
        let cli = Cli::try_parse_from([
            "notebox", "task", "add", "Trip", "-s", "Pack", "-s", "Book flight", "--today", "true",
        ])
        .unwrap();
        let Command::Task(TaskCommand::Add {
            title,
            fields,
            subtasks,
        }) = cli.command
        else {
            panic!("expected task add");
        };
        assert_eq!(title, "Trip");
        assert_eq!(subtasks, vec!["Pack", "Book flight"]);
        assert_eq!(fields.today, Some(true));
    }
}
