use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::store::TaskRepository;
use crate::task::{Filter, Task, TaskId, TaskText};
use crate::view;
use clap::{Parser, Subcommand};
use std::{error::Error, io::Write, path::Path, path::PathBuf};

#[derive(Debug, Parser)]
#[command(name = "todo-tui", version, about = "A small to-do list for the terminal")]
pub struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Config file to read instead of the default location
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log file (overrides the config file)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write a default config file if none exists
    Init,
    /// Add a new task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List tasks, newest first
    List {
        #[arg(short, long, default_value = "all")]
        filter: Filter,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Mark a task done, or pending again
    Toggle { id: i64 },
    /// Show storage details
    Info,
}

/// Runs a one-shot command. Unlike the TUI, store errors are returned.
pub fn run<R: TaskRepository, W: Write>(
    command: Command,
    repo: &R,
    config: &Config,
    config_path: Option<&Path>,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Init => {
            let path = config_path.ok_or("no config directory available; pass --config")?;
            if config.init(path)? {
                writeln!(out, "Wrote {}", path.display())?;
            } else {
                writeln!(out, "Config already exists at {}", path.display())?;
            }
        }
        Command::Add { text } => {
            let text = TaskText::parse(&text.join(" ")).ok_or("task text must not be empty")?;
            repo.create(&text)?;
            writeln!(out, "Added: {}", text.as_str())?;
        }
        Command::List { filter, json } => {
            let tasks = repo.read_all()?;
            let shown = view::visible(&tasks, filter);
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&shown)?)?;
            } else {
                for task in shown {
                    writeln!(out, "{}", list_line(task))?;
                }
            }
        }
        Command::Toggle { id } => {
            let id = TaskId(id);
            repo.toggle(id)?;
            match repo.read_all()?.into_iter().find(|t| t.id == id) {
                Some(task) => writeln!(out, "{}", list_line(&task))?,
                None => writeln!(out, "No task with id {id}")?,
            }
        }
        Command::Info => {
            let diag = Diagnostics::fetch(repo);
            writeln!(out, "database: {}", config.database_path.display())?;
            writeln!(out, "sqlite:   {}", diag.engine_version)?;
            writeln!(out, "schema:   {}", diag.schema_version)?;
        }
    }
    Ok(())
}

fn list_line(task: &Task) -> String {
    format!(
        "[{}] #{} {} ({})",
        if task.done { "x" } else { " " },
        task.id,
        task.text,
        task.created_at.format("%Y-%m-%d %H:%M")
    )
}
