use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::capture::TaskInput;
use crate::config::parse_timeout_secs;
use crate::model::Priority;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskflow",
    version,
    about = "Organize tasks by category, priority and due date.",
    after_help = "Examples:\n  taskflow                     List tasks (same as `taskflow list`)\n  taskflow add Buy milk --priority high --due tomorrow\n  taskflow list --category work --search report\n  taskflow complete task_01H... task_01J...\n  taskflow --api-url https://records.example.com stats"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Use a remote record API instead of the local store
    #[arg(long, value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Bearer token for the remote record API
    #[arg(long, value_name = "TOKEN", global = true)]
    pub api_token: Option<String>,

    /// Remote request timeout in seconds (default 30)
    #[arg(long, value_name = "SECS", global = true, value_parser = parse_timeout_secs)]
    pub api_timeout: Option<Duration>,

    /// Tracing filter directive (e.g. "info", "taskflow_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    /// Skip creating the default categories in an empty store
    #[arg(long, global = true)]
    pub no_seed: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Show the filtered, sorted task list (default command)
    List(ListArgs),
    /// Add a task
    Add(AddArgs),
    /// Edit fields of a task
    Edit(EditArgs),
    /// Flip a task between open and completed
    Toggle(IdArgs),
    /// Complete one or more tasks
    Complete(IdsArgs),
    /// Delete one or more tasks
    Delete(DeleteArgs),
    /// Show progress counters
    Stats,
    /// List categories with live task counts
    Categories,
    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommand),
}

impl Default for CliCommand {
    fn default() -> Self {
        CliCommand::List(ListArgs::default())
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoryCommand {
    /// Create a category
    Add(CategoryAddArgs),
    /// Rename or recolor a category
    Edit(CategoryEditArgs),
    /// Delete a category (its tasks become uncategorized)
    Delete(IdArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Category id or name, or "all"
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Case-insensitive text to look for in titles and descriptions
    #[arg(long, value_name = "TEXT")]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TEXT", required = true)]
    pub text: Vec<String>,

    /// Optional longer description
    #[arg(long)]
    pub description: Option<String>,

    /// Category id or name (defaults to the first category)
    #[arg(long, value_name = "CATEGORY")]
    pub category: Option<String>,

    /// Priority (low, medium, high or 1-3; defaults to low)
    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    /// Due date (ISO e.g. 2024-01-10, today, tomorrow, +3d; defaults to today)
    #[arg(long = "due", value_name = "DATE")]
    pub due_date: Option<String>,
}

impl From<AddArgs> for TaskInput {
    fn from(args: AddArgs) -> Self {
        TaskInput {
            title: args.text.join(" "),
            description: args.description,
            category_id: args.category,
            priority: args.priority,
            due_date: args.due_date,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Move the task to this category (id or name)
    #[arg(long, value_name = "CATEGORY", conflicts_with = "uncategorize")]
    pub category: Option<String>,

    /// Remove the task from its category
    #[arg(long)]
    pub uncategorize: bool,

    #[arg(long, value_enum)]
    pub priority: Option<Priority>,

    #[arg(long = "due", value_name = "DATE")]
    pub due_date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct IdsArgs {
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,

    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryAddArgs {
    #[arg(value_name = "NAME", required = true)]
    pub name: Vec<String>,

    /// Badge color as #RGB or #RRGGBB
    #[arg(long)]
    pub color: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CategoryEditArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub color: Option<String>,
}
