use std::fmt;
use std::io::Write;

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use tracing::{info, warn};

use crate::capture::{parse_due_date, CategoryInput, TaskInput};
use crate::cli::{
    AddArgs, CategoryAddArgs, CategoryCommand, CategoryEditArgs, CliCommand, DeleteArgs,
    EditArgs, ListArgs,
};
use crate::model::{CategoryFilter, CategoryPatch, TaskPatch, ALL_CATEGORIES};
use crate::render;
use crate::services::{BulkReport, Outcome, TaskBoard};

/// Wall-clock readings for one command run.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
}

impl Clock {
    pub fn system() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            today: now.with_timezone(&Local).date_naive(),
        }
    }
}

/// Run `command` against a loaded board, then print whatever toasts it queued.
///
/// `confirm` is asked before bulk deletes that were not pre-approved with `--yes`.
pub async fn execute<W, C>(
    board: &TaskBoard,
    command: CliCommand,
    clock: Clock,
    confirm: C,
    mut writer: W,
) -> Result<()>
where
    W: Write,
    C: FnOnce(usize) -> bool,
{
    let result = dispatch(board, command, clock, confirm, &mut writer).await;
    if let Err(err) = &result {
        warn!(error = %err, "command failed");
    }
    render::write_toasts(&mut writer, &board.take_toasts())?;
    result
}

async fn dispatch<W, C>(
    board: &TaskBoard,
    command: CliCommand,
    clock: Clock,
    confirm: C,
    writer: &mut W,
) -> Result<()>
where
    W: Write,
    C: FnOnce(usize) -> bool,
{
    match command {
        CliCommand::List(args) => handle_list(board, args, clock, writer),
        CliCommand::Add(args) => handle_add(board, args, clock, writer).await,
        CliCommand::Edit(args) => handle_edit(board, args, clock, writer).await,
        CliCommand::Toggle(args) => {
            let task = settle(board.toggle_complete(&args.id, clock.now).await)?;
            let state = if task.completed { "completed" } else { "reopened" };
            writeln!(writer, "Task {} {}", task.id, state)?;
            Ok(())
        }
        CliCommand::Complete(args) => {
            select_only(board, &args.ids);
            let report = settle(board.bulk_complete(clock.now).await)?;
            BulkSummary::new(BulkAction::Complete, &report).write_to(writer)
        }
        CliCommand::Delete(args) => handle_delete(board, args, confirm, writer).await,
        CliCommand::Stats => render::write_stats(writer, &board.view(clock.today).stats),
        CliCommand::Categories => render::write_sidebar(writer, &board.view(clock.today).sidebar),
        CliCommand::Category(command) => handle_category(board, command, writer).await,
    }
}

fn handle_list<W: Write>(
    board: &TaskBoard,
    args: ListArgs,
    clock: Clock,
    writer: &mut W,
) -> Result<()> {
    if let Some(raw) = args.category.as_deref() {
        board.set_category_filter(resolve_filter(board, raw)?);
    }
    if let Some(search) = args.search {
        board.set_search(search);
    }
    render::write_rows(writer, &board.view(clock.today))
}

async fn handle_add<W: Write>(
    board: &TaskBoard,
    args: AddArgs,
    clock: Clock,
    writer: &mut W,
) -> Result<()> {
    let mut input = TaskInput::from(args);
    if let Some(raw) = input.category_id.take() {
        input.category_id = Some(resolve_category_id(board, &raw)?);
    }
    let task = settle(board.add_task(input, clock.today).await)?;
    writeln!(writer, "Added task {}", task.id)?;
    Ok(())
}

async fn handle_edit<W: Write>(
    board: &TaskBoard,
    args: EditArgs,
    clock: Clock,
    writer: &mut W,
) -> Result<()> {
    let category_id = match (args.category.as_deref(), args.uncategorize) {
        (Some(raw), _) => Some(Some(resolve_category_id(board, raw)?)),
        (None, true) => Some(None),
        (None, false) => None,
    };
    let due_date = args
        .due_date
        .as_deref()
        .map(|raw| parse_due_date(raw, clock.today))
        .transpose()?;
    let mut patch = TaskPatch::default();
    patch.title = args.title;
    patch.description = args.description;
    patch.category_id = category_id;
    patch.priority = args.priority;
    patch.due_date = due_date;
    if patch.is_empty() {
        bail!("Nothing to change: pass at least one field to edit");
    }

    let task = settle(board.update_task(&args.id, patch, clock.now).await)?;
    writeln!(writer, "Updated task {}", task.id)?;
    Ok(())
}

async fn handle_delete<W, C>(
    board: &TaskBoard,
    args: DeleteArgs,
    confirm: C,
    writer: &mut W,
) -> Result<()>
where
    W: Write,
    C: FnOnce(usize) -> bool,
{
    select_only(board, &args.ids);
    let yes = args.yes;
    match board.bulk_delete(|count| yes || confirm(count)).await {
        Outcome::Cancelled => {
            info!(count = args.ids.len(), "bulk delete cancelled");
            board.clear_selection();
            writeln!(writer, "Cancelled")?;
            Ok(())
        }
        outcome => {
            let report = settle(outcome)?;
            BulkSummary::new(BulkAction::Delete, &report).write_to(writer)
        }
    }
}

async fn handle_category<W: Write>(
    board: &TaskBoard,
    command: CategoryCommand,
    writer: &mut W,
) -> Result<()> {
    match command {
        CategoryCommand::Add(CategoryAddArgs { name, color }) => {
            let input = CategoryInput {
                name: name.join(" "),
                color,
            };
            let category = settle(board.add_category(input).await)?;
            writeln!(writer, "Added category {} {}", category.id, category.name)?;
        }
        CategoryCommand::Edit(CategoryEditArgs { id, name, color }) => {
            let id = resolve_category_id(board, &id)?;
            let category = settle(board.update_category(&id, CategoryPatch { name, color }).await)?;
            writeln!(writer, "Updated category {}", category.id)?;
        }
        CategoryCommand::Delete(args) => {
            let id = resolve_category_id(board, &args.id)?;
            settle(board.delete_category(&id).await)?;
            writeln!(writer, "Deleted category {id}")?;
        }
    }
    Ok(())
}

/// Turn a controller outcome into a command result; toasts carry the user-facing detail.
fn settle<T>(outcome: Outcome<T>) -> Result<T> {
    match outcome {
        Outcome::Applied(value) => Ok(value),
        Outcome::Rejected(err) => Err(err.into()),
        Outcome::Failed(message) => Err(anyhow!(message)),
        Outcome::Ignored => bail!("Nothing to do"),
        Outcome::Cancelled => bail!("Cancelled"),
    }
}

fn select_only(board: &TaskBoard, ids: &[String]) {
    board.clear_selection();
    for id in ids {
        // a repeated id toggles back off
        if !board.toggle_selection(id) {
            board.toggle_selection(id);
        }
    }
}

fn resolve_filter(board: &TaskBoard, raw: &str) -> Result<CategoryFilter> {
    if raw.trim().eq_ignore_ascii_case(ALL_CATEGORIES) {
        return Ok(CategoryFilter::All);
    }
    Ok(CategoryFilter::Category(resolve_category_id(board, raw)?))
}

/// Accept a category id or a case-insensitive name.
fn resolve_category_id(board: &TaskBoard, raw: &str) -> Result<String> {
    let needle = raw.trim();
    let state = board.snapshot();
    state
        .categories()
        .iter()
        .find(|category| category.id == needle)
        .or_else(|| {
            state
                .categories()
                .iter()
                .find(|category| category.name.eq_ignore_ascii_case(needle))
        })
        .map(|category| category.id.clone())
        .ok_or_else(|| anyhow!("Unknown category '{}'", needle))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BulkAction {
    Complete,
    Delete,
}

struct BulkSummary<'a> {
    action: BulkAction,
    report: &'a BulkReport,
}

impl<'a> BulkSummary<'a> {
    fn new(action: BulkAction, report: &'a BulkReport) -> Self {
        Self { action, report }
    }

    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writeln!(writer, "{self}")?;
        if !self.report.skipped.is_empty() {
            let label = match self.action {
                BulkAction::Complete => "Skipped (missing or already completed)",
                BulkAction::Delete => "Not found",
            };
            writeln!(writer, "{}: {}", label, self.report.skipped.join(", "))?;
        }
        if !self.report.failed.is_empty() {
            writeln!(writer, "Failed: {}", self.report.failed.join(", "))?;
        }
        Ok(())
    }
}

impl fmt::Display for BulkSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.report.succeeded.len();
        let verb = match self.action {
            BulkAction::Complete => "Completed",
            BulkAction::Delete => "Deleted",
        };
        match count {
            0 => write!(f, "No tasks {}", verb.to_lowercase()),
            1 => write!(f, "{verb} 1 task"),
            n => write!(f, "{verb} {n} tasks"),
        }
    }
}
