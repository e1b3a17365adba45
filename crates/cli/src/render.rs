//! Plain-text rendering of board snapshots.

use std::io::Write;

use anyhow::Result;

use crate::core::view::{BoardView, EmptyState, ProgressStats, SidebarEntry, TaskRow};
use crate::services::{Toast, ToastKind};

pub fn write_rows<W: Write>(writer: &mut W, view: &BoardView) -> Result<()> {
    if let Some(empty) = &view.empty {
        return write_empty(writer, empty);
    }
    for row in &view.rows {
        writeln!(writer, "{}", row_line(row))?;
    }
    Ok(())
}

pub fn row_line(row: &TaskRow) -> String {
    let mark = if row.task.completed { "[x]" } else { "[ ]" };
    let due = if row.is_overdue && !row.task.completed {
        format!("{}!", row.due_label)
    } else {
        row.due_label.clone()
    };
    format!(
        "{mark} {id}  {title}  ({priority}, {category}, {due})",
        id = row.task.id,
        title = row.task.title,
        priority = row.task.priority,
        category = row.category_name(),
    )
}

pub fn write_empty<W: Write>(writer: &mut W, empty: &EmptyState) -> Result<()> {
    writeln!(writer, "{}", empty.title())?;
    writeln!(writer, "{}", empty.hint())?;
    Ok(())
}

pub fn write_stats<W: Write>(writer: &mut W, stats: &ProgressStats) -> Result<()> {
    writeln!(
        writer,
        "Total: {}  Completed: {}  Pending: {}  Progress: {}%",
        stats.total, stats.completed, stats.pending, stats.percent_complete
    )?;
    writeln!(writer, "{} tasks completed today", stats.completed_today)?;
    Ok(())
}

pub fn write_sidebar<W: Write>(writer: &mut W, sidebar: &[SidebarEntry]) -> Result<()> {
    for entry in sidebar {
        let marker = if entry.active { "*" } else { " " };
        writeln!(
            writer,
            "{marker} {name} ({count})  {color}  {id}",
            name = entry.name,
            count = entry.count,
            color = entry.color,
            id = entry.filter,
        )?;
    }
    Ok(())
}

pub fn write_toasts<W: Write>(writer: &mut W, toasts: &[Toast]) -> Result<()> {
    for toast in toasts {
        match toast.kind {
            ToastKind::Success => writeln!(writer, "{}", toast.message)?,
            ToastKind::Error => writeln!(writer, "error: {}", toast.message)?,
        }
    }
    Ok(())
}
