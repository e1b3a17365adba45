//! Read-only presentation snapshot derived from [`BoardState`].

use chrono::NaiveDate;

use crate::model::{Category, CategoryFilter, Task};
use crate::services::{BoardState, LoadState};

pub const ALL_TASKS_LABEL: &str = "All Tasks";
pub const ALL_TASKS_COLOR: &str = "#6B7280";
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub task: Task,
    /// `None` when the task has no category or references one that no longer exists.
    pub category: Option<Category>,
    pub is_overdue: bool,
    pub is_due_today: bool,
    pub selected: bool,
    pub due_label: String,
}

impl TaskRow {
    pub fn category_name(&self) -> &str {
        self.category
            .as_ref()
            .map(|category| category.name.as_str())
            .unwrap_or(UNCATEGORIZED_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidebarEntry {
    pub filter: CategoryFilter,
    pub name: String,
    pub color: String,
    pub count: usize,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub percent_complete: u8,
    pub completed_today: usize,
}

impl ProgressStats {
    pub fn from_tasks(tasks: &[Task], today: NaiveDate) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|task| task.completed).count();
        let completed_today = tasks.iter().filter(|task| task.completed_on(today)).count();
        Self {
            total,
            completed,
            pending: total - completed,
            percent_complete: percent(completed, total),
            completed_today,
        }
    }
}

/// Why the visible list is empty, in display precedence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmptyState {
    NoSearchMatches { query: String },
    EmptyCategory,
    NoTasks,
}

impl EmptyState {
    pub fn title(&self) -> &'static str {
        match self {
            EmptyState::NoSearchMatches { .. } => "No tasks found",
            EmptyState::EmptyCategory => "No tasks in this category",
            EmptyState::NoTasks => "Ready to get productive?",
        }
    }

    pub fn hint(&self) -> String {
        match self {
            EmptyState::NoSearchMatches { query } => {
                format!("No tasks match your search for \"{query}\"")
            }
            EmptyState::EmptyCategory => {
                "Create your first task in this category to see it here".to_string()
            }
            EmptyState::NoTasks => "Start by adding your first task".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView {
    pub rows: Vec<TaskRow>,
    pub sidebar: Vec<SidebarEntry>,
    pub stats: ProgressStats,
    pub empty: Option<EmptyState>,
    pub selected_count: usize,
    pub load: LoadState,
}

impl BoardView {
    pub fn build(state: &BoardState, today: NaiveDate) -> Self {
        let rows: Vec<TaskRow> = state
            .visible_tasks()
            .into_iter()
            .map(|task| TaskRow {
                category: task
                    .category_id
                    .as_deref()
                    .and_then(|id| state.category(id))
                    .cloned(),
                is_overdue: task.is_overdue(today),
                is_due_today: task.is_due_today(today),
                selected: state.selection().contains(&task.id),
                due_label: due_label(task, today),
                task: task.clone(),
            })
            .collect();

        let empty = if rows.is_empty() {
            Some(empty_state(state))
        } else {
            None
        };

        Self {
            rows,
            sidebar: sidebar(state),
            stats: ProgressStats::from_tasks(state.tasks(), today),
            empty,
            selected_count: state.selection().len(),
            load: state.load_state().clone(),
        }
    }
}

/// "Due today", "Overdue", or the short month/day form such as `Mar 3`.
pub fn due_label(task: &Task, today: NaiveDate) -> String {
    if task.is_due_today(today) {
        "Due today".to_string()
    } else if task.is_overdue(today) {
        "Overdue".to_string()
    } else {
        task.due_date.format("%b %-d").to_string()
    }
}

fn empty_state(state: &BoardState) -> EmptyState {
    if !state.search().trim().is_empty() {
        EmptyState::NoSearchMatches {
            query: state.search().to_string(),
        }
    } else if !state.filter().is_all() {
        EmptyState::EmptyCategory
    } else {
        EmptyState::NoTasks
    }
}

fn sidebar(state: &BoardState) -> Vec<SidebarEntry> {
    let tasks = state.tasks();
    let mut entries = Vec::with_capacity(state.categories().len() + 1);
    entries.push(SidebarEntry {
        filter: CategoryFilter::All,
        name: ALL_TASKS_LABEL.to_string(),
        color: ALL_TASKS_COLOR.to_string(),
        count: tasks.len(),
        active: state.filter().is_all(),
    });
    for category in state.categories() {
        let filter = CategoryFilter::Category(category.id.clone());
        entries.push(SidebarEntry {
            count: tasks.iter().filter(|task| filter.matches(task)).count(),
            active: state.filter() == &filter,
            name: category.name.clone(),
            color: category.color.clone(),
            filter,
        });
    }
    entries
}

fn percent(part: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((part * 200 + total) / (total * 2)) as u8
}
