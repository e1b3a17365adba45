use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::{normalize_category_id, CategoryPatch, NewCategory, NewTask, Priority, TaskPatch};

/// Badge color used when a category is created without one.
pub const DEFAULT_CATEGORY_COLOR: &str = "#6B7280";

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#(?:[0-9A-Fa-f]{3}|[0-9A-Fa-f]{6})$").expect("valid color regex"));

static RELATIVE_DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+(\d{1,4})d$").expect("valid relative date regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task title cannot be empty")]
    EmptyTitle,
    #[error("Category name cannot be empty")]
    EmptyCategoryName,
    #[error("Invalid color '{0}': expected #RGB or #RRGGBB")]
    InvalidColor(String),
    #[error("Invalid priority '{0}': expected low|medium|high or 1|2|3")]
    InvalidPriority(String),
    #[error("Invalid date '{0}': expected YYYY-MM-DD, today, tomorrow or +Nd")]
    InvalidDate(String),
}

/// Raw quick-add form values, shared by every surface that creates tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<String>,
}

impl TaskInput {
    pub fn require_title(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(())
    }

    /// Validate the form and fill in quick-add defaults: low priority, due today, and
    /// `default_category` when no category was picked.
    pub fn into_new_task(
        self,
        today: NaiveDate,
        default_category: Option<&str>,
    ) -> Result<NewTask, ValidationError> {
        self.require_title()?;
        let due_date = match self.due_date.as_deref() {
            Some(raw) => parse_due_date(raw, today)?,
            None => today,
        };
        let category_id = normalize_category_id(self.category_id)
            .or_else(|| default_category.map(str::to_string));

        Ok(NewTask {
            title: self.title.trim().to_string(),
            description: self.description.unwrap_or_default().trim().to_string(),
            category_id,
            priority: self.priority.unwrap_or_default(),
            due_date,
        })
    }
}

/// Reject edits that would blank out the title.
pub fn validate_task_patch(patch: &TaskPatch) -> Result<(), ValidationError> {
    match &patch.title {
        Some(title) if title.trim().is_empty() => Err(ValidationError::EmptyTitle),
        _ => Ok(()),
    }
}

/// Validate an edit and trim its text fields; a blank category id clears the category.
pub fn normalize_task_patch(patch: TaskPatch) -> Result<TaskPatch, ValidationError> {
    validate_task_patch(&patch)?;
    Ok(TaskPatch {
        title: patch.title.map(|title| title.trim().to_string()),
        description: patch.description.map(|text| text.trim().to_string()),
        category_id: patch.category_id.map(normalize_category_id),
        ..patch
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub color: Option<String>,
}

impl CategoryInput {
    pub fn into_new_category(self) -> Result<NewCategory, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyCategoryName);
        }
        let color = match self.color {
            Some(color) => validate_color(&color)?,
            None => DEFAULT_CATEGORY_COLOR.to_string(),
        };
        Ok(NewCategory {
            name: name.to_string(),
            color,
        })
    }
}

pub fn validate_category_patch(patch: &CategoryPatch) -> Result<(), ValidationError> {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyCategoryName);
        }
    }
    if let Some(color) = &patch.color {
        validate_color(color)?;
    }
    Ok(())
}

pub fn normalize_category_patch(patch: CategoryPatch) -> Result<CategoryPatch, ValidationError> {
    validate_category_patch(&patch)?;
    Ok(CategoryPatch {
        name: patch.name.map(|name| name.trim().to_string()),
        color: patch.color.map(|color| color.trim().to_ascii_uppercase()),
    })
}

pub fn validate_color(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if HEX_COLOR.is_match(trimmed) {
        Ok(trimmed.to_ascii_uppercase())
    } else {
        Err(ValidationError::InvalidColor(raw.to_string()))
    }
}

pub fn parse_priority(raw: &str) -> Result<Priority, ValidationError> {
    raw.parse::<Priority>()
        .map_err(|_| ValidationError::InvalidPriority(raw.to_string()))
}

pub fn parse_due_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim().to_ascii_lowercase();
    match trimmed.as_str() {
        "today" => return Ok(today),
        "tomorrow" => return Ok(today + Duration::days(1)),
        _ => {}
    }
    if let Some(caps) = RELATIVE_DAYS.captures(&trimmed) {
        let days: i64 = caps[1]
            .parse()
            .map_err(|_| ValidationError::InvalidDate(raw.to_string()))?;
        return Ok(today + Duration::days(days));
    }
    NaiveDate::parse_from_str(&trimmed, "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}
