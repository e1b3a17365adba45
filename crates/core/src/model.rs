use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.value()
    }
}

impl TryFrom<u8> for Priority {
    type Error = anyhow::Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(anyhow!("Unknown priority {}: expected 1|2|3", other)),
        }
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "low" => Ok(Priority::Low),
            "2" | "med" | "medium" => Ok(Priority::Medium),
            "3" | "high" => Ok(Priority::High),
            other => Err(anyhow!(
                "Unknown priority '{}': expected low|medium|high or 1|2|3",
                other
            )),
        }
    }
}

impl ValueEnum for Priority {
    fn value_variants<'a>() -> &'a [Self] {
        const VARIANTS: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];
        &VARIANTS
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        let value = clap::builder::PossibleValue::new(self.as_str());
        Some(match self {
            Priority::Low => value.alias("1"),
            Priority::Medium => value.aliases(["2", "med"]),
            Priority::High => value.alias("3"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub category_id: Option<String>,
    pub priority: Priority,
    pub due_date: NaiveDate,
    #[serde(default, deserialize_with = "null_as_default")]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Merge `patch` into a copy of this task and derive the store-bound delta.
    ///
    /// A false→true transition of `completed` stamps `completed_at` with `now`, a
    /// true→false transition clears it. The returned delta carries the requested fields
    /// plus `completedAt` whenever such a transition happened.
    pub fn apply_patch(&self, patch: &TaskPatch, now: DateTime<Utc>) -> (Task, TaskPatch) {
        let mut merged = self.clone();
        let mut delta = patch.clone();
        delta.completed_at = None;

        if let Some(title) = &patch.title {
            merged.title = title.clone();
        }
        if let Some(description) = &patch.description {
            merged.description = description.clone();
        }
        if let Some(category_id) = &patch.category_id {
            merged.category_id = normalize_category_id(category_id.clone());
        }
        if let Some(priority) = patch.priority {
            merged.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            merged.due_date = due_date;
        }
        if let Some(completed) = patch.completed {
            match (self.completed, completed) {
                (false, true) => {
                    merged.completed_at = Some(now);
                    delta.completed_at = Some(Some(now));
                }
                (true, false) => {
                    merged.completed_at = None;
                    delta.completed_at = Some(None);
                }
                _ => {}
            }
            merged.completed = completed;
        }

        (merged, delta)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.due_date < today
    }

    pub fn is_due_today(&self, today: NaiveDate) -> bool {
        self.due_date == today
    }

    /// Completed tasks count towards "today" using their completion stamp, falling back
    /// to the creation stamp for records written before `completedAt` existed.
    pub fn completed_on(&self, today: NaiveDate) -> bool {
        if !self.completed {
            return false;
        }
        let stamp = self.completed_at.unwrap_or(self.created_at);
        stamp.with_timezone(&Local).date_naive() == today
    }

    pub fn matches_search(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category_id: Option<String>,
    pub priority: Priority,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `Some(None)` clears the category reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) completed_at: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.completed.is_none()
    }

    /// True when the patch only flips the completion flag.
    pub fn is_completion_only(&self) -> bool {
        self.completed.is_some()
            && self.title.is_none()
            && self.description.is_none()
            && self.category_id.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
    }

    pub fn completed_at(&self) -> Option<Option<DateTime<Utc>>> {
        self.completed_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    pub color: String,
    /// Informational only; views count tasks live.
    #[serde(default, deserialize_with = "null_as_default")]
    pub task_count: u32,
}

impl Category {
    pub fn apply_patch(&self, patch: &CategoryPatch) -> Category {
        let mut merged = self.clone();
        if let Some(name) = &patch.name {
            merged.name = name.clone();
        }
        if let Some(color) = &patch.color {
            merged.color = color.clone();
        }
        merged
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CategoryPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

pub const ALL_CATEGORIES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum CategoryFilter {
    #[default]
    All,
    Category(String),
}

impl CategoryFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(id) => task.category_id.as_deref() == Some(id.as_str()),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CategoryFilter::All)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CategoryFilter::All => ALL_CATEGORIES,
            CategoryFilter::Category(id) => id.as_str(),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CategoryFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Category filter cannot be empty"));
        }
        if trimmed.eq_ignore_ascii_case(ALL_CATEGORIES) {
            Ok(CategoryFilter::All)
        } else {
            Ok(CategoryFilter::Category(trimmed.to_string()))
        }
    }
}

pub(crate) fn normalize_category_id(raw: Option<String>) -> Option<String> {
    raw.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(normalize_category_id(Option::<String>::deserialize(
        deserializer,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn sample_task() -> Task {
        Task {
            id: "task_1".into(),
            title: "Buy milk".into(),
            description: String::new(),
            category_id: Some("cat1".into()),
            priority: Priority::Medium,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            completed: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
            completed_at: None,
        }
    }

    #[rstest]
    #[case("1", Priority::Low)]
    #[case("low", Priority::Low)]
    #[case("MED", Priority::Medium)]
    #[case("2", Priority::Medium)]
    #[case("High", Priority::High)]
    fn priority_parses_names_and_numbers(#[case] raw: &str, #[case] expected: Priority) {
        assert_eq!(raw.parse::<Priority>().unwrap(), expected);
    }

    #[test]
    fn priority_rejects_out_of_range_values() {
        assert!(Priority::try_from(0).is_err());
        assert!(Priority::try_from(4).is_err());
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn task_serializes_with_camel_case_wire_names() {
        let value = serde_json::to_value(sample_task()).unwrap();
        assert_eq!(value["categoryId"], json!("cat1"));
        assert_eq!(value["dueDate"], json!("2024-01-10"));
        assert_eq!(value["priority"], json!(2));
        assert_eq!(value["completedAt"], json!(null));
    }

    #[test]
    fn task_decodes_loose_records() {
        let task: Task = serde_json::from_value(json!({
            "id": "task_9",
            "title": "Water plants",
            "description": null,
            "categoryId": "",
            "priority": 3,
            "dueDate": "2024-02-01",
            "createdAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(task.description, "");
        assert_eq!(task.category_id, None);
        assert!(!task.completed);
        assert_eq!(task.completed_at, None);
    }

    #[test]
    fn completing_stamps_and_reopening_clears() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let task = sample_task();

        let (done, delta) = task.apply_patch(&TaskPatch::completion(true), now);
        assert!(done.completed);
        assert_eq!(done.completed_at, Some(now));
        assert_eq!(delta.completed_at(), Some(Some(now)));

        let (reopened, delta) = done.apply_patch(&TaskPatch::completion(false), now);
        assert!(!reopened.completed);
        assert_eq!(reopened.completed_at, None);
        assert_eq!(delta.completed_at(), Some(None));
        assert_eq!(reopened.completed, task.completed);
    }

    #[test]
    fn editing_a_completed_task_keeps_its_stamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
        let (done, _) = sample_task().apply_patch(&TaskPatch::completion(true), now);
        let later = now + chrono::Duration::hours(3);
        let patch = TaskPatch {
            title: Some("Buy oat milk".into()),
            ..TaskPatch::default()
        };
        let (edited, delta) = done.apply_patch(&patch, later);
        assert_eq!(edited.completed_at, Some(now));
        assert_eq!(delta.completed_at(), None);
        assert_eq!(
            serde_json::to_value(&delta).unwrap(),
            json!({ "title": "Buy oat milk" })
        );
    }

    #[test]
    fn clearing_category_serializes_null() {
        let patch = TaskPatch {
            category_id: Some(None),
            ..TaskPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "categoryId": null })
        );
        let (task, _) = sample_task().apply_patch(&patch, Utc::now());
        assert_eq!(task.category_id, None);
    }

    #[rstest]
    #[case(2024, 1, 9, false, true)]
    #[case(2024, 1, 10, false, false)]
    #[case(2024, 1, 11, false, false)]
    #[case(2024, 1, 9, true, false)]
    fn overdue_means_strictly_before_today(
        #[case] y: i32,
        #[case] m: u32,
        #[case] d: u32,
        #[case] completed: bool,
        #[case] expected: bool,
    ) {
        let mut task = sample_task();
        task.due_date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        task.completed = completed;
        let today = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(task.is_overdue(today), expected);
    }

    #[test]
    fn completed_on_falls_back_to_creation_stamp() {
        let mut task = sample_task();
        task.completed = true;
        let created_local = task.created_at.with_timezone(&Local).date_naive();
        assert!(task.completed_on(created_local));

        let stamp = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        task.completed_at = Some(stamp);
        assert!(task.completed_on(stamp.with_timezone(&Local).date_naive()));
        assert!(!task.completed_on(created_local));
    }

    #[test]
    fn category_filter_round_trips_through_strings() {
        assert_eq!("all".parse::<CategoryFilter>().unwrap(), CategoryFilter::All);
        assert_eq!(
            "cat1".parse::<CategoryFilter>().unwrap(),
            CategoryFilter::Category("cat1".into())
        );
        assert_eq!(CategoryFilter::Category("cat1".into()).to_string(), "cat1");
        assert!("  ".parse::<CategoryFilter>().is_err());
    }
}
