use std::collections::HashSet;

use crate::capture::ValidationError;
use crate::model::{Category, CategoryFilter, Task};
use crate::pipeline;
use crate::selection::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

/// Transient user-facing notification queued by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: ToastKind::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

/// Result of a controller operation. Errors never escape as `Err`; the toast outbox
/// carries the user-facing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    /// Nothing to do, or a submit for an entity that already has a mutation in flight.
    Ignored,
    Rejected(ValidationError),
    Cancelled,
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            _ => None,
        }
    }
}

/// Keys that guard against duplicate submits while a store call is outstanding.
pub mod keys {
    pub const CREATE_TASK: &str = "create:task";
    pub const CREATE_CATEGORY: &str = "create:category";

    pub fn task(id: &str) -> String {
        format!("task:{id}")
    }

    pub fn category(id: &str) -> String {
        format!("category:{id}")
    }
}

/// The single owned container for everything the board renders.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    tasks: Vec<Task>,
    categories: Vec<Category>,
    filter: CategoryFilter,
    search: String,
    selection: Selection,
    in_flight: HashSet<String>,
    load: LoadState,
    toasts: Vec<Toast>,
}

impl BoardState {
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn pending_toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.in_flight.contains(key)
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        pipeline::filter_and_sort(&self.tasks, &self.filter, &self.search)
    }

    pub(crate) fn replace_all(&mut self, tasks: Vec<Task>, categories: Vec<Category>) {
        self.tasks = tasks;
        self.categories = categories;
    }

    pub(crate) fn set_load_state(&mut self, load: LoadState) {
        self.load = load;
    }

    pub(crate) fn prepend_task(&mut self, task: Task) {
        self.tasks.insert(0, task);
    }

    /// Replace the task with the same id; returns false when it is no longer present.
    pub(crate) fn put_task(&mut self, task: Task) -> bool {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(slot) => {
                *slot = task;
                true
            }
            None => false,
        }
    }

    pub(crate) fn remove_task(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|task| task.id == id)?;
        self.selection.remove(id);
        Some(self.tasks.remove(index))
    }

    pub(crate) fn push_category(&mut self, category: Category) {
        self.categories.push(category);
    }

    pub(crate) fn put_category(&mut self, category: Category) -> bool {
        match self
            .categories
            .iter_mut()
            .find(|existing| existing.id == category.id)
        {
            Some(slot) => {
                *slot = category;
                true
            }
            None => false,
        }
    }

    /// Drop a category; tasks keep their reference. An active filter on it resets to all.
    pub(crate) fn remove_category(&mut self, id: &str) -> Option<Category> {
        let index = self
            .categories
            .iter()
            .position(|category| category.id == id)?;
        if matches!(&self.filter, CategoryFilter::Category(active) if active == id) {
            self.filter = CategoryFilter::All;
        }
        Some(self.categories.remove(index))
    }

    pub(crate) fn set_filter(&mut self, filter: CategoryFilter) {
        self.filter = filter;
    }

    pub(crate) fn set_search(&mut self, search: String) {
        self.search = search;
    }

    pub(crate) fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// Register an in-flight mutation; false when one with the same key is already pending.
    pub(crate) fn begin(&mut self, key: &str) -> bool {
        self.in_flight.insert(key.to_string())
    }

    pub(crate) fn finish(&mut self, key: &str) {
        self.in_flight.remove(key);
    }

    pub(crate) fn push_toast(&mut self, toast: Toast) {
        self.toasts.push(toast);
    }

    pub(crate) fn take_toasts(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn task(id: &str, category: Option<&str>) -> Task {
        Task {
            id: id.into(),
            title: id.into(),
            description: String::new(),
            category_id: category.map(str::to_string),
            priority: Priority::Low,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            completed: false,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            completed_at: None,
        }
    }

    fn category(id: &str) -> Category {
        Category {
            id: id.into(),
            name: id.into(),
            color: "#5B47E0".into(),
            task_count: 0,
        }
    }

    #[test]
    fn in_flight_keys_guard_duplicates() {
        let mut state = BoardState::default();
        assert!(state.begin(&keys::task("t1")));
        assert!(!state.begin(&keys::task("t1")));
        assert!(state.is_pending("task:t1"));
        state.finish(&keys::task("t1"));
        assert!(state.begin(&keys::task("t1")));
    }

    #[test]
    fn removing_a_task_drops_it_from_the_selection() {
        let mut state = BoardState::default();
        state.replace_all(vec![task("t1", None), task("t2", None)], Vec::new());
        state.selection_mut().toggle("t1");
        state.selection_mut().toggle("t2");

        assert_eq!(state.remove_task("t1").map(|task| task.id), Some("t1".into()));
        assert_eq!(state.selection().ids().to_vec(), vec!["t2"]);
        assert!(state.remove_task("t1").is_none());
    }

    #[test]
    fn removing_the_active_category_resets_the_filter() {
        let mut state = BoardState::default();
        state.replace_all(vec![task("t1", Some("work"))], vec![category("work"), category("home")]);
        state.set_filter(CategoryFilter::Category("work".into()));

        state.remove_category("work");
        assert_eq!(state.filter(), &CategoryFilter::All);
        assert_eq!(state.tasks()[0].category_id.as_deref(), Some("work"));

        state.set_filter(CategoryFilter::Category("home".into()));
        state.remove_category("missing");
        assert_eq!(state.filter(), &CategoryFilter::Category("home".into()));
    }

    #[test]
    fn toasts_drain_once() {
        let mut state = BoardState::default();
        state.push_toast(Toast::success("Task deleted"));
        assert_eq!(state.take_toasts(), vec![Toast::success("Task deleted")]);
        assert!(state.take_toasts().is_empty());
    }
}
