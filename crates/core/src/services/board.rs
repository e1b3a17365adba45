use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, Utc};
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::capture::{normalize_category_patch, normalize_task_patch, CategoryInput, TaskInput};
use crate::model::{Category, CategoryFilter, CategoryPatch, Task, TaskPatch};
use crate::repository::{CategoryRepository, TaskRepository};
use crate::store::{Collection, RecordStore, StoreError, StoreResult};
use crate::telemetry::{Event as TelemetryEvent, Handle as TelemetryHandle};
use crate::view::BoardView;

use super::state::{keys, BoardState, LoadState, Outcome, Toast};

/// Per-id results of a bulk action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Unknown, already-completed, or busy ids that were left alone.
    pub skipped: Vec<String>,
}

/// Await `mutation`; when it fails, run `reload` before handing the error back so local
/// state matches the store again.
pub async fn mutate_then_reconcile<T, M, R, RFut>(mutation: M, reload: R) -> StoreResult<T>
where
    M: Future<Output = StoreResult<T>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = ()>,
{
    match mutation.await {
        Ok(value) => Ok(value),
        Err(err) => {
            reload().await;
            Err(err)
        }
    }
}

/// Optimistic mutation controller over the task and category repositories.
///
/// Every method takes `&self`: state lives behind a mutex that is never held across an
/// await, so overlapping calls on one task interleave the way UI events would.
pub struct TaskBoard {
    tasks: TaskRepository,
    categories: CategoryRepository,
    state: Mutex<BoardState>,
    telemetry: TelemetryHandle,
}

impl TaskBoard {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            tasks: TaskRepository::new(Arc::clone(&store)),
            categories: CategoryRepository::new(store),
            state: Mutex::new(BoardState::default()),
            telemetry: TelemetryHandle::new(),
        }
    }

    pub fn task_repository(&self) -> &TaskRepository {
        &self.tasks
    }

    pub fn category_repository(&self) -> &CategoryRepository {
        &self.categories
    }

    pub fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> BoardState {
        self.state.lock().clone()
    }

    pub fn view(&self, today: NaiveDate) -> BoardView {
        BoardView::build(&self.state.lock(), today)
    }

    pub fn take_toasts(&self) -> Vec<Toast> {
        self.state.lock().take_toasts()
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.state.lock().is_pending(key)
    }

    pub async fn load(&self) -> Outcome<()> {
        self.state.lock().set_load_state(LoadState::Loading);
        match self.fetch_all().await {
            Ok((tasks, categories)) => {
                info!(
                    tasks = tasks.len(),
                    categories = categories.len(),
                    "board loaded"
                );
                self.telemetry.record(TelemetryEvent::Loaded {
                    tasks: tasks.len(),
                    categories: categories.len(),
                });
                let mut state = self.state.lock();
                state.replace_all(tasks, categories);
                state.set_load_state(LoadState::Ready);
                Outcome::Applied(())
            }
            Err(err) => {
                warn!(error = %err, "failed to load board");
                self.telemetry
                    .record(TelemetryEvent::LoadFailed(err.to_string()));
                let mut state = self.state.lock();
                state.set_load_state(LoadState::Failed(err.to_string()));
                state.push_toast(Toast::error("Failed to load tasks"));
                Outcome::Failed(err.to_string())
            }
        }
    }

    pub async fn add_task(&self, input: TaskInput, today: NaiveDate) -> Outcome<Task> {
        let default_category = self
            .state
            .lock()
            .categories()
            .first()
            .map(|category| category.id.clone());
        let draft = match input.into_new_task(today, default_category.as_deref()) {
            Ok(draft) => draft,
            Err(err) => return Outcome::Rejected(err),
        };
        if !self.state.lock().begin(keys::CREATE_TASK) {
            return Outcome::Ignored;
        }

        let result = self.tasks.create(&draft).await;
        let mut state = self.state.lock();
        state.finish(keys::CREATE_TASK);
        match result {
            Ok(task) => {
                info!(task_id = task.id.as_str(), "task added");
                self.telemetry
                    .record(TelemetryEvent::MutationApplied("add task".into()));
                state.prepend_task(task.clone());
                state.push_toast(Toast::success("Task added successfully!"));
                Outcome::Applied(task)
            }
            Err(err) => {
                self.report_failure(&mut state, "add task", &err, "Failed to add task");
                Outcome::Failed(err.to_string())
            }
        }
    }

    pub async fn update_task(
        &self,
        id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Outcome<Task> {
        let patch = match normalize_task_patch(patch) {
            Ok(patch) => patch,
            Err(err) => return Outcome::Rejected(err),
        };
        if patch.is_empty() {
            return Outcome::Ignored;
        }
        let key = keys::task(id);
        let delta = {
            let mut state = self.state.lock();
            if state.is_pending(&key) {
                return Outcome::Ignored;
            }
            let Some(current) = state.task(id).cloned() else {
                let err = StoreError::not_found(Collection::Tasks, id);
                self.report_failure(&mut state, "update task", &err, "Failed to update task");
                return Outcome::Failed(err.to_string());
            };
            let (merged, delta) = current.apply_patch(&patch, now);
            state.begin(&key);
            state.put_task(merged);
            delta
        };

        let result = mutate_then_reconcile(self.tasks.update(id, &delta), || {
            self.reconcile("update task")
        })
        .await;

        let mut state = self.state.lock();
        state.finish(&key);
        match result {
            Ok(stored) => {
                info!(task_id = id, "task updated");
                self.telemetry
                    .record(TelemetryEvent::MutationApplied("update task".into()));
                state.put_task(stored.clone());
                match patch.completed {
                    Some(true) => state.push_toast(Toast::success("Task completed!")),
                    Some(false) => {}
                    None => state.push_toast(Toast::success("Task updated successfully!")),
                }
                Outcome::Applied(stored)
            }
            Err(err) => {
                self.report_failure(&mut state, "update task", &err, "Failed to update task");
                Outcome::Failed(err.to_string())
            }
        }
    }

    pub async fn toggle_complete(&self, id: &str, now: DateTime<Utc>) -> Outcome<Task> {
        let completed = self.state.lock().task(id).map(|task| task.completed);
        match completed {
            Some(completed) => {
                self.update_task(id, TaskPatch::completion(!completed), now)
                    .await
            }
            None => {
                let err = StoreError::not_found(Collection::Tasks, id);
                let mut state = self.state.lock();
                self.report_failure(&mut state, "update task", &err, "Failed to update task");
                Outcome::Failed(err.to_string())
            }
        }
    }

    pub async fn delete_task(&self, id: &str) -> Outcome<()> {
        let key = keys::task(id);
        {
            let mut state = self.state.lock();
            if !state.begin(&key) {
                return Outcome::Ignored;
            }
            state.remove_task(id);
        }

        let result =
            mutate_then_reconcile(self.tasks.delete(id), || self.reconcile("delete task")).await;

        let mut state = self.state.lock();
        state.finish(&key);
        match result {
            Ok(()) => {
                info!(task_id = id, "task deleted");
                self.telemetry
                    .record(TelemetryEvent::MutationApplied("delete task".into()));
                state.push_toast(Toast::success("Task deleted"));
                Outcome::Applied(())
            }
            Err(err) => {
                self.report_failure(&mut state, "delete task", &err, "Failed to delete task");
                Outcome::Failed(err.to_string())
            }
        }
    }

    /// Complete every selected task that is still open. Store calls run concurrently; a
    /// failure in one leaves the others applied.
    pub async fn bulk_complete(&self, now: DateTime<Utc>) -> Outcome<BulkReport> {
        let mut report = BulkReport::default();
        let pending = {
            let mut state = self.state.lock();
            if state.selection().is_empty() {
                return Outcome::Ignored;
            }
            let ids = state.selection().ids().to_vec();
            let mut pending = Vec::new();
            for id in ids {
                let key = keys::task(&id);
                let open = state
                    .task(&id)
                    .filter(|task| !task.completed)
                    .cloned();
                match open {
                    Some(task) if state.begin(&key) => {
                        let (merged, delta) = task.apply_patch(&TaskPatch::completion(true), now);
                        state.put_task(merged);
                        pending.push((id, delta));
                    }
                    _ => report.skipped.push(id),
                }
            }
            pending
        };

        let results = join_all(
            pending
                .iter()
                .map(|(id, delta)| self.tasks.update(id, delta)),
        )
        .await;

        let mut failures = Vec::new();
        {
            let mut state = self.state.lock();
            for ((id, _), result) in pending.iter().zip(results) {
                state.finish(&keys::task(id));
                match result {
                    Ok(stored) => {
                        state.put_task(stored);
                        report.succeeded.push(id.clone());
                    }
                    Err(err) => failures.push((id.clone(), err)),
                }
            }
        }

        self.finish_bulk(
            "complete tasks",
            &mut report,
            failures,
            "Failed to update task",
            |count| match count {
                1 => "Task completed!".to_string(),
                n => format!("{n} tasks completed!"),
            },
        )
        .await;
        Outcome::Applied(report)
    }

    /// Delete every selected task once `confirm` (given the selection size) agrees.
    pub async fn bulk_delete<F>(&self, confirm: F) -> Outcome<BulkReport>
    where
        F: FnOnce(usize) -> bool,
    {
        let selected = self.state.lock().selection().len();
        if selected == 0 {
            return Outcome::Ignored;
        }
        if !confirm(selected) {
            return Outcome::Cancelled;
        }

        let mut report = BulkReport::default();
        let pending = {
            let mut state = self.state.lock();
            let ids = state.selection().ids().to_vec();
            let mut pending = Vec::new();
            for id in ids {
                if state.task(&id).is_some() && state.begin(&keys::task(&id)) {
                    state.remove_task(&id);
                    pending.push(id);
                } else {
                    report.skipped.push(id);
                }
            }
            pending
        };

        let results = join_all(pending.iter().map(|id| self.tasks.delete(id))).await;

        let mut failures = Vec::new();
        {
            let mut state = self.state.lock();
            for (id, result) in pending.iter().zip(results) {
                state.finish(&keys::task(id));
                match result {
                    Ok(()) => report.succeeded.push(id.clone()),
                    Err(err) => failures.push((id.clone(), err)),
                }
            }
        }

        self.finish_bulk(
            "delete tasks",
            &mut report,
            failures,
            "Failed to delete task",
            |count| match count {
                1 => "Task deleted".to_string(),
                n => format!("{n} tasks deleted"),
            },
        )
        .await;
        Outcome::Applied(report)
    }

    pub async fn add_category(&self, input: CategoryInput) -> Outcome<Category> {
        let draft = match input.into_new_category() {
            Ok(draft) => draft,
            Err(err) => return Outcome::Rejected(err),
        };
        if !self.state.lock().begin(keys::CREATE_CATEGORY) {
            return Outcome::Ignored;
        }

        let result = self.categories.create(&draft).await;
        let mut state = self.state.lock();
        state.finish(keys::CREATE_CATEGORY);
        match result {
            Ok(category) => {
                info!(category_id = category.id.as_str(), "category added");
                self.telemetry
                    .record(TelemetryEvent::MutationApplied("add category".into()));
                state.push_category(category.clone());
                state.push_toast(Toast::success("Category added successfully!"));
                Outcome::Applied(category)
            }
            Err(err) => {
                self.report_failure(&mut state, "add category", &err, "Failed to add category");
                Outcome::Failed(err.to_string())
            }
        }
    }

    pub async fn update_category(&self, id: &str, patch: CategoryPatch) -> Outcome<Category> {
        let patch = match normalize_category_patch(patch) {
            Ok(patch) => patch,
            Err(err) => return Outcome::Rejected(err),
        };
        if patch.is_empty() {
            return Outcome::Ignored;
        }
        let key = keys::category(id);
        {
            let mut state = self.state.lock();
            if state.is_pending(&key) {
                return Outcome::Ignored;
            }
            let Some(current) = state.category(id).cloned() else {
                let err = StoreError::not_found(Collection::Categories, id);
                self.report_failure(
                    &mut state,
                    "update category",
                    &err,
                    "Failed to update category",
                );
                return Outcome::Failed(err.to_string());
            };
            state.begin(&key);
            state.put_category(current.apply_patch(&patch));
        }

        let result = mutate_then_reconcile(self.categories.update(id, &patch), || {
            self.reconcile("update category")
        })
        .await;

        let mut state = self.state.lock();
        state.finish(&key);
        match result {
            Ok(stored) => {
                self.telemetry
                    .record(TelemetryEvent::MutationApplied("update category".into()));
                state.put_category(stored.clone());
                state.push_toast(Toast::success("Category updated successfully!"));
                Outcome::Applied(stored)
            }
            Err(err) => {
                self.report_failure(
                    &mut state,
                    "update category",
                    &err,
                    "Failed to update category",
                );
                Outcome::Failed(err.to_string())
            }
        }
    }

    /// Remove a category. Tasks that reference it are left as they are.
    pub async fn delete_category(&self, id: &str) -> Outcome<()> {
        let key = keys::category(id);
        {
            let mut state = self.state.lock();
            if !state.begin(&key) {
                return Outcome::Ignored;
            }
            state.remove_category(id);
        }

        let result = mutate_then_reconcile(self.categories.delete(id), || {
            self.reconcile("delete category")
        })
        .await;

        let mut state = self.state.lock();
        state.finish(&key);
        match result {
            Ok(()) => {
                self.telemetry
                    .record(TelemetryEvent::MutationApplied("delete category".into()));
                state.push_toast(Toast::success("Category deleted"));
                Outcome::Applied(())
            }
            Err(err) => {
                self.report_failure(
                    &mut state,
                    "delete category",
                    &err,
                    "Failed to delete category",
                );
                Outcome::Failed(err.to_string())
            }
        }
    }

    pub fn set_category_filter(&self, filter: CategoryFilter) {
        self.telemetry
            .record(TelemetryEvent::FilterChanged(filter.to_string()));
        self.state.lock().set_filter(filter);
    }

    pub fn set_search(&self, search: impl Into<String>) {
        self.state.lock().set_search(search.into());
    }

    pub fn clear_filters(&self) {
        let mut state = self.state.lock();
        state.set_search(String::new());
        state.set_filter(CategoryFilter::All);
    }

    /// Returns whether `id` is selected afterwards.
    pub fn toggle_selection(&self, id: &str) -> bool {
        self.state.lock().selection_mut().toggle(id)
    }

    pub fn clear_selection(&self) {
        self.state.lock().selection_mut().clear();
    }

    async fn fetch_all(&self) -> StoreResult<(Vec<Task>, Vec<Category>)> {
        futures::try_join!(self.tasks.get_all(), self.categories.get_all())
    }

    /// Discard local state in favour of the store's. A failed reload keeps what we have.
    async fn reconcile(&self, action: &str) {
        match self.fetch_all().await {
            Ok((tasks, categories)) => {
                info!(action, "reconciled board with store");
                self.telemetry.record(TelemetryEvent::Reconciled {
                    action: action.to_string(),
                });
                self.state.lock().replace_all(tasks, categories);
            }
            Err(err) => {
                warn!(action, error = %err, "reload after failed mutation also failed");
                self.telemetry
                    .record(TelemetryEvent::LoadFailed(err.to_string()));
                self.state
                    .lock()
                    .push_toast(Toast::error("Failed to load tasks"));
            }
        }
    }

    async fn finish_bulk(
        &self,
        action: &str,
        report: &mut BulkReport,
        failures: Vec<(String, StoreError)>,
        failure_toast: &str,
        success_toast: impl FnOnce(usize) -> String,
    ) {
        if !failures.is_empty() {
            self.reconcile(action).await;
        }
        self.telemetry.record(TelemetryEvent::BulkFinished {
            action: action.to_string(),
            succeeded: report.succeeded.len(),
            failed: failures.len(),
        });

        let mut state = self.state.lock();
        for (id, err) in failures {
            warn!(action, task_id = id.as_str(), error = %err, "bulk item failed");
            self.telemetry.record(TelemetryEvent::MutationFailed {
                action: action.to_string(),
                error: err.to_string(),
            });
            state.push_toast(Toast::error(failure_toast));
            report.failed.push(id);
        }
        if !report.succeeded.is_empty() {
            state.push_toast(Toast::success(success_toast(report.succeeded.len())));
        }
        state.selection_mut().clear();
    }

    fn report_failure(
        &self,
        state: &mut BoardState,
        action: &str,
        err: &StoreError,
        toast: &str,
    ) {
        warn!(action, error = %err, "mutation failed");
        self.telemetry.record(TelemetryEvent::MutationFailed {
            action: action.to_string(),
            error: err.to_string(),
        });
        state.push_toast(Toast::error(toast));
    }
}

/// Today's date in the local timezone, as the board's date-sensitive views expect.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
