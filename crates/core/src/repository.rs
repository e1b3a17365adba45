use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::model::{Category, CategoryPatch, NewCategory, NewTask, Task, TaskPatch};
use crate::store::{Collection, Record, RecordStore, StoreError, StoreResult};

/// A typed record living in one store collection.
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    type Draft: Serialize + Send + Sync;
    type Patch: Serialize + Send + Sync;

    /// Fields every freshly created record starts with unless the draft sets them.
    fn creation_defaults(_record: &mut Record) {}
}

impl Entity for Task {
    const COLLECTION: Collection = Collection::Tasks;

    type Draft = NewTask;
    type Patch = TaskPatch;

    fn creation_defaults(record: &mut Record) {
        record.entry("completed").or_insert(Value::Bool(false));
        record.entry("completedAt").or_insert(Value::Null);
    }
}

impl Entity for Category {
    const COLLECTION: Collection = Collection::Categories;

    type Draft = NewCategory;
    type Patch = CategoryPatch;

    fn creation_defaults(record: &mut Record) {
        record.entry("taskCount").or_insert(Value::from(0));
    }
}

/// Typed facade over a [`RecordStore`] collection. No business logic lives here.
pub struct Repository<E: Entity> {
    store: Arc<dyn RecordStore>,
    _entity: PhantomData<fn() -> E>,
}

pub type TaskRepository = Repository<Task>;
pub type CategoryRepository = Repository<Category>;

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    pub(crate) fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub async fn get_all(&self) -> StoreResult<Vec<E>> {
        self.store
            .list(E::COLLECTION)
            .await?
            .into_iter()
            .map(decode::<E>)
            .collect()
    }

    pub async fn get_by_id(&self, id: &str) -> StoreResult<E> {
        decode(self.store.get(E::COLLECTION, id).await?)
    }

    pub async fn create(&self, draft: &E::Draft) -> StoreResult<E> {
        let mut record = encode(E::COLLECTION, draft)?;
        E::creation_defaults(&mut record);
        decode(self.store.create(E::COLLECTION, record).await?)
    }

    pub async fn update(&self, id: &str, patch: &E::Patch) -> StoreResult<E> {
        let record = encode(E::COLLECTION, patch)?;
        decode(self.store.update(E::COLLECTION, id, record).await?)
    }

    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.store.delete(E::COLLECTION, id).await
    }
}

fn encode<T: Serialize>(collection: Collection, value: &T) -> StoreResult<Record> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Codec {
            collection,
            message: format!("expected an object, got {other}"),
        }),
        Err(err) => Err(StoreError::Codec {
            collection,
            message: err.to_string(),
        }),
    }
}

fn decode<E: Entity>(record: Record) -> StoreResult<E> {
    serde_json::from_value(Value::Object(record)).map_err(|err| StoreError::Codec {
        collection: E::COLLECTION,
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::model::Priority;
    use crate::store::LocalStore;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (Arc<dyn RecordStore>, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).unwrap();
        (Arc::new(LocalStore::open(&config).unwrap()), dir)
    }

    fn buy_milk() -> NewTask {
        NewTask {
            title: "Buy milk".into(),
            description: String::new(),
            category_id: Some("cat1".into()),
            priority: Priority::Medium,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        }
    }

    #[tokio::test]
    async fn created_task_reads_back_intact() {
        let (store, _guard) = store();
        let tasks = TaskRepository::new(store);

        let created = tasks.create(&buy_milk()).await.unwrap();
        let fetched = tasks.get_by_id(&created.id).await.unwrap();

        assert!(!fetched.id.is_empty());
        assert!(!fetched.completed);
        assert_eq!(fetched.completed_at, None);
        assert_eq!(fetched.title, "Buy milk");
        assert_eq!(fetched.priority, Priority::Medium);
        assert_eq!(fetched.due_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(fetched.category_id.as_deref(), Some("cat1"));
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn created_task_record_has_explicit_null_completion() {
        let (store, _guard) = store();
        let created = TaskRepository::new(Arc::clone(&store))
            .create(&buy_milk())
            .await
            .unwrap();
        let raw = store.get(Collection::Tasks, &created.id).await.unwrap();
        assert_eq!(raw["completed"], json!(false));
        assert_eq!(raw["completedAt"], json!(null));
        assert_eq!(raw["categoryId"], json!("cat1"));
    }

    #[tokio::test]
    async fn update_returns_merged_record() {
        let (store, _guard) = store();
        let tasks = TaskRepository::new(store);
        let created = tasks.create(&buy_milk()).await.unwrap();

        let patch = TaskPatch {
            priority: Some(Priority::High),
            category_id: Some(None),
            ..TaskPatch::default()
        };
        let updated = tasks.update(&created.id, &patch).await.unwrap();
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.category_id, None);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn missing_ids_fail_with_not_found() {
        let (store, _guard) = store();
        let categories = CategoryRepository::new(store);
        assert!(categories.get_by_id("nope").await.unwrap_err().is_not_found());
        assert!(categories
            .update("nope", &CategoryPatch::default())
            .await
            .unwrap_err()
            .is_not_found());
        assert!(categories.delete("nope").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn categories_default_task_count() {
        let (store, _guard) = store();
        let categories = CategoryRepository::new(store);
        let work = categories
            .create(&NewCategory {
                name: "Work".into(),
                color: "#5B47E0".into(),
            })
            .await
            .unwrap();
        assert_eq!(work.task_count, 0);
        assert_eq!(categories.get_all().await.unwrap(), vec![work]);
    }

    #[tokio::test]
    async fn undecodable_records_surface_codec_errors() {
        let (store, _guard) = store();
        let mut record = Record::new();
        record.insert("title".into(), json!("no due date"));
        store.create(Collection::Tasks, record).await.unwrap();

        let err = TaskRepository::new(store).get_all().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Codec {
                collection: Collection::Tasks,
                ..
            }
        ));
    }
}
