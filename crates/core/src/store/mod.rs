//! Record store boundary shared by the local and remote persistence backends.

mod local;
mod remote;

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use ulid::Ulid;

use crate::config::{AppConfig, StoreBackend};

pub use local::LocalStore;
pub use remote::RemoteStore;

/// A plain record as the store sees it: top-level wire fields keyed by name.
pub type Record = Map<String, Value>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub(crate) const ID_FIELD: &str = "id";
pub(crate) const CREATED_AT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Tasks,
    Categories,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Tasks => "tasks",
            Collection::Categories => "categories",
        }
    }

    pub fn id_prefix(&self) -> &'static str {
        match self {
            Collection::Tasks => "task",
            Collection::Categories => "category",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Collection::Tasks => "Task",
            Collection::Categories => "Category",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.noun())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{collection} '{id}' not found")]
    NotFound { collection: Collection, id: String },
    #[error("record store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed {collection} record: {message}")]
    Codec {
        collection: Collection,
        message: String,
    },
}

impl StoreError {
    pub fn not_found(collection: Collection, id: impl Into<String>) -> Self {
        StoreError::NotFound {
            collection,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Asynchronous CRUD over plain records keyed by an opaque identifier.
///
/// `create` assigns the identifier and creation stamp. `update` shallow-merges the
/// provided top-level fields and fails with [`StoreError::NotFound`] for unknown ids,
/// as does `delete`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, collection: Collection) -> StoreResult<Vec<Record>>;

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Record>;

    async fn create(&self, collection: Collection, data: Record) -> StoreResult<Record>;

    async fn update(&self, collection: Collection, id: &str, patch: Record)
        -> StoreResult<Record>;

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()>;

    /// Store-level bookkeeping such as the first-run marker. Backends without a
    /// metadata area report [`StoreError::Unavailable`].
    async fn get_meta(&self, key: &str) -> StoreResult<Option<String>> {
        Err(StoreError::Unavailable(format!(
            "store keeps no metadata (reading '{key}')"
        )))
    }

    async fn set_meta(&self, key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::Unavailable(format!(
            "store keeps no metadata (writing '{key}')"
        )))
    }
}

/// Build the record store selected by `config`.
pub fn open(config: &AppConfig) -> Result<Arc<dyn RecordStore>> {
    match config.backend() {
        StoreBackend::Local => {
            let store = LocalStore::open(config).with_context(|| {
                format!(
                    "Failed to open local store at {}",
                    config.db_path().display()
                )
            })?;
            tracing::debug!(path = %config.db_path().display(), "using local record store");
            Ok(Arc::new(store))
        }
        StoreBackend::Remote {
            base_url,
            token,
            timeout,
        } => {
            let store = RemoteStore::new(base_url, token.clone(), *timeout)
                .with_context(|| format!("Failed to configure remote store at {base_url}"))?;
            tracing::debug!(base_url = base_url.as_str(), "using remote record store");
            Ok(Arc::new(store))
        }
    }
}

pub(crate) fn new_record_id(collection: Collection) -> String {
    format!("{}_{}", collection.id_prefix(), Ulid::new())
}

/// Shallow merge; identity fields in the patch are ignored.
pub(crate) fn merge_record(target: &mut Record, patch: Record) {
    for (key, value) in patch {
        if key == ID_FIELD || key == CREATED_AT_FIELD {
            continue;
        }
        target.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn merge_overwrites_fields_but_keeps_identity() {
        let mut target = record(json!({
            "id": "task_1",
            "title": "Old",
            "createdAt": "2024-01-01T00:00:00Z",
            "completedAt": "2024-01-02T00:00:00Z"
        }));
        merge_record(
            &mut target,
            record(json!({
                "id": "task_2",
                "title": "New",
                "createdAt": "2030-01-01T00:00:00Z",
                "completedAt": null
            })),
        );
        assert_eq!(target["id"], json!("task_1"));
        assert_eq!(target["title"], json!("New"));
        assert_eq!(target["createdAt"], json!("2024-01-01T00:00:00Z"));
        assert_eq!(target["completedAt"], json!(null));
    }

    #[test]
    fn record_ids_carry_collection_prefix() {
        assert!(new_record_id(Collection::Tasks).starts_with("task_"));
        assert!(new_record_id(Collection::Categories).starts_with("category_"));
        assert_ne!(
            new_record_id(Collection::Tasks),
            new_record_id(Collection::Tasks)
        );
    }

    #[test]
    fn not_found_message_names_the_record_kind() {
        let err = StoreError::not_found(Collection::Tasks, "task_9");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Task 'task_9' not found");
    }
}
