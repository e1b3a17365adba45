//! Seeds the default categories so a fresh store has something to file tasks under.

use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::model::NewCategory;
use crate::repository::CategoryRepository;
use crate::store::{RecordStore, StoreResult};

pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Work", "#5B47E0"),
    ("Personal", "#10B981"),
    ("Shopping", "#F59E0B"),
    ("Health", "#EF4444"),
];

/// Metadata key written once the first-run check has happened.
pub const SEEDED_META_KEY: &str = "seeded_defaults";

/// Create the default categories on first run. Returns whether it seeded.
///
/// Only a store that has never been checked is seeded; once the marker exists an empty
/// category list stays empty. Stores that already hold categories are marked without
/// being seeded.
pub async fn maybe_seed_defaults(categories: &CategoryRepository) -> StoreResult<bool> {
    let store = categories.store();
    if store.get_meta(SEEDED_META_KEY).await?.is_some() {
        return Ok(false);
    }

    let seed = categories.get_all().await?.is_empty();
    if seed {
        for (name, color) in DEFAULT_CATEGORIES {
            categories
                .create(&NewCategory {
                    name: name.to_string(),
                    color: color.to_string(),
                })
                .await?;
        }
        info!(count = DEFAULT_CATEGORIES.len(), "seeded default categories");
    }

    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    store.set_meta(SEEDED_META_KEY, &stamp).await?;
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::{LocalStore, RecordStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn repository() -> (CategoryRepository, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::from_data_dir(dir.path().to_path_buf()).unwrap();
        let store: Arc<dyn RecordStore> = Arc::new(LocalStore::open(&config).unwrap());
        (CategoryRepository::new(store), dir)
    }

    #[tokio::test]
    async fn seeds_once_into_an_empty_store() {
        let (categories, _guard) = repository();

        assert!(maybe_seed_defaults(&categories).await.unwrap());
        assert!(!maybe_seed_defaults(&categories).await.unwrap());

        let names: Vec<String> = categories
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect();
        assert_eq!(names, vec!["Work", "Personal", "Shopping", "Health"]);
    }

    #[tokio::test]
    async fn deleting_every_category_is_not_undone() {
        let (categories, _guard) = repository();
        assert!(maybe_seed_defaults(&categories).await.unwrap());

        for category in categories.get_all().await.unwrap() {
            categories.delete(&category.id).await.unwrap();
        }

        assert!(!maybe_seed_defaults(&categories).await.unwrap());
        assert!(categories.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn existing_categories_are_marked_without_seeding() {
        let (categories, _guard) = repository();
        categories
            .create(&NewCategory {
                name: "Garden".into(),
                color: "#22C55E".into(),
            })
            .await
            .unwrap();

        assert!(!maybe_seed_defaults(&categories).await.unwrap());
        assert!(categories
            .store()
            .get_meta(SEEDED_META_KEY)
            .await
            .unwrap()
            .is_some());
        assert_eq!(categories.get_all().await.unwrap().len(), 1);
    }
}
