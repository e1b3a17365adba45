use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use rusqlite::{named_params, Connection, OptionalExtension};
use serde_json::Value;

use super::{
    merge_record, new_record_id, Collection, Record, RecordStore, StoreError, StoreResult,
    CREATED_AT_FIELD, ID_FIELD,
};
use crate::config::AppConfig;

/// On-device record store backed by a SQLite file in the data directory.
///
/// Each call opens its own connection on the blocking pool, so the store itself is a
/// cheap clonable path handle.
#[derive(Debug, Clone)]
pub struct LocalStore {
    db_path: PathBuf,
}

impl LocalStore {
    pub fn open(config: &AppConfig) -> Result<Self> {
        Self::open_path(config.db_path())
    }

    pub fn open_path(db_path: &Path) -> Result<Self> {
        let conn = connect(db_path)
            .with_context(|| format!("Failed to open database at {}", db_path.display()))?;
        apply_migrations(&conn).context("Failed to apply record store migrations")?;
        Ok(Self {
            db_path: db_path.to_path_buf(),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = connect(&path).map_err(backend_error)?;
            op(&conn)
        })
        .await
        .map_err(|err| StoreError::Unavailable(format!("blocking task failed: {err}")))?
    }
}

#[async_trait]
impl RecordStore for LocalStore {
    async fn list(&self, collection: Collection) -> StoreResult<Vec<Record>> {
        self.run(move |conn| {
            let mut stmt = conn
                .prepare("SELECT body FROM records WHERE collection = ? ORDER BY seq ASC")
                .map_err(backend_error)?;
            let mut rows = stmt.query([collection.as_str()]).map_err(backend_error)?;
            let mut records = Vec::new();
            while let Some(row) = rows.next().map_err(backend_error)? {
                let body: String = row.get(0).map_err(backend_error)?;
                records.push(decode_body(collection, &body)?);
            }
            Ok(records)
        })
        .await
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Record> {
        let id = id.to_string();
        self.run(move |conn| {
            fetch_record(conn, collection, &id)?.ok_or_else(|| StoreError::not_found(collection, id))
        })
        .await
    }

    async fn create(&self, collection: Collection, mut data: Record) -> StoreResult<Record> {
        self.run(move |conn| {
            let id = new_record_id(collection);
            let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            data.insert(ID_FIELD.into(), Value::String(id.clone()));
            data.insert(CREATED_AT_FIELD.into(), Value::String(created_at));

            conn.execute(
                "INSERT INTO records (collection, id, body) VALUES (:collection, :id, :body)",
                named_params![
                    ":collection": collection.as_str(),
                    ":id": &id,
                    ":body": encode_body(collection, &data)?,
                ],
            )
            .map_err(backend_error)?;
            Ok(data)
        })
        .await
    }

    async fn update(
        &self,
        collection: Collection,
        id: &str,
        patch: Record,
    ) -> StoreResult<Record> {
        let id = id.to_string();
        self.run(move |conn| {
            let mut record = fetch_record(conn, collection, &id)?
                .ok_or_else(|| StoreError::not_found(collection, id.clone()))?;
            merge_record(&mut record, patch);
            conn.execute(
                "UPDATE records SET body = :body WHERE collection = :collection AND id = :id",
                named_params![
                    ":body": encode_body(collection, &record)?,
                    ":collection": collection.as_str(),
                    ":id": &id,
                ],
            )
            .map_err(backend_error)?;
            Ok(record)
        })
        .await
    }

    async fn delete(&self, collection: Collection, id: &str) -> StoreResult<()> {
        let id = id.to_string();
        self.run(move |conn| {
            let affected = conn
                .execute(
                    "DELETE FROM records WHERE collection = :collection AND id = :id",
                    named_params![":collection": collection.as_str(), ":id": &id],
                )
                .map_err(backend_error)?;
            if affected == 0 {
                return Err(StoreError::not_found(collection, id));
            }
            Ok(())
        })
        .await
    }

    async fn get_meta(&self, key: &str) -> StoreResult<Option<String>> {
        let key = key.to_string();
        self.run(move |conn| {
            conn.query_row(
                "SELECT value FROM meta WHERE key = ?",
                [&key],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend_error)
        })
        .await
    }

    async fn set_meta(&self, key: &str, value: &str) -> StoreResult<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (:key, :value)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                named_params![":key": &key, ":value": &value],
            )
            .map_err(backend_error)?;
            Ok(())
        })
        .await
    }
}

fn connect(path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

fn apply_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT);
         CREATE TABLE IF NOT EXISTS records (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            UNIQUE (collection, id)
         );
         CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection);
        ",
    )
}

fn fetch_record(conn: &Connection, collection: Collection, id: &str) -> StoreResult<Option<Record>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM records WHERE collection = :collection AND id = :id LIMIT 1",
            named_params![":collection": collection.as_str(), ":id": id],
            |row| row.get(0),
        )
        .optional()
        .map_err(backend_error)?;
    body.map(|raw| decode_body(collection, &raw)).transpose()
}

fn encode_body(collection: Collection, record: &Record) -> StoreResult<String> {
    serde_json::to_string(record).map_err(|err| StoreError::Codec {
        collection,
        message: err.to_string(),
    })
}

fn decode_body(collection: Collection, raw: &str) -> StoreResult<Record> {
    serde_json::from_str::<Record>(raw).map_err(|err| StoreError::Codec {
        collection,
        message: err.to_string(),
    })
}

fn backend_error(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}
