//! Record store: string-keyed ideas in an embedded SQLite engine.
//!
//! The working database always lives in memory. When a storage path is
//! configured, the file's rows are loaded on [`IdeaStore::open`] and the full
//! database image is written back by [`IdeaStore::persist`], either
//! explicitly or after every mutation when auto-persist is on.
//!
//! ```text
//!   open ──▶ in-memory engine ◀── create / delete / get / list / iterate
//!     ▲              │
//!     │ load         │ persist (VACUUM INTO tmp, rename)
//!     └──── backing file ◀┘
//! ```

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::db;
use crate::migrate;
use crate::models::Idea;

/// Default page size for [`IdeaStore::iterate`].
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors raised by the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The candidate record breaks a field rule.
    #[error("Invalid idea: {0}")]
    Validation(String),
    /// A record with this id is already stored.
    #[error("Idea with id '{0}' already exists")]
    DuplicateId(String),
    /// An id argument was empty.
    #[error("id must be a non-empty string")]
    InvalidArgument,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Options for [`IdeaStore::open`].
#[derive(Debug, Clone, Default)]
pub struct IdeaStoreOptions {
    /// File to load from and persist to. `None` keeps the store purely in memory.
    pub storage_path: Option<PathBuf>,
    /// Persist after every write. Defaults to `true` when a storage path is set.
    pub auto_persist: Option<bool>,
}

impl IdeaStoreOptions {
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: Some(path.into()),
            auto_persist: None,
        }
    }
}

/// Handle to an open record store.
pub struct IdeaStore {
    pool: SqlitePool,
    storage_path: Option<PathBuf>,
    auto_persist: bool,
}

impl IdeaStore {
    /// Open a store, loading the backing file if one is configured and exists.
    pub async fn open(options: IdeaStoreOptions) -> Result<Self, StoreError> {
        let pool = db::connect_memory().await?;
        migrate::ensure_record_schema(&pool).await?;

        let auto_persist = options
            .auto_persist
            .unwrap_or(options.storage_path.is_some());

        let store = Self {
            pool,
            storage_path: options.storage_path,
            auto_persist,
        };

        if let Some(path) = store.storage_path.as_deref() {
            if path.exists() {
                store.load_image(path).await?;
            }
        }

        Ok(store)
    }

    /// Open a store with no backing file.
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::open(IdeaStoreOptions::default()).await
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    async fn load_image(&self, path: &Path) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;

        sqlx::query("ATTACH DATABASE ? AS image")
            .bind(path.to_string_lossy().into_owned())
            .execute(&mut *conn)
            .await?;

        let has_table: Result<bool, sqlx::Error> = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM image.sqlite_master WHERE type='table' AND name='ideas'",
        )
        .fetch_one(&mut *conn)
        .await;

        let copied = match has_table {
            Ok(true) => sqlx::query(
                "INSERT INTO main.ideas (id, title, summary, objective, tags) \
                 SELECT id, title, summary, objective, tags FROM image.ideas ORDER BY rowid ASC",
            )
            .execute(&mut *conn)
            .await
            .map(|_| ()),
            Ok(false) => Ok(()),
            Err(e) => Err(e),
        };

        // Detach even when the copy failed so the connection stays clean.
        sqlx::query("DETACH DATABASE image")
            .execute(&mut *conn)
            .await?;

        copied?;
        Ok(())
    }

    /// Write the full database image to the storage path.
    ///
    /// No-op for an in-memory store. The image is written next to the target
    /// first and then renamed over it.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = self.storage_path.as_deref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = temp_image_path(path);
        match tokio::fs::remove_file(&tmp).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        sqlx::query("VACUUM INTO ?")
            .bind(tmp.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Insert a new idea and return the stored record.
    pub async fn create(&self, idea: &Idea) -> Result<Idea, StoreError> {
        idea.validate()?;

        let tags = serde_json::to_string(&idea.tags)
            .map_err(|e| StoreError::Validation(format!("tags could not be encoded: {}", e)))?;

        let inserted = sqlx::query(
            "INSERT INTO ideas (id, title, summary, objective, tags) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&idea.id)
        .bind(&idea.title)
        .bind(&idea.summary)
        .bind(&idea.objective)
        .bind(&tags)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(StoreError::DuplicateId(idea.id.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        if self.auto_persist {
            if let Err(e) = self.persist().await {
                // Keep the engine in step with the file: a failed create stores nothing.
                if let Err(undo) = sqlx::query("DELETE FROM ideas WHERE id = ?")
                    .bind(&idea.id)
                    .execute(&self.pool)
                    .await
                {
                    warn!("Failed to roll back idea '{}': {}", idea.id, undo);
                }
                return Err(e);
            }
        }

        Ok(idea.clone())
    }

    /// Fetch one idea. `Ok(None)` when no record has this id.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Idea>, StoreError> {
        if id.is_empty() {
            return Err(StoreError::InvalidArgument);
        }

        let row = sqlx::query("SELECT id, title, summary, objective, tags FROM ideas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(row_to_idea))
    }

    /// All ideas in insertion order.
    pub async fn list(&self) -> Result<Vec<Idea>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, summary, objective, tags FROM ideas ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_idea).collect())
    }

    /// Start a batched walk over all ideas in insertion order.
    ///
    /// A `batch_size` of 0 uses [`DEFAULT_BATCH_SIZE`]. Each call returns a
    /// fresh cursor positioned at the first record.
    pub fn iterate(&self, batch_size: usize) -> IdeaBatches<'_> {
        let size = if batch_size == 0 {
            DEFAULT_BATCH_SIZE
        } else {
            batch_size
        };
        IdeaBatches {
            store: self,
            batch_size: i64::try_from(size).unwrap_or(i64::MAX),
            offset: 0,
            done: false,
        }
    }

    async fn fetch_page(&self, limit: i64, offset: i64) -> Result<Vec<Idea>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, title, summary, objective, tags FROM ideas ORDER BY rowid ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_idea).collect())
    }

    /// Delete by id. Returns whether a row was removed.
    pub async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        if id.is_empty() {
            return Err(StoreError::InvalidArgument);
        }

        let result = sqlx::query("DELETE FROM ideas WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if self.auto_persist {
            self.persist().await?;
        }

        Ok(result.rows_affected() > 0)
    }

    /// Release the engine. Unsaved changes are dropped; call [`persist`](Self::persist) first.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

/// Lazy cursor over the record store, one page per [`next_batch`](Self::next_batch) call.
pub struct IdeaBatches<'a> {
    store: &'a IdeaStore,
    batch_size: i64,
    offset: i64,
    done: bool,
}

impl IdeaBatches<'_> {
    /// Next non-empty batch, or `None` once the table is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Idea>>, StoreError> {
        if self.done {
            return Ok(None);
        }

        let batch = self.store.fetch_page(self.batch_size, self.offset).await?;
        if batch.is_empty() {
            self.done = true;
            return Ok(None);
        }

        self.offset += batch.len() as i64;
        Ok(Some(batch))
    }
}

fn row_to_idea(row: &SqliteRow) -> Idea {
    let tags: String = row.get("tags");
    Idea {
        id: row.get("id"),
        title: row.get("title"),
        summary: row.get("summary"),
        objective: row.get("objective"),
        tags: decode_tags(&tags),
    }
}

fn decode_tags(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_default()
}

fn temp_image_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn idea(id: &str, tags: &[&str]) -> Idea {
        Idea {
            id: id.to_string(),
            title: format!("Title {}", id),
            summary: format!("Summary {}", id),
            objective: format!("Objective {}", id),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    async fn collect_batches(store: &IdeaStore, size: usize) -> Vec<Vec<Idea>> {
        let mut batches = Vec::new();
        let mut cursor = store.iterate(size);
        while let Some(batch) = cursor.next_batch().await.unwrap() {
            batches.push(batch);
        }
        batches
    }

    #[tokio::test]
    async fn test_in_memory_crud() {
        let store = IdeaStore::in_memory().await.unwrap();
        let input = idea("idea-1", &["a", "b"]);

        let created = store.create(&input).await.unwrap();
        assert_eq!(created, input);

        let fetched = store.get_by_id("idea-1").await.unwrap();
        assert_eq!(fetched, Some(input.clone()));

        assert_eq!(store.list().await.unwrap(), vec![input]);

        assert!(store.delete_by_id("idea-1").await.unwrap());
        assert_eq!(store.get_by_id("idea-1").await.unwrap(), None);
        assert!(!store.delete_by_id("idea-1").await.unwrap());

        store.close().await;
    }

    #[tokio::test]
    async fn test_duplicate_id_keeps_original() {
        let store = IdeaStore::in_memory().await.unwrap();
        let first = idea("dup", &[]);
        store.create(&first).await.unwrap();

        let mut second = idea("dup", &["changed"]);
        second.title = "Other".to_string();
        let err = store.create(&second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(ref id) if id == "dup"));

        assert_eq!(store.get_by_id("dup").await.unwrap(), Some(first));
    }

    #[tokio::test]
    async fn test_validation_and_invalid_argument() {
        let store = IdeaStore::in_memory().await.unwrap();
        let mut bad = idea("x", &[]);
        bad.summary.clear();
        assert!(matches!(
            store.create(&bad).await,
            Err(StoreError::Validation(_))
        ));
        assert!(store.list().await.unwrap().is_empty());

        assert!(matches!(
            store.get_by_id("").await,
            Err(StoreError::InvalidArgument)
        ));
        assert!(matches!(
            store.delete_by_id("").await,
            Err(StoreError::InvalidArgument)
        ));
    }

    #[tokio::test]
    async fn test_iterate_matches_list_for_every_batch_size() {
        let store = IdeaStore::in_memory().await.unwrap();
        for i in 1..=7 {
            store
                .create(&idea(&format!("i{}", i), &[&i.to_string()]))
                .await
                .unwrap();
        }
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 7);

        for size in 1..=9 {
            let batches = collect_batches(&store, size).await;
            assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= size));
            let flat: Vec<Idea> = batches.into_iter().flatten().collect();
            assert_eq!(flat, all, "batch size {}", size);
        }

        // A new cursor restarts from the beginning.
        assert_eq!(collect_batches(&store, 3).await.len(), 3);
    }

    #[tokio::test]
    async fn test_iterate_empty_store() {
        let store = IdeaStore::in_memory().await.unwrap();
        let mut cursor = store.iterate(0);
        assert!(cursor.next_batch().await.unwrap().is_none());
        assert!(cursor.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data").join("ideas.sqlite");

        let first = IdeaStore::open(IdeaStoreOptions::with_file(&path))
            .await
            .unwrap();
        first.create(&idea("p1", &["x"])).await.unwrap();
        first.create(&idea("p2", &[])).await.unwrap();
        first.persist().await.unwrap();
        first.close().await;
        assert!(path.exists());

        let second = IdeaStore::open(IdeaStoreOptions::with_file(&path))
            .await
            .unwrap();
        let ids: Vec<String> = second
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["p1", "p2"]);
        assert_eq!(
            second.get_by_id("p1").await.unwrap(),
            Some(idea("p1", &["x"]))
        );
    }

    #[tokio::test]
    async fn test_auto_persist_on_write() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("auto.sqlite");

        let store = IdeaStore::open(IdeaStoreOptions::with_file(&path))
            .await
            .unwrap();
        store.create(&idea("a1", &[])).await.unwrap();
        // Still open; the write alone must already be on disk.
        let other = IdeaStore::open(IdeaStoreOptions::with_file(&path))
            .await
            .unwrap();
        assert_eq!(other.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_open_loads_file_written_by_native_pool() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("native.sqlite");

        let pool = db::connect(&path).await.unwrap();
        migrate::ensure_record_schema(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO ideas (id, title, summary, objective, tags) VALUES ('f1', 't', 's', 'o', '[\"k\"]')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        let store = IdeaStore::open(IdeaStoreOptions {
            storage_path: Some(path.clone()),
            auto_persist: Some(false),
        })
        .await
        .unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tags, vec!["k"]);

        store.create(&idea("f2", &[])).await.unwrap();
        store.persist().await.unwrap();
        store.close().await;

        let pool = db::connect(&path).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ideas")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
        pool.close().await;
    }

    #[tokio::test]
    async fn test_create_rolls_back_when_persist_fails() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let store = IdeaStore::open(IdeaStoreOptions::with_file(blocker.join("ideas.sqlite")))
            .await
            .unwrap();
        let err = store.create(&idea("r1", &[])).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
        assert!(store.get_by_id("r1").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_does_not_persist() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("manual.sqlite");

        let store = IdeaStore::open(IdeaStoreOptions {
            storage_path: Some(path.clone()),
            auto_persist: Some(false),
        })
        .await
        .unwrap();
        store.create(&idea("m1", &[])).await.unwrap();
        store.close().await;

        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_persist_in_memory_is_noop() {
        let store = IdeaStore::in_memory().await.unwrap();
        store.create(&idea("n1", &[])).await.unwrap();
        store.persist().await.unwrap();
        assert!(store.storage_path().is_none());
    }

    #[test]
    fn test_decode_tags_tolerates_garbage() {
        assert!(decode_tags("").is_empty());
        assert!(decode_tags("not json").is_empty());
        assert!(decode_tags("{\"a\":1}").is_empty());
        assert_eq!(decode_tags("[\"a\",\"b\"]"), vec!["a", "b"]);
    }
}
