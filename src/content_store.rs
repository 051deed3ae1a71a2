//! Content store: auto-id ideas deduplicated by their text.
//!
//! Backed by a native SQLite file. Used by `vibes seed-content` and by the
//! HTTP server when `IDEAS_BACKEND=content`, where one pool is shared by all
//! requests.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;
use std::path::Path;

use crate::db;
use crate::migrate;
use crate::models::{ContentIdea, NewContentIdea, Page};

/// Upper bound for page sizes and random samples.
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct ContentStore {
    pool: SqlitePool,
}

impl ContentStore {
    /// Connect to `db_path` and make sure the table exists.
    pub async fn open(db_path: &Path) -> Result<Self> {
        let pool = db::connect(db_path).await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        migrate::ensure_content_schema(&self.pool).await?;
        Ok(())
    }

    /// Every stored content string.
    pub async fn existing_contents(&self) -> Result<HashSet<String>> {
        let contents: Vec<String> = sqlx::query_scalar("SELECT content FROM ideas")
            .fetch_all(&self.pool)
            .await?;
        Ok(contents.into_iter().collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ideas")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }

    /// Delete all rows.
    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM ideas").execute(&self.pool).await?;
        Ok(())
    }

    /// Insert `items` in a single transaction, skipping any whose content is
    /// already in `existing`. Inserted content is added to `existing`.
    ///
    /// Returns `(inserted, skipped)`. Nothing is written if any insert fails.
    pub async fn insert_batch(
        &self,
        items: &[NewContentIdea],
        existing: &mut HashSet<String>,
    ) -> Result<(u64, u64)> {
        let mut inserted = 0u64;
        let mut skipped = 0u64;

        let mut tx = self.pool.begin().await?;

        for item in items {
            if existing.contains(&item.content) {
                skipped += 1;
                continue;
            }

            match &item.created_at {
                Some(created_at) => {
                    sqlx::query("INSERT INTO ideas (content, created_at) VALUES (?, ?)")
                        .bind(&item.content)
                        .bind(created_at)
                        .execute(&mut *tx)
                        .await?;
                }
                None => {
                    sqlx::query("INSERT INTO ideas (content) VALUES (?)")
                        .bind(&item.content)
                        .execute(&mut *tx)
                        .await?;
                }
            }

            existing.insert(item.content.clone());
            inserted += 1;
        }

        tx.commit().await?;
        Ok((inserted, skipped))
    }

    /// One page in id order. `limit` is clamped to `1..=100`, `offset` to `>= 0`.
    pub async fn list_page(&self, limit: i64, offset: i64) -> Result<Page> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let offset = offset.max(0);

        let total = self.count().await?;

        let rows = sqlx::query(
            "SELECT id, content, created_at FROM ideas ORDER BY id ASC LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<ContentIdea> = rows.iter().map(row_to_content_idea).collect();
        let (has_more, next_offset) = continuation(total, offset, items.len());

        Ok(Page {
            items,
            total,
            limit,
            offset,
            has_more,
            next_offset,
        })
    }

    /// Up to `count` rows in random order. `count` is clamped to `1..=100`.
    pub async fn random_sample(&self, count: i64) -> Result<Vec<ContentIdea>> {
        let count = count.clamp(1, MAX_PAGE_SIZE);

        let rows =
            sqlx::query("SELECT id, content, created_at FROM ideas ORDER BY RANDOM() LIMIT ?")
                .bind(count)
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.iter().map(row_to_content_idea).collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// `has_more` and `next_offset` for a page of `returned` rows at `offset`.
pub fn continuation(total: i64, offset: i64, returned: usize) -> (bool, Option<i64>) {
    let end = offset + returned as i64;
    if end < total {
        (true, Some(end))
    } else {
        (false, None)
    }
}

fn row_to_content_idea(row: &SqliteRow) -> ContentIdea {
    ContentIdea {
        id: row.get("id"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_item(content: &str) -> NewContentIdea {
        NewContentIdea {
            content: content.to_string(),
            created_at: None,
        }
    }

    async fn seeded_store(tmp: &TempDir, n: usize) -> ContentStore {
        let store = ContentStore::open(&tmp.path().join("app.db")).await.unwrap();
        let items: Vec<NewContentIdea> = (0..n).map(|i| new_item(&format!("idea {}", i))).collect();
        let mut existing = HashSet::new();
        store.insert_batch(&items, &mut existing).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_insert_batch_skips_existing() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("app.db")).await.unwrap();

        let mut existing = store.existing_contents().await.unwrap();
        let (inserted, skipped) = store
            .insert_batch(&[new_item("a"), new_item("b")], &mut existing)
            .await
            .unwrap();
        assert_eq!((inserted, skipped), (2, 0));

        let mut existing = store.existing_contents().await.unwrap();
        let (inserted, skipped) = store
            .insert_batch(&[new_item("b"), new_item("c")], &mut existing)
            .await
            .unwrap();
        assert_eq!((inserted, skipped), (1, 1));
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_created_at_is_kept_or_defaulted() {
        let tmp = TempDir::new().unwrap();
        let store = ContentStore::open(&tmp.path().join("app.db")).await.unwrap();
        let items = vec![
            NewContentIdea {
                content: "dated".to_string(),
                created_at: Some("2024-01-02T03:04:05Z".to_string()),
            },
            new_item("undated"),
        ];
        store
            .insert_batch(&items, &mut HashSet::new())
            .await
            .unwrap();

        let page = store.list_page(10, 0).await.unwrap();
        assert_eq!(page.items[0].created_at, "2024-01-02T03:04:05Z");
        assert!(!page.items[1].created_at.is_empty());
    }

    #[tokio::test]
    async fn test_pagination_arithmetic() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp, 7).await;

        for limit in 1..=8i64 {
            for offset in 0..=9i64 {
                let page = store.list_page(limit, offset).await.unwrap();
                let expected = limit.min((7 - offset).max(0));
                assert_eq!(page.items.len() as i64, expected, "L={} O={}", limit, offset);
                assert_eq!(page.total, 7);
                assert_eq!(page.has_more, offset + expected < 7);
                assert_eq!(page.next_offset.is_some(), page.has_more);
                if let Some(next) = page.next_offset {
                    assert_eq!(next, offset + expected);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_pagination_clamps_bounds() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp, 3).await;

        let page = store.list_page(0, -5).await.unwrap();
        assert_eq!(page.limit, 1);
        assert_eq!(page.offset, 0);
        assert_eq!(page.items.len(), 1);

        let page = store.list_page(1000, 0).await.unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.items.len(), 3);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_random_sample_is_clamped_subset() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp, 5).await;

        assert_eq!(store.random_sample(0).await.unwrap().len(), 1);
        assert_eq!(store.random_sample(3).await.unwrap().len(), 3);

        let all = store.random_sample(500).await.unwrap();
        assert_eq!(all.len(), 5);
        let mut ids: Vec<i64> = all.iter().map(|i| i.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let tmp = TempDir::new().unwrap();
        let store = seeded_store(&tmp, 4).await;
        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.existing_contents().await.unwrap().is_empty());
    }

    #[test]
    fn test_continuation() {
        assert_eq!(continuation(10, 0, 5), (true, Some(5)));
        assert_eq!(continuation(10, 5, 5), (false, None));
        assert_eq!(continuation(0, 0, 0), (false, None));
        assert_eq!(continuation(3, 10, 0), (false, None));
    }
}
