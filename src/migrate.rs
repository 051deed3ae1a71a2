use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

use crate::db;

/// Create the record-store table. Column order is relied on when a backing
/// file image is loaded.
pub async fn ensure_record_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ideas (
            id TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            summary TEXT NOT NULL,
            objective TEXT NOT NULL,
            tags TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the content-keyed table.
pub async fn ensure_content_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ideas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// `vibes init`: create the content database file and its schema.
pub async fn run_init(db_path: &Path) -> Result<()> {
    let pool = db::connect(db_path).await?;
    ensure_content_schema(&pool).await?;
    pool.close().await;
    Ok(())
}
