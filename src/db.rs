use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Open a pool on a native SQLite file, creating the file and its parent
/// directory if missing.
pub async fn connect(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path.display()))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Open a private in-memory database.
///
/// Every SQLite connection to `:memory:` is its own database, so the pool is
/// pinned to exactly one connection that is never recycled.
pub async fn connect_memory() -> Result<SqlitePool, sqlx::Error> {
    // Not the `sqlite::memory:` URL: that sets SQLITE_OPEN_MEMORY, which ATTACH inherits.
    let options = SqliteConnectOptions::new().filename(":memory:");

    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}
