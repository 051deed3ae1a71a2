//! Record seeding: load a directory of JSON files into the record store.
//!
//! Files are read and normalized up front; any parse failure aborts the run
//! before the store is touched. Items are then inserted one at a time, with
//! the store's duplicate detection deciding what gets skipped.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::models::Idea;
use crate::store::{IdeaStore, IdeaStoreOptions, StoreError};

/// Inputs for [`seed_ideas_directory`].
#[derive(Debug, Clone)]
pub struct SeedOptions {
    pub seed_dir: PathBuf,
    pub db_file_path: PathBuf,
    /// Abort on the first non-duplicate insertion error.
    pub strict: bool,
    /// Count duplicate ids as skipped instead of as errors.
    pub skip_duplicates: bool,
}

impl SeedOptions {
    pub fn new(seed_dir: impl Into<PathBuf>, db_file_path: impl Into<PathBuf>) -> Self {
        Self {
            seed_dir: seed_dir.into(),
            db_file_path: db_file_path.into(),
            strict: false,
            skip_duplicates: true,
        }
    }
}

/// Outcome of a record seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub files_processed: usize,
    pub ideas_read: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl std::fmt::Display for SeedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "files={} ideas_read={} inserted={} skipped={} errors={}",
            self.files_processed, self.ideas_read, self.inserted, self.skipped, self.errors
        )
    }
}

/// Run a record seed. See the module docs for the flow.
pub async fn seed_ideas_directory(options: &SeedOptions) -> Result<SeedReport> {
    if options.seed_dir.as_os_str().is_empty() {
        bail!("seed directory is required");
    }
    if options.db_file_path.as_os_str().is_empty() {
        bail!("database file path is required");
    }
    ensure_directory(&options.seed_dir)?;

    let files = list_json_files(&options.seed_dir, true)?;
    let mut items = Vec::new();
    for file in &files {
        items.extend(read_seed_file(file)?);
    }

    let store = IdeaStore::open(IdeaStoreOptions::with_file(&options.db_file_path))
        .await
        .with_context(|| {
            format!(
                "Failed to open database: {}",
                options.db_file_path.display()
            )
        })?;

    let outcome = insert_all(&store, &items, options).await;
    let outcome = match outcome {
        Ok(counts) => store.persist().await.map(|_| counts).map_err(anyhow::Error::from),
        Err(e) => Err(e),
    };
    store.close().await;

    let (inserted, skipped, errors) = outcome?;
    let report = SeedReport {
        files_processed: files.len(),
        ideas_read: items.len(),
        inserted,
        skipped,
        errors,
    };

    info!("Seed complete: {}", report);
    Ok(report)
}

async fn insert_all(
    store: &IdeaStore,
    items: &[Value],
    options: &SeedOptions,
) -> Result<(usize, usize, usize)> {
    let mut inserted = 0;
    let mut skipped = 0;
    let mut errors = 0;

    for (index, item) in items.iter().enumerate() {
        let created = match Idea::from_json(item) {
            Ok(idea) => store.create(&idea).await,
            Err(e) => Err(e),
        };

        match created {
            Ok(_) => inserted += 1,
            Err(StoreError::DuplicateId(id)) if options.skip_duplicates => {
                warn!("Skipping duplicate id '{}' (item #{})", id, index + 1);
                skipped += 1;
            }
            Err(e) => {
                errors += 1;
                error!(
                    "Failed to insert idea at index {} (id='{}'): {}",
                    index,
                    item_id(item),
                    e
                );
                if options.strict {
                    bail!("Aborting due to strict mode and an insertion error");
                }
            }
        }
    }

    Ok((inserted, skipped, errors))
}

/// Extract the raw idea values from one parsed seed file.
///
/// Accepts a top-level array, an object with an `ideas` array, or a single
/// object.
pub fn normalize_seed_json(json: Value, source: &Path) -> Result<Vec<Value>> {
    match json {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("ideas") {
            Some(Value::Array(items)) => Ok(items),
            Some(other) => {
                obj.insert("ideas".to_string(), other);
                Ok(vec![Value::Object(obj)])
            }
            None => Ok(vec![Value::Object(obj)]),
        },
        _ => Err(anyhow!(
            "Unsupported JSON structure in {}. Expected an array, {{ ideas: [] }}, or single object.",
            source.display()
        )),
    }
}

fn read_seed_file(path: &Path) -> Result<Vec<Value>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let json: Value = serde_json::from_str(&text)
        .map_err(|e| anyhow!("Failed to parse JSON in {}: {}", path.display(), e))?;
    normalize_seed_json(json, path)
}

fn item_id(item: &Value) -> String {
    item.get("id")
        .and_then(Value::as_str)
        .unwrap_or("<missing>")
        .to_string()
}

pub(crate) fn ensure_directory(dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => bail!(
            "Seed directory not found or not a directory: {}",
            dir.display()
        ),
    }
}

/// Regular files directly inside `dir` whose name ends in `.json`, sorted by
/// file name.
pub(crate) fn list_json_files(dir: &Path, ignore_case: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_json = {
            let name = entry.file_name().to_string_lossy();
            if ignore_case {
                name.to_lowercase().ends_with(".json")
            } else {
                name.ends_with(".json")
            }
        };
        if is_json {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}
