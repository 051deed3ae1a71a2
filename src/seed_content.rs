//! Content seeding: load a directory of JSON files into the content store.
//!
//! Lenient: unreadable or malformed files and items without usable text are
//! dropped. Items are deduplicated by their
//! trimmed content, first within the run and then against what is already
//! stored, and written in a single transaction.

use anyhow::Result;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::content_store::ContentStore;
use crate::models::NewContentIdea;
use crate::seed::{ensure_directory, list_json_files};

/// Inputs for [`seed_content_directory`].
#[derive(Debug, Clone)]
pub struct ContentSeedOptions {
    pub seed_dir: PathBuf,
    pub db_path: PathBuf,
    /// Delete every stored row first (ignored for dry runs).
    pub clear: bool,
    /// Report what would happen without writing.
    pub dry_run: bool,
}

/// Outcome of a content seed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSeedReport {
    pub total_files: usize,
    pub total_read: usize,
    pub total_deduped: usize,
    pub inserted: u64,
    pub skipped_existing: u64,
    pub cleared: bool,
}

impl std::fmt::Display for ContentSeedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "files={} read={} deduped={} inserted={} skipped={}",
            self.total_files,
            self.total_read,
            self.total_deduped,
            self.inserted,
            self.skipped_existing
        )?;
        if self.cleared {
            write!(f, " cleared=true")?;
        }
        Ok(())
    }
}

pub async fn seed_content_directory(options: &ContentSeedOptions) -> Result<ContentSeedReport> {
    ensure_directory(&options.seed_dir)?;

    let files = list_json_files(&options.seed_dir, false)?;
    let ideas = collect_ideas(&files);
    let deduped = dedup_by_content(&ideas);

    let mut report = ContentSeedReport {
        total_files: files.len(),
        total_read: ideas.len(),
        total_deduped: deduped.len(),
        ..Default::default()
    };

    let store = ContentStore::open(&options.db_path).await?;
    let outcome = apply(&store, &deduped, options, &mut report).await;
    store.close().await;
    outcome?;

    info!(
        dry_run = options.dry_run,
        "Content seed complete: {}", report
    );
    Ok(report)
}

async fn apply(
    store: &ContentStore,
    deduped: &[NewContentIdea],
    options: &ContentSeedOptions,
    report: &mut ContentSeedReport,
) -> Result<()> {
    if options.clear && !options.dry_run {
        store.clear().await?;
        report.cleared = true;
    }

    let mut existing = store.existing_contents().await?;

    if options.dry_run {
        for idea in deduped {
            if existing.contains(&idea.content) {
                report.skipped_existing += 1;
            } else {
                report.inserted += 1;
            }
        }
        return Ok(());
    }

    let (inserted, skipped) = store.insert_batch(deduped, &mut existing).await?;
    report.inserted = inserted;
    report.skipped_existing = skipped;
    Ok(())
}

fn collect_ideas(files: &[PathBuf]) -> Vec<NewContentIdea> {
    let mut ideas = Vec::new();
    for file in files {
        match read_json(file) {
            Ok(json) => ideas.extend(extract_ideas(&json)),
            Err(e) => warn!("Skipping {}: {}", file.display(), e),
        }
    }
    ideas
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Normalize a single seed item: a string or an object with a `content`
/// string. Returns `None` when no non-blank content is present.
pub fn normalize_idea(item: &Value) -> Option<NewContentIdea> {
    match item {
        Value::String(s) => {
            let content = s.trim();
            (!content.is_empty()).then(|| NewContentIdea {
                content: content.to_string(),
                created_at: None,
            })
        }
        Value::Object(obj) => {
            let content = obj.get("content").and_then(Value::as_str)?.trim();
            if content.is_empty() {
                return None;
            }
            Some(NewContentIdea {
                content: content.to_string(),
                created_at: obj
                    .get("createdAt")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        }
        _ => None,
    }
}

/// Pull normalized ideas out of one parsed file.
///
/// Shapes: an array of items, `{ "ideas": [...] }`, `{ "idea": item }`, a
/// single item object, or a bare string.
pub fn extract_ideas(json: &Value) -> Vec<NewContentIdea> {
    match json {
        Value::Array(items) => items.iter().filter_map(normalize_idea).collect(),
        Value::Object(obj) => {
            if let Some(Value::Array(items)) = obj.get("ideas") {
                items.iter().filter_map(normalize_idea).collect()
            } else if let Some(single) = obj.get("idea") {
                normalize_idea(single).into_iter().collect()
            } else {
                normalize_idea(json).into_iter().collect()
            }
        }
        Value::String(_) => normalize_idea(json).into_iter().collect(),
        _ => Vec::new(),
    }
}

/// Keep the first occurrence of each content string, preserving order.
pub fn dedup_by_content(ideas: &[NewContentIdea]) -> Vec<NewContentIdea> {
    let mut seen = HashSet::new();
    ideas
        .iter()
        .filter(|idea| seen.insert(idea.content.as_str()))
        .cloned()
        .collect()
}
