//! Core data models used throughout the service.
//!
//! Two idea shapes coexist: [`Idea`] is the string-keyed record served by the
//! record store and the generator, [`ContentIdea`] is the content-keyed row
//! written by the content seeder.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::store::StoreError;

/// An idea record keyed by a caller-supplied string id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub objective: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Idea {
    /// Convert an arbitrary JSON value (e.g. one element of a seed file)
    /// into an [`Idea`].
    ///
    /// A missing or `null` `tags` field becomes an empty list.
    pub fn from_json(value: &Value) -> Result<Self, StoreError> {
        let obj = value
            .as_object()
            .ok_or_else(|| StoreError::Validation("must be an object".to_string()))?;

        let field = |name: &str| -> Result<String, StoreError> {
            match obj.get(name) {
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                _ => Err(StoreError::Validation(format!(
                    "{} must be a non-empty string",
                    name
                ))),
            }
        };

        let tags = match obj.get("tags") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|t| {
                    t.as_str().map(str::to_string).ok_or_else(|| {
                        StoreError::Validation("tags must be an array of strings".to_string())
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => {
                return Err(StoreError::Validation("tags must be an array".to_string()));
            }
        };

        Ok(Idea {
            id: field("id")?,
            title: field("title")?,
            summary: field("summary")?,
            objective: field("objective")?,
            tags,
        })
    }

    /// Check the insert invariants: every text field is non-empty.
    pub fn validate(&self) -> Result<(), StoreError> {
        for (name, value) in [
            ("id", &self.id),
            ("title", &self.title),
            ("summary", &self.summary),
            ("objective", &self.objective),
        ] {
            if value.is_empty() {
                return Err(StoreError::Validation(format!(
                    "{} must be a non-empty string",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// A stored content-keyed idea row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ContentIdea {
    pub id: i64,
    pub content: String,
    pub created_at: String,
}

/// A normalized content idea read from a seed file, before insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContentIdea {
    pub content: String,
    pub created_at: Option<String>,
}

/// One page of content ideas with continuation info.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub items: Vec<ContentIdea>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<i64>,
}
