//! Idea generation providers.
//!
//! [`IdeaGenerator`] is the seam for AI-backed idea generation. The only
//! provider today is [`DummyGenerator`], which returns fixed placeholder
//! ideas. Use [`create_generator`] to pick a provider from configuration.

use anyhow::Result;
use async_trait::async_trait;
use tracing::warn;

use crate::models::Idea;

/// Smallest count accepted by the generate-ideas route.
pub const MIN_COUNT: u32 = 1;
/// Largest count accepted by the generate-ideas route.
pub const MAX_COUNT: u32 = 12;

/// Providers known to [`create_generator`].
pub const KNOWN_PROVIDERS: &[&str] = &["dummy"];

/// A source of generated ideas.
#[async_trait]
pub trait IdeaGenerator: Send + Sync {
    /// Provider identifier, e.g. `"dummy"`.
    fn name(&self) -> &str;

    /// Produce `count` ideas with ids `idea-1..=idea-count`.
    async fn generate(&self, count: u32) -> Result<Vec<Idea>>;
}

/// Placeholder provider: every idea is identical apart from its id.
pub struct DummyGenerator;

#[async_trait]
impl IdeaGenerator for DummyGenerator {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn generate(&self, count: u32) -> Result<Vec<Idea>> {
        Ok((1..=count)
            .map(|n| Idea {
                id: format!("idea-{}", n),
                title: "Dummy Idea".to_string(),
                summary: "A placeholder idea for development and testing.".to_string(),
                objective: "Demonstrate the API contract for idea generation.".to_string(),
                tags: vec!["ideation".to_string(), "dummy".to_string(), "v0".to_string()],
            })
            .collect())
    }
}

/// Instantiate the provider named in configuration (case-insensitive).
///
/// Unknown names fall back to [`DummyGenerator`] with a warning.
pub fn create_generator(provider: &str) -> Box<dyn IdeaGenerator> {
    match provider.to_lowercase().as_str() {
        "dummy" => Box::new(DummyGenerator),
        other => {
            warn!(
                "Unknown AI provider '{}' (known: {}); using dummy",
                other,
                KNOWN_PROVIDERS.join(", ")
            );
            Box::new(DummyGenerator)
        }
    }
}
