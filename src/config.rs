//! Runtime configuration.
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file (`--config`), then environment variables.
//!
//! | Variable | Field | Default |
//! |----------|-------|---------|
//! | `PORT` | `server.port` | `3000` |
//! | `APP_VERSION` | `server.app_version` | `v0.1.0` |
//! | `GIT_COMMIT` | `server.git_commit` | `local` |
//! | `AI_PROVIDER` | `ai.provider` | `dummy` |
//! | `DB_FILE_PATH` | `db.file_path` | unset (in-memory) |
//! | `DB_PATH` | `db.path` | `data/app.db` |
//! | `IDEAS_BACKEND` | `db.backend` | `records` |
//! | `SEED_DIR` | `seed.dir` | unset |
//!
//! Empty environment values are treated as unset.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub seed: SeedConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_app_version")]
    pub app_version: String,
    #[serde(default = "default_git_commit")]
    pub git_commit: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            app_version: default_app_version(),
            git_commit: default_git_commit(),
        }
    }
}

fn default_port() -> u16 {
    3000
}
fn default_app_version() -> String {
    "v0.1.0".to_string()
}
fn default_git_commit() -> String {
    "local".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
        }
    }
}

fn default_provider() -> String {
    "dummy".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DbConfig {
    /// Backing file of the record store.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    /// Native database file of the content store.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub backend: Backend,
}

impl DbConfig {
    /// Content database path, falling back to `data/app.db`.
    pub fn content_db_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from("data").join("app.db"))
    }
}

/// Which store backs the `/api/v1/ideas` routes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Records,
    Content,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "records" => Ok(Backend::Records),
            "content" => Ok(Backend::Content),
            other => bail!(
                "Unknown ideas backend: '{}'. Must be records or content.",
                other
            ),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Load configuration from an optional TOML file plus the process environment.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            toml::from_str(&content).with_context(|| "Failed to parse config file")?
        }
        None => Config::default(),
    };

    let config = apply_env(config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Overlay environment values onto `config` using `lookup` to read variables.
pub fn apply_env<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = var("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("PORT must be a port number, got '{}'", port))?;
    }
    if let Some(version) = var("APP_VERSION") {
        config.server.app_version = version;
    }
    if let Some(commit) = var("GIT_COMMIT") {
        config.server.git_commit = commit;
    }
    if let Some(provider) = var("AI_PROVIDER") {
        config.ai.provider = provider;
    }
    if let Some(file_path) = var("DB_FILE_PATH") {
        config.db.file_path = Some(PathBuf::from(file_path));
    }
    if let Some(path) = var("DB_PATH") {
        config.db.path = Some(PathBuf::from(path));
    }
    if let Some(backend) = var("IDEAS_BACKEND") {
        config.db.backend = backend.parse()?;
    }
    if let Some(dir) = var("SEED_DIR") {
        config.seed.dir = Some(PathBuf::from(dir));
    }

    config.ai.provider = config.ai.provider.to_lowercase();
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        bail!("server.port must be > 0");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = apply_env(Config::default(), env(&[])).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.app_version, "v0.1.0");
        assert_eq!(cfg.server.git_commit, "local");
        assert_eq!(cfg.ai.provider, "dummy");
        assert_eq!(cfg.db.backend, Backend::Records);
        assert!(cfg.db.file_path.is_none());
        assert_eq!(cfg.db.content_db_path(), PathBuf::from("data").join("app.db"));
        validate(&cfg).unwrap();
    }

    #[test]
    fn test_env_overrides() {
        let cfg = apply_env(
            Config::default(),
            env(&[
                ("PORT", "8080"),
                ("APP_VERSION", "v1.2.3"),
                ("GIT_COMMIT", "abc123"),
                ("AI_PROVIDER", "DUMMY"),
                ("DB_FILE_PATH", "/tmp/ideas.sqlite"),
                ("DB_PATH", "/tmp/app.db"),
                ("IDEAS_BACKEND", "content"),
                ("SEED_DIR", "seeds"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.app_version, "v1.2.3");
        assert_eq!(cfg.server.git_commit, "abc123");
        assert_eq!(cfg.ai.provider, "dummy");
        assert_eq!(cfg.db.file_path, Some(PathBuf::from("/tmp/ideas.sqlite")));
        assert_eq!(cfg.db.content_db_path(), PathBuf::from("/tmp/app.db"));
        assert_eq!(cfg.db.backend, Backend::Content);
        assert_eq!(cfg.seed.dir, Some(PathBuf::from("seeds")));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let cfg = apply_env(Config::default(), env(&[("PORT", ""), ("APP_VERSION", "  ")])).unwrap();
        assert_eq!(cfg.server.port, 3000);
        assert_eq!(cfg.server.app_version, "v0.1.0");
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(apply_env(Config::default(), env(&[("PORT", "eighty")])).is_err());
        assert!(apply_env(Config::default(), env(&[("IDEAS_BACKEND", "redis")])).is_err());

        let mut cfg = Config::default();
        cfg.server.port = 0;
        assert!(validate(&cfg).is_err());

        // Provider names are resolved by the generator factory, not here.
        let cfg = apply_env(Config::default(), env(&[("AI_PROVIDER", "openai")])).unwrap();
        assert_eq!(cfg.ai.provider, "openai");
        validate(&cfg).unwrap();
    }

    #[test]
    fn test_toml_file_then_env() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("vibes.toml");
        std::fs::write(
            &path,
            r#"
[server]
port = 4000
git_commit = "from-file"

[db]
backend = "content"
path = "var/app.db"
"#,
        )
        .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let file_cfg: Config = toml::from_str(&content).unwrap();
        let cfg = apply_env(file_cfg, env(&[("GIT_COMMIT", "from-env")])).unwrap();
        assert_eq!(cfg.server.port, 4000);
        assert_eq!(cfg.server.app_version, "v0.1.0");
        assert_eq!(cfg.server.git_commit, "from-env");
        assert_eq!(cfg.db.backend, Backend::Content);
        assert_eq!(cfg.db.content_db_path(), PathBuf::from("var/app.db"));
    }
}
