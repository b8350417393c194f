use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use config::{Config, Environment};
use regex::Regex;
use serde::Deserialize;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "NOTE";

static AUTHOR_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());

/// Runtime settings: defaults, then `NOTE_*` environment variables.
/// CLI flags are applied on top by the binary.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub author: Option<String>,
    pub cache_dir: PathBuf,
    pub base_url: String,
    pub page_delay_ms: u64,
    pub timeout_secs: u64,
    pub prompts_dir: PathBuf,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("cache_dir", "cached_posts")?
            .set_default("base_url", "https://note.com")?
            .set_default("page_delay_ms", 1000)?
            .set_default("timeout_secs", 30)?
            .set_default("prompts_dir", "prompts")?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Author id from the CLI override or the environment.
    pub fn author_id(&self, cli: Option<&str>) -> Result<String, ConfigError> {
        let given = |s: &&str| !s.trim().is_empty();
        let raw = cli
            .filter(given)
            .or(self.author.as_deref().filter(given))
            .ok_or(ConfigError::MissingAuthor)?;
        resolve_author(raw)
    }
}

/// Accepts a bare id (`someone`) or a profile URL (`https://note.com/someone/`).
pub fn resolve_author(input: &str) -> Result<String, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingAuthor);
    }

    let path = trimmed.split(['?', '#']).next().unwrap_or_default();
    let last = path.trim_end_matches('/').rsplit('/').next().unwrap_or_default();

    if AUTHOR_ID_RE.is_match(last) {
        Ok(last.to_string())
    } else {
        Err(ConfigError::InvalidAuthor(input.to_string()))
    }
}
