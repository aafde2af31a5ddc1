//! Query configuration: category vocabulary and limits
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a three-layer resolution:
//! 1. An explicit path (`--config`), if it exists
//! 2. Override in data dir (~/.local/share/tally/config/tally.toml)
//! 3. Embedded defaults (compiled into binary)
//!
//! Files only need to name the keys they change.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/tally.toml");

/// Vocabulary and limits shared by the query pipeline, server and CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TallyConfig {
    /// Closed category vocabulary, in priority order
    pub known_categories: Vec<String>,
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub default_evidence_limit: usize,
    pub max_evidence_limit: usize,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            known_categories: ["Travel", "Essentials", "Food", "Personal", "Home", "Others"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_top_k: 5,
            max_top_k: 20,
            default_evidence_limit: 20,
            max_evidence_limit: 100,
        }
    }
}

impl TallyConfig {
    /// Load from the data dir override, falling back to embedded defaults
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load with an explicit override path taking precedence
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let content = match path.filter(|p| p.exists()) {
            Some(p) => read_config(p)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(p) => read_config(&p)?,
                None => DEFAULT_CONFIG.to_string(),
            },
        };
        parse_config(&content)
    }

    /// Same limits, different category vocabulary
    pub fn with_categories<I, S>(mut self, categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_categories = categories.into_iter().map(Into::into).collect();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.known_categories.is_empty() {
            return Err(Error::Config("known_categories must not be empty".into()));
        }
        for (i, cat) in self.known_categories.iter().enumerate() {
            if cat.trim().is_empty() {
                return Err(Error::Config("known_categories contains a blank name".into()));
            }
            if self.known_categories[..i]
                .iter()
                .any(|prev| prev.eq_ignore_ascii_case(cat))
            {
                return Err(Error::Config(format!("Duplicate category: {}", cat)));
            }
        }
        for (key, value) in [
            ("default_top_k", self.default_top_k),
            ("max_top_k", self.max_top_k),
            ("default_evidence_limit", self.default_evidence_limit),
            ("max_evidence_limit", self.max_evidence_limit),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{} must be at least 1", key)));
            }
        }
        if self.default_top_k > self.max_top_k {
            return Err(Error::Config("default_top_k exceeds max_top_k".into()));
        }
        if self.default_evidence_limit > self.max_evidence_limit {
            return Err(Error::Config(
                "default_evidence_limit exceeds max_evidence_limit".into(),
            ));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("tally").join("config").join("tally.toml"))
}

fn read_config(path: &Path) -> Result<String> {
    debug!(path = %path.display(), "Loading config override");
    fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    vocabulary: Option<RawVocabulary>,
    query: Option<RawQuery>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawVocabulary {
    known_categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQuery {
    default_top_k: Option<usize>,
    max_top_k: Option<usize>,
    default_evidence_limit: Option<usize>,
    max_evidence_limit: Option<usize>,
}

/// Parse config from TOML content on top of the built-in defaults
fn parse_config(content: &str) -> Result<TallyConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = TallyConfig::default();

    if let Some(categories) = raw.vocabulary.and_then(|v| v.known_categories) {
        config.known_categories = categories;
    }

    if let Some(query) = raw.query {
        if let Some(k) = query.default_top_k {
            config.default_top_k = k;
        }
        if let Some(k) = query.max_top_k {
            config.max_top_k = k;
        }
        if let Some(limit) = query.default_evidence_limit {
            config.default_evidence_limit = limit;
        }
        if let Some(limit) = query.max_evidence_limit {
            config.max_evidence_limit = limit;
        }
    }

    config.validate()?;
    Ok(config)
}
