//! Application configuration.
//!
//! Sources, lowest to highest precedence: built-in defaults, the TOML file at
//! `$EUNOIA_CONFIG` (or `<config dir>/config.toml`), then `EUNOIA_*`
//! environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::logging::LoggingConfig;
use crate::services::filter_service::DEFAULT_EXCLUDED_NAMES;
use crate::services::metadata_service::TextLoading;
use crate::services::path_resolver::{default_rules, TranslationRule, TranslationTable};

pub const CONFIG_ENV: &str = "EUNOIA_CONFIG";
pub const ROOT_ENV: &str = "EUNOIA_ROOT";
pub const TEXT_LOADING_ENV: &str = "EUNOIA_TEXT_LOADING";
pub const MEILI_URL_ENV: &str = "EUNOIA_MEILI_URL";
pub const MEILI_KEY_ENV: &str = "EUNOIA_MEILI_KEY";
pub const INDEX_NAME_ENV: &str = "EUNOIA_INDEX_NAME";

const DEFAULT_ROOT: &str = "eunoia/.output";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexBackend {
    #[default]
    Meilisearch,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub backend: IndexBackend,
    pub url: String,
    pub api_key: Option<String>,
    /// Embedded backend database; defaults to `<data dir>/index.db`.
    pub sqlite_path: Option<PathBuf>,
    pub name: String,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: IndexBackend::default(),
            url: "http://127.0.0.1:7700".to_string(),
            api_key: None,
            sqlite_path: None,
            name: "transcripts".to_string(),
            poll_interval_ms: 100,
            max_poll_attempts: 600,
        }
    }
}

impl IndexConfig {
    pub fn sqlite_path(&self) -> Result<PathBuf, AppError> {
        match &self.sqlite_path {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("index.db")),
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        let valid_name = !self.name.is_empty()
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid_name {
            return Err(AppError::Config(format!(
                "index name '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.name
            )));
        }
        if self.max_poll_attempts == 0 {
            return Err(AppError::Config(
                "index.max_poll_attempts must be at least 1".to_string(),
            ));
        }
        if self.backend == IndexBackend::Meilisearch && self.url.trim().is_empty() {
            return Err(AppError::Config("index.url is required for meilisearch".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            debounce_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_root_dir")]
    pub root_dir: PathBuf,
    #[serde(default)]
    pub text_loading: TextLoading,
    #[serde(default = "default_excluded_names")]
    pub excluded_names: Vec<String>,
    /// `None` means the built-in Voice Memos and Photos rules.
    #[serde(default)]
    pub translation_rules: Option<Vec<TranslationRule>>,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn project_dirs() -> Result<directories::ProjectDirs, AppError> {
    directories::ProjectDirs::from("", "eunoia", "eunoia")
        .ok_or_else(|| AppError::Config("could not determine platform directories".to_string()))
}

fn home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("/"))
}

fn default_root_dir() -> PathBuf {
    home_dir().join(DEFAULT_ROOT)
}

fn default_excluded_names() -> Vec<String> {
    DEFAULT_EXCLUDED_NAMES.iter().map(|s| s.to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_dir: default_root_dir(),
            text_loading: TextLoading::default(),
            excluded_names: default_excluded_names(),
            translation_rules: None,
            index: IndexConfig::default(),
            watch: WatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self, AppError> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(p) if !p.is_empty() => PathBuf::from(p),
            _ => project_dirs()?.config_dir().join("config.toml"),
        };
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => {
                tracing::debug!(path = %path.display(), "loading config file");
                Self::from_toml(&raw)
                    .map_err(|e| AppError::Config(format!("{}: {e}", path.display())))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, AppError> {
        toml::from_str(raw).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Apply `EUNOIA_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(root) = lookup(ROOT_ENV) {
            self.root_dir = PathBuf::from(root);
        }
        if let Some(mode) = lookup(TEXT_LOADING_ENV) {
            self.text_loading = mode
                .parse()
                .map_err(|e: String| AppError::Config(format!("{TEXT_LOADING_ENV}: {e}")))?;
        }
        if let Some(url) = lookup(MEILI_URL_ENV) {
            self.index.url = url;
        }
        if let Some(key) = lookup(MEILI_KEY_ENV) {
            self.index.api_key = Some(key);
        }
        if let Some(name) = lookup(INDEX_NAME_ENV) {
            self.index.name = name;
        }
        Ok(())
    }

    pub fn root(&self) -> String {
        self.root_dir.to_string_lossy().to_string()
    }

    pub fn rules(&self) -> Vec<TranslationRule> {
        match &self.translation_rules {
            Some(rules) => rules.clone(),
            None => default_rules(&home_dir().to_string_lossy()),
        }
    }

    pub fn translation_table(&self) -> Result<TranslationTable, AppError> {
        TranslationTable::new(self.rules())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.translation_table()?;
        self.index.validate()?;
        Ok(())
    }
}
