//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Where and how definitions are discovered
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// External executor settings
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Filtering and failure policy
    #[serde(default)]
    pub run: RunConfig,
}

/// Discovery settings
#[derive(Debug, Deserialize)]
pub struct DiscoveryConfig {
    /// Directory the pattern is expanded against
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Relative, `/`-separated pattern with `*` and `?` wildcards
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Sort the discovered paths instead of keeping directory order
    #[serde(default)]
    pub sort: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            pattern: default_pattern(),
            sort: false,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_pattern() -> String {
    "*/operation_types/*/definition.json".to_string()
}

/// Executor settings
#[derive(Debug, Deserialize)]
pub struct ExecutorConfig {
    /// Program name (looked up on PATH) or path to the executor
    #[serde(default = "default_program")]
    pub program: String,

    /// Subcommand passed before the `-c`/`-o` pair
    #[serde(default = "default_subcommand")]
    pub subcommand: String,

    /// Extra arguments placed before the subcommand
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            subcommand: default_subcommand(),
            args: Vec::new(),
        }
    }
}

fn default_program() -> String {
    "pfish".to_string()
}

fn default_subcommand() -> String {
    "test".to_string()
}

/// Run settings
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Only records whose name starts with this prefix are executed
    #[serde(default = "default_name_prefix")]
    pub name_prefix: String,

    /// Continue past per-record failures and fail at the end
    #[serde(default)]
    pub keep_going: bool,

    /// Restrict execution to these categories (empty means all)
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            name_prefix: default_name_prefix(),
            keep_going: false,
            categories: Vec::new(),
        }
    }
}

fn default_name_prefix() -> String {
    "Test".to_string()
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default config file is
    /// used when present and defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}
