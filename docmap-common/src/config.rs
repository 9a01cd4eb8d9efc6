//! Configuration loading and data folder resolution
//!
//! Bootstrap configuration comes from a small TOML file. Every field has a
//! built-in default, so a missing or partial file still yields a usable config.
//!
//! # Data folder priority
//!
//! 1. Explicit argument (e.g. a command-line flag handled by the caller)
//! 2. `DOCMAP_DATA_DIR` environment variable
//! 3. OS-dependent default (`<local data dir>/docmap`)
//! 4. `./docmap_data`

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable consulted when no explicit data folder is given
pub const DATA_DIR_ENV: &str = "DOCMAP_DATA_DIR";

const DEFAULT_STATE_DB: &str = "state.db";
const DEFAULT_TAXONOMY_DB: &str = "taxonomy.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocmapConfig {
    /// Folder that relative database paths resolve against
    pub data_dir: Option<PathBuf>,

    /// Processing state ledger. May be wiped by an external rebuild.
    pub state_db_path: PathBuf,

    /// Taxonomy database (categories, tags, cluster map, article tags)
    pub taxonomy_db_path: PathBuf,

    pub layout: LayoutConfig,

    pub logging: LoggingConfig,
}

/// Layout projection and neighbor graph parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Neighbors kept per document in the graph handed to the visualization
    pub neighbors_k: usize,

    /// Power iteration cap per principal axis
    pub max_iterations: usize,

    /// Convergence threshold on the change of the axis between iterations
    pub tolerance: f64,

    /// Scale coordinates so the largest absolute value is 1.0
    pub normalize: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for DocmapConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            state_db_path: PathBuf::from(DEFAULT_STATE_DB),
            taxonomy_db_path: PathBuf::from(DEFAULT_TAXONOMY_DB),
            layout: LayoutConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            neighbors_k: 10,
            max_iterations: 200,
            tolerance: 1e-9,
            normalize: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DocmapConfig {
    /// Load configuration from a TOML file
    ///
    /// Relative database paths are resolved against the data folder, which
    /// follows the priority order in the module docs when the file leaves it unset.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), "Loaded config file");
        Self::from_toml_str(&content)
    }

    /// Parse configuration text and resolve database paths
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: DocmapConfig =
            toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;

        let data_dir = resolve_data_dir(config.data_dir.as_deref());
        config.state_db_path = resolve_against(&data_dir, &config.state_db_path);
        config.taxonomy_db_path = resolve_against(&data_dir, &config.taxonomy_db_path);
        config.data_dir = Some(data_dir);
        Ok(config)
    }

    /// Defaults rooted at the given (or resolved) data folder
    pub fn with_data_dir(data_dir: Option<&Path>) -> Self {
        let data_dir = resolve_data_dir(data_dir);
        Self {
            state_db_path: data_dir.join(DEFAULT_STATE_DB),
            taxonomy_db_path: data_dir.join(DEFAULT_TAXONOMY_DB),
            data_dir: Some(data_dir),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if self.layout.max_iterations == 0 {
            return Err(Error::Config("layout.max_iterations must be positive".to_string()));
        }
        if !(self.layout.tolerance.is_finite() && self.layout.tolerance > 0.0) {
            return Err(Error::Config(format!(
                "layout.tolerance must be a positive number, got {}",
                self.layout.tolerance
            )));
        }
        if self.state_db_path.as_os_str().is_empty() || self.taxonomy_db_path.as_os_str().is_empty() {
            return Err(Error::Config("database paths must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Resolve the data folder: explicit argument, environment, OS default
pub fn resolve_data_dir(explicit: Option<&Path>) -> PathBuf {
    // Priority 1: explicit argument
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    // Priority 2: environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
        warn!("{} is set but empty, ignoring", DATA_DIR_ENV);
    }

    // Priority 3/4: OS-dependent default
    default_data_dir()
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("docmap"))
        .unwrap_or_else(|| PathBuf::from("./docmap_data"))
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
