//! # Configuration Module
//!
//! Data directory setup and runtime settings for radiorec.
//!
//! ## Data Storage
//!
//! The catalog database lives in the platform-standard data directory:
//! - Linux: `~/.local/share/radiorec/radio.db`
//! - macOS: `~/Library/Application Support/radiorec/radio.db`
//! - Windows: `%APPDATA%\radiorec\radio.db`
//!
//! An optional `config.json` in the same directory tunes the recommender:
//!
//! ```json
//! { "recommender": { "min_co_raters": 3, "max_neighbors": 10 } }
//! ```
//!
//! Missing keys fall back to their defaults.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::similarity::MIN_CO_RATERS;

const APP_DIR_NAME: &str = "radiorec";
const DB_FILE_NAME: &str = "radio.db";
const CONFIG_FILE_NAME: &str = "config.json";

/// Returns the platform-appropriate data directory, creating it if needed.
///
/// # Errors
///
/// Fails if the system data directory cannot be determined or the
/// `radiorec` subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR_NAME);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create radiorec data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Returns the platform-appropriate database file path.
///
/// ```no_run
/// use radiorec::config::get_db_path;
///
/// let db_path = get_db_path()?;
/// println!("Database location: {}", db_path.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(DB_FILE_NAME))
}

/// Tuning knobs for similarity and prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Co-raters needed before two songs get a similarity score.
    pub min_co_raters: usize,
    /// Most neighbors that vote on a prediction.
    pub max_neighbors: usize,
    /// Cap on catalog size; `None` means unlimited.
    pub catalog_capacity: Option<usize>,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            min_co_raters: MIN_CO_RATERS,
            max_neighbors: 20,
            catalog_capacity: None,
        }
    }
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to the database file
    pub db_path: PathBuf,
    #[serde(default)]
    pub recommender: RecommenderConfig,
}

/// On-disk shape of `config.json`; every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    recommender: RecommenderConfig,
}

impl RuntimeConfig {
    /// Create a new runtime configuration from the data directory, reading
    /// `config.json` there if it exists.
    pub fn new() -> Result<Self> {
        let data_dir = get_data_dir()?;
        Self::load_from(&data_dir.join(CONFIG_FILE_NAME), data_dir.join(DB_FILE_NAME))
    }

    /// Create configuration with explicit database path
    pub fn with_db_path(db_path: PathBuf) -> Self {
        Self {
            db_path,
            recommender: RecommenderConfig::default(),
        }
    }

    /// Configuration for an explicit database file. `config.json` is looked
    /// up beside it rather than in the data directory, and the explicit path
    /// wins over any `db_path` the file names.
    pub fn for_db_path(db_path: PathBuf) -> Result<Self> {
        let config_path = db_path.with_file_name(CONFIG_FILE_NAME);
        let mut config = Self::load_from(&config_path, db_path.clone())?;
        config.db_path = db_path;
        Ok(config)
    }

    /// Read `config_path` if present; `default_db` is used when the file does
    /// not name a database.
    pub fn load_from(config_path: &Path, default_db: PathBuf) -> Result<Self> {
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::with_db_path(default_db));
        }

        let raw = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        let file: ConfigFile = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in config file {}", config_path.display()))?;

        debug!("Loaded config from {}", config_path.display());
        Ok(Self {
            db_path: file.db_path.unwrap_or(default_db),
            recommender: file.recommender,
        })
    }
}
