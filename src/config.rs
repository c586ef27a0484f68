//! Engine configuration.
//!
//! Handles loading, validating, and merging `config.toml`. The file lives in
//! the content directory; its values are layered on top of the stock defaults, so
//! it only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [catalog]
//! extensions = ["md", "mdx"]          # Document file extensions to discover
//! include_unpublished = false         # Author preview: keep published = false
//!
//! [progress]
//! store_path = ".course-progress.json"  # JSON progress store
//! utc_offset_minutes = 0              # Calendar-day boundary for streaks
//!
//! [processing]
//! max_threads = 4                     # Parse workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::catalog::CatalogOptions;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Largest accepted `utc_offset_minutes`, either side of UTC.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 23 * 60 + 59;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Document discovery and publishing.
    pub catalog: CatalogConfig,
    /// Learner progress storage and calendar.
    pub progress: ProgressConfig,
    /// Parallel parsing settings.
    pub processing: ProcessingConfig,
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.catalog.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "catalog.extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .catalog
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.contains('.') || e.contains('/'))
        {
            return Err(ConfigError::Validation(format!(
                "catalog.extensions entry {bad:?} must be a bare extension like \"md\""
            )));
        }
        if self.progress.store_path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "progress.store_path must not be empty".into(),
            ));
        }
        if self.progress.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ConfigError::Validation(format!(
                "progress.utc_offset_minutes must be within ±{MAX_UTC_OFFSET_MINUTES}"
            )));
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn catalog_options(&self) -> CatalogOptions {
        CatalogOptions {
            include_unpublished: self.catalog.include_unpublished,
        }
    }

    /// The configured calendar offset.
    pub fn utc_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.progress.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::Validation(format!(
                "progress.utc_offset_minutes {} is out of range",
                self.progress.utc_offset_minutes
            ))
        })
    }
}

/// Document discovery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    /// File extensions (without the dot) treated as course documents.
    pub extensions: Vec<String>,
    /// Keep `published: false` courses in the catalog.
    pub include_unpublished: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["md".to_string(), "mdx".to_string()],
            include_unpublished: false,
        }
    }
}

/// Progress store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProgressConfig {
    /// JSON store file, relative to the working directory.
    pub store_path: String,
    /// Minutes east of UTC where a learner's calendar day starts.
    pub utc_offset_minutes: i32,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            store_path: ".course-progress.json".to_string(),
            utc_offset_minutes: 0,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel parse workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(EngineConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<EngineConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(dir)?)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r#"# Course Unlock Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file in the content directory. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Catalog
# ---------------------------------------------------------------------------
[catalog]
# File extensions (without the dot) treated as course documents.
extensions = ["md", "mdx"]

# Keep courses marked `published: false`, for previewing drafts.
include_unpublished = false

# ---------------------------------------------------------------------------
# Progress
# ---------------------------------------------------------------------------
[progress]
# JSON file holding every learner's completion records.
store_path = ".course-progress.json"

# Minutes east of UTC where calendar days start, for streaks and stats.
# Example: -300 for UTC-5, 60 for UTC+1.
utc_offset_minutes = 0

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel parse workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"#
}
