//! Generator settings.
//!
//! Settings come from an optional JSON file; command-line flags override
//! individual keys afterwards.

use crate::error::{AppError, Result};
use chrono::NaiveDate;
use std::fmt::Write;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Namespace for generated verification codes
pub const DEFAULT_QR_PREFIX: &str = "LAZYSLOTH";

/// Long US date, e.g. "October 17, 2026"
pub const DEFAULT_DATE_FORMAT: &str = "%B %-d, %Y";

pub const DEFAULT_ARCHIVE_PREFIX: &str = "assets";

pub const DEFAULT_STORE_DIR: &str = ".massgen";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub qr_prefix: String,
    pub date_format: String,
    pub archive_prefix: String,
    pub store_dir: PathBuf,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            qr_prefix: DEFAULT_QR_PREFIX.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
        }
    }
}

impl GeneratorConfig {
    /// Defaults, overlaid with the file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .map_err(|e| AppError::Config(format!("{}: {}", p.display(), e)))?;
                serde_json::from_str(&content)
                    .map_err(|e| AppError::Config(format!("{}: {}", p.display(), e)))?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.qr_prefix.trim().is_empty() {
            return Err(AppError::Config("qrPrefix must not be empty".to_string()));
        }
        if !is_valid_date_format(&self.date_format) {
            return Err(AppError::Config(format!(
                "invalid dateFormat: {}",
                self.date_format
            )));
        }
        if self.archive_prefix.contains(['/', '\\']) {
            return Err(AppError::Config(format!(
                "archivePrefix must be a plain file name: {}",
                self.archive_prefix
            )));
        }
        Ok(())
    }
}

/// Format `date` with `pattern`. `None` when the pattern is malformed or
/// asks for parts a calendar date does not have (time, zone).
pub fn try_format_date(date: NaiveDate, pattern: &str) -> Option<String> {
    if pattern.is_empty() {
        return None;
    }
    let mut out = String::new();
    write!(out, "{}", date.format(pattern)).ok()?;
    Some(out)
}

/// True when `pattern` formats a plain calendar date without erroring.
pub fn is_valid_date_format(pattern: &str) -> bool {
    NaiveDate::from_ymd_opt(2000, 1, 1).map_or(false, |d| try_format_date(d, pattern).is_some())
}
