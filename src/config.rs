//! Configuration - JSON file with defaults for every field

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::dialect::Dialect;
use crate::payload::{DecodeOptions, PricePolicy};
use crate::scanner::ScannerConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodecConfig {
    #[serde(default)]
    pub price_policy: PricePolicy,
    #[serde(default)]
    pub dialect: Dialect,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl CodecConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Defaults when the file does not exist; a present but broken file is still an error
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions { price_policy: self.price_policy }
    }
}
