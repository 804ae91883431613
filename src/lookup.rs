//! Product Lookup - server-resolved identifiers
//!
//! In the lookup dialect the QR carries only an opaque identifier. A
//! `ProductLookup` resolves it back to a record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::ConfigError;
use crate::record::ProductRecord;

pub type ProductId = String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Product not found: {0}")]
    NotFound(String),

    #[error("Lookup unavailable: {0}")]
    Unavailable(String),
}

/// Resolves an identifier to a record. One-shot, no retry.
pub trait ProductLookup {
    fn lookup(&self, id: &str) -> Result<ProductRecord, LookupError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: ProductId,
    #[serde(flatten)]
    pub record: ProductRecord,
}

/// In-memory product catalog, optionally backed by a JSON file
#[derive(Debug, Default)]
pub struct Catalog {
    products: HashMap<ProductId, ProductRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self { products: HashMap::new() }
    }

    /// Load entries from a JSON array. A missing file is an empty catalog.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut catalog = Self::new();
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let entries: Vec<CatalogEntry> = serde_json::from_str(&content)?;
            for entry in entries {
                catalog.products.insert(entry.id, entry.record);
            }
        }
        Ok(catalog)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let entries: Vec<CatalogEntry> = self
            .list()
            .into_iter()
            .map(|(id, record)| CatalogEntry {
                id: id.to_string(),
                record: record.clone(),
            })
            .collect();
        fs::write(path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }

    /// Store a record under a fresh identifier, which becomes the QR text
    pub fn register(&mut self, record: ProductRecord) -> ProductId {
        let id = Uuid::new_v4().to_string();
        info!(id = %id, product = %record.product_name, "registered product");
        self.products.insert(id.clone(), record);
        id
    }

    pub fn get(&self, id: &str) -> Option<&ProductRecord> {
        self.products.get(id)
    }

    /// All entries, ordered by product name then id
    pub fn list(&self) -> Vec<(&str, &ProductRecord)> {
        let mut entries: Vec<_> = self
            .products
            .iter()
            .map(|(id, record)| (id.as_str(), record))
            .collect();
        entries.sort_by(|a, b| {
            a.1.product_name
                .cmp(&b.1.product_name)
                .then_with(|| a.0.cmp(b.0))
        });
        entries
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductLookup for Catalog {
    fn lookup(&self, id: &str) -> Result<ProductRecord, LookupError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(LookupError::NotFound(String::new()));
        }
        self.get(id)
            .cloned()
            .ok_or_else(|| LookupError::NotFound(id.to_string()))
    }
}
