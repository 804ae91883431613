//! Decode Dialects - explicit strategy selection
//!
//! The caller picks the dialect. Scanned text is never sniffed to guess
//! one, since an identifier and a payload can look alike.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::lookup::ProductLookup;
use crate::payload::{self, resolve_price, DecodeOptions};
use crate::pipeline::ParseFailure;
use crate::record::ProductRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `PRODUCTNAME:..*COLOR:..*PRICE:..`, decoded offline
    #[default]
    Delimited,
    /// Opaque identifier resolved by a `ProductLookup`
    Lookup,
    /// JSON object with `productName`, `color` and `price`
    Json,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::Lookup => "lookup",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "delimited" => Ok(Self::Delimited),
            "lookup" => Ok(Self::Lookup),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown dialect '{}' (expected delimited, lookup or json)", other)),
        }
    }
}

/// Turns scanned text into a record, or a classified failure
pub trait DecodeStrategy {
    fn dialect(&self) -> Dialect;
    fn decode(&self, text: &str) -> Result<ProductRecord, ParseFailure>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedStrategy {
    pub options: DecodeOptions,
}

impl DelimitedStrategy {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }
}

impl DecodeStrategy for DelimitedStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Delimited
    }

    fn decode(&self, text: &str) -> Result<ProductRecord, ParseFailure> {
        payload::decode_with(text, &self.options)
    }
}

pub struct LookupStrategy<'a> {
    lookup: &'a dyn ProductLookup,
}

impl<'a> LookupStrategy<'a> {
    pub fn new(lookup: &'a dyn ProductLookup) -> Self {
        Self { lookup }
    }
}

impl DecodeStrategy for LookupStrategy<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Lookup
    }

    fn decode(&self, text: &str) -> Result<ProductRecord, ParseFailure> {
        debug!(id = text, "resolving product identifier");
        self.lookup.lookup(text).map_err(|e| {
            warn!(error = %e, "product lookup failed");
            ParseFailure::LookupFailed(e)
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStrategy {
    pub options: DecodeOptions,
}

impl JsonStrategy {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }
}

impl DecodeStrategy for JsonStrategy {
    fn dialect(&self) -> Dialect {
        Dialect::Json
    }

    fn decode(&self, text: &str) -> Result<ProductRecord, ParseFailure> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            debug!(error = %e, "scanned text is not JSON");
            ParseFailure::InvalidFormat
        })?;

        let product_name = string_field(&value, "productName")?;
        let color = string_field(&value, "color")?;
        let price = match value.get("price") {
            Some(Value::Number(n)) => n.as_f64().ok_or(ParseFailure::InvalidFormat)?,
            Some(Value::String(s)) => resolve_price(s, self.options.price_policy)?,
            _ => return Err(ParseFailure::InvalidFormat),
        };

        Ok(ProductRecord {
            product_name,
            color,
            price,
        })
    }
}

fn string_field(value: &Value, key: &str) -> Result<String, ParseFailure> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or(ParseFailure::InvalidFormat)
}

/// JSON text for the JSON dialect, field for field what a browser's
/// `JSON.stringify` writes for the same product. Casing is preserved.
pub fn encode_json(record: &ProductRecord) -> Result<String, serde_json::Error> {
    serde_json::to_string(record)
}
