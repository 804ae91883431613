//! Product Records - the structured side of the codec
//!
//! A `ProductDraft` is raw user input. `ProductDraft::complete` is the
//! caller-side gate that must pass before anything is encoded.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::payload::{FIELD_SEPARATOR, KV_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub product_name: String,
    pub color: String,
    #[serde(serialize_with = "serialize_price")]
    pub price: f64,
}

/// Largest integer an f64 holds exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Integral prices are written as JSON integers (`5`, not `5.0`)
fn serialize_price<S: Serializer>(price: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if price.is_finite() && price.fract() == 0.0 && price.abs() <= MAX_EXACT_INTEGER {
        serializer.serialize_i64(*price as i64)
    } else {
        serializer.serialize_f64(*price)
    }
}

impl ProductRecord {
    pub fn new(product_name: impl Into<String>, color: impl Into<String>, price: f64) -> Self {
        Self {
            product_name: product_name.into(),
            color: color.into(),
            price,
        }
    }

    /// Same record with name and color upper-cased, as the wire form carries them
    pub fn normalized(&self) -> Self {
        Self {
            product_name: self.product_name.to_uppercase(),
            color: self.color.to_uppercase(),
            price: self.price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("please fill all the fields (missing {0})")]
    MissingField(&'static str),

    #[error("price is not a number: {0:?}")]
    InvalidPrice(String),

    #[error("price must not be negative: {0}")]
    NegativePrice(String),

    #[error("{field} must not contain '{ch}'")]
    ReservedCharacter { field: &'static str, ch: char },
}

/// Unvalidated product input as typed by a user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub price: String,
}

impl ProductDraft {
    pub fn new(
        product_name: impl Into<String>,
        color: impl Into<String>,
        price: impl Into<String>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            color: color.into(),
            price: price.into(),
        }
    }

    /// Completeness check. Only a record returned from here may be encoded.
    pub fn complete(&self) -> Result<ProductRecord, RecordError> {
        let product_name = required_text("productName", &self.product_name)?;
        let color = required_text("color", &self.color)?;

        if self.price.trim().is_empty() {
            return Err(RecordError::MissingField("price"));
        }
        let price = parse_price(&self.price)?;

        Ok(ProductRecord {
            product_name: product_name.to_string(),
            color: color.to_string(),
            price,
        })
    }
}

fn required_text<'a>(field: &'static str, value: &'a str) -> Result<&'a str, RecordError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(RecordError::MissingField(field));
    }
    for ch in [FIELD_SEPARATOR, KV_SEPARATOR] {
        if value.contains(ch) {
            return Err(RecordError::ReservedCharacter { field, ch });
        }
    }
    Ok(value)
}

/// Strict price parsing: finite, non-negative, plain decimal notation
pub fn parse_price(text: &str) -> Result<f64, RecordError> {
    let trimmed = text.trim();
    if !is_decimal_literal(trimmed) {
        return Err(RecordError::InvalidPrice(text.to_string()));
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| RecordError::InvalidPrice(text.to_string()))?;
    if !value.is_finite() {
        return Err(RecordError::InvalidPrice(text.to_string()));
    }
    if value < 0.0 {
        return Err(RecordError::NegativePrice(text.to_string()));
    }
    Ok(value)
}

/// Lenient price coercion used by the decoder.
///
/// Blank text coerces to `0`, `Infinity` spellings to infinities, and
/// anything else that is not a decimal literal to `NaN`. Never fails.
pub fn coerce_price(text: &str) -> f64 {
    let trimmed = text.trim();
    match trimmed {
        "" => 0.0,
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if is_decimal_literal(trimmed) => trimmed.parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

/// Digits with optional sign, fraction and exponent. Rejects the
/// `inf`/`nan` words that `f64::from_str` would otherwise accept.
fn is_decimal_literal(s: &str) -> bool {
    !s.is_empty()
        && s.chars().any(|c| c.is_ascii_digit())
        && s
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_complete_trims_fields() {
        let record = ProductDraft::new("  widget ", "red", "9.99").complete().unwrap();
        assert_eq!(record.product_name, "widget");
        assert_eq!(record.color, "red");
        assert_eq!(record.price, 9.99);
    }

    #[test]
    fn test_draft_missing_fields() {
        assert_eq!(
            ProductDraft::new("", "red", "1").complete(),
            Err(RecordError::MissingField("productName"))
        );
        assert_eq!(
            ProductDraft::new("widget", "   ", "1").complete(),
            Err(RecordError::MissingField("color"))
        );
        assert_eq!(
            ProductDraft::new("widget", "red", "").complete(),
            Err(RecordError::MissingField("price"))
        );
    }

    #[test]
    fn test_draft_rejects_separators() {
        let err = ProductDraft::new("a*b", "red", "1").complete().unwrap_err();
        assert_eq!(err, RecordError::ReservedCharacter { field: "productName", ch: '*' });

        let err = ProductDraft::new("widget", "re:d", "1").complete().unwrap_err();
        assert_eq!(err, RecordError::ReservedCharacter { field: "color", ch: ':' });
    }

    #[test]
    fn test_draft_price_rules() {
        assert!(matches!(
            ProductDraft::new("w", "r", "$5").complete(),
            Err(RecordError::InvalidPrice(_))
        ));
        assert!(matches!(
            ProductDraft::new("w", "r", "1,000").complete(),
            Err(RecordError::InvalidPrice(_))
        ));
        assert!(matches!(
            ProductDraft::new("w", "r", "-2").complete(),
            Err(RecordError::NegativePrice(_))
        ));
        assert!(matches!(
            ProductDraft::new("w", "r", "inf").complete(),
            Err(RecordError::InvalidPrice(_))
        ));
        assert_eq!(ProductDraft::new("w", "r", "0").complete().unwrap().price, 0.0);
    }

    #[test]
    fn test_coerce_price() {
        assert_eq!(coerce_price("10"), 10.0);
        assert_eq!(coerce_price(" 2.5 "), 2.5);
        assert_eq!(coerce_price("1e3"), 1000.0);
        assert_eq!(coerce_price(""), 0.0);
        assert_eq!(coerce_price("Infinity"), f64::INFINITY);
        assert!(coerce_price("notanumber").is_nan());
        assert!(coerce_price("nan").is_nan());
        assert!(coerce_price("1.2.3").is_nan());
    }

    #[test]
    fn test_normalized_uppercases() {
        let record = ProductRecord::new("widget", "Red", 5.0).normalized();
        assert_eq!(record, ProductRecord::new("WIDGET", "RED", 5.0));
    }

    #[test]
    fn test_record_json_field_names() {
        let json = serde_json::to_value(ProductRecord::new("A", "B", 1.5)).unwrap();
        assert_eq!(json, serde_json::json!({"productName": "A", "color": "B", "price": 1.5}));
    }

    #[test]
    fn test_integral_price_serializes_without_fraction() {
        let text = serde_json::to_string(&ProductRecord::new("A", "B", 12.0)).unwrap();
        assert_eq!(text, r#"{"productName":"A","color":"B","price":12}"#);

        let back: ProductRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.price, 12.0);
    }
}
