//! Wire Payload - the delimited text grammar
//!
//! `PRODUCTNAME:<NAME>*COLOR:<COLOR>*PRICE:<PRICE>`
//!
//! Encoding and decoding share the constants below. The decoder only checks
//! the first tag; the COLOR and PRICE tags are trusted by position.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pipeline::ParseFailure;
use crate::record::{coerce_price, ProductRecord};

pub const FIELD_SEPARATOR: char = '*';
pub const KV_SEPARATOR: char = ':';

pub const PRODUCT_NAME_TAG: &str = "PRODUCTNAME";
pub const COLOR_TAG: &str = "COLOR";
pub const PRICE_TAG: &str = "PRICE";

/// Three tag/value pairs
pub const MIN_TOKENS: usize = 6;

/// Encoded payload text, ready to be embedded in a QR image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WirePayload(String);

impl WirePayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for WirePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for WirePayload {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What the decoder does with a price token that is not a number
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricePolicy {
    /// Pass the value through as NaN
    #[default]
    Lenient,
    /// Fail the decode with `NonNumericPrice`
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeOptions {
    #[serde(default)]
    pub price_policy: PricePolicy,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        Self { price_policy: PricePolicy::Strict }
    }
}

/// Encode a complete record. Total: never fails.
///
/// Name and color are upper-cased; the price uses its shortest
/// numeric text with no fixed decimal places.
pub fn encode(record: &ProductRecord) -> WirePayload {
    WirePayload(format!(
        "{PRODUCT_NAME_TAG}{KV_SEPARATOR}{}{FIELD_SEPARATOR}{COLOR_TAG}{KV_SEPARATOR}{}{FIELD_SEPARATOR}{PRICE_TAG}{KV_SEPARATOR}{}",
        record.product_name.to_uppercase(),
        record.color.to_uppercase(),
        format_price(record.price),
    ))
}

pub fn format_price(price: f64) -> String {
    if price.is_nan() {
        "NaN".to_string()
    } else if price == f64::INFINITY {
        "Infinity".to_string()
    } else if price == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else if price == 0.0 {
        // drops the sign of -0
        "0".to_string()
    } else {
        price.to_string()
    }
}

/// Split on `*`, then each field on `:`, flattened in input order.
///
/// Makes no assumption of well-formedness.
pub fn tokenize(raw: &str) -> Vec<&str> {
    raw.split(FIELD_SEPARATOR)
        .flat_map(|field| field.split(KV_SEPARATOR))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Discriminator,
    Name,
    ColorTag,
    Color,
    PriceTag,
    Price,
}

const SLOTS: [Slot; MIN_TOKENS] = [
    Slot::Discriminator,
    Slot::Name,
    Slot::ColorTag,
    Slot::Color,
    Slot::PriceTag,
    Slot::Price,
];

/// Decode with the default (lenient) price policy
pub fn decode(raw: &str) -> Result<ProductRecord, ParseFailure> {
    decode_with(raw, &DecodeOptions::default())
}

pub fn decode_with(raw: &str, options: &DecodeOptions) -> Result<ProductRecord, ParseFailure> {
    let tokens = tokenize(raw);
    debug!(tokens = tokens.len(), "decoding delimited payload");

    if tokens.len() < MIN_TOKENS {
        debug!(tokens = tokens.len(), "too few tokens");
        return Err(ParseFailure::InvalidFormat);
    }
    if tokens.len() > MIN_TOKENS {
        debug!(extra = tokens.len() - MIN_TOKENS, "ignoring trailing tokens");
    }

    let mut name = "";
    let mut color = "";
    let mut price_text = "";

    for (slot, token) in SLOTS.iter().zip(tokens.iter().copied()) {
        match slot {
            Slot::Discriminator => {
                if token != PRODUCT_NAME_TAG {
                    debug!("discriminator tag mismatch");
                    return Err(ParseFailure::InvalidFormat);
                }
            }
            Slot::Name => name = token,
            // Positional: these tags are reported but never enforced.
            Slot::ColorTag => flag_unchecked_tag(COLOR_TAG, token),
            Slot::Color => color = token,
            Slot::PriceTag => flag_unchecked_tag(PRICE_TAG, token),
            Slot::Price => price_text = token,
        }
    }

    let price = resolve_price(price_text, options.price_policy)?;

    Ok(ProductRecord {
        product_name: name.to_string(),
        color: color.to_string(),
        price,
    })
}

/// Coerce a scanned price token under the given policy.
///
/// Only text that is not a number at all counts against the strict policy;
/// negative and infinite values are numbers and pass.
pub fn resolve_price(text: &str, policy: PricePolicy) -> Result<f64, ParseFailure> {
    let price = coerce_price(text);
    if !price.is_nan() {
        return Ok(price);
    }
    match policy {
        PricePolicy::Lenient => {
            warn!(price = text, "non-numeric price passed through as NaN");
            Ok(price)
        }
        PricePolicy::Strict => Err(ParseFailure::NonNumericPrice(text.to_string())),
    }
}

fn flag_unchecked_tag(expected: &str, actual: &str) {
    if actual != expected {
        warn!(expected, actual, "field tag mismatch ignored, trusting position");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_grammar() {
        let payload = encode(&ProductRecord::new("Widget", "red", 9.99));
        assert_eq!(payload.as_str(), "PRODUCTNAME:WIDGET*COLOR:RED*PRICE:9.99");
    }

    #[test]
    fn test_encode_integral_price_has_no_decimals() {
        let payload = encode(&ProductRecord::new("a", "b", 10.0));
        assert!(payload.as_str().ends_with("*PRICE:10"));
    }

    #[test]
    fn test_format_price_special_values() {
        assert_eq!(format_price(-0.0), "0");
        assert_eq!(format_price(0.5), "0.5");
        assert_eq!(format_price(f64::NAN), "NaN");
        assert_eq!(format_price(f64::INFINITY), "Infinity");
    }

    #[test]
    fn test_tokenize_flattens_in_order() {
        assert_eq!(
            tokenize("PRODUCTNAME:A*COLOR:B*PRICE:1"),
            vec!["PRODUCTNAME", "A", "COLOR", "B", "PRICE", "1"]
        );
        assert_eq!(tokenize(""), vec![""]);
        assert_eq!(tokenize("a:b:c*d"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_decode_too_few_tokens() {
        assert_eq!(decode("PRODUCTNAME:FOO*COLOR:RED"), Err(ParseFailure::InvalidFormat));
        assert_eq!(decode("PRODUCTNAME"), Err(ParseFailure::InvalidFormat));
    }

    #[test]
    fn test_decode_discriminator_is_case_sensitive() {
        assert_eq!(
            decode("productname:FOO*COLOR:RED*PRICE:10"),
            Err(ParseFailure::InvalidFormat)
        );
        assert_eq!(
            decode(" PRODUCTNAME:FOO*COLOR:RED*PRICE:10"),
            Err(ParseFailure::InvalidFormat)
        );
    }

    #[test]
    fn test_decode_ignores_trailing_tokens() {
        let record = decode("PRODUCTNAME:FOO*COLOR:RED*PRICE:10*EXTRA:1").unwrap();
        assert_eq!(record, ProductRecord::new("FOO", "RED", 10.0));
    }

    #[test]
    fn test_decode_separator_in_value_shifts_fields() {
        // Values are not escaped, so an embedded ':' moves every later field.
        let record = decode("PRODUCTNAME:A:B*COLOR:RED*PRICE:10").unwrap();
        assert_eq!(record.product_name, "A");
        assert_eq!(record.color, "COLOR");
        assert!(record.price.is_nan());
    }

    #[test]
    fn test_decode_strict_price() {
        let result = decode_with("PRODUCTNAME:FOO*COLOR:RED*PRICE:abc", &DecodeOptions::strict());
        assert_eq!(result, Err(ParseFailure::NonNumericPrice("abc".to_string())));

        let record =
            decode_with("PRODUCTNAME:FOO*COLOR:RED*PRICE:3.5", &DecodeOptions::strict()).unwrap();
        assert_eq!(record.price, 3.5);
    }

    #[test]
    fn test_decode_empty_values_are_not_rejected() {
        let record = decode("PRODUCTNAME:*COLOR:*PRICE:").unwrap();
        assert_eq!(record, ProductRecord::new("", "", 0.0));
    }

    #[test]
    fn test_resolve_price_strict_accepts_any_number() {
        assert_eq!(resolve_price("-5", PricePolicy::Strict), Ok(-5.0));
        assert_eq!(resolve_price("Infinity", PricePolicy::Strict), Ok(f64::INFINITY));
        assert_eq!(
            resolve_price("5$", PricePolicy::Strict),
            Err(ParseFailure::NonNumericPrice("5$".to_string()))
        );
        assert!(resolve_price("5$", PricePolicy::Lenient).unwrap().is_nan());
    }

    #[test]
    fn test_decode_keeps_values_verbatim() {
        let record = decode("PRODUCTNAME:foo*COLOR:Red*PRICE:1").unwrap();
        assert_eq!(record.product_name, "foo");
        assert_eq!(record.color, "Red");
    }
}
