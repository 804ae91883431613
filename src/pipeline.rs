//! Scan Pipeline - generate and read entry points
//!
//! Every read path ends in either a record or a `ParseFailure`. Nothing
//! here holds state between calls; progress lives in a caller-owned
//! `ScanState`.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::dialect::{DecodeStrategy, Dialect, DelimitedStrategy, JsonStrategy, LookupStrategy};
use crate::lookup::{LookupError, ProductLookup};
use crate::payload::{self, DecodeOptions, WirePayload};
use crate::record::{ProductDraft, ProductRecord, RecordError};
use crate::scanner::{ImageScanner, ImageSource, ScanError};

#[cfg(feature = "test-hooks")]
use std::sync::atomic::{AtomicU32, Ordering};

#[cfg(feature = "test-hooks")]
static DECODE_CALL_COUNT: AtomicU32 = AtomicU32::new(0);

#[cfg(feature = "test-hooks")]
pub fn get_decode_call_count() -> u32 {
    DECODE_CALL_COUNT.load(Ordering::SeqCst)
}

#[cfg(feature = "test-hooks")]
pub fn reset_decode_call_count() {
    DECODE_CALL_COUNT.store(0, Ordering::SeqCst);
}

pub const INVALID_QR_MESSAGE: &str = "INVALID QR CODE";
pub const SCAN_FAILED_MESSAGE: &str = "Failed to read QR code. Make sure it's clear and visible.";
pub const NOT_FOUND_MESSAGE: &str = "Product not found";
pub const RETRY_LATER_MESSAGE: &str = "Please try again later";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("INVALID QR CODE")]
    InvalidFormat,

    #[error("Failed to read QR code. Make sure it's clear and visible.")]
    ImageDecodeFailed(#[source] ScanError),

    #[error("INVALID QR CODE (no text extracted)")]
    NoTextExtracted,

    #[error("Lookup failed: {0}")]
    LookupFailed(#[from] LookupError),

    #[error("INVALID QR CODE (non-numeric price {0:?})")]
    NonNumericPrice(String),
}

impl ParseFailure {
    /// Text shown to the person holding the QR code
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidFormat | Self::NoTextExtracted | Self::NonNumericPrice(_) => {
                INVALID_QR_MESSAGE
            }
            Self::ImageDecodeFailed(_) => SCAN_FAILED_MESSAGE,
            Self::LookupFailed(LookupError::NotFound(_)) => NOT_FOUND_MESSAGE,
            Self::LookupFailed(LookupError::Unavailable(_)) => RETRY_LATER_MESSAGE,
        }
    }

    /// Stable machine-readable name
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::ImageDecodeFailed(_) => "image_decode_failed",
            Self::NoTextExtracted => "no_text_extracted",
            Self::LookupFailed(_) => "lookup_failed",
            Self::NonNumericPrice(_) => "non_numeric_price",
        }
    }
}

/// The codec pipeline - single entry point for generating and reading payloads
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanPipeline {
    options: DecodeOptions,
}

impl ScanPipeline {
    pub fn new(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Validate the draft, then encode. Incomplete drafts never reach the encoder.
    pub fn generate(&self, draft: &ProductDraft) -> Result<WirePayload, RecordError> {
        let record = draft.complete()?;
        Ok(payload::encode(&record))
    }

    pub fn delimited(&self) -> DelimitedStrategy {
        DelimitedStrategy::new(self.options)
    }

    pub fn json(&self) -> JsonStrategy {
        JsonStrategy::new(self.options)
    }

    pub fn lookup<'a>(&self, lookup: &'a dyn ProductLookup) -> LookupStrategy<'a> {
        LookupStrategy::new(lookup)
    }

    /// Strategy for a dialect. The lookup dialect needs a collaborator.
    pub fn strategy<'a>(
        &self,
        dialect: Dialect,
        lookup: Option<&'a dyn ProductLookup>,
    ) -> Result<Box<dyn DecodeStrategy + 'a>, ParseFailure> {
        match dialect {
            Dialect::Delimited => Ok(Box::new(self.delimited())),
            Dialect::Json => Ok(Box::new(self.json())),
            Dialect::Lookup => match lookup {
                Some(lookup) => Ok(Box::new(self.lookup(lookup))),
                None => Err(ParseFailure::LookupFailed(LookupError::Unavailable(
                    "no product lookup configured".to_string(),
                ))),
            },
        }
    }

    /// Decode text that is already in hand
    pub fn decode_text(
        &self,
        text: &str,
        strategy: &dyn DecodeStrategy,
    ) -> Result<ProductRecord, ParseFailure> {
        #[cfg(feature = "test-hooks")]
        DECODE_CALL_COUNT.fetch_add(1, Ordering::SeqCst);

        debug!(dialect = %strategy.dialect(), len = text.len(), "decoding scanned text");
        strategy.decode(text)
    }

    /// Scan an image, then decode whatever text it held
    pub fn read(
        &self,
        scanner: &dyn ImageScanner,
        source: &ImageSource,
        strategy: &dyn DecodeStrategy,
    ) -> Result<ProductRecord, ParseFailure> {
        let text = scanner.scan(source).map_err(|e| {
            warn!(source = %source, error = %e, "image scan failed");
            ParseFailure::ImageDecodeFailed(e)
        })?;

        if text.is_empty() {
            return Err(ParseFailure::NoTextExtracted);
        }

        self.decode_text(&text, strategy)
    }
}

/// Caller-owned progress of one scan
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ScanState {
    #[default]
    Idle,
    Loading {
        dialect: Dialect,
        started_at: DateTime<Utc>,
    },
    Ready {
        record: ProductRecord,
        dialect: Dialect,
        completed_at: DateTime<Utc>,
    },
    Failed {
        failure: ParseFailure,
        message: String,
        completed_at: DateTime<Utc>,
    },
}

impl ScanState {
    /// Start a scan. Any previous result or error is cleared.
    pub fn begin(&mut self, dialect: Dialect) {
        *self = Self::Loading {
            dialect,
            started_at: Utc::now(),
        };
    }

    /// Record the outcome. The dialect is the one the scan was begun with.
    pub fn finish(&mut self, result: Result<ProductRecord, ParseFailure>) {
        let dialect = self.dialect().unwrap_or_default();
        let completed_at = Utc::now();
        *self = match result {
            Ok(record) => Self::Ready {
                record,
                dialect,
                completed_at,
            },
            Err(failure) => Self::Failed {
                message: failure.user_message().to_string(),
                failure,
                completed_at,
            },
        };
    }

    pub fn dialect(&self) -> Option<Dialect> {
        match self {
            Self::Loading { dialect, .. } | Self::Ready { dialect, .. } => Some(*dialect),
            Self::Idle | Self::Failed { .. } => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading { .. })
    }

    pub fn record(&self) -> Option<&ProductRecord> {
        match self {
            Self::Ready { record, .. } => Some(record),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }
}
