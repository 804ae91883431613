//! ProductQR Core - Product Payload Codec
//!
//! # Ground Rules
//! 1. The grammar is the single source of truth for encode and decode
//! 2. Only complete records are encoded
//! 3. Every read ends in a record or a classified failure
//! 4. The caller chooses the dialect
//! 5. No state survives a call

pub mod record;
pub mod payload;
pub mod dialect;
pub mod lookup;
pub mod scanner;
pub mod pipeline;
pub mod config;

pub use record::{ProductRecord, ProductDraft, RecordError};
pub use payload::{encode, decode, decode_with, WirePayload, DecodeOptions, PricePolicy};
pub use dialect::{Dialect, DecodeStrategy, DelimitedStrategy, LookupStrategy, JsonStrategy, encode_json};
pub use lookup::{Catalog, ProductLookup, LookupError, ProductId};
pub use scanner::{ImageScanner, ImageSource, ScanError, CommandScanner, ScannerConfig};
pub use pipeline::{ScanPipeline, ScanState, ParseFailure};
pub use config::{CodecConfig, ConfigError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
