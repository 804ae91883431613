//! ProductQR CLI - Bridge interface for the codec
//!
//! Commands: encode, decode, scan, register, products
//! Outputs JSON to stdout, logs to stderr
//! Returns 2 on validation or decode failure, 1 on setup failure

use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use productqr_core::{
    encode_json, Catalog, CodecConfig, CommandScanner, Dialect, ImageSource, ParseFailure,
    PricePolicy, ProductDraft, ProductLookup, ProductRecord, ScanPipeline, ScanState,
};

#[derive(Parser)]
#[command(name = "productqr-cli")]
#[command(about = "ProductQR CLI - Product payload codec")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the JSON config file
    #[arg(short, long, default_value = "productqr.json")]
    config: PathBuf,

    /// Catalog file (overrides catalogPath from the config)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Reject non-numeric prices instead of passing them through
    #[arg(long)]
    strict: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a product into QR payload text
    Encode {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        color: String,

        #[arg(short, long)]
        price: String,

        /// Payload dialect: delimited or json
        #[arg(short, long, default_value = "delimited")]
        format: Dialect,
    },

    /// Decode scanned text
    Decode {
        /// Raw text extracted from a QR code
        #[arg(short, long)]
        text: String,

        #[arg(short, long)]
        dialect: Option<Dialect>,
    },

    /// Scan a local image file and decode it
    Scan {
        #[arg(short, long)]
        image: String,

        #[arg(short, long)]
        dialect: Option<Dialect>,
    },

    /// Register a product in the catalog and print its identifier
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(long)]
        color: String,

        #[arg(short, long)]
        price: String,
    },

    /// List catalog products
    Products,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut config = match CodecConfig::load_or_default(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!(path = %cli.config.display(), error = %e, "failed to load config");
            emit(&json!({"success": false, "error": format!("Failed to load config: {}", e)}));
            return ExitCode::FAILURE;
        }
    };
    if cli.strict {
        config.price_policy = PricePolicy::Strict;
    }
    if cli.catalog.is_some() {
        config.catalog_path = cli.catalog.clone();
    }

    let pipeline = ScanPipeline::new(config.decode_options());

    match cli.command {
        Commands::Encode { name, color, price, format } => {
            let draft = ProductDraft::new(name, color, price);
            let record = match draft.complete() {
                Ok(r) => r,
                Err(e) => {
                    emit(&json!({"success": false, "error": e.to_string()}));
                    return ExitCode::from(2);
                }
            };

            let payload = match format {
                Dialect::Delimited => productqr_core::encode(&record).into_string(),
                Dialect::Json => match encode_json(&record) {
                    Ok(text) => text,
                    Err(e) => {
                        emit(&json!({"success": false, "error": e.to_string()}));
                        return ExitCode::FAILURE;
                    }
                },
                Dialect::Lookup => {
                    emit(&json!({
                        "success": false,
                        "error": "lookup identifiers are issued by `register`",
                    }));
                    return ExitCode::FAILURE;
                }
            };

            emit(&json!({"success": true, "dialect": format, "payload": payload}));
            ExitCode::SUCCESS
        }

        Commands::Decode { text, dialect } => {
            let dialect = dialect.unwrap_or(config.dialect);
            let catalog = match open_catalog_for(dialect, &config) {
                Ok(c) => c,
                Err(code) => return code,
            };
            let lookup = catalog.as_ref().map(|c| c as &dyn ProductLookup);

            let mut state = ScanState::default();
            state.begin(dialect);
            let result = pipeline
                .strategy(dialect, lookup)
                .and_then(|strategy| pipeline.decode_text(&text, strategy.as_ref()));
            state.finish(result);
            report(&state)
        }

        Commands::Scan { image, dialect } => {
            let dialect = dialect.unwrap_or(config.dialect);
            let catalog = match open_catalog_for(dialect, &config) {
                Ok(c) => c,
                Err(code) => return code,
            };
            let lookup = catalog.as_ref().map(|c| c as &dyn ProductLookup);

            let scanner = CommandScanner::new(config.scanner.clone());
            let source = ImageSource::parse(&image);

            let mut state = ScanState::default();
            state.begin(dialect);
            let result = pipeline
                .strategy(dialect, lookup)
                .and_then(|strategy| pipeline.read(&scanner, &source, strategy.as_ref()));
            state.finish(result);
            report(&state)
        }

        Commands::Register { name, color, price } => {
            let Some(path) = config.catalog_path.clone() else {
                emit(&json!({"success": false, "error": "No catalog path configured"}));
                return ExitCode::FAILURE;
            };

            let record = match ProductDraft::new(name, color, price).complete() {
                Ok(r) => r,
                Err(e) => {
                    emit(&json!({"success": false, "error": e.to_string()}));
                    return ExitCode::from(2);
                }
            };

            let saved = Catalog::load(&path).and_then(|mut catalog| {
                let id = catalog.register(record.clone());
                catalog.save(&path).map(|_| id)
            });
            match saved {
                Ok(id) => {
                    emit(&json!({"success": true, "id": id, "product": record_json(&record)}));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to update catalog");
                    emit(&json!({"success": false, "error": e.to_string()}));
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Products => {
            let Some(path) = config.catalog_path.clone() else {
                emit(&json!([]));
                return ExitCode::SUCCESS;
            };
            match Catalog::load(&path) {
                Ok(catalog) => {
                    let products: Vec<Value> = catalog
                        .list()
                        .into_iter()
                        .map(|(id, record)| {
                            let mut entry = record_json(record);
                            entry["id"] = json!(id);
                            entry
                        })
                        .collect();
                    emit(&Value::Array(products));
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    emit(&json!({"success": false, "error": e.to_string()}));
                    ExitCode::FAILURE
                }
            }
        }
    }
}

/// The lookup dialect resolves against the catalog file; other dialects need none
fn open_catalog_for(dialect: Dialect, config: &CodecConfig) -> Result<Option<Catalog>, ExitCode> {
    if dialect != Dialect::Lookup {
        return Ok(None);
    }
    let Some(path) = &config.catalog_path else {
        return Ok(None);
    };
    match Catalog::load(path) {
        Ok(catalog) => Ok(Some(catalog)),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to load catalog");
            emit(&json!({"success": false, "error": format!("Failed to load catalog: {}", e)}));
            Err(ExitCode::FAILURE)
        }
    }
}

fn report(state: &ScanState) -> ExitCode {
    match state {
        ScanState::Ready { record, dialect, completed_at } => {
            emit(&json!({
                "success": true,
                "dialect": dialect,
                "product": record_json(record),
                "completedAt": completed_at,
            }));
            ExitCode::SUCCESS
        }
        ScanState::Failed { failure, message, completed_at } => {
            emit(&failure_json(failure, message, completed_at));
            ExitCode::from(2)
        }
        ScanState::Idle | ScanState::Loading { .. } => ExitCode::FAILURE,
    }
}

fn failure_json(
    failure: &ParseFailure,
    message: &str,
    completed_at: &chrono::DateTime<chrono::Utc>,
) -> Value {
    json!({
        "success": false,
        "kind": failure.kind(),
        "error": message,
        "detail": failure.to_string(),
        "completedAt": completed_at,
    })
}

fn record_json(record: &ProductRecord) -> Value {
    json!({
        "productName": record.product_name,
        "color": record.color,
        "price": record.price,
    })
}

fn emit(value: &Value) {
    println!("{:#}", value);
}
