//! Image Scanning - the external QR reader seam
//!
//! The codec never looks at pixels. An `ImageScanner` turns an image
//! resource into the text a QR decoder found in it.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use image::GenericImageView;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Image not found: {0}")]
    NotFound(String),

    #[error("Unreadable image: {0}")]
    UnreadableImage(String),

    #[error("Scanner could not be started: {0}")]
    Unavailable(String),

    #[error("No QR code detected: {0}")]
    NoCode(String),
}

/// Where the image comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    File(PathBuf),
    Url(String),
}

impl ImageSource {
    /// URLs are recognised by scheme, everything else is a local path
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            Self::Url(input.to_string())
        } else {
            Self::File(PathBuf::from(input))
        }
    }
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => f.write_str(url),
        }
    }
}

/// Extracts QR text from an image. One-shot, no retry.
pub trait ImageScanner {
    fn scan(&self, source: &ImageSource) -> Result<String, ScanError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannerConfig {
    #[serde(default = "default_program")]
    pub program: String,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Open local files with the `image` crate before handing them over
    #[serde(default = "default_true")]
    pub verify_image: bool,
}

fn default_program() -> String { "zbarimg".to_string() }
fn default_args() -> Vec<String> { vec!["--raw".to_string(), "--quiet".to_string()] }
fn default_true() -> bool { true }

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            verify_image: default_true(),
        }
    }
}

/// Runs an external QR decoder program and reads the text from its stdout
pub struct CommandScanner {
    config: ScannerConfig,
}

impl CommandScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self { config }
    }

    fn verify<'a>(&self, source: &'a ImageSource) -> Result<&'a PathBuf, ScanError> {
        let path = match source {
            ImageSource::File(path) => path,
            ImageSource::Url(url) => {
                return Err(ScanError::Unavailable(format!(
                    "{} reads local files only, cannot fetch {}",
                    self.config.program, url
                )))
            }
        };
        if !path.exists() {
            return Err(ScanError::NotFound(path.display().to_string()));
        }
        if self.config.verify_image {
            let img = image::open(path)
                .map_err(|e| ScanError::UnreadableImage(format!("{}: {}", path.display(), e)))?;
            let (width, height) = img.dimensions();
            debug!(width, height, "image verified");
        }
        Ok(path)
    }
}

impl Default for CommandScanner {
    fn default() -> Self {
        Self::new(ScannerConfig::default())
    }
}

impl ImageScanner for CommandScanner {
    fn scan(&self, source: &ImageSource) -> Result<String, ScanError> {
        let path = self.verify(source)?;

        let output = Command::new(&self.config.program)
            .args(&self.config.args)
            .arg(path)
            .output()
            .map_err(|e| ScanError::Unavailable(format!("{}: {}", self.config.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(source = %source, status = ?output.status.code(), "scanner reported no code");
            return Err(ScanError::NoCode(if stderr.is_empty() {
                source.to_string()
            } else {
                stderr
            }));
        }

        Ok(strip_line_ending(&String::from_utf8_lossy(&output.stdout)).to_string())
    }
}

/// Decoder programs terminate their output with a newline that is not part of the code
pub fn strip_line_ending(text: &str) -> &str {
    text.trim_end_matches(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_source_parse() {
        assert_eq!(
            ImageSource::parse("https://example.com/qr.png"),
            ImageSource::Url("https://example.com/qr.png".to_string())
        );
        assert_eq!(
            ImageSource::parse("qr.png"),
            ImageSource::File(PathBuf::from("qr.png"))
        );
    }

    #[test]
    fn test_strip_line_ending_keeps_inner_whitespace() {
        assert_eq!(strip_line_ending("PRODUCTNAME:A B\r\n"), "PRODUCTNAME:A B");
        assert_eq!(strip_line_ending(" x \n\n"), " x ");
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let scanner = CommandScanner::default();
        let source = ImageSource::File(PathBuf::from("/nonexistent/qr-code.png"));
        assert!(matches!(scanner.scan(&source), Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_non_image_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr-code.png");
        std::fs::write(&path, b"not an image").unwrap();

        let scanner = CommandScanner::default();
        let result = scanner.scan(&ImageSource::File(path));
        assert!(matches!(result, Err(ScanError::UnreadableImage(_))));
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("qr-code.png");
        std::fs::write(&path, b"unchecked").unwrap();

        let scanner = CommandScanner::new(ScannerConfig {
            program: "definitely-not-a-qr-decoder".to_string(),
            args: vec![],
            verify_image: false,
        });
        let result = scanner.scan(&ImageSource::File(path));
        assert!(matches!(result, Err(ScanError::Unavailable(_))));
    }

    #[test]
    fn test_url_source_is_rejected_before_running() {
        let scanner = CommandScanner::default();
        let result = scanner.scan(&ImageSource::Url("https://example.com/qr.png".to_string()));
        assert!(matches!(result, Err(ScanError::Unavailable(msg)) if msg.contains("local files only")));
    }
}
