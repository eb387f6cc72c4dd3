//! In-process converter seam.
//!
//! The non-CLI path goes through a [`LibraryConverter`] instead of a
//! subprocess. Before converting, the orchestrator asks the converter whether
//! it can handle the file at all; an [`Capability::Unavailable`] answer turns
//! into an "install the converter" failure rather than a runtime load error.
//!
//! Conversion is synchronous and runs inside `spawn_blocking`, so
//! implementations are free to do blocking I/O and CPU-heavy parsing.
//!
//! [`BuiltinConverter`] covers the formats that need no external tooling:
//! plain text, Markdown, JSON and XML pass through unchanged; CSV and Excel
//! workbooks become Markdown tables. Everything else reports `Unavailable`.

use crate::error::{DocmarkError, INSTALL_HINT};
use crate::preview::{range_to_table, read_csv_table, read_workbook};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Whether a library converter can handle a given file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    Available,
    Unavailable { hint: String },
}

/// A converter running inside this process.
pub trait LibraryConverter: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Report whether `filename` can be converted.
    fn probe(&self, filename: &str) -> Capability;

    /// Convert the byte stream; `filename` is a hint for format detection.
    fn convert_stream(
        &self,
        stream: &mut dyn Read,
        filename: &str,
        enable_plugins: bool,
    ) -> Result<String, DocmarkError>;
}

/// Convenience alias for a shared converter.
pub type SharedLibraryConverter = Arc<dyn LibraryConverter>;

/// Dependency-free converter for text and tabular formats.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinConverter;

const PASSTHROUGH: &[&str] = &["txt", "md", "markdown", "json", "xml"];
const TABULAR: &[&str] = &["csv", "xlsx", "xls"];

fn ext_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

impl LibraryConverter for BuiltinConverter {
    fn name(&self) -> &str {
        "builtin"
    }

    fn probe(&self, filename: &str) -> Capability {
        let ext = ext_of(filename);
        if PASSTHROUGH.contains(&ext.as_str()) || TABULAR.contains(&ext.as_str()) {
            Capability::Available
        } else {
            Capability::Unavailable {
                hint: format!(
                    "The built-in converter only handles text, JSON, XML, CSV and Excel files.\n\
                     Enable the external converter CLI, after installing it with: {INSTALL_HINT}"
                ),
            }
        }
    }

    fn convert_stream(
        &self,
        stream: &mut dyn Read,
        filename: &str,
        enable_plugins: bool,
    ) -> Result<String, DocmarkError> {
        if enable_plugins {
            debug!("builtin converter has no plugins; ignoring enable_plugins");
        }

        let mut bytes = Vec::new();
        stream
            .read_to_end(&mut bytes)
            .map_err(|e| DocmarkError::LibraryFailed {
                filename: filename.to_string(),
                detail: e.to_string(),
            })?;

        let failed = |detail: String| DocmarkError::LibraryFailed {
            filename: filename.to_string(),
            detail,
        };

        match ext_of(filename).as_str() {
            "csv" => {
                let table = read_csv_table(&bytes, None).map_err(|e| failed(e.to_string()))?;
                Ok(table.to_markdown())
            }
            "xlsx" | "xls" => {
                let sheets = read_workbook(bytes.into()).map_err(|e| failed(e.to_string()))?;
                let mut out = String::new();
                for (name, range) in sheets {
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&format!("## {name}\n\n"));
                    out.push_str(&range_to_table(&range, None).to_markdown());
                }
                Ok(out)
            }
            _ => String::from_utf8(bytes)
                .map_err(|e| failed(format!("file is not valid UTF-8 text: {e}"))),
        }
    }
}
