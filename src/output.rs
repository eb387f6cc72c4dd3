//! Result types produced by the orchestrator.
//!
//! [`ConversionResult`] is the single value returned for every conversion
//! attempt; [`ConversionReport`] wraps it with everything the UI shows around
//! it (file details, command line, preview, warnings). Both serialise to JSON
//! for the `/api/convert` endpoint and `docmark convert --json`.

use crate::error::{DocmarkError, INSTALL_HINT};
use crate::preview::TablePreview;
use crate::upload::FileDetails;
use serde::{Deserialize, Serialize};

/// User-facing failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The converter binary or in-process converter is not installed.
    ExternalToolMissing,
    /// The converter ran but reported an error (or timed out).
    ConversionFailed,
    /// The request itself was unusable (empty file, rejected arguments).
    InvalidInput,
    /// Anything else: I/O errors, panics, runtime trouble.
    UnexpectedError,
}

/// A failed conversion, ready to render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Raw converter diagnostics (stderr). Empty when there are none.
    pub diagnostic_output: String,
}

impl ConversionFailure {
    /// Placeholder Markdown document describing the failure.
    ///
    /// Only failures that come from the converter side get one; input and
    /// unexpected errors are shown as an error box without an output section.
    pub fn placeholder_markdown(&self) -> Option<String> {
        match self.kind {
            FailureKind::ConversionFailed => Some(format!(
                "# Conversion Error\n\n{}.\n\n```\n{}\n```",
                self.message.trim_end_matches('.'),
                self.diagnostic_output
            )),
            FailureKind::ExternalToolMissing => Some(format!(
                "# Import Error\n\n{}\n\nPlease install it with:\n\n```\n{}\n```",
                self.message.lines().next().unwrap_or_default(),
                INSTALL_HINT
            )),
            FailureKind::InvalidInput | FailureKind::UnexpectedError => None,
        }
    }
}

impl From<DocmarkError> for ConversionFailure {
    fn from(e: DocmarkError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
            diagnostic_output: e.diagnostic_output(),
        }
    }
}

/// Outcome of one conversion attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    Success { markdown_text: String },
    Failure(ConversionFailure),
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }

    pub fn failure(&self) -> Option<&ConversionFailure> {
        match self {
            ConversionResult::Failure(f) => Some(f),
            ConversionResult::Success { .. } => None,
        }
    }

    /// The Markdown to display and offer for download: the converter output on
    /// success, the synthesised placeholder for converter-side failures.
    pub fn markdown_document(&self) -> Option<String> {
        match self {
            ConversionResult::Success { markdown_text } => Some(markdown_text.clone()),
            ConversionResult::Failure(f) => f.placeholder_markdown(),
        }
    }
}

impl From<Result<String, DocmarkError>> for ConversionResult {
    fn from(r: Result<String, DocmarkError>) -> Self {
        match r {
            Ok(markdown_text) => ConversionResult::Success { markdown_text },
            Err(e) => ConversionResult::Failure(e.into()),
        }
    }
}

/// Everything produced for a single upload request.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub file: FileDetails,
    /// Command line that was run, when the external CLI path was taken.
    pub command: Option<String>,
    pub result: ConversionResult,
    /// Document shown in the output section and offered for download.
    pub markdown: Option<String>,
    /// `<original-stem>.md`
    pub download_name: String,
    pub preview: Option<TablePreview>,
    /// Non-fatal problems (preview failures, unrecognised extension).
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}
