//! Error types for the docmark library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocmarkError`] — **Fatal for the conversion**: the document could not be
//!   turned into Markdown (converter missing, converter exited non-zero,
//!   timeout, I/O trouble with the temporary file). These never escape the
//!   orchestrator as `Err`; they are folded into
//!   [`crate::output::ConversionResult::Failure`] so the UI can render them.
//!
//! * [`PreviewError`] — **Non-fatal**: the tabular preview of a spreadsheet or
//!   CSV upload could not be produced. It is reported as a warning and the
//!   Markdown result is still shown.

use crate::output::FailureKind;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Install command suggested whenever the converter cannot be found.
pub const INSTALL_HINT: &str = "pip install 'markitdown[all]'";

/// All conversion errors produced by the docmark library.
#[derive(Debug, Error)]
pub enum DocmarkError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The uploaded file has no content.
    #[error("Uploaded file '{name}' is empty")]
    EmptyUpload { name: String },

    /// The extra converter arguments violate the argument policy.
    #[error("Rejected extra argument '{token}': {reason}")]
    RejectedArgument { token: String, reason: String },

    // ── Converter availability ────────────────────────────────────────────
    /// The converter binary could not be found on `PATH`.
    #[error(
        "Converter '{program}' was not found.\nInstall it with: {install}",
        install = INSTALL_HINT
    )]
    ToolMissing { program: String },

    /// The in-process converter cannot handle this file (or none is configured).
    #[error("In-process converter is not available for '{filename}'.\n{hint}")]
    LibraryUnavailable { filename: String, hint: String },

    // ── Converter failures ────────────────────────────────────────────────
    /// The converter ran but exited with a non-zero code.
    ///
    /// `code` is `-1` when the process was terminated by a signal.
    #[error("Command failed with error code {code}")]
    CommandFailed { code: i32, stderr: String },

    /// The converter did not finish within the configured timeout.
    #[error("Converter timed out after {limit:?} and was terminated")]
    Timeout { limit: Duration },

    /// The converter exited 0 but its stdout is not valid UTF-8 text.
    #[error("Converter output is not valid UTF-8: {detail}")]
    InvalidOutput { detail: String, stderr: String },

    /// The in-process converter reported an error.
    #[error("In-process conversion of '{filename}' failed: {detail}")]
    LibraryFailed { filename: String, detail: String },

    /// The converter process could not be started for a reason other than
    /// the binary being missing (permissions, bad executable format …).
    #[error("Failed to start converter '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create, write or remove the temporary artifact.
    #[error("Temporary file error at '{path}': {source}")]
    TempFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (task panic, runtime shutdown …).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocmarkError {
    /// Which bucket of the user-facing failure taxonomy this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            DocmarkError::EmptyUpload { .. }
            | DocmarkError::RejectedArgument { .. }
            | DocmarkError::InvalidConfig(_) => FailureKind::InvalidInput,
            DocmarkError::ToolMissing { .. } | DocmarkError::LibraryUnavailable { .. } => {
                FailureKind::ExternalToolMissing
            }
            DocmarkError::CommandFailed { .. }
            | DocmarkError::Timeout { .. }
            | DocmarkError::InvalidOutput { .. }
            | DocmarkError::LibraryFailed { .. } => FailureKind::ConversionFailed,
            DocmarkError::SpawnFailed { .. }
            | DocmarkError::TempFile { .. }
            | DocmarkError::Internal(_) => FailureKind::UnexpectedError,
        }
    }

    /// Raw diagnostic text to show next to the message (converter stderr).
    pub fn diagnostic_output(&self) -> String {
        match self {
            DocmarkError::CommandFailed { stderr, .. }
            | DocmarkError::InvalidOutput { stderr, .. } => stderr.clone(),
            DocmarkError::LibraryFailed { detail, .. } => detail.clone(),
            _ => String::new(),
        }
    }
}

/// A non-fatal error while building the tabular preview.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PreviewError {
    /// CSV parsing failed.
    #[error("Could not generate data preview: CSV parse error: {detail}")]
    Csv { detail: String },

    /// The workbook could not be opened or the first sheet could not be read.
    #[error("Could not generate data preview: spreadsheet error: {detail}")]
    Spreadsheet { detail: String },

    /// The preview task did not complete.
    #[error("Could not generate data preview: {detail}")]
    Internal { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_failed_display_contains_code() {
        let e = DocmarkError::CommandFailed {
            code: 2,
            stderr: "boom".into(),
        };
        assert_eq!(e.to_string(), "Command failed with error code 2");
        assert_eq!(e.diagnostic_output(), "boom");
        assert_eq!(e.kind(), FailureKind::ConversionFailed);
    }

    #[test]
    fn tool_missing_names_install_command() {
        let e = DocmarkError::ToolMissing {
            program: "markitdown".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("markitdown"), "got: {msg}");
        assert!(msg.contains(INSTALL_HINT), "got: {msg}");
        assert_eq!(e.kind(), FailureKind::ExternalToolMissing);
    }

    #[test]
    fn timeout_display() {
        let e = DocmarkError::Timeout {
            limit: Duration::from_secs(30),
        };
        assert!(e.to_string().contains("30s"));
        assert_eq!(e.kind(), FailureKind::ConversionFailed);
    }

    #[test]
    fn sub_second_timeout_is_not_reported_as_zero() {
        let e = DocmarkError::Timeout {
            limit: Duration::from_millis(250),
        };
        assert!(e.to_string().contains("250ms"), "got: {e}");
    }

    #[test]
    fn invalid_output_is_conversion_failure_with_stderr() {
        let e = DocmarkError::InvalidOutput {
            detail: "invalid utf-8 sequence of 1 bytes from index 0".into(),
            stderr: "warning: odd codec\n".into(),
        };
        assert_eq!(e.kind(), FailureKind::ConversionFailed);
        assert_eq!(e.diagnostic_output(), "warning: odd codec\n");
    }

    #[test]
    fn internal_is_unexpected() {
        let e = DocmarkError::Internal("task panicked".into());
        assert_eq!(e.kind(), FailureKind::UnexpectedError);
        assert!(e.diagnostic_output().is_empty());
    }

    #[test]
    fn preview_error_display() {
        let e = PreviewError::Csv {
            detail: "found record with 3 fields".into(),
        };
        assert!(e.to_string().starts_with("Could not generate data preview"));
    }
}
