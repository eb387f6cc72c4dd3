//! Conversion orchestrator: upload in, [`ConversionResult`] out.
//!
//! [`Orchestrator::convert`] is the core operation. It never returns `Err`
//! and never lets a panic escape: every failure, including a panicking
//! in-process converter, is folded into [`ConversionResult::Failure`].
//! [`Orchestrator::handle`] wraps it with the tabular preview and everything
//! else a UI shows for one request.
//!
//! An `Orchestrator` is immutable after construction and meant to be shared
//! (`Arc`) across concurrent requests; each request owns its own temp file
//! and at most one converter process.

use crate::config::{ConversionOptions, ConverterSettings};
use crate::error::{DocmarkError, PreviewError, INSTALL_HINT};
use crate::output::{ConversionReport, ConversionResult};
use crate::pipeline::external::{self, Invocation};
use crate::pipeline::library::{BuiltinConverter, Capability, SharedLibraryConverter};
use crate::pipeline::staging::StagedUpload;
use crate::preview::{preview_tabular_data, TablePreview};
use crate::upload::UploadedFile;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Runs conversions according to [`ConverterSettings`].
pub struct Orchestrator {
    settings: ConverterSettings,
    library: Option<SharedLibraryConverter>,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("settings", &self.settings)
            .field("library", &self.library.as_ref().map(|l| l.name().to_string()))
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

impl Orchestrator {
    /// Orchestrator with the [`BuiltinConverter`] as in-process fallback.
    pub fn new(settings: ConverterSettings) -> Self {
        let permits = Arc::new(Semaphore::new(settings.max_concurrent));
        Self {
            settings,
            library: Some(Arc::new(BuiltinConverter)),
            permits,
        }
    }

    /// Replace the in-process converter.
    pub fn with_library(mut self, library: SharedLibraryConverter) -> Self {
        self.library = Some(library);
        self
    }

    /// Disable the in-process path entirely; it then reports the converter
    /// as missing.
    pub fn without_library(mut self) -> Self {
        self.library = None;
        self
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    /// Convert one upload. Always returns a result; never panics outward.
    pub async fn convert(
        &self,
        upload: &UploadedFile,
        options: &ConversionOptions,
    ) -> ConversionResult {
        self.convert_inner(upload, options).await.0
    }

    /// Convert one upload and gather everything the UI shows for it.
    pub async fn handle(&self, upload: UploadedFile, options: &ConversionOptions) -> ConversionReport {
        let start = Instant::now();
        let upload = Arc::new(upload);
        info!(
            "Converting {} ({} bytes, cli: {}, plugins: {})",
            upload.name, upload.size_bytes, options.use_external_cli, options.enable_plugins
        );

        let mut warnings = Vec::new();
        if !upload.has_recognized_extension() {
            warnings.push(format!(
                "'{}' does not have a recognised extension; the converter may not support it.",
                upload.name
            ));
        }

        let (result, invocation) = self.convert_inner(&upload, options).await;
        let markdown = result.markdown_document();

        let mut preview = None;
        if markdown.is_some() && upload.is_tabular() {
            match preview_blocking(Arc::clone(&upload)).await {
                Ok(p) => preview = p,
                Err(e) => {
                    warn!("{}", e);
                    warnings.push(e.to_string());
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            ConversionResult::Success { markdown_text } => info!(
                "Converted {} in {}ms ({} chars)",
                upload.name,
                duration_ms,
                markdown_text.len()
            ),
            ConversionResult::Failure(f) => {
                warn!("Conversion of {} failed: {}", upload.name, f.message)
            }
        }

        ConversionReport {
            file: upload.details(),
            command: invocation.map(|i| i.to_string()),
            result,
            markdown,
            download_name: upload.download_name(),
            preview,
            warnings,
            duration_ms,
        }
    }

    /// Check whether the converter binary can be started at all.
    ///
    /// Runs `<converter> [base args] --version`; used by the health endpoint.
    pub async fn probe_converter(&self) -> bool {
        let cmd = &self.settings.converter;
        let status = tokio::process::Command::new(&cmd.program)
            .args(&cmd.base_args)
            .arg("--version")
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .status();
        matches!(
            tokio::time::timeout(std::time::Duration::from_secs(10), status).await,
            Ok(Ok(s)) if s.success()
        )
    }

    async fn convert_inner(
        &self,
        upload: &UploadedFile,
        options: &ConversionOptions,
    ) -> (ConversionResult, Option<Invocation>) {
        let mut invocation = None;
        let attempt = AssertUnwindSafe(self.run(upload, options, &mut invocation))
            .catch_unwind()
            .await;
        let result = match attempt {
            Ok(r) => r.into(),
            Err(panic) => {
                let detail = panic_message(&*panic);
                warn!("Conversion of {} panicked: {}", upload.name, detail);
                ConversionResult::from(Err(DocmarkError::Internal(format!(
                    "conversion panicked: {detail}"
                ))))
            }
        };
        (result, invocation)
    }

    async fn run(
        &self,
        upload: &UploadedFile,
        options: &ConversionOptions,
        invocation: &mut Option<Invocation>,
    ) -> Result<String, DocmarkError> {
        if upload.content.is_empty() {
            return Err(DocmarkError::EmptyUpload {
                name: upload.name.clone(),
            });
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| DocmarkError::Internal(format!("conversion slots closed: {e}")))?;

        let staged = StagedUpload::create(upload, self.settings.temp_dir.as_deref())?;

        let outcome = if options.use_external_cli {
            match Invocation::build(&self.settings.converter, staged.path(), options) {
                Ok(inv) => {
                    let r = external::run(&inv, self.settings.timeout).await;
                    *invocation = Some(inv);
                    r
                }
                Err(e) => Err(e),
            }
        } else {
            self.run_library(&staged, upload, options).await
        };

        if let Err(cleanup) = staged.release() {
            warn!("{}", cleanup);
        }
        outcome
    }

    async fn run_library(
        &self,
        staged: &StagedUpload,
        upload: &UploadedFile,
        options: &ConversionOptions,
    ) -> Result<String, DocmarkError> {
        let Some(library) = self.library.as_ref().map(Arc::clone) else {
            return Err(DocmarkError::LibraryUnavailable {
                filename: upload.name.clone(),
                hint: format!("No in-process converter is configured. Install one with: {INSTALL_HINT}"),
            });
        };

        if let Capability::Unavailable { hint } = library.probe(&upload.name) {
            return Err(DocmarkError::LibraryUnavailable {
                filename: upload.name.clone(),
                hint,
            });
        }

        debug!("Converting {} in-process with {}", upload.name, library.name());
        let path = staged.path().to_path_buf();
        let filename = upload.name.clone();
        let enable_plugins = options.enable_plugins;

        tokio::task::spawn_blocking(move || {
            let mut file = std::fs::File::open(&path).map_err(|e| DocmarkError::TempFile {
                path: path.clone(),
                source: e,
            })?;
            library.convert_stream(&mut file, &filename, enable_plugins)
        })
        .await
        .map_err(|e| DocmarkError::Internal(format!("in-process converter task failed: {e}")))?
    }
}

async fn preview_blocking(upload: Arc<UploadedFile>) -> Result<Option<TablePreview>, PreviewError> {
    tokio::task::spawn_blocking(move || preview_tabular_data(&upload))
        .await
        .map_err(|e| PreviewError::Internal {
            detail: e.to_string(),
        })?
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::FailureKind;

    #[tokio::test]
    async fn empty_upload_is_invalid_input() {
        let orch = Orchestrator::new(ConverterSettings::default());
        let upload = UploadedFile::new("empty.pdf", "application/pdf", Vec::new());
        let r = orch.convert(&upload, &ConversionOptions::default()).await;
        assert_eq!(r.failure().unwrap().kind, FailureKind::InvalidInput);
    }

    #[tokio::test]
    async fn builtin_library_path_converts_text() {
        let orch = Orchestrator::new(ConverterSettings::default());
        let upload = UploadedFile::new("notes.txt", "text/plain", b"# Notes\n".to_vec());
        let options = ConversionOptions::builder().use_external_cli(false).build();
        let r = orch.convert(&upload, &options).await;
        assert_eq!(
            r,
            ConversionResult::Success {
                markdown_text: "# Notes\n".into()
            }
        );
    }

    #[tokio::test]
    async fn without_library_reports_missing_tool() {
        let orch = Orchestrator::new(ConverterSettings::default()).without_library();
        let upload = UploadedFile::new("notes.txt", "", b"x".to_vec());
        let options = ConversionOptions::builder().use_external_cli(false).build();
        let r = orch.convert(&upload, &options).await;
        let f = r.failure().unwrap();
        assert_eq!(f.kind, FailureKind::ExternalToolMissing);
        assert!(f.message.contains(INSTALL_HINT));
    }

    #[test]
    fn panic_message_extracts_payload() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
