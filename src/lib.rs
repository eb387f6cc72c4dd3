//! # docmark
//!
//! Upload a document, convert it to Markdown with an external converter
//! (`markitdown` by default), show the result and hand back a `.md` file.
//!
//! The parsing itself (PDF, Office, images, audio …) is entirely the
//! converter's job. This crate is the orchestration around it: stage the
//! upload in a scoped temp file, run the converter as a subprocess (or an
//! in-process [`LibraryConverter`]), turn every outcome into a renderable
//! [`ConversionResult`], and clean up.
//!
//! ## Request Flow
//!
//! ```text
//! upload
//!  │
//!  ├─ 1. Stage    write bytes to a temp file, keeping the extension
//!  ├─ 2. Convert  `markitdown <tmp> [--use-plugins] [extra…]`  or in-process
//!  ├─ 3. Release  delete the temp file on every exit path
//!  ├─ 4. Preview  first 10 rows of .csv / .xlsx / .xls uploads
//!  └─ 5. Report   Markdown (or failure placeholder) + download name
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docmark::{ConversionOptions, ConverterSettings, Orchestrator, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = Orchestrator::new(ConverterSettings::default());
//!     let upload = UploadedFile::from_path("report.docx".as_ref())?;
//!     let result = orchestrator.convert(&upload, &ConversionOptions::default()).await;
//!     match result.markdown_document() {
//!         Some(md) => println!("{md}"),
//!         None => eprintln!("{:?}", result.failure()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | axum web UI ([`server`]) |
//! | `cli`    | on      | Enables the `docmark` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod preview;
#[cfg(feature = "server")]
pub mod server;
pub mod upload;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    ConversionOptions, ConversionOptionsBuilder, ConverterCommand, ConverterSettings,
    ConverterSettingsBuilder,
};
pub use convert::Orchestrator;
pub use error::{DocmarkError, PreviewError, INSTALL_HINT};
pub use output::{ConversionFailure, ConversionReport, ConversionResult, FailureKind};
pub use pipeline::library::{BuiltinConverter, Capability, LibraryConverter};
pub use preview::{preview_tabular_data, TablePreview, PREVIEW_ROWS};
pub use upload::{FileDetails, UploadedFile, SUPPORTED_EXTENSIONS};
