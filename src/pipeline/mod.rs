//! Pipeline stages for a single conversion request.
//!
//! Each submodule implements exactly one step so each is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! upload ──▶ staging ──▶ external (subprocess) ──▶ Markdown
//!                    └─▶ library  (in-process) ──┘
//! ```
//!
//! 1. [`staging`]  — write the upload to a scoped temp file that keeps the
//!    original extension
//! 2. [`args`]     — tokenise and police the user's extra converter arguments
//! 3. [`external`] — build the converter command line and run it with a
//!    timeout, capturing stdout and stderr
//! 4. [`library`]  — the in-process alternative behind the
//!    [`library::LibraryConverter`] trait

pub mod args;
pub mod external;
pub mod library;
pub mod staging;
