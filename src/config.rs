//! Configuration types for document-to-Markdown conversion.
//!
//! Two structs split the knobs by lifetime:
//!
//! * [`ConversionOptions`] — chosen by the user for a single upload (the two
//!   checkboxes and the free-text argument field of the web form).
//! * [`ConverterSettings`] — chosen by the operator once at start-up (which
//!   converter binary to run, how long to wait for it, where to stage files).
//!   Built via [`ConverterSettingsBuilder`] so every field has a documented
//!   default and `build()` can validate the combination.

use crate::error::DocmarkError;
use crate::pipeline::args;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Per-request conversion options.
///
/// # Example
/// ```rust
/// use docmark::ConversionOptions;
///
/// let options = ConversionOptions::builder()
///     .enable_plugins(true)
///     .extra_arguments_str("--keep-data-uris")
///     .build();
/// assert!(options.use_external_cli);
/// assert_eq!(options.extra_arguments, vec!["--keep-data-uris"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    /// Run the external converter as a subprocess (`true`) or use the
    /// in-process library converter (`false`). Default: true.
    pub use_external_cli: bool,

    /// Forward the plugin-enable flag to the converter. Default: false.
    pub enable_plugins: bool,

    /// Extra tokens appended to the converter command line after the
    /// argument policy in [`crate::pipeline::args`] has checked them.
    pub extra_arguments: Vec<String>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            use_external_cli: true,
            enable_plugins: false,
            extra_arguments: Vec::new(),
        }
    }
}

impl ConversionOptions {
    /// Create a new builder for `ConversionOptions`.
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder {
            options: Self::default(),
        }
    }
}

/// Builder for [`ConversionOptions`].
#[derive(Debug)]
pub struct ConversionOptionsBuilder {
    options: ConversionOptions,
}

impl ConversionOptionsBuilder {
    pub fn use_external_cli(mut self, v: bool) -> Self {
        self.options.use_external_cli = v;
        self
    }

    pub fn enable_plugins(mut self, v: bool) -> Self {
        self.options.enable_plugins = v;
        self
    }

    pub fn extra_arguments(mut self, tokens: Vec<String>) -> Self {
        self.options.extra_arguments = tokens;
        self
    }

    /// Tokenise free text (as typed into the web form) on whitespace.
    pub fn extra_arguments_str(mut self, raw: &str) -> Self {
        self.options.extra_arguments = args::tokenize(raw);
        self
    }

    pub fn build(self) -> ConversionOptions {
        self.options
    }
}

// ── Converter command ────────────────────────────────────────────────────

/// The converter invocation prefix: a program plus fixed leading arguments.
///
/// Usually just `markitdown`, but a multi-word form such as
/// `python -m markitdown` is accepted for installs where the console script
/// is not on `PATH`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterCommand {
    pub program: String,
    pub base_args: Vec<String>,
}

impl ConverterCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_base_args<I, S>(mut self, base_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = base_args.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a whitespace-separated command line such as `python -m markitdown`.
    pub fn parse(s: &str) -> Result<Self, DocmarkError> {
        let mut parts = s.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| DocmarkError::InvalidConfig("converter command is empty".into()))?;
        Ok(Self::new(program).with_base_args(parts))
    }
}

impl Default for ConverterCommand {
    fn default() -> Self {
        Self::new("markitdown")
    }
}

impl fmt::Display for ConverterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.base_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ── Operator settings ────────────────────────────────────────────────────

/// Process-wide settings for the conversion orchestrator.
#[derive(Debug, Clone)]
pub struct ConverterSettings {
    /// External converter command. Default: `markitdown`.
    pub converter: ConverterCommand,

    /// Maximum time to wait for the external converter. Default: 300 s.
    ///
    /// When exceeded, the child process is killed and the request fails with
    /// [`DocmarkError::Timeout`].
    pub timeout: Duration,

    /// Maximum number of conversions running at the same time. Default: 4.
    ///
    /// Further requests wait for a free slot rather than spawning more
    /// converter processes.
    pub max_concurrent: usize,

    /// Directory for temporary artifacts. Default: the platform temp dir.
    pub temp_dir: Option<PathBuf>,

    /// Largest accepted upload in bytes. Default: 200 MiB.
    pub max_upload_bytes: usize,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            converter: ConverterCommand::default(),
            timeout: Duration::from_secs(300),
            max_concurrent: 4,
            temp_dir: None,
            max_upload_bytes: 200 * 1024 * 1024,
        }
    }
}

impl ConverterSettings {
    /// Create a new builder for `ConverterSettings`.
    pub fn builder() -> ConverterSettingsBuilder {
        ConverterSettingsBuilder {
            settings: Self::default(),
        }
    }
}

/// Builder for [`ConverterSettings`].
#[derive(Debug)]
pub struct ConverterSettingsBuilder {
    settings: ConverterSettings,
}

impl ConverterSettingsBuilder {
    pub fn converter(mut self, cmd: ConverterCommand) -> Self {
        self.settings.converter = cmd;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout = timeout;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.settings.timeout = Duration::from_secs(secs);
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.settings.max_concurrent = n;
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.temp_dir = Some(dir.into());
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.settings.max_upload_bytes = n;
        self
    }

    /// Build the settings, validating constraints.
    pub fn build(self) -> Result<ConverterSettings, DocmarkError> {
        let s = &self.settings;
        if s.converter.program.trim().is_empty() {
            return Err(DocmarkError::InvalidConfig(
                "converter program must not be empty".into(),
            ));
        }
        if s.timeout.is_zero() {
            return Err(DocmarkError::InvalidConfig("timeout must be > 0".into()));
        }
        if s.max_concurrent == 0 {
            return Err(DocmarkError::InvalidConfig(
                "max concurrent conversions must be ≥ 1".into(),
            ));
        }
        if s.max_upload_bytes == 0 {
            return Err(DocmarkError::InvalidConfig(
                "max upload size must be > 0".into(),
            ));
        }
        if let Some(ref dir) = s.temp_dir {
            if !dir.is_dir() {
                return Err(DocmarkError::InvalidConfig(format!(
                    "temp dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }
        Ok(self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let o = ConversionOptions::default();
        assert!(o.use_external_cli);
        assert!(!o.enable_plugins);
        assert!(o.extra_arguments.is_empty());
    }

    #[test]
    fn options_builder_tokenizes_free_text() {
        let o = ConversionOptions::builder()
            .use_external_cli(false)
            .extra_arguments_str("  --keep-data-uris   -x pdf ")
            .build();
        assert!(!o.use_external_cli);
        assert_eq!(o.extra_arguments, vec!["--keep-data-uris", "-x", "pdf"]);
    }

    #[test]
    fn converter_command_parse() {
        let c = ConverterCommand::parse("python -m markitdown").unwrap();
        assert_eq!(c.program, "python");
        assert_eq!(c.base_args, vec!["-m", "markitdown"]);
        assert_eq!(c.to_string(), "python -m markitdown");

        assert!(ConverterCommand::parse("   ").is_err());
    }

    #[test]
    fn settings_defaults_validate() {
        let s = ConverterSettings::builder().build().unwrap();
        assert_eq!(s.converter.program, "markitdown");
        assert_eq!(s.timeout, Duration::from_secs(300));
        assert_eq!(s.max_concurrent, 4);
    }

    #[test]
    fn settings_reject_zero_timeout() {
        let err = ConverterSettings::builder()
            .timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn settings_reject_zero_concurrency() {
        assert!(ConverterSettings::builder().max_concurrent(0).build().is_err());
    }

    #[test]
    fn settings_reject_missing_temp_dir() {
        let err = ConverterSettings::builder()
            .temp_dir("/definitely/not/a/real/dir")
            .build()
            .unwrap_err();
        assert!(matches!(err, DocmarkError::InvalidConfig(_)));
    }
}
