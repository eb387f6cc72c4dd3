//! External converter subprocess.
//!
//! The converter is run as
//! `<program> [base args] <staged-path> [--use-plugins] [extra tokens…]`
//! with stdin closed and stdout/stderr captured separately. Exit code 0 means
//! stdout is the whole Markdown document; anything else is a failure whose
//! diagnostics are on stderr.
//!
//! The wait is async and bounded by the configured timeout. The child is
//! spawned with `kill_on_drop`, so giving up on the wait (timeout or the
//! request future being dropped) also kills the process.

use crate::config::{ConversionOptions, ConverterCommand};
use crate::error::DocmarkError;
use crate::pipeline::args::{self, PLUGIN_FLAG};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// A fully built converter command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub base_args: Vec<String>,
    pub input: PathBuf,
    pub flags: Vec<String>,
}

impl Invocation {
    /// Build the invocation for `input`, applying the argument policy.
    pub fn build(
        converter: &ConverterCommand,
        input: &Path,
        options: &ConversionOptions,
    ) -> Result<Self, DocmarkError> {
        let mut flags = Vec::new();
        if options.enable_plugins {
            flags.push(PLUGIN_FLAG.to_string());
        }
        flags.extend(args::sanitize(
            &options.extra_arguments,
            options.enable_plugins,
        )?);

        Ok(Self {
            program: converter.program.clone(),
            base_args: converter.base_args.clone(),
            input: input.to_path_buf(),
            flags,
        })
    }

    /// Every argument after the program, in order.
    pub fn args(&self) -> Vec<String> {
        let mut out = self.base_args.clone();
        out.push(self.input.to_string_lossy().into_owned());
        out.extend(self.flags.iter().cloned());
        out
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in self.args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run the converter and return its stdout as the Markdown document.
pub async fn run(invocation: &Invocation, timeout: Duration) -> Result<String, DocmarkError> {
    info!("Running command: {}", invocation);

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.base_args)
        .arg(&invocation.input)
        .args(&invocation.flags)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DocmarkError::ToolMissing {
                program: invocation.program.clone(),
            }
        } else {
            DocmarkError::SpawnFailed {
                program: invocation.program.clone(),
                source: e,
            }
        }
    })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| {
            DocmarkError::Internal(format!("failed to collect converter output: {e}"))
        })?,
        Err(_) => {
            warn!(
                "Converter '{}' exceeded {:?}; killing it",
                invocation.program, timeout
            );
            return Err(DocmarkError::Timeout { limit: timeout });
        }
    };

    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        warn!("Converter exited with code {}: {}", code, stderr.trim_end());
        return Err(DocmarkError::CommandFailed { code, stderr });
    }

    if !stderr.is_empty() {
        debug!("Converter stderr: {}", stderr.trim_end());
    }

    String::from_utf8(output.stdout).map_err(|e| {
        warn!("Converter output is not valid UTF-8: {}", e.utf8_error());
        DocmarkError::InvalidOutput {
            detail: e.utf8_error().to_string(),
            stderr,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(plugins: bool, extra: &str) -> ConversionOptions {
        ConversionOptions::builder()
            .enable_plugins(plugins)
            .extra_arguments_str(extra)
            .build()
    }

    #[test]
    fn invocation_order_is_path_then_plugins_then_extras() {
        let inv = Invocation::build(
            &ConverterCommand::default(),
            Path::new("/tmp/docmark-abc.pdf"),
            &opts(true, "--keep-data-uris"),
        )
        .unwrap();
        assert_eq!(
            inv.to_string(),
            "markitdown /tmp/docmark-abc.pdf --use-plugins --keep-data-uris"
        );
    }

    #[test]
    fn plugin_flag_appears_exactly_once() {
        let inv = Invocation::build(
            &ConverterCommand::default(),
            Path::new("/tmp/x.docx"),
            &opts(true, "--use-plugins --use-plugins"),
        )
        .unwrap();
        let count = inv.args().iter().filter(|a| *a == PLUGIN_FLAG).count();
        assert_eq!(count, 1);
    }

    #[test]
    fn no_plugin_flag_by_default() {
        let inv = Invocation::build(
            &ConverterCommand::default(),
            Path::new("/tmp/x.docx"),
            &opts(false, ""),
        )
        .unwrap();
        assert_eq!(inv.args(), vec!["/tmp/x.docx"]);
    }

    #[test]
    fn base_args_precede_input() {
        let cmd = ConverterCommand::parse("python -m markitdown").unwrap();
        let inv = Invocation::build(&cmd, Path::new("/tmp/x.pdf"), &opts(false, "")).unwrap();
        assert_eq!(inv.program, "python");
        assert_eq!(inv.args(), vec!["-m", "markitdown", "/tmp/x.pdf"]);
    }

    #[test]
    fn rejected_extra_argument_fails_build() {
        let err = Invocation::build(
            &ConverterCommand::default(),
            Path::new("/tmp/x.pdf"),
            &opts(false, "-o /tmp/elsewhere.md"),
        )
        .unwrap_err();
        assert!(matches!(err, DocmarkError::RejectedArgument { .. }));
    }

    #[tokio::test]
    async fn missing_binary_is_tool_missing() {
        let inv = Invocation::build(
            &ConverterCommand::new("docmark-no-such-converter-binary"),
            Path::new("/tmp/x.pdf"),
            &ConversionOptions::default(),
        )
        .unwrap();
        let err = run(&inv, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(err, DocmarkError::ToolMissing { .. }), "got {err:?}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn stdout_and_stderr_captured_separately() {
        let cmd = ConverterCommand::new("sh").with_base_args([
            "-c",
            "printf '# Out\\n'; printf 'warn\\n' >&2",
            "markitdown",
        ]);
        let inv = Invocation::build(&cmd, Path::new("/tmp/x.txt"), &ConversionOptions::default())
            .unwrap();
        let md = run(&inv, Duration::from_secs(10)).await.unwrap();
        assert_eq!(md, "# Out\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_kills_converter() {
        let cmd = ConverterCommand::new("sh").with_base_args(["-c", "sleep 5", "markitdown"]);
        let inv = Invocation::build(&cmd, Path::new("/tmp/x.txt"), &ConversionOptions::default())
            .unwrap();
        let start = std::time::Instant::now();
        let err = run(&inv, Duration::from_millis(200)).await.unwrap_err();
        assert!(matches!(err, DocmarkError::Timeout { .. }), "got {err:?}");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_utf8_stdout_is_an_error() {
        let cmd = ConverterCommand::new("sh").with_base_args(["-c", "printf '\\377'", "markitdown"]);
        let inv = Invocation::build(&cmd, Path::new("/tmp/x.txt"), &ConversionOptions::default())
            .unwrap();
        let err = run(&inv, Duration::from_secs(10)).await.unwrap_err();
        assert!(matches!(err, DocmarkError::InvalidOutput { .. }), "got {err:?}");
    }

    #[test]
    fn abbreviated_output_option_fails_build() {
        for extra in ["-o/tmp/elsewhere.md", "--out /tmp/elsewhere.md", "--outp=/tmp/e.md"] {
            let err = Invocation::build(
                &ConverterCommand::default(),
                Path::new("/tmp/x.pdf"),
                &opts(false, extra),
            )
            .unwrap_err();
            assert!(matches!(err, DocmarkError::RejectedArgument { .. }), "{extra}");
        }
    }
}
