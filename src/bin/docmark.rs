//! CLI binary for docmark.
//!
//! A thin shim over the library crate: `serve` starts the web UI, `convert`
//! runs a single conversion in the terminal.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docmark::server::{self, AppState};
use docmark::{
    ConversionOptions, ConversionReport, ConversionResult, ConverterCommand, ConverterSettings,
    Orchestrator, UploadedFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Start the web UI on http://127.0.0.1:8501
  docmark serve

  # Listen on all interfaces, converter installed as a Python module
  docmark --converter "python -m markitdown" serve --bind 0.0.0.0:8501

  # Convert one file to stdout
  docmark convert slides.pptx

  # Convert to a file with plugins enabled
  docmark convert --use-plugins report.pdf -o report.md

  # Use the built-in in-process converter (text, JSON, XML, CSV, Excel)
  docmark convert --no-cli data.xlsx --preview

  # Structured output
  docmark convert --json invoice.pdf > invoice.json

ENVIRONMENT VARIABLES:
  DOCMARK_CONVERTER       Converter command (default: markitdown)
  DOCMARK_TIMEOUT         Converter timeout in seconds (default: 300)
  DOCMARK_MAX_CONCURRENT  Conversions allowed to run at once (default: 4)
  DOCMARK_TEMP_DIR        Directory for temporary files
  DOCMARK_MAX_UPLOAD_MB   Largest accepted upload in MiB (default: 200)
  DOCMARK_VERBOSE         Same as -v
  DOCMARK_QUIET           Same as -q
  DOCMARK_BIND            Address for `serve` (default: 127.0.0.1:8501)
  RUST_LOG                Log filter, overrides -v / -q

SETUP:
  pip install 'markitdown[all]'
"#;

/// Convert documents to Markdown through an external converter.
#[derive(Parser, Debug)]
#[command(
    name = "docmark",
    version,
    about = "Convert documents to Markdown through an external converter — web UI and CLI",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Converter command, e.g. `markitdown` or `python -m markitdown`.
    #[arg(long, global = true, env = "DOCMARK_CONVERTER", default_value = "markitdown")]
    converter: String,

    /// Seconds to wait for the converter before killing it.
    #[arg(long, global = true, env = "DOCMARK_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Conversions allowed to run at the same time.
    #[arg(long, global = true, env = "DOCMARK_MAX_CONCURRENT", default_value_t = 4)]
    max_concurrent: usize,

    /// Directory for temporary files (default: platform temp dir).
    #[arg(long, global = true, env = "DOCMARK_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Largest accepted upload in MiB.
    #[arg(long, global = true, env = "DOCMARK_MAX_UPLOAD_MB", default_value_t = 200)]
    max_upload_mb: usize,

    /// Disable the in-process converter.
    #[arg(long, global = true)]
    no_library: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCMARK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCMARK_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the web UI.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "DOCMARK_BIND", default_value = "127.0.0.1:8501")]
        bind: SocketAddr,
    },
    /// Convert a single file.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Document to convert.
    input: PathBuf,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use the in-process converter instead of the converter CLI.
    #[arg(long)]
    no_cli: bool,

    /// Pass --use-plugins to the converter.
    #[arg(long)]
    use_plugins: bool,

    /// Additional converter arguments (whitespace separated).
    #[arg(long, allow_hyphen_values = true, default_value = "")]
    extra_args: String,

    /// Output the full ConversionReport as JSON.
    #[arg(long)]
    json: bool,

    /// Print a table preview for .csv / .xlsx / .xls inputs.
    #[arg(long)]
    preview: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if matches!(cli.command, Command::Convert(_)) {
        // The spinner and summary line cover what the user needs.
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let orchestrator = build_orchestrator(&cli)?;

    match cli.command {
        Command::Serve { bind } => {
            let state = Arc::new(AppState { orchestrator });
            server::serve(bind, state, shutdown_signal())
                .await
                .with_context(|| format!("Server on {bind} failed"))?;
        }
        Command::Convert(ref args) => {
            let ok = run_convert(&orchestrator, args, cli.quiet).await?;
            if !ok {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Map CLI args to `ConverterSettings`.
fn build_orchestrator(cli: &Cli) -> Result<Orchestrator> {
    let converter = ConverterCommand::parse(&cli.converter).context("Invalid --converter")?;

    let mut builder = ConverterSettings::builder()
        .converter(converter)
        .timeout_secs(cli.timeout)
        .max_concurrent(cli.max_concurrent)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024));
    if let Some(ref dir) = cli.temp_dir {
        builder = builder.temp_dir(dir);
    }
    let settings = builder.build().context("Invalid configuration")?;

    let orchestrator = Orchestrator::new(settings);
    Ok(if cli.no_library {
        orchestrator.without_library()
    } else {
        orchestrator
    })
}

/// Run one conversion; returns whether it succeeded.
async fn run_convert(orchestrator: &Orchestrator, args: &ConvertArgs, quiet: bool) -> Result<bool> {
    let upload = UploadedFile::from_path(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let options = ConversionOptions::builder()
        .use_external_cli(!args.no_cli)
        .enable_plugins(args.use_plugins)
        .extra_arguments_str(&args.extra_args)
        .build();

    let spinner = (!quiet && !args.json).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_message(format!("Converting {}…", upload.name));
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let report = orchestrator.handle(upload, &options).await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(report.result.is_success());
    }

    print_failure(&report);

    if let Some(ref md) = report.markdown {
        if let Some(ref path) = args.output {
            tokio::fs::write(path, md)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !quiet {
                eprintln!("{} wrote {}", green("✔"), path.display());
            }
        } else {
            write_markdown(&mut io::stdout().lock(), md).context("Failed to write to stdout")?;
        }
    }

    if !quiet {
        for w in &report.warnings {
            eprintln!("{} {}", yellow("⚠"), w);
        }
        if args.preview {
            if let Some(ref preview) = report.preview {
                eprintln!("\nData Preview:\n{}", preview.to_markdown());
            }
        }
        if report.result.is_success() {
            eprintln!("{}", dim(&format!("converted in {}ms", report.duration_ms)));
        }
    }

    Ok(report.result.is_success())
}

/// Write `md`, terminated by a newline.
fn write_markdown<W: Write>(out: &mut W, md: &str) -> io::Result<()> {
    out.write_all(md.as_bytes())?;
    if !md.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

fn print_failure(report: &ConversionReport) {
    if let ConversionResult::Failure(ref f) = report.result {
        eprintln!("{} {}", red("✘"), f.message);
        if !f.diagnostic_output.is_empty() {
            eprintln!("{}", dim(f.diagnostic_output.trim_end()));
        }
        if let Some(ref cmd) = report.command {
            eprintln!("{}", dim(&format!("command: {cmd}")));
        }
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_markdown_appends_newline_once() {
        let mut buf = Vec::new();
        write_markdown(&mut buf, "# A").unwrap();
        write_markdown(&mut buf, "# B\n").unwrap();
        assert_eq!(buf, b"# A\n# B\n");
    }

    #[test]
    fn write_markdown_propagates_io_errors() {
        let err = write_markdown(&mut FailingWriter, "# A").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn after_help_lists_every_env_var() {
        let cmd = Cli::command();
        let mut vars = Vec::new();
        for arg in cmd.get_arguments() {
            vars.extend(arg.get_env().map(|v| v.to_string_lossy().into_owned()));
        }
        for sub in cmd.get_subcommands() {
            for arg in sub.get_arguments() {
                vars.extend(arg.get_env().map(|v| v.to_string_lossy().into_owned()));
            }
        }
        assert!(vars.contains(&"DOCMARK_MAX_UPLOAD_MB".to_string()));
        for var in vars {
            assert!(AFTER_HELP.contains(&var), "{var} missing from help");
        }
    }
}
