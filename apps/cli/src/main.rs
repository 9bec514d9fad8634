//! calcmark - evaluate the math regions of a Markdown document
//!
//! Usage:
//!   calcmark process <path> [--in-place | -o <out>]   - write results into the document
//!   calcmark clear <path> [--in-place | -o <out>]     - remove every computed result
//!   calcmark inspect <path>                           - print the symbol IR as JSON
//!
//! `-` reads the document from stdin.

mod config;
mod logging;

use anyhow::{bail, Context};
use calcmark_document::{strip_computed, Diagnostic, Processor};
use calcmark_engine::SummaryBackend;
use clap::{Args, Parser, Subcommand};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "calcmark", version, about = "Evaluate unit-aware math regions in Markdown documents")]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate every region and write the results back
    Process {
        #[command(flatten)]
        io: IoArgs,

        /// Significant digits in rendered results
        #[arg(long)]
        precision: Option<u32>,

        /// Per-expression timeout in milliseconds (0 disables it)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Fill `=>` regions with a plain-text summary of the expression
        #[arg(long)]
        symbolic: bool,

        /// Exit with status 1 when any region failed
        #[arg(long)]
        check: bool,
    },
    /// Remove computed results and error annotations
    Clear {
        #[command(flatten)]
        io: IoArgs,
    },
    /// Print the symbol IR of the document as JSON
    Inspect {
        /// Input document, or `-` for stdin
        input: PathBuf,

        /// Include region diagnostics next to the IR
        #[arg(long)]
        diagnostics: bool,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input document, or `-` for stdin
    input: PathBuf,

    /// Write the result here instead of stdout
    #[arg(long, short = 'o', conflicts_with = "in_place")]
    output: Option<PathBuf>,

    /// Rewrite the input file
    #[arg(long, short = 'i')]
    in_place: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut overrides = config::Overrides {
        log_level: cli.log_level.clone(),
        json_logs: cli.json_logs,
        ..Default::default()
    };
    if let Command::Process {
        precision,
        timeout_ms,
        ..
    } = &cli.command
    {
        overrides.precision = *precision;
        overrides.timeout_ms = *timeout_ms;
    }

    let dotenv_problem = config::load_dotenv();
    let config =
        config::load(cli.config.as_deref(), &overrides).context("Failed to load configuration")?;
    logging::init_logging(&config.logging).context("Failed to initialize logging")?;
    if let Some(err) = dotenv_problem {
        tracing::warn!(error = %err, "ignoring unreadable .env file");
    }

    match cli.command {
        Command::Process {
            io,
            symbolic,
            check,
            ..
        } => {
            let mut processor = Processor::new(config.process);
            if symbolic {
                processor = processor.with_symbolic_backend(Arc::new(SummaryBackend));
            }

            let doc = read_input(&io.input)?;
            let processed = processor.process(&doc);
            report(&io.input, &processed.diagnostics);
            write_output(&io, &processed.document)?;
            if check && !processed.diagnostics.is_empty() {
                bail!(
                    "{} region(s) failed in {}",
                    processed.diagnostics.len(),
                    io.input.display()
                );
            }
        }
        Command::Clear { io } => {
            let doc = read_input(&io.input)?;
            write_output(&io, &strip_computed(&doc))?;
        }
        Command::Inspect { input, diagnostics } => {
            let doc = read_input(&input)?;
            let processed = Processor::new(config.process).process(&doc);
            let json = if diagnostics {
                serde_json::to_string_pretty(&serde_json::json!({
                    "ir": processed.ir,
                    "diagnostics": processed.diagnostics,
                }))
            } else {
                processed.ir.to_json()
            }
            .context("Failed to serialize IR")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if is_stdin(path) {
        let mut doc = String::new();
        std::io::stdin()
            .read_to_string(&mut doc)
            .context("Failed to read document from stdin")?;
        return Ok(doc);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_output(io: &IoArgs, content: &str) -> anyhow::Result<()> {
    let target = match (&io.output, io.in_place) {
        (Some(path), _) => Some(path.as_path()),
        (None, true) if is_stdin(&io.input) => bail!("--in-place needs a file input"),
        (None, true) => Some(io.input.as_path()),
        (None, false) => None,
    };
    match target {
        Some(path) => {
            std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(content.as_bytes())
                .and_then(|()| stdout.flush())
                .context("Failed to write to stdout")
        }
    }
}

fn report(input: &Path, diagnostics: &[Diagnostic]) {
    for d in diagnostics {
        eprintln!(
            "{}:{}:{}: {}: {}",
            input.display(),
            d.line,
            d.column,
            d.kind,
            d.message
        );
    }
}
