// Command-line entry point for the man page toolchain.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use man_toolchain::application::{DepResolveUsecase, GraphUsecase, ScanUsecase};
use man_toolchain::infrastructure::toolchain::{check_toolchain, ToolchainProbe, DEFAULT_TOOLCHAIN};
use man_toolchain::infrastructure::{ManPageGrapher, ManPageScanner, NoopDepResolver, StdinInput};
use tracing_subscriber::EnvFilter;

/// Extracts defs of POSIX commands from man pages for shell-script analysis.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for man pages
    ///
    /// Scan the directory tree rooted at the current directory for man pages.
    Scan {
        /// Directory to scan instead of the current directory
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Graph man pages
    ///
    /// Graph man pages, producing defs of standard commands.
    Graph {
        /// Directory that unit file paths are relative to
        #[arg(long)]
        root: Option<PathBuf>,

        /// Toolchain program checked before graphing
        #[arg(long, env = "MAN_TOOLCHAIN_RUSTC", default_value = DEFAULT_TOOLCHAIN)]
        toolchain: String,
    },

    /// Resolve imports of man pages
    ///
    /// Performs no operation, provided for compatibility.
    Depresolve,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Logs go to stderr; stdout carries only the stage's JSON.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,man_toolchain={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn resolve_root(root: Option<PathBuf>) -> Result<PathBuf> {
    match root {
        Some(path) => Ok(path),
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Scan { root } => {
            let root = resolve_root(root)?;
            let scanner = ManPageScanner::default();
            ScanUsecase { scanner: &scanner }.run(&root, &mut out)?;
        }
        Commands::Graph { root, toolchain } => {
            check_toolchain(&ToolchainProbe::for_program(toolchain))
                .context("toolchain preflight failed")?;
            let grapher = ManPageGrapher::new(resolve_root(root)?);
            let mut input = StdinInput::new();
            GraphUsecase { grapher: &grapher }.run(&mut input, &mut out)?;
        }
        Commands::Depresolve => {
            let mut input = StdinInput::new();
            DepResolveUsecase { resolver: &NoopDepResolver }.run(&mut input, &mut out)?;
        }
    }

    out.flush().context("writing output failed")?;
    Ok(())
}
