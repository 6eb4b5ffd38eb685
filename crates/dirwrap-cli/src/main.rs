//! dirwrap - drive a directory provider from the command line.
//!
//! Plays the host role: builds one provider from a config file (or `--root`),
//! issues open/read/rewind/close and mkdir/rmdir against it, and turns errors
//! into diagnostics that keep "not supported" apart from "failed".

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dirwrap::config::{self, Config, LogConfig, ProviderConfig};
use dirwrap::{DirError, DirectoryProvider, StreamOptions};

#[derive(Debug, Parser)]
#[command(name = "dirwrap", version, about = "List, create and remove directories through a provider")]
struct Cli {
    /// Provider configuration file (TOML).
    #[arg(long, short, conflicts_with = "root")]
    config: Option<PathBuf>,

    /// Serve real directories under this root instead of using a config file.
    #[arg(long)]
    root: Option<PathBuf>,

    /// With --root: declare no mkdir/rmdir capability.
    #[arg(long, requires = "root")]
    read_only: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List a directory.
    Ls {
        path: String,
        /// Rewind after the first pass and list again.
        #[arg(long)]
        twice: bool,
    },
    /// Create a directory.
    Mkdir {
        path: String,
        /// Create missing parents.
        #[arg(short = 'p', long)]
        parents: bool,
        /// Permission bits, in octal.
        #[arg(long, default_value = "755", value_parser = parse_mode)]
        mode: u32,
    },
    /// Remove a directory.
    Rmdir {
        path: String,
        /// Remove contents too.
        #[arg(short, long)]
        recursive: bool,
    },
    /// Show which optional operations the provider declares.
    Caps,
}

fn parse_mode(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s.trim_start_matches("0o"), 8)
        .map_err(|e| format!("invalid octal mode {s:?}: {e}"))
}

fn recursive_if(flag: bool) -> StreamOptions {
    if flag {
        StreamOptions::RECURSIVE
    } else {
        StreamOptions::empty()
    }
}

fn load(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return config::load_config(path).with_context(|| format!("loading {}", path.display()));
    }
    let root = match &cli.root {
        Some(root) => root.clone(),
        None => std::env::current_dir().context("resolving current directory")?,
    };
    Ok(Config {
        log: LogConfig::default(),
        provider: ProviderConfig::Local {
            root,
            read_only: cli.read_only,
            io_timeout_ms: None,
        },
    })
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Host-side diagnostic for a provider error.
fn diagnose(command: &str, err: &DirError) -> String {
    if err.is_unsupported() {
        format!("{command}: operation not supported by this provider ({err})")
    } else {
        format!("{command}: operation failed [{}]: {err}", err.kind())
    }
}

async fn list(provider: &dyn DirectoryProvider, path: &str, twice: bool) -> Result<(), DirError> {
    let handle = provider.open(path, StreamOptions::REPORT_ERRORS).await?;
    let passes = if twice { 2 } else { 1 };

    let mut result = Ok(());
    'passes: for pass in 0..passes {
        if pass > 0 {
            if let Err(e) = provider.rewind(handle).await {
                result = Err(e);
                break;
            }
            println!();
        }
        loop {
            match provider.read(handle).await {
                Ok(Some(name)) => println!("{name}"),
                Ok(None) => break,
                Err(e) => {
                    result = Err(e);
                    break 'passes;
                }
            }
        }
    }

    let closed = provider.close(handle).await;
    result.and(closed)
}

async fn run(cli: &Cli, provider: Arc<dyn DirectoryProvider>) -> Result<(), (&'static str, DirError)> {
    match &cli.command {
        Command::Ls { path, twice } => list(provider.as_ref(), path, *twice)
            .await
            .map_err(|e| ("ls", e)),
        Command::Mkdir {
            path,
            parents,
            mode,
        } => provider
            .make_directory(path, *mode, recursive_if(*parents))
            .await
            .map_err(|e| ("mkdir", e)),
        Command::Rmdir { path, recursive } => provider
            .remove_directory(path, recursive_if(*recursive))
            .await
            .map_err(|e| ("rmdir", e)),
        Command::Caps => {
            let caps = provider.capabilities();
            println!("make_directory: {}", caps.contains(dirwrap::Capabilities::MAKE_DIRECTORY));
            println!("remove_directory: {}", caps.contains(dirwrap::Capabilities::REMOVE_DIRECTORY));
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = load(&cli)?;
    init_tracing(&config.log);

    let provider = config.provider.build().context("building provider")?;
    tracing::debug!(capabilities = ?provider.capabilities(), "provider ready");

    match run(&cli, provider).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err((command, err)) => {
            tracing::debug!(error = ?err, "{command} failed");
            eprintln!("dirwrap: {}", diagnose(command, &err));
            Ok(ExitCode::FAILURE)
        }
    }
}
