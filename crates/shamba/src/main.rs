// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shamba - inbound SMS classification and dispatch for agricultural advice.
//!
//! This is the binary entry point: configuration checks, pagination previews
//! and offline replay of inbound messages against a catalog.

mod check;
mod pages;
mod replay;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use shamba_config::ShambaConfig;
use shamba_router::page_options;

/// Shamba - inbound SMS classification and dispatch.
#[derive(Parser, Debug)]
#[command(name = "shamba", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate configuration and, optionally, a catalog.
    Check {
        /// Catalog JSON to check against the operated countries.
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
    /// Show the SMS pages a text would be sent as.
    Pages {
        text: String,
        /// Override the configured page limit.
        #[arg(long)]
        limit: Option<usize>,
        /// Replace or drop characters outside the GSM alphabet first.
        #[arg(long)]
        clean: bool,
    },
    /// Push inbound messages from a JSON lines file through the engine.
    Replay {
        /// Catalog JSON seeding templates, keywords, regions and customers.
        #[arg(long)]
        catalog: PathBuf,
        /// One `{"from", "to"?, "text", "at"}` object per line.
        #[arg(long)]
        messages: PathBuf,
        /// Print Prometheus metrics after the replay.
        #[arg(long)]
        metrics: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => shamba_config::load_and_validate_path(path),
        None => shamba_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            shamba_config::render_errors(&errors);
            std::process::exit(1);
        }
    };
    init_tracing(&config.engine.log_level);

    match cli.command {
        Some(Commands::Check { catalog, plain }) => {
            if !check::run_check(&config, catalog.as_deref(), plain).await {
                std::process::exit(1);
            }
        }
        Some(Commands::Pages { text, limit, clean }) => {
            if let Err(e) = run_pages(&config, &text, limit, clean) {
                eprintln!("shamba pages: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Replay {
            catalog,
            messages,
            metrics,
        }) => {
            if let Err(e) = replay::run_replay(config, &catalog, &messages, metrics).await {
                eprintln!("shamba replay: {e}");
                std::process::exit(1);
            }
        }
        None => {
            println!("shamba: use --help for available commands");
        }
    }
}

fn run_pages(
    config: &ShambaConfig,
    text: &str,
    limit: Option<usize>,
    clean: bool,
) -> Result<(), shamba_text::PaginationError> {
    let mut options = page_options(&config.sms);
    if let Some(limit) = limit {
        options.limit = limit;
    }
    print!("{}", pages::render_pages(text, &options, clean)?);
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so that command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shamba={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
