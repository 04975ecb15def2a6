// Copyright 2026 Indices Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use indices_runtime::cli;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "indices",
    about = "Global market indices scraper with a JSON API",
    version,
    after_help = "Run 'indices <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to listen on
        #[arg(long, default_value = "5000")]
        port: u16,
    },
    /// Scrape once and print the result
    Scrape {
        /// Render the page in headless Chromium before falling back to HTTP
        #[arg(long)]
        renderer: bool,
        /// Persist the result to the document store
        #[arg(long)]
        store: bool,
        /// Records to keep in the store
        #[arg(long, default_value = "100")]
        limit: usize,
        /// Append instead of replacing the stored records
        #[arg(long)]
        no_limit: bool,
    },
    /// Print raw unfiltered data from the source site
    Raw {
        /// Render the page in headless Chromium before falling back to HTTP
        #[arg(long)]
        renderer: bool,
    },
    /// Print stored records, newest first
    Data,
    /// Check environment and diagnose issues
    Doctor,
    /// Smoke-test a running server
    Check {
        /// Base URL of the server
        #[arg(long, default_value = "http://localhost:5000")]
        url: String,
        /// Ask the server to render the page
        #[arg(long)]
        renderer: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let directive = if verbose { "indices=debug" } else { "indices=info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(directive.parse().expect("static log directive is valid"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let result = match cli.command {
        Commands::Serve { host, port } => cli::serve::run(&host, port).await,
        Commands::Scrape {
            renderer,
            store,
            limit,
            no_limit,
        } => cli::scrape_cmd::run(renderer, store, limit, no_limit).await,
        Commands::Raw { renderer } => cli::scrape_cmd::run_raw(renderer).await,
        Commands::Data => cli::data_cmd::run().await,
        Commands::Doctor => cli::doctor::run().await,
        Commands::Check { url, renderer } => cli::check_cmd::run(&url, renderer).await,
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "indices", &mut std::io::stdout());
            Ok(())
        }
    };

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        eprintln!("  Error: {e:#}");
        std::process::exit(1);
    }

    result
}
