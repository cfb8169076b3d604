//! contractfuzz - Contract-driven fuzzing for HTTP APIs
//!
//! Sends contract-derived, one-change-at-a-time mutations of each
//! operation's baseline request and reports whether the service answered
//! with the status family its contract promises.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

use cli::commands;
use cli::OutputFormat;
use contractfuzz::errors::{self, ContractError};
use contractfuzz::fuzzer::FuzzProfile;

/// contractfuzz - Contract fuzzing for HTTP APIs
#[derive(Parser)]
#[command(
    name = "contractfuzz",
    version,
    about = "Contract-driven fuzzing for HTTP APIs",
    long_about = "contractfuzz mutates requests derived from an OpenAPI contract and checks \
                  that the service answers with the documented response code family.\n\n\
                  Exit codes: 0 no violations, 1 at least one FAIL or ERROR verdict, \
                  2 the run could not start"
)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    format: OutputFormat,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuzz a service against its contract
    Run {
        /// OpenAPI contract (JSON)
        #[arg(short, long)]
        contract: PathBuf,

        /// Base URL of the service under test
        #[arg(short, long)]
        server: String,

        /// Fuzzing profile
        #[arg(short, long, default_value = "standard")]
        profile: FuzzProfile,

        /// Run only these fuzzers (comma-separated)
        #[arg(long, value_delimiter = ',')]
        fuzzers: Option<Vec<String>>,

        /// Number of units executed concurrently
        #[arg(short, long)]
        workers: Option<usize>,

        /// Per-request timeout in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Expect type-coerced values to be rejected
        #[arg(long)]
        strict_types: bool,

        /// Extra header sent with every request (NAME:VALUE, repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Random seed for reproducible value generation
        #[arg(long)]
        seed: Option<u64>,

        /// Maximum run time (e.g., "30s", "5m")
        #[arg(long)]
        max_time: Option<String>,

        /// Maximum number of requests
        #[arg(long)]
        max_requests: Option<u64>,

        /// Disable all resource limits
        #[arg(long)]
        no_limits: bool,

        /// Fuzz authentication headers too
        #[arg(long)]
        include_auth_headers: bool,

        /// Write the report to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the built-in fuzzers
    List,
}

fn init_logging(verbosity: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbosity {
            0 => EnvFilter::new("contractfuzz=info"),
            1 => EnvFilter::new("contractfuzz=debug"),
            2 => EnvFilter::new("contractfuzz=trace"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Cancel the run cooperatively on the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted: finishing in-flight units");
            trigger.cancel();
        }
    });
    token
}

async fn dispatch(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Run {
            contract,
            server,
            profile,
            fuzzers,
            workers,
            timeout,
            strict_types,
            headers,
            seed,
            max_time,
            max_requests,
            no_limits,
            include_auth_headers,
            output,
        } => {
            let args = commands::run::RunArgs {
                contract,
                server,
                options: commands::run::RunOptions {
                    profile,
                    fuzzers,
                    workers,
                    timeout,
                    strict_types,
                    headers,
                    seed,
                    max_time,
                    max_requests,
                    no_limits,
                    include_auth_headers,
                },
                format: cli.format,
                output,
                progress: !cli.quiet && cli.format == OutputFormat::Text,
            };
            commands::run::run(args, cancel_on_ctrl_c()).await
        }
        Commands::List => {
            commands::list::run(cli.format)?;
            Ok(false)
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet);

    match dispatch(cli).await {
        Ok(false) => {}
        Ok(true) => std::process::exit(1),
        Err(err) => {
            match err.downcast::<ContractError>() {
                Ok(contract_err) => eprintln!("{:?}", miette::Report::new(contract_err)),
                Err(err) => eprintln!("{} {}", "Error:".red().bold(), errors::format_error(&err)),
            }
            std::process::exit(2);
        }
    }
}
