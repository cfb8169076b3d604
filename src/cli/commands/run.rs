//! Run command - Fuzz a service against its contract

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::OutputFormat;
use contractfuzz::contract::Contract;
use contractfuzz::errors::ContractError;
use contractfuzz::fuzzer::config::parse_header;
use contractfuzz::fuzzer::limits::ResourceLimits;
use contractfuzz::fuzzer::{suite, FuzzConfig, FuzzEngine, FuzzProfile, FuzzResults};
use contractfuzz::reporter::junit::generate_junit;
use contractfuzz::transport::ReqwestTransport;

/// Arguments for the run command
pub struct RunArgs {
    /// Contract file
    pub contract: PathBuf,
    /// Base URL of the service under test
    pub server: String,
    /// Fuzzing options
    pub options: RunOptions,
    /// Output format
    pub format: OutputFormat,
    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
    /// Show a progress bar
    pub progress: bool,
}

/// Fuzzing options layered over the profile defaults
#[derive(Debug, Default)]
pub struct RunOptions {
    pub profile: FuzzProfile,
    pub fuzzers: Option<Vec<String>>,
    pub workers: Option<usize>,
    /// Per-request timeout in milliseconds
    pub timeout: Option<u64>,
    pub strict_types: bool,
    /// Extra `NAME:VALUE` headers
    pub headers: Vec<String>,
    pub seed: Option<u64>,
    /// Maximum time (e.g., "5m")
    pub max_time: Option<String>,
    pub max_requests: Option<u64>,
    /// Disable all resource limits
    pub no_limits: bool,
    /// Fuzz authentication headers too
    pub include_auth_headers: bool,
}

impl RunOptions {
    /// Build the run configuration from the profile plus overrides
    pub fn to_config(&self) -> Result<FuzzConfig> {
        let mut config = FuzzConfig::with_profile(self.profile);

        if let Some(workers) = self.workers {
            config = config.with_workers(workers);
        }
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        if self.strict_types {
            config = config.with_strict_types(true);
        }
        if self.include_auth_headers {
            config = config.with_skip_auth_headers(false);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(names) = &self.fuzzers {
            let known = suite::names();
            if let Some(unknown) = names.iter().find(|n| !known.contains(&n.as_str())) {
                return Err(ContractError::unknown_fuzzer(unknown.clone(), &known).into());
            }
            config = config.with_fuzzers(Some(names.clone()));
        }
        for raw in &self.headers {
            let (name, value) = parse_header(raw)?;
            config = config.with_extra_header(name, value);
        }

        if self.no_limits {
            config = config.with_unlimited_resources();
        } else {
            if let Some(raw) = &self.max_time {
                let duration = ResourceLimits::parse_duration(raw)
                    .map_err(|e| anyhow::anyhow!("Invalid --max-time value: {}", e))?;
                config = config.with_max_time(duration);
            }
            if let Some(count) = self.max_requests {
                config = config.with_max_requests(count);
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Run the fuzzing command; returns whether any unit failed
pub async fn run(args: RunArgs, cancel: CancellationToken) -> Result<bool> {
    let RunArgs {
        contract,
        server,
        options,
        format,
        output,
        progress,
    } = args;

    info!("Fuzzing {} against {}", server, contract.display());
    let config = options.to_config()?;
    debug!(
        "Profile: {}, Workers: {}, Timeout: {}ms, Seed: {:?}, Fuzzers: {:?}",
        config.profile, config.workers, config.request_timeout_ms, config.seed, config.fuzzers
    );

    let contract = Contract::load(&contract)?;
    let transport = Arc::new(ReqwestTransport::new(&server)?);

    if format == OutputFormat::Text {
        println!("{}", "Starting fuzzing run...".cyan());
        println!("  Server: {}", server.yellow());
        println!("  Operations: {}", contract.operations.len());
        println!("  Profile: {}", config.profile.to_string().cyan());
        println!("  Workers: {}", config.workers);
        if let Some(seed) = config.seed {
            println!("  Seed: {}", seed);
        }
        if let Some(t) = config.resource_limits.max_time {
            println!("  Max time: {}s", t.as_secs());
        }
        if let Some(r) = config.resource_limits.max_requests {
            println!("  Max requests: {}", r);
        }
        println!();
    }

    let results = FuzzEngine::new(contract, transport, config)
        .with_target(server)
        .with_cancellation(cancel)
        .with_progress(progress)
        .run()
        .await?;

    if let Some(reason) = &results.stop_reason {
        warn!("Run stopped early: {}", reason);
    }

    emit(&results, format, output.as_ref())?;
    Ok(results.has_failures())
}

fn emit(results: &FuzzResults, format: OutputFormat, output: Option<&PathBuf>) -> Result<()> {
    let rendered = match format {
        OutputFormat::Text => {
            if output.is_none() {
                results.print_text();
                return Ok(());
            }
            results.to_json()?
        }
        OutputFormat::Json => results.to_json()?,
        OutputFormat::Junit => generate_junit(results),
    };

    match output {
        Some(path) => {
            std::fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}
