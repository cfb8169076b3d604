//! Fuzzer Configuration - Settings and profiles for fuzzing runs
//!
//! Provides configuration options for controlling fuzzing behavior,
//! including timeouts, workers, fuzzer selection, and profiles.

use std::time::Duration;

use super::limits::{FuzzerError, ResourceLimits};
use super::path::MAX_PATH_DEPTH;

/// Fuzzing configuration
#[derive(Debug, Clone)]
pub struct FuzzConfig {
    /// Timeout per request in milliseconds
    pub request_timeout_ms: u64,
    /// Number of units executed concurrently
    pub workers: usize,
    /// Coercion fuzzers expect rejection instead of acceptance
    pub strict_types: bool,
    /// Maximum named segments in a field path
    pub max_path_depth: usize,
    /// Random seed for reproducibility (None = random)
    pub seed: Option<u64>,
    /// Leave authentication headers alone
    pub skip_auth_headers: bool,
    /// Fuzzers to run (None = all)
    pub fuzzers: Option<Vec<String>>,
    /// Headers added to every request
    pub extra_headers: Vec<(String, String)>,
    /// Fuzzing profile
    pub profile: FuzzProfile,
    /// Resource limits for safety controls
    pub resource_limits: ResourceLimits,
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000,
            workers: 1,
            strict_types: false,
            max_path_depth: MAX_PATH_DEPTH,
            seed: None,
            skip_auth_headers: true,
            fuzzers: None,
            extra_headers: Vec::new(),
            profile: FuzzProfile::Standard,
            resource_limits: ResourceLimits::default(),
        }
    }
}

impl FuzzConfig {
    /// Create config with specific profile
    pub fn with_profile(profile: FuzzProfile) -> Self {
        let mut config = profile.default_config();
        config.profile = profile;
        config
    }

    /// Set number of workers
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.request_timeout_ms = timeout_ms;
        self
    }

    pub fn with_strict_types(mut self, strict: bool) -> Self {
        self.strict_types = strict;
        self
    }

    pub fn with_max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    /// Set random seed for reproducibility
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_skip_auth_headers(mut self, skip: bool) -> Self {
        self.skip_auth_headers = skip;
        self
    }

    /// Restrict the run to these fuzzers
    pub fn with_fuzzers(mut self, fuzzers: Option<Vec<String>>) -> Self {
        self.fuzzers = fuzzers;
        self
    }

    pub fn with_extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// Set resource limits
    pub fn with_resource_limits(mut self, limits: ResourceLimits) -> Self {
        self.resource_limits = limits;
        self
    }

    /// Set maximum run time
    pub fn with_max_time(mut self, duration: Duration) -> Self {
        self.resource_limits = self.resource_limits.with_max_time(duration);
        self
    }

    /// Set maximum number of requests
    pub fn with_max_requests(mut self, count: u64) -> Self {
        self.resource_limits = self.resource_limits.with_max_requests(count);
        self
    }

    /// Disable all resource limits
    pub fn with_unlimited_resources(mut self) -> Self {
        self.resource_limits = ResourceLimits::unlimited();
        self
    }

    /// Per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Reject settings the run cannot honor
    pub fn validate(&self) -> Result<(), FuzzerError> {
        if self.request_timeout_ms == 0 {
            return Err(FuzzerError::ZeroTimeout);
        }
        if self.max_path_depth == 0 {
            return Err(FuzzerError::ZeroPathDepth);
        }
        Ok(())
    }

    /// Whether a fuzzer is selected for this run
    pub fn selects(&self, fuzzer: &str) -> bool {
        self.fuzzers
            .as_ref()
            .map_or(true, |names| names.iter().any(|n| n == fuzzer))
    }
}

/// Parse a `NAME:VALUE` header argument
pub fn parse_header(raw: &str) -> Result<(String, String), FuzzerError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| FuzzerError::InvalidHeader(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(FuzzerError::InvalidHeader(raw.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Fuzzing profiles with different intensity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FuzzProfile {
    /// Quick run (core fuzzers only, short timeouts)
    Quick,
    /// Standard run (all fuzzers, sequential)
    #[default]
    Standard,
    /// Intensive run (all fuzzers, parallel, no time limit)
    Intensive,
    /// CI-optimized (fast feedback, deterministic seed)
    #[clap(name = "ci")]
    CI,
}

/// Fuzzers run by the quick profile
const QUICK_FUZZERS: &[&str] = &[
    "happy-path",
    "remove-fields",
    "boundary-values",
    "remove-headers",
];

impl FuzzProfile {
    /// Get default configuration for this profile
    pub fn default_config(&self) -> FuzzConfig {
        let base = FuzzConfig {
            profile: *self,
            ..FuzzConfig::default()
        };

        match self {
            FuzzProfile::Quick => FuzzConfig {
                request_timeout_ms: 3000,
                fuzzers: Some(QUICK_FUZZERS.iter().map(|s| s.to_string()).collect()),
                resource_limits: ResourceLimits::default().with_max_time(Duration::from_secs(120)),
                ..base
            },
            FuzzProfile::Standard => FuzzConfig {
                resource_limits: ResourceLimits::default().with_max_time(Duration::from_secs(600)),
                ..base
            },
            FuzzProfile::Intensive => FuzzConfig {
                request_timeout_ms: 10000,
                workers: 4,
                ..base
            },
            FuzzProfile::CI => FuzzConfig {
                request_timeout_ms: 2000,
                seed: Some(42), // Deterministic for CI
                resource_limits: ResourceLimits::default()
                    .with_max_time(Duration::from_secs(300))
                    .with_max_requests(5000),
                ..base
            },
        }
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FuzzProfile::Quick => "quick",
            FuzzProfile::Standard => "standard",
            FuzzProfile::Intensive => "intensive",
            FuzzProfile::CI => "ci",
        }
    }
}

impl std::fmt::Display for FuzzProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
