//! Resource Limits - Safety controls for fuzzing runs
//!
//! Limits are checked between units, the same way cancellation is: a unit
//! that has started always runs to its verdict, but no new unit is scheduled
//! once a limit is exceeded.
//!
//! # Supported Limits
//!
//! - **Time**: Maximum wall-clock time for the run
//! - **Requests**: Maximum number of HTTP requests sent

use std::time::{Duration, Instant};

use serde::Serialize;

/// Resource limits for fuzzing runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum run time (None = unlimited)
    pub max_time: Option<Duration>,
    /// Maximum number of requests sent (None = unlimited)
    pub max_requests: Option<u64>,
}

impl ResourceLimits {
    /// Create unlimited resource limits
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Set maximum run time
    pub fn with_max_time(mut self, duration: Duration) -> Self {
        self.max_time = Some(duration);
        self
    }

    /// Set maximum requests
    pub fn with_max_requests(mut self, count: u64) -> Self {
        self.max_requests = Some(count);
        self
    }

    /// Check if any limits are configured
    pub fn has_limits(&self) -> bool {
        self.max_time.is_some() || self.max_requests.is_some()
    }

    /// Parse duration from human-readable string (e.g., "5m", "1h", "30s")
    pub fn parse_duration(s: &str) -> Result<Duration, ParseError> {
        let s = s.trim().to_lowercase();

        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        let (num_str, multiplier) = if let Some(num) = s.strip_suffix("ms") {
            (num, 1u64)
        } else if let Some(num) = s.strip_suffix('s') {
            (num, 1000u64)
        } else if let Some(num) = s.strip_suffix('m') {
            (num, 60 * 1000u64)
        } else if let Some(num) = s.strip_suffix('h') {
            (num, 60 * 60 * 1000u64)
        } else if s.ends_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(ParseError::UnknownUnit(s.clone()));
        } else {
            // Assume seconds if no unit
            (s.as_str(), 1000u64)
        };

        let num: u64 = num_str
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidNumber(num_str.to_string()))?;

        let millis = num
            .checked_mul(multiplier)
            .ok_or_else(|| ParseError::InvalidNumber(num_str.to_string()))?;
        Ok(Duration::from_millis(millis))
    }
}

/// Error parsing limit values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty value")]
    Empty,

    #[error("invalid number: '{0}'")]
    InvalidNumber(String),

    #[error("unknown unit: '{0}'")]
    UnknownUnit(String),
}

/// Errors in fuzzer configuration
#[derive(Debug, thiserror::Error)]
pub enum FuzzerError {
    /// Configuration parsing error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] ParseError),

    #[error("Request timeout must be greater than zero")]
    ZeroTimeout,

    #[error("Path depth limit must be at least 1")]
    ZeroPathDepth,

    #[error("Unknown fuzzer '{0}'")]
    UnknownFuzzer(String),

    #[error("Invalid header '{0}': expected NAME:VALUE")]
    InvalidHeader(String),
}

/// Counters checked against the limits
#[derive(Debug, Clone, Default)]
pub struct FuzzStats {
    /// Requests sent so far
    pub requests: u64,
}

/// Resource monitor that tracks usage and checks limits
pub struct ResourceMonitor {
    limits: ResourceLimits,
    start_time: Instant,
}

impl ResourceMonitor {
    /// Create a new resource monitor; the clock starts now
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            start_time: Instant::now(),
        }
    }

    /// Check if any limits have been exceeded
    pub fn check(&self, stats: &FuzzStats) -> Option<LimitExceeded> {
        if let Some(max_time) = self.limits.max_time {
            if self.start_time.elapsed() >= max_time {
                return Some(LimitExceeded::Time(max_time));
            }
        }

        if let Some(max_requests) = self.limits.max_requests {
            if stats.requests >= max_requests {
                return Some(LimitExceeded::Requests(max_requests));
            }
        }

        None
    }
}

/// A limit that stopped the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LimitExceeded {
    Time(Duration),
    Requests(u64),
}

impl std::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitExceeded::Time(d) => write!(f, "Time limit exceeded: {:?}", d),
            LimitExceeded::Requests(n) => write!(f, "Request limit exceeded: {} requests", n),
        }
    }
}

/// Why a run ended before every unit was executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    Limit(String),
}

impl From<LimitExceeded> for StopReason {
    fn from(exceeded: LimitExceeded) -> Self {
        Self::Limit(exceeded.to_string())
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Cancelled => write!(f, "cancelled"),
            StopReason::Limit(detail) => write!(f, "{}", detail),
        }
    }
}
