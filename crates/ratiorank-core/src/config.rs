//! Collector configuration.
//!
//! Defaults can be overridden from the environment:
//!
//! | Variable | Default |
//! |----------|---------|
//! | `RATIORANK_MARKET_SUFFIX` | `.SA` |
//! | `RATIORANK_MAX_CONCURRENCY` | number of CPUs |
//! | `RATIORANK_TIMEOUT_MS` | `10000` |
//! | `RATIORANK_REQUESTS_PER_SECOND` | `5` |

use std::time::Duration;

use crate::{ConfigError, MarketSuffix};

pub const ENV_MARKET_SUFFIX: &str = "RATIORANK_MARKET_SUFFIX";
pub const ENV_MAX_CONCURRENCY: &str = "RATIORANK_MAX_CONCURRENCY";
pub const ENV_TIMEOUT_MS: &str = "RATIORANK_TIMEOUT_MS";
pub const ENV_REQUESTS_PER_SECOND: &str = "RATIORANK_REQUESTS_PER_SECOND";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUESTS_PER_SECOND: u32 = 5;

/// Settings for one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorConfig {
    pub market_suffix: MarketSuffix,
    /// Upper bound on in-flight provider requests. Always at least 1.
    pub max_concurrency: usize,
    pub request_timeout: Duration,
    pub requests_per_second: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            market_suffix: MarketSuffix::default(),
            max_concurrency: num_cpus::get().max(1),
            request_timeout: DEFAULT_TIMEOUT,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }
}

impl CollectorConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`CollectorConfig::from_env`] with an explicit variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_MARKET_SUFFIX) {
            config.market_suffix =
                MarketSuffix::parse(&value).map_err(|error| ConfigError::InvalidValue {
                    name: ENV_MARKET_SUFFIX,
                    value: value.clone(),
                    reason: error.to_string(),
                })?;
        }
        if let Some(value) = lookup(ENV_MAX_CONCURRENCY) {
            config.max_concurrency = parse_positive(ENV_MAX_CONCURRENCY, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            config.request_timeout =
                Duration::from_millis(parse_positive(ENV_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = lookup(ENV_REQUESTS_PER_SECOND) {
            config.requests_per_second = parse_positive(ENV_REQUESTS_PER_SECOND, &value)?;
        }

        Ok(config)
    }

    pub fn with_market_suffix(mut self, market_suffix: MarketSuffix) -> Self {
        self.market_suffix = market_suffix;
        self
    }

    /// Zero is clamped to one.
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Zero is clamped to one.
    pub fn with_requests_per_second(mut self, requests_per_second: u32) -> Self {
        self.requests_per_second = requests_per_second.max(1);
        self
    }
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let invalid = |reason: &str| ConfigError::InvalidValue {
        name,
        value: value.to_owned(),
        reason: reason.to_owned(),
    };

    let parsed = value
        .trim()
        .parse::<T>()
        .map_err(|_| invalid("expected a positive integer"))?;
    if parsed <= T::default() {
        return Err(invalid("must be greater than zero"));
    }
    Ok(parsed)
}
