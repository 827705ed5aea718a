use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// How long the breaker stays open before a trial request is let through. Also
    /// bounds how long one trial may hold the half-open slot.
    pub open_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed,
    Open { since: Instant },
    /// `trial` is when the outstanding trial request was admitted, if any.
    HalfOpen { trial: Option<Instant> },
}

#[derive(Debug)]
struct Breaker {
    phase: Phase,
    consecutive_failures: u32,
}

/// Circuit breaker shared by every collector task of one adapter.
///
/// While open, calls fail fast. Once `open_timeout` has elapsed exactly one
/// caller is admitted as a trial; everyone else keeps failing fast until the
/// trial reports back. A trial that never reports (its task was cancelled by
/// a timeout) releases the slot after another `open_timeout`.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<Breaker>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Breaker {
                phase: Phase::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Breaker> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the caller may send a request now. A `true` while half-open
    /// makes the caller the trial request; it must report with `record_success` or
    /// `record_failure`.
    pub fn allow_request(&self) -> bool {
        let mut breaker = self.lock();
        let now = Instant::now();
        let timeout = self.config.open_timeout;

        match breaker.phase {
            Phase::Closed => true,
            Phase::Open { since } if now.duration_since(since) >= timeout => {
                tracing::debug!("provider circuit breaker half-open; admitting trial request");
                breaker.phase = Phase::HalfOpen { trial: Some(now) };
                true
            }
            Phase::Open { .. } => false,
            Phase::HalfOpen { trial: Some(admitted) }
                if now.duration_since(admitted) < timeout =>
            {
                false
            }
            Phase::HalfOpen { .. } => {
                breaker.phase = Phase::HalfOpen { trial: Some(now) };
                true
            }
        }
    }

    pub fn record_success(&self) {
        let mut breaker = self.lock();
        if !matches!(breaker.phase, Phase::Closed) {
            tracing::info!("provider circuit breaker closed");
        }
        breaker.phase = Phase::Closed;
        breaker.consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut breaker = self.lock();
        breaker.consecutive_failures = breaker.consecutive_failures.saturating_add(1);

        let trips = match breaker.phase {
            Phase::HalfOpen { .. } => true,
            Phase::Closed => breaker.consecutive_failures >= self.config.failure_threshold,
            Phase::Open { .. } => false,
        };
        if trips {
            tracing::warn!(
                failures = breaker.consecutive_failures,
                "provider circuit breaker opened"
            );
            breaker.phase = Phase::Open {
                since: Instant::now(),
            };
        }
    }

    pub fn state(&self) -> CircuitState {
        match self.lock().phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }
}
