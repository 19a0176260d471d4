//! Worker configuration.

use std::time::Duration;

/// Settings for an in-process worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name used in logs
    pub name: String,
    /// Bound of the job channel; `enqueue` waits when it is full
    pub capacity: usize,
    pub retry_policy: RetryPolicy,
}

impl WorkerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: "worker".to_string(),
            capacity: 1024,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// How transient failures are retried.
///
/// The attempt limit itself comes from [`Job::max_retries`](crate::Job::max_retries).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            backoff: BackoffStrategy::Exponential {
                base: Duration::from_secs(1),
                max: Duration::from_secs(30),
            },
        }
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone)]
pub enum BackoffStrategy {
    /// Fixed delay between retries
    Fixed(Duration),

    /// base * 2^retry_count, capped at max
    Exponential { base: Duration, max: Duration },

    /// base * (retry_count + 1), capped at max
    Linear { base: Duration, max: Duration },
}

impl BackoffStrategy {
    /// Delay before the attempt following `retry_count` failures.
    pub fn delay(&self, retry_count: u32) -> Duration {
        match self {
            BackoffStrategy::Fixed(d) => *d,
            BackoffStrategy::Exponential { base, max } => base
                .saturating_mul(2u32.saturating_pow(retry_count))
                .min(*max),
            BackoffStrategy::Linear { base, max } => {
                base.saturating_mul(retry_count.saturating_add(1)).min(*max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = BackoffStrategy::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(30),
        };
        assert_eq!(backoff.delay(0), Duration::from_secs(1));
        assert_eq!(backoff.delay(3), Duration::from_secs(8));
        assert_eq!(backoff.delay(10), Duration::from_secs(30));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_linear_and_fixed_backoff() {
        let linear = BackoffStrategy::Linear {
            base: Duration::from_millis(100),
            max: Duration::from_millis(250),
        };
        assert_eq!(linear.delay(0), Duration::from_millis(100));
        assert_eq!(linear.delay(5), Duration::from_millis(250));
        assert_eq!(
            BackoffStrategy::Fixed(Duration::from_millis(5)).delay(7),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn test_worker_config_capacity_floor() {
        let config = WorkerConfig::new("reset_password").with_capacity(0);
        assert_eq!(config.capacity, 1);
        assert_eq!(config.name, "reset_password");
    }
}
