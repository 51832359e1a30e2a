//! Executor configuration.

use std::time::Duration;

/// Environment variable read by `ExecutorConfig::from_env`.
pub const WAIT_TIMEOUT_ENV: &str = "FANOUT_WAIT_TIMEOUT_MS";

/// Knobs for `ParallelExecutor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound for one blocking wait in the drive loop. Waits return
    /// earlier as soon as any call has activity. Defaults to 1s.
    pub wait_timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            wait_timeout: Duration::from_secs(1),
        }
    }
}

impl ExecutorConfig {
    /// Default configuration, with `wait_timeout` taken from
    /// `FANOUT_WAIT_TIMEOUT_MS` when it holds a positive integer.
    pub fn from_env() -> Self {
        Self::from_wait_timeout_var(std::env::var(WAIT_TIMEOUT_ENV).ok().as_deref())
    }

    fn from_wait_timeout_var(value: Option<&str>) -> Self {
        let mut config = Self::default();
        match value.map(|v| v.trim().parse::<u64>()) {
            Some(Ok(ms)) if ms > 0 => config.wait_timeout = Duration::from_millis(ms),
            Some(_) => log::warn!(
                "ignoring {WAIT_TIMEOUT_ENV}={:?}: expected a positive integer",
                value.unwrap_or_default()
            ),
            None => {}
        }
        config
    }

    pub fn with_wait_timeout(mut self, wait_timeout: Duration) -> Self {
        self.wait_timeout = wait_timeout;
        self
    }
}
