use std::time::Duration;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderOptions {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Total number of attempts per operation, including the first one.
    ///
    /// Values below 1 behave like 1.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds; doubles on every retry.
    pub initial_backoff_ms: u64,
}

impl ProviderOptions {
    pub(crate) fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub(crate) fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_retries: 3,
            initial_backoff_ms: 300,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ProviderOptions;

    #[test]
    fn defaults_match_documented_values() {
        let options = ProviderOptions::default();
        assert_eq!(options.timeout_ms, 5_000);
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.initial_backoff_ms, 300);
    }
}
