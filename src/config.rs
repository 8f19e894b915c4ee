use std::time::Duration;

use serde::Deserialize;

/// Construction surface for the shortener client. `base_url` has no default
/// and must be non-empty; validation happens when the client is built.
#[derive(Clone, Debug, Deserialize)]
pub struct ShortenerConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
}

impl ShortenerConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: default_timeout(),
            max_retries: default_max_retries(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_max_retries() -> usize {
    3
}
