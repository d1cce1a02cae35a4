use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
///
/// Every field has a default matching the storage provider's documented
/// limits, so `from_env` never fails; variables only override.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Records per batched write. Provider ceiling is 500 operations.
    pub batch_size: usize,
    /// Delay before the second and later batches, in milliseconds.
    pub batch_delay_ms: u64,
    /// Delay growth per completed batch, in milliseconds.
    pub batch_delay_step_ms: u64,
    /// Upper bound on the inter-batch delay, in milliseconds.
    pub batch_delay_max_ms: u64,
    /// Maximum previously stored records fetched per existing-key lookup.
    pub existing_fetch_limit: usize,
    /// Freshness window for cached existing-key sets.
    pub existing_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            batch_size: env::var("FASTNETLITE_BATCH_SIZE")
                .unwrap_or_else(|_| "500".to_string())
                .parse()
                .unwrap_or(500),
            batch_delay_ms: env::var("FASTNETLITE_BATCH_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            batch_delay_step_ms: env::var("FASTNETLITE_BATCH_DELAY_STEP_MS")
                .unwrap_or_else(|_| "200".to_string())
                .parse()
                .unwrap_or(200),
            batch_delay_max_ms: env::var("FASTNETLITE_BATCH_DELAY_MAX_MS")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),
            existing_fetch_limit: env::var("FASTNETLITE_EXISTING_FETCH_LIMIT")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
            existing_cache_ttl: Duration::from_secs(
                env::var("FASTNETLITE_EXISTING_CACHE_TTL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
            ),
        }
    }

    /// Delay to wait after `completed` batches have committed.
    pub fn batch_delay(&self, completed: usize) -> Duration {
        let grown = self
            .batch_delay_ms
            .saturating_add(self.batch_delay_step_ms * (completed.saturating_sub(1)) as u64);
        Duration::from_millis(grown.min(self.batch_delay_max_ms))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            batch_delay_ms: 1000,
            batch_delay_step_ms: 200,
            batch_delay_max_ms: 3000,
            existing_fetch_limit: 1000,
            existing_cache_ttl: Duration::from_secs(60),
        }
    }
}
