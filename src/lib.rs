pub mod config;
pub mod errors;
pub mod models;
pub mod parsers;
pub mod services;
pub mod store;

use services::cache::ScopeCache;

/// Shared application state constructed once at process start and passed
/// by reference to the services that need it.
#[derive(Debug)]
pub struct AppState {
    pub config: config::AppConfig,
    pub existing_codes: ScopeCache,
}

impl AppState {
    pub fn new(config: config::AppConfig) -> Self {
        let existing_codes = ScopeCache::new(config.existing_cache_ttl);
        Self {
            config,
            existing_codes,
        }
    }
}
