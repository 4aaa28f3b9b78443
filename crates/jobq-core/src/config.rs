use std::env;
use std::time::Duration;

/// Engine tuning knobs. Defaults follow the product constants; every
/// knob can be overridden through `JOBQ_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub page_size: u32,
    pub cache_ttl: Duration,
    pub cache_capacity: usize,
    pub fetch_timeout: Duration,
    pub max_saved_searches: usize,
    pub max_recent_searches: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 512,
            fetch_timeout: Duration::from_secs(10),
            max_saved_searches: 10,
            max_recent_searches: 5,
        }
    }
}

fn parse_env_u64(name: &str) -> Option<u64> {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            page_size: parse_env_u64("JOBQ_PAGE_SIZE")
                .map(|value| value as u32)
                .unwrap_or(defaults.page_size),
            cache_ttl: parse_env_u64("JOBQ_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            cache_capacity: parse_env_u64("JOBQ_CACHE_CAPACITY")
                .map(|value| value as usize)
                .unwrap_or(defaults.cache_capacity),
            fetch_timeout: parse_env_u64("JOBQ_FETCH_TIMEOUT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.fetch_timeout),
            max_saved_searches: parse_env_u64("JOBQ_MAX_SAVED_SEARCHES")
                .map(|value| value as usize)
                .unwrap_or(defaults.max_saved_searches),
            max_recent_searches: parse_env_u64("JOBQ_MAX_RECENT_SEARCHES")
                .map(|value| value as usize)
                .unwrap_or(defaults.max_recent_searches),
        }
    }
}
