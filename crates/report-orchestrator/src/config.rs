use std::time::Duration;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Bounded ticker-resolution cache settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickerCacheConfig {
    pub ttl: Duration,
    pub capacity: usize,
}

/// Request pipeline settings
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Fiscal years fetched per entity
    pub years: usize,
    /// Max entities resolved and fetched at once
    pub concurrency: usize,
    /// Deadline for one entity's resolve + fetch
    pub entity_timeout: Duration,
    /// `None` disables ticker caching
    pub ticker_cache: Option<TickerCacheConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            years: 3,
            concurrency: 4,
            entity_timeout: Duration::from_secs(30),
            ticker_cache: None,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cache_ttl: u64 = env_or("TICKER_CACHE_TTL_SECS", 0);
        let ticker_cache = (cache_ttl > 0).then(|| TickerCacheConfig {
            ttl: Duration::from_secs(cache_ttl),
            capacity: env_or("TICKER_CACHE_CAPACITY", 256usize).max(1),
        });

        Self {
            years: env_or("PIPELINE_YEARS", defaults.years).max(1),
            concurrency: env_or("PIPELINE_CONCURRENCY", defaults.concurrency).max(1),
            entity_timeout: Duration::from_secs(env_or(
                "PIPELINE_ENTITY_TIMEOUT_SECS",
                defaults.entity_timeout.as_secs(),
            )),
            ticker_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.years, 3);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.entity_timeout, Duration::from_secs(30));
        assert!(config.ticker_cache.is_none());
    }
}
