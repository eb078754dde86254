//! Response cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_RESPONSE_LIMIT: usize = 200;
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve public pages from the in-process response cache and run
    /// revalidation hooks against it.
    pub enable_response_cache: bool,
    /// Maximum number of rendered responses kept in memory.
    pub response_limit: usize,
    /// Responses with larger bodies are passed through uncached.
    pub max_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enable_response_cache: true,
            response_limit: DEFAULT_RESPONSE_LIMIT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enable_response_cache: settings.enable_response_cache,
            response_limit: settings.response_limit.get() as usize,
            max_body_bytes: settings.max_body_bytes.get() as usize,
        }
    }
}

impl CacheConfig {
    pub fn is_enabled(&self) -> bool {
        self.enable_response_cache
    }

    /// Response limit as NonZeroUsize, clamping to 1 if zero.
    pub fn response_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.response_limit).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn disabled() -> Self {
        Self {
            enable_response_cache: false,
            ..Self::default()
        }
    }
}
