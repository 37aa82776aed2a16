//! Router configuration.

use crate::plan::{DEFAULT_CYCLE_COUNT, DEFAULT_PLAN_CAP};
use core::time::Duration;

/// Error reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used.
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
}

/// Tunables for chat and image routing.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use vega_router::RouterConfig;
///
/// let config = RouterConfig::default()
///     .with_request_timeout(Duration::from_secs(30))
///     .with_proxy("http://127.0.0.1:8080");
///
/// assert_eq!(config.cycle_count, 3);
/// assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:8080"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Passes over the candidate list.
    pub cycle_count: usize,
    /// Upper bound on plan length.
    pub plan_cap: usize,
    /// Per-attempt bound for chat requests.
    pub request_timeout: Duration,
    /// Per-attempt bound for image generation.
    pub image_timeout: Duration,
    /// Outbound proxy, used only while the proxy switch is on.
    pub proxy: Option<String>,
    /// Failed invocations within one call before the proxy is attached.
    pub proxy_after_failures: usize,
    /// Pause after a network failure.
    pub network_pause: Duration,
    /// Most history messages forwarded to a provider.
    pub max_history_messages: usize,
    /// Most history characters forwarded to a provider.
    pub max_history_chars: usize,
    /// Passes over the image-generation providers.
    pub image_passes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            cycle_count: DEFAULT_CYCLE_COUNT,
            plan_cap: DEFAULT_PLAN_CAP,
            request_timeout: Duration::from_secs(120),
            image_timeout: Duration::from_secs(60),
            proxy: None,
            proxy_after_failures: 3,
            network_pause: Duration::from_millis(100),
            max_history_messages: 100,
            max_history_chars: 50_000,
            image_passes: 2,
        }
    }
}

impl RouterConfig {
    /// Sets the number of passes over the candidate list.
    #[must_use]
    pub fn with_cycle_count(mut self, cycles: usize) -> Self {
        self.cycle_count = cycles;
        self
    }

    /// Sets the upper bound on plan length.
    #[must_use]
    pub fn with_plan_cap(mut self, cap: usize) -> Self {
        self.plan_cap = cap;
        self
    }

    /// Sets the per-attempt timeout for chat requests.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the per-attempt timeout for image generation.
    #[must_use]
    pub fn with_image_timeout(mut self, timeout: Duration) -> Self {
        self.image_timeout = timeout;
        self
    }

    /// Sets the outbound proxy address.
    #[must_use]
    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Sets how many failed invocations precede proxy use.
    #[must_use]
    pub fn with_proxy_after_failures(mut self, failures: usize) -> Self {
        self.proxy_after_failures = failures;
        self
    }

    /// Sets the pause after network failures.
    #[must_use]
    pub fn with_network_pause(mut self, pause: Duration) -> Self {
        self.network_pause = pause;
        self
    }

    /// Sets the history budget forwarded to providers.
    #[must_use]
    pub fn with_history_limits(mut self, max_messages: usize, max_chars: usize) -> Self {
        self.max_history_messages = max_messages;
        self.max_history_chars = max_chars;
        self
    }

    /// Sets the number of passes over image-generation providers.
    #[must_use]
    pub fn with_image_passes(mut self, passes: usize) -> Self {
        self.image_passes = passes;
        self
    }

    /// Reads overrides from `VEGA_*` environment variables on top of the defaults.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `VEGA_CYCLE_COUNT` | `cycle_count` |
    /// | `VEGA_PLAN_CAP` | `plan_cap` |
    /// | `VEGA_REQUEST_TIMEOUT_SECS` | `request_timeout` |
    /// | `VEGA_IMAGE_TIMEOUT_SECS` | `image_timeout` |
    /// | `VEGA_PROXY` | `proxy` |
    /// | `VEGA_PROXY_AFTER_FAILURES` | `proxy_after_failures` |
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to something unusable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a variable is set to something unusable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(cycles) = positive(&lookup, "VEGA_CYCLE_COUNT")? {
            config.cycle_count = cycles;
        }
        if let Some(cap) = positive(&lookup, "VEGA_PLAN_CAP")? {
            config.plan_cap = cap;
        }
        if let Some(secs) = positive(&lookup, "VEGA_REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(secs) = positive(&lookup, "VEGA_IMAGE_TIMEOUT_SECS")? {
            config.image_timeout = Duration::from_secs(secs as u64);
        }
        if let Some(failures) = number(&lookup, "VEGA_PROXY_AFTER_FAILURES")? {
            config.proxy_after_failures = failures;
        }
        if let Some(proxy) = lookup("VEGA_PROXY") {
            let proxy = proxy.trim();
            if !proxy.is_empty() {
                if !proxy.contains("://") {
                    return Err(ConfigError::Invalid {
                        var: "VEGA_PROXY",
                        value: proxy.to_string(),
                        reason: "expected a URL such as http://host:port",
                    });
                }
                config.proxy = Some(proxy.to_string());
            }
        }

        Ok(config)
    }
}

fn number(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<usize>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            var,
            value: raw,
            reason: "expected a non-negative integer",
        })
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<usize>, ConfigError> {
    match number(lookup, var)? {
        Some(0) => Err(ConfigError::Invalid {
            var,
            value: "0".to_string(),
            reason: "expected a positive integer",
        }),
        other => Ok(other),
    }
}
