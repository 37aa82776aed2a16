//! Process-wide router state.

use hashbrown::HashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug)]
struct Inner {
    preferred: String,
    successes: HashMap<String, u64>,
}

/// State shared by every request served by a router.
///
/// Holds the preferred starting provider, per-provider success counters and
/// the proxy switch. Share it through an `Arc`. The mutex is never held
/// across an `.await`.
#[derive(Debug)]
pub struct RouterState {
    inner: Mutex<Inner>,
    proxy_enabled: AtomicBool,
}

impl RouterState {
    /// Creates state that starts routing at `preferred`, with the proxy off.
    #[must_use]
    pub fn new(preferred: impl Into<String>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                preferred: preferred.into(),
                successes: HashMap::new(),
            }),
            proxy_enabled: AtomicBool::new(false),
        }
    }

    /// The provider new plans start from.
    #[must_use]
    pub fn preferred_provider(&self) -> String {
        self.inner.lock().preferred.clone()
    }

    /// Replaces the preferred provider. Callers validate the identity.
    pub fn set_preferred_provider(&self, provider: impl Into<String>) {
        self.inner.lock().preferred = provider.into();
    }

    /// Records a success: bumps the provider's counter and makes it preferred.
    ///
    /// Both updates happen in one critical section. Concurrent successes never
    /// lose a count; the last writer decides the preferred provider.
    pub fn record_success(&self, provider: &str) -> u64 {
        let mut inner = self.inner.lock();
        let count = inner.successes.entry(provider.to_string()).or_insert(0);
        *count += 1;
        let count = *count;
        inner.preferred = provider.to_string();
        count
    }

    /// Successes recorded for `provider`.
    #[must_use]
    pub fn success_count(&self, provider: &str) -> u64 {
        self.inner.lock().successes.get(provider).copied().unwrap_or(0)
    }

    /// All success counters, sorted by provider.
    #[must_use]
    pub fn usage_snapshot(&self) -> BTreeMap<String, u64> {
        self.inner
            .lock()
            .successes
            .iter()
            .map(|(name, count)| (name.clone(), *count))
            .collect()
    }

    /// Whether the proxy may be used.
    #[must_use]
    pub fn proxy_enabled(&self) -> bool {
        self.proxy_enabled.load(Ordering::Relaxed)
    }

    /// Turns the proxy on or off.
    pub fn set_proxy_enabled(&self, enabled: bool) {
        self.proxy_enabled.store(enabled, Ordering::Relaxed);
    }

    /// Flips the proxy switch and returns the new setting.
    pub fn toggle_proxy(&self) -> bool {
        !self.proxy_enabled.fetch_xor(true, Ordering::Relaxed)
    }
}

impl Default for RouterState {
    fn default() -> Self {
        Self::new("Chatai")
    }
}
