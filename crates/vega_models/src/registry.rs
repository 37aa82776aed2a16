//! Backend registry.

use crate::backend::CompletionBackend;
use crate::error::RegistryError;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry mapping provider identifiers to [`CompletionBackend`] implementations.
///
/// A single transport commonly fronts many providers (one client that takes the
/// provider name as a parameter). Such a transport can be installed once as the
/// [fallback](Self::with_fallback) instead of being registered under every name.
///
/// ```
/// # use std::sync::Arc;
/// # use vega_models::BackendRegistry;
/// # use vega_models::backend::{BackendRequest, FnBackend};
/// let shared = Arc::new(FnBackend::new(|request: BackendRequest| async move {
///     Ok(format!("answered by {}", request.provider))
/// }));
///
/// let registry = BackendRegistry::new().with_fallback(shared);
/// assert!(registry.resolve("Blackbox").is_ok());
/// ```
#[derive(Default)]
pub struct BackendRegistry {
    // Maps provider identifiers to implementations.
    backends: HashMap<String, Arc<dyn CompletionBackend>>,
    // Used for any identifier without a dedicated entry.
    fallback: Option<Arc<dyn CompletionBackend>>,
}

impl core::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("backends", &self.names())
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl BackendRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
            fallback: None,
        }
    }

    /// Sets the backend used for identifiers without a dedicated registration.
    #[must_use]
    pub fn with_fallback<B: CompletionBackend>(mut self, backend: Arc<B>) -> Self {
        self.set_fallback(backend);
        self
    }

    /// Sets the backend used for identifiers without a dedicated registration.
    pub fn set_fallback<B: CompletionBackend>(&mut self, backend: Arc<B>) {
        self.fallback = Some(backend as Arc<dyn CompletionBackend>);
    }

    /// Registers a backend for a provider identifier.
    ///
    /// # Arguments
    ///
    /// * `name` - Provider identifier as it appears in the catalog (e.g., `"Blackbox"`)
    /// * `backend` - The backend implementation
    ///
    /// # Panics
    ///
    /// Panics if a backend with the same name is already registered.
    pub fn register<B: CompletionBackend>(&mut self, name: impl Into<String>, backend: Arc<B>) {
        let name = name.into();
        assert!(
            !self.backends.contains_key(&name),
            "backend '{name}' is already registered"
        );
        self.backends
            .insert(name, backend as Arc<dyn CompletionBackend>);
    }

    /// Returns the backend serving `name`, falling back to the shared backend if one is set.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownProvider`] if nothing can serve the identifier.
    pub fn resolve(&self, name: impl AsRef<str>) -> Result<Arc<dyn CompletionBackend>, RegistryError> {
        let name = name.as_ref();
        self.backends
            .get(name)
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProvider(name.to_string()))
    }

    /// Checks if a dedicated backend is registered for `name`.
    #[must_use]
    pub fn has(&self, name: impl AsRef<str>) -> bool {
        self.backends.contains_key(name.as_ref())
    }

    /// Lists identifiers with a dedicated registration, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, BackendRequest};
    use async_trait::async_trait;

    struct Echo(&'static str);

    #[async_trait]
    impl CompletionBackend for Echo {
        async fn invoke(&self, _request: BackendRequest) -> Result<String, BackendError> {
            Ok(self.0.to_string())
        }
    }

    fn echo(tag: &'static str) -> Arc<Echo> {
        Arc::new(Echo(tag))
    }

    #[tokio::test]
    async fn resolves_registered_backend() {
        let mut registry = BackendRegistry::new();
        registry.register("Chatai", echo("chatai"));

        let backend = registry.resolve("Chatai").unwrap();
        let reply = backend
            .invoke(BackendRequest::new("Chatai", "gpt-4"))
            .await
            .unwrap();
        assert_eq!(reply, "chatai");
    }

    #[test]
    fn unknown_provider_without_fallback() {
        let registry = BackendRegistry::new();
        let err = registry.resolve("Nope").err().unwrap();
        assert!(matches!(err, RegistryError::UnknownProvider(ref name) if name == "Nope"));
        assert_eq!(err.to_string(), "unknown provider: Nope");
    }

    #[tokio::test]
    async fn dedicated_registration_wins_over_fallback() {
        let mut registry = BackendRegistry::new().with_fallback(echo("shared"));
        registry.register("Blackbox", echo("blackbox"));

        let dedicated = registry.resolve("Blackbox").unwrap();
        let shared = registry.resolve("Yqcloud").unwrap();

        let request = BackendRequest::new("x", "gpt-4");
        assert_eq!(dedicated.invoke(request.clone()).await.unwrap(), "blackbox");
        assert_eq!(shared.invoke(request).await.unwrap(), "shared");
        assert!(!registry.has("Yqcloud"));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = BackendRegistry::new();
        registry.register("Chatai", echo("a"));
        registry.register("Chatai", echo("b"));
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = BackendRegistry::new();
        registry.register("Yqcloud", echo("y"));
        registry.register("Blackbox", echo("b"));
        assert_eq!(registry.names(), vec!["Blackbox", "Yqcloud"]);
    }
}
