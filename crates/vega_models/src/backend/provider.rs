//! The [`CompletionBackend`] trait for upstream providers.

use super::error::BackendError;
use super::types::BackendRequest;
use async_trait::async_trait;
use core::future::Future;

/// Trait implemented by transports that call an upstream provider.
///
/// Implementations return the raw response text. An empty string is a valid
/// return value; the router treats it as a failed attempt.
#[async_trait]
pub trait CompletionBackend: Send + Sync + 'static {
    /// Sends a completion request to the provider named in `request.provider`.
    ///
    /// # Arguments
    ///
    /// * `request` - Provider, model, conversation and per-call options
    async fn invoke(&self, request: BackendRequest) -> Result<String, BackendError>;
}

/// Adapts an async closure into a [`CompletionBackend`].
pub struct FnBackend<F> {
    call: F,
}

impl<F> core::fmt::Debug for FnBackend<F> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnBackend").finish_non_exhaustive()
    }
}

impl<F, Fut> FnBackend<F>
where
    F: Fn(BackendRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, BackendError>> + Send + 'static,
{
    /// Wraps `call` so it can be registered as a backend.
    #[must_use]
    pub fn new(call: F) -> Self {
        Self { call }
    }
}

#[async_trait]
impl<F, Fut> CompletionBackend for FnBackend<F>
where
    F: Fn(BackendRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, BackendError>> + Send + 'static,
{
    async fn invoke(&self, request: BackendRequest) -> Result<String, BackendError> {
        (self.call)(request).await
    }
}
