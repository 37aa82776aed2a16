//! Outward-facing facade over the chat and image routers.

use crate::catalog::ProviderCatalog;
use crate::config::RouterConfig;
use crate::image::ImageRouter;
use crate::request::{CompletionRequest, trim_history};
use crate::result::{Completion, GeneratedImage, ImageError, RouteError};
use crate::router::FailoverRouter;
use crate::state::RouterState;
use crate::store::{ConversationStore, ExchangeRecord, StoreError};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use vega_core::Clock;
use vega_models::BackendRegistry;
use vega_models::backend::ImageAttachment;

/// Error from a store-backed chat turn.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Reading or writing the conversation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No provider answered.
    #[error(transparent)]
    Route(#[from] RouteError),
}

impl ServiceError {
    /// Text suitable for showing to the end user.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Store(_) => "Sorry, the conversation could not be loaded. Please try again later.",
            Self::Route(err) => err.user_message(),
        }
    }
}

/// Snapshot of routing configuration and usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Provider new requests start from.
    pub current_provider: String,
    /// Model used in automatic mode.
    pub default_model: String,
    /// Whether the proxy switch is on.
    pub proxy_enabled: bool,
    /// Whether a proxy address is configured.
    pub proxy_configured: bool,
    /// Size of the fast tier.
    pub fast_count: usize,
    /// Size of the medium tier.
    pub medium_count: usize,
    /// Size of the slow tier.
    pub slow_count: usize,
    /// Number of distinct tiered providers.
    pub total_count: usize,
    /// Providers able to read images.
    pub vision_providers: Vec<String>,
    /// Providers known not to read images.
    pub no_vision_providers: Vec<String>,
    /// Providers able to generate images.
    pub image_providers: Vec<String>,
    /// Successes per provider.
    pub usage: BTreeMap<String, u64>,
    /// Every tiered provider in routing order.
    pub all_providers: Vec<String>,
}

/// Chat and image routing behind one handle.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vega_router::{ChatService, CompletionRequest, ProviderCatalog, RouterConfig};
/// use vega_models::BackendRegistry;
/// use vega_models::backend::{BackendRequest, FnBackend};
///
/// let backends = BackendRegistry::new().with_fallback(Arc::new(FnBackend::new(
///     |request: BackendRequest| async move { Ok(format!("hello from {}", request.provider)) },
/// )));
/// let service = ChatService::new(ProviderCatalog::default(), backends, RouterConfig::default());
///
/// let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
/// let completion = runtime
///     .block_on(service.route_chat(CompletionRequest::new("hi")))
///     .unwrap();
/// assert_eq!(completion.provider, "Chatai");
/// ```
#[derive(Debug)]
pub struct ChatService {
    router: FailoverRouter,
    images: ImageRouter,
}

impl ChatService {
    /// Creates a service whose state starts at the catalog's default provider.
    #[must_use]
    pub fn new(catalog: ProviderCatalog, backends: BackendRegistry, config: RouterConfig) -> Self {
        let state = Arc::new(RouterState::new(catalog.default_provider.as_str()));
        Self::from_parts(Arc::new(catalog), Arc::new(backends), state, config)
    }

    /// Creates a service from shared parts.
    #[must_use]
    pub fn from_parts(
        catalog: Arc<ProviderCatalog>,
        backends: Arc<BackendRegistry>,
        state: Arc<RouterState>,
        config: RouterConfig,
    ) -> Self {
        let images = ImageRouter::new(Arc::clone(&catalog), Arc::clone(&backends), config.clone());
        let router = FailoverRouter::new(catalog, backends, state, config);
        Self { router, images }
    }

    /// Replaces the clock of both routers.
    #[must_use]
    pub fn with_clock(self, clock: Clock) -> Self {
        Self {
            router: self.router.with_clock(clock.clone()),
            images: self.images.with_clock(clock),
        }
    }

    /// The chat router.
    #[must_use]
    pub fn router(&self) -> &FailoverRouter {
        &self.router
    }

    /// The image router.
    #[must_use]
    pub fn images(&self) -> &ImageRouter {
        &self.images
    }

    /// The shared router state.
    #[must_use]
    pub fn state(&self) -> &Arc<RouterState> {
        self.router.state()
    }

    /// Routes a chat request, starting at the preferred provider.
    ///
    /// History beyond the configured budget is trimmed, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] if no provider answered.
    pub async fn route_chat(&self, mut request: CompletionRequest) -> Result<Completion, RouteError> {
        let config = self.router.config();
        request.history = trim_history(
            core::mem::take(&mut request.history),
            config.max_history_messages,
            config.max_history_chars,
        );
        let start = self.state().preferred_provider();
        self.router.complete(&request, Some(start.as_str())).await
    }

    /// Generates an image, optionally on a specific provider.
    ///
    /// # Errors
    ///
    /// See [`ImageRouter::generate_image`].
    pub async fn route_image_generation(
        &self,
        prompt: &str,
        provider: Option<&str>,
    ) -> Result<GeneratedImage, ImageError> {
        self.images.generate_image(prompt, provider).await
    }

    /// Current routing configuration and usage.
    #[must_use]
    pub fn provider_info(&self) -> ProviderInfo {
        let catalog = self.router.catalog();
        let state = self.state();
        let all_providers = catalog.all_providers();
        ProviderInfo {
            current_provider: state.preferred_provider(),
            default_model: catalog.default_model.clone(),
            proxy_enabled: state.proxy_enabled(),
            proxy_configured: self.router.config().proxy.is_some(),
            fast_count: catalog.fast.len(),
            medium_count: catalog.medium.len(),
            slow_count: catalog.slow.len(),
            total_count: all_providers.len(),
            vision_providers: catalog.vision().to_vec(),
            no_vision_providers: catalog.no_vision().to_vec(),
            image_providers: catalog.image_generation().to_vec(),
            usage: state.usage_snapshot(),
            all_providers,
        }
    }

    /// Makes `provider` the preferred starting provider.
    ///
    /// Returns `false` and changes nothing if `provider` is not in the catalog.
    pub fn set_preferred_provider(&self, provider: &str) -> bool {
        if !self.router.catalog().all_providers().iter().any(|name| name == provider) {
            tracing::warn!(provider, "refusing to prefer unknown provider");
            return false;
        }
        self.state().set_preferred_provider(provider);
        tracing::info!(provider, "preferred provider changed");
        true
    }

    /// Turns the proxy on or off.
    pub fn set_proxy_enabled(&self, enabled: bool) {
        self.state().set_proxy_enabled(enabled);
        tracing::info!(enabled, "proxy switch set");
    }

    /// Flips the proxy switch and returns the new setting.
    pub fn toggle_proxy(&self) -> bool {
        let enabled = self.state().toggle_proxy();
        tracing::info!(enabled, "proxy switch toggled");
        enabled
    }

    /// Runs one stored chat turn.
    ///
    /// Loads the session history, records the user message, routes the
    /// request and records the reply.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Store`] if the store fails and
    /// [`ServiceError::Route`] if no provider answered. A routing failure
    /// leaves the user message recorded without a reply.
    pub async fn respond(
        &self,
        store: &dyn ConversationStore,
        session: &str,
        message: &str,
        image: Option<ImageAttachment>,
    ) -> Result<Completion, ServiceError> {
        let history = store.history(session).await?;
        let mut request = CompletionRequest::new(message).with_exchanges(&history);
        request.image = image;

        store.record(session, ExchangeRecord::user(message)).await?;
        let completion = self.route_chat(request).await?;
        store
            .record(session, ExchangeRecord::assistant(&completion))
            .await?;
        Ok(completion)
    }
}
