//! The failover router.
//!
//! [`FailoverRouter::complete`] builds an [`AttemptPlan`] before contacting
//! any backend, then walks it strictly in order until one provider answers
//! with non-empty text. Per-attempt failures never escape; only the terminal
//! [`RouteError`] does.

use crate::catalog::ProviderCatalog;
use crate::classify::{FailureClassifier, FailureKind};
use crate::config::RouterConfig;
use crate::plan::{AttemptPlan, CandidateSet, Quarantine, select_candidates};
use crate::request::CompletionRequest;
use crate::result::{Completion, RouteError};
use crate::state::RouterState;
use std::sync::Arc;
use tracing::Instrument;
use vega_core::Clock;
use vega_models::BackendRegistry;
use vega_models::backend::BackendRequest;

/// Routes chat requests across interchangeable providers.
///
/// Cheap to share behind an `Arc`: the catalog, registry and state are
/// already shared, and a call keeps its plan and quarantine to itself.
#[derive(Debug)]
pub struct FailoverRouter {
    catalog: Arc<ProviderCatalog>,
    backends: Arc<BackendRegistry>,
    state: Arc<RouterState>,
    config: RouterConfig,
    classifier: FailureClassifier,
    clock: Clock,
}

impl FailoverRouter {
    /// Creates a router with the default classifier and the system clock.
    #[must_use]
    pub fn new(
        catalog: Arc<ProviderCatalog>,
        backends: Arc<BackendRegistry>,
        state: Arc<RouterState>,
        config: RouterConfig,
    ) -> Self {
        Self {
            catalog,
            backends,
            state,
            config,
            classifier: FailureClassifier::default(),
            clock: Clock::system(),
        }
    }

    /// Replaces the failure classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: FailureClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Replaces the clock used for elapsed-time measurements.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// The provider catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<ProviderCatalog> {
        &self.catalog
    }

    /// The backend registry.
    #[must_use]
    pub fn backends(&self) -> &Arc<BackendRegistry> {
        &self.backends
    }

    /// The shared router state.
    #[must_use]
    pub fn state(&self) -> &Arc<RouterState> {
        &self.state
    }

    /// The router configuration.
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// The clock used for elapsed-time measurements.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Builds the candidate set and attempt plan for `request` without running it.
    #[must_use]
    pub fn plan(
        &self,
        request: &CompletionRequest,
        start_provider: Option<&str>,
    ) -> (CandidateSet, AttemptPlan) {
        let candidates = select_candidates(&self.catalog, request);
        let plan = AttemptPlan::build(
            &candidates.providers,
            start_provider,
            self.config.cycle_count,
            self.config.plan_cap,
        );
        (candidates, plan)
    }

    /// Routes `request` until a provider answers or the plan runs out.
    ///
    /// Iteration starts at `start_provider` when it is a candidate. On success
    /// the provider becomes the preferred provider in [`RouterState`].
    /// Dropping the returned future abandons the remaining attempts.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::NoCandidates`] if no provider is eligible and
    /// [`RouteError::Exhausted`] if every planned attempt failed.
    pub async fn complete(
        &self,
        request: &CompletionRequest,
        start_provider: Option<&str>,
    ) -> Result<Completion, RouteError> {
        let request_id = nanoid::nanoid!(10);
        let span = tracing::info_span!("route", %request_id, image = request.has_image());
        self.run(request, start_provider).instrument(span).await
    }

    async fn run(
        &self,
        request: &CompletionRequest,
        start_provider: Option<&str>,
    ) -> Result<Completion, RouteError> {
        let started = self.clock.now();
        let image_request = request.has_image();
        let (candidates, plan) = self.plan(request, start_provider);

        if plan.is_empty() {
            tracing::warn!(source = ?candidates.source, "no eligible providers");
            return Err(RouteError::NoCandidates { image_request });
        }

        tracing::debug!(
            source = ?candidates.source,
            model = %candidates.model,
            attempts = plan.len(),
            candidates = plan.candidate_len(),
            "attempt plan built"
        );

        let messages = request.messages();
        let mut quarantine = Quarantine::new();
        let mut invocations = 0;
        let mut failures = 0;

        for attempt in &plan {
            let provider = attempt.provider.as_str();
            let number = attempt.index + 1;

            if plan.is_cycle_boundary(attempt.index) && !quarantine.is_empty() {
                tracing::debug!(released = quarantine.len(), "new cycle, quarantine cleared");
                quarantine.clear();
            }
            if quarantine.contains(provider) {
                tracing::debug!(provider, attempt = number, "skipping rate-limited provider");
                continue;
            }
            if image_request && !self.catalog.is_vision_capable(provider) {
                tracing::debug!(provider, attempt = number, "skipping provider without vision");
                continue;
            }

            let backend = match self.backends.resolve(provider) {
                Ok(backend) => backend,
                Err(err) => {
                    tracing::warn!(
                        provider,
                        attempt = number,
                        kind = %FailureKind::UnknownProvider,
                        error = %err,
                        "provider has no backend"
                    );
                    continue;
                }
            };

            let model = if image_request {
                self.catalog
                    .vision_model_for(provider)
                    .unwrap_or(candidates.model.as_str())
            } else {
                candidates.model.as_str()
            };

            let mut backend_request = BackendRequest::new(provider, model)
                .messages(messages.clone())
                .timeout(self.config.request_timeout);
            let proxy = self.proxy_for(failures);
            if let Some(proxy) = proxy {
                backend_request = backend_request.proxy(proxy);
            }

            tracing::debug!(provider, model, attempt = number, proxy = proxy.is_some(), "invoking backend");
            invocations += 1;

            let kind = match tokio::time::timeout(
                self.config.request_timeout,
                backend.invoke(backend_request),
            )
            .await
            {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    let elapsed = self.clock.elapsed_since(started);
                    let successes = self.state.record_success(provider);
                    tracing::info!(
                        provider,
                        model,
                        attempt = number,
                        elapsed_ms = elapsed.as_millis() as u64,
                        successes,
                        "provider answered"
                    );
                    return Ok(Completion {
                        text: vega_format::format(&text),
                        raw_text: text,
                        provider: provider.to_string(),
                        model: model.to_string(),
                        attempt_number: number,
                        elapsed,
                        message_length: request.message.chars().count(),
                        history_length: request.history.len(),
                        proxy_used: proxy.is_some(),
                    });
                }
                Ok(Ok(_)) => {
                    tracing::warn!(provider, attempt = number, "empty response");
                    FailureKind::Empty
                }
                Ok(Err(err)) => {
                    let kind = self.classifier.classify(&err, image_request);
                    tracing::warn!(provider, attempt = number, kind = %kind, error = %err, "attempt failed");
                    kind
                }
                Err(_elapsed) => {
                    tracing::warn!(
                        provider,
                        attempt = number,
                        timeout_ms = self.config.request_timeout.as_millis() as u64,
                        "attempt timed out"
                    );
                    FailureKind::Timeout
                }
            };

            failures += 1;
            match kind {
                FailureKind::RateLimited => quarantine.insert(provider),
                FailureKind::Network => tokio::time::sleep(self.config.network_pause).await,
                _ => {}
            }
        }

        let err = RouteError::Exhausted {
            attempts: plan.len(),
            invocations,
            quarantined: quarantine.total(),
            usage: self.state.usage_snapshot(),
            image_request,
        };
        tracing::error!(
            attempts = plan.len(),
            invocations,
            quarantined = quarantine.total(),
            elapsed_ms = self.clock.elapsed_since(started).as_millis() as u64,
            "all providers failed"
        );
        Err(err)
    }

    /// The proxy to attach after `failures` failed invocations in this call.
    fn proxy_for(&self, failures: usize) -> Option<&str> {
        if failures < self.config.proxy_after_failures || !self.state.proxy_enabled() {
            return None;
        }
        self.config.proxy.as_deref()
    }
}
