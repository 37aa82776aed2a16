//! Image generation across image-capable providers.

use crate::catalog::ProviderCatalog;
use crate::classify::QuotaDetector;
use crate::config::RouterConfig;
use crate::result::{GeneratedImage, ImageError, QuotaNote};
use std::sync::Arc;
use tracing::Instrument;
use vega_core::Clock;
use vega_models::BackendRegistry;
use vega_models::backend::{BackendRequest, ChatMessage};

/// Routes image-generation prompts.
///
/// Without an explicit provider the image-capable providers are walked
/// `image_passes` times in catalog order. Quota reports are collected rather
/// than treated as ordinary failures, so callers can tell users to wait.
#[derive(Debug)]
pub struct ImageRouter {
    catalog: Arc<ProviderCatalog>,
    backends: Arc<BackendRegistry>,
    config: RouterConfig,
    detector: QuotaDetector,
    clock: Clock,
}

impl ImageRouter {
    /// Creates an image router with the default quota detector and the system clock.
    #[must_use]
    pub fn new(
        catalog: Arc<ProviderCatalog>,
        backends: Arc<BackendRegistry>,
        config: RouterConfig,
    ) -> Self {
        Self {
            catalog,
            backends,
            config,
            detector: QuotaDetector::default(),
            clock: Clock::system(),
        }
    }

    /// Replaces the clock used for elapsed-time measurements.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the quota detector.
    #[must_use]
    pub fn with_detector(mut self, detector: QuotaDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Providers to try for `provider`, in order.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Validation`] if `provider` cannot generate images.
    pub fn candidates(&self, provider: Option<&str>) -> Result<Vec<String>, ImageError> {
        match provider {
            Some(provider) if !self.catalog.is_image_capable(provider) => Err(ImageError::Validation {
                provider: provider.to_string(),
                valid: self.catalog.image_generation().to_vec(),
            }),
            Some(provider) => Ok(vec![provider.to_string()]),
            None => Ok(self
                .catalog
                .image_generation()
                .iter()
                .cycle()
                .take(self.catalog.image_generation().len() * self.config.image_passes)
                .cloned()
                .collect()),
        }
    }

    /// Generates an image for `prompt`, optionally on a specific provider.
    ///
    /// # Errors
    ///
    /// - [`ImageError::Validation`] if `provider` is named but cannot generate
    ///   images. No backend is contacted.
    /// - [`ImageError::QuotaExhausted`] if nothing succeeded and at least one
    ///   provider reported an exhausted quota.
    /// - [`ImageError::Exhausted`] otherwise.
    pub async fn generate_image(
        &self,
        prompt: &str,
        provider: Option<&str>,
    ) -> Result<GeneratedImage, ImageError> {
        let request_id = nanoid::nanoid!(10);
        let span = tracing::info_span!("generate_image", %request_id);
        self.run(prompt, provider).instrument(span).await
    }

    async fn run(&self, prompt: &str, provider: Option<&str>) -> Result<GeneratedImage, ImageError> {
        let started = self.clock.now();
        let candidates = self.candidates(provider).inspect_err(|err| {
            tracing::warn!(error = %err, "rejected image provider");
        })?;

        let mut notes: Vec<QuotaNote> = Vec::new();
        let mut last_error = None;
        let mut providers_tried = Vec::with_capacity(candidates.len());

        for provider in &candidates {
            let provider = provider.as_str();
            providers_tried.push(provider.to_string());

            let backend = match self.backends.resolve(provider) {
                Ok(backend) => backend,
                Err(err) => {
                    tracing::warn!(provider, error = %err, "provider has no backend");
                    last_error = Some(err.to_string());
                    continue;
                }
            };

            tracing::debug!(provider, "requesting image");
            match tokio::time::timeout(self.config.image_timeout, backend.invoke(self.request(provider, prompt))).await {
                Ok(Ok(body)) if body.trim().is_empty() => {
                    tracing::warn!(provider, "empty image response");
                }
                Ok(Ok(body)) => {
                    if let Some(note) = self.detector.from_body(provider, &body) {
                        tracing::warn!(provider, note = %note, "quota reported in response");
                        notes.push(note);
                        continue;
                    }

                    let elapsed = self.clock.elapsed_since(started);
                    let url = vega_format::extract_image_url(&body);
                    tracing::info!(
                        provider,
                        elapsed_ms = elapsed.as_millis() as u64,
                        found_url = url.is_some(),
                        "image generated"
                    );
                    return Ok(GeneratedImage {
                        url,
                        raw: body,
                        provider: provider.to_string(),
                        elapsed,
                        prompt: prompt.to_string(),
                    });
                }
                Ok(Err(err)) => {
                    if let Some(note) = self.detector.from_error(provider, &err) {
                        tracing::warn!(provider, note = %note, "quota exhausted");
                        last_error = Some(note.to_string());
                        notes.push(note);
                    } else {
                        tracing::warn!(provider, error = %err, "image attempt failed");
                        last_error = Some(format!("provider {provider}: {err}"));
                    }
                }
                Err(_elapsed) => {
                    tracing::warn!(
                        provider,
                        timeout_ms = self.config.image_timeout.as_millis() as u64,
                        "image attempt timed out"
                    );
                    last_error = Some(format!("timed out waiting for {provider}"));
                }
            }
        }

        tracing::error!(
            attempts = providers_tried.len(),
            quota_notes = notes.len(),
            "image generation failed"
        );
        if notes.is_empty() {
            Err(ImageError::Exhausted {
                last_error,
                providers_tried,
            })
        } else {
            Err(ImageError::QuotaExhausted { notes })
        }
    }

    fn request(&self, provider: &str, prompt: &str) -> BackendRequest {
        let mut request = BackendRequest::new(provider, self.catalog.default_model.as_str())
            .messages(vec![ChatMessage::user(prompt)])
            .timeout(self.config.image_timeout)
            .param("prompt", prompt);
        if let Some(params) = self.catalog.image_params(provider) {
            for (key, value) in params {
                request = request.param(key.as_str(), value.clone());
            }
        }
        request
    }
}
