//! Outcomes of routed chat and image-generation calls.

use core::fmt;
use core::time::Duration;
use std::collections::BTreeMap;

/// A successful chat completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Formatted response text.
    pub text: String,
    /// Response text exactly as the provider returned it.
    pub raw_text: String,
    /// Provider that answered.
    pub provider: String,
    /// Model requested from that provider.
    pub model: String,
    /// 1-based position of the successful attempt in the plan.
    pub attempt_number: usize,
    /// Time from the start of routing to the answer.
    pub elapsed: Duration,
    /// Characters in the user's message.
    pub message_length: usize,
    /// History messages forwarded with the request.
    pub history_length: usize,
    /// Whether the successful attempt went through the proxy.
    pub proxy_used: bool,
}

/// Terminal failure of a routed chat call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    /// Every planned attempt failed.
    #[error(
        "all providers failed after {attempts} attempts ({invocations} backend calls, {quarantined} rate limited)"
    )]
    Exhausted {
        /// Planned attempts walked, including skipped ones.
        attempts: usize,
        /// Backend invocations actually made.
        invocations: usize,
        /// Distinct providers quarantined during the call.
        quarantined: usize,
        /// Success counters at the time of failure, by provider.
        usage: BTreeMap<String, u64>,
        /// Whether the request carried an image.
        image_request: bool,
    },

    /// The plan was empty before any attempt.
    #[error("no eligible providers for this request")]
    NoCandidates {
        /// Whether the request carried an image.
        image_request: bool,
    },
}

impl RouteError {
    /// Whether the failed request carried an image.
    #[must_use]
    pub fn is_image_request(&self) -> bool {
        match self {
            Self::Exhausted { image_request, .. } | Self::NoCandidates { image_request } => {
                *image_request
            }
        }
    }

    /// Text suitable for showing to the end user.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        if self.is_image_request() {
            "Sorry, all AI vision providers are currently unavailable. Please try again later or upload the image later."
        } else {
            "Sorry, all AI providers are currently unavailable. Please try again later."
        }
    }
}

// ─────────────────────
// Image generation
// ─────────────────────

/// A successful image generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    /// Image URL found in the response, if any.
    pub url: Option<String>,
    /// Response exactly as the provider returned it.
    pub raw: String,
    /// Provider that answered.
    pub provider: String,
    /// Time from the start of routing to the answer.
    pub elapsed: Duration,
    /// Prompt that was sent.
    pub prompt: String,
}

/// A provider reported that its generation quota is used up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaNote {
    /// Provider that reported it.
    pub provider: String,
    /// Wait time the provider suggested, when it gave one.
    pub retry_after: Option<Duration>,
}

impl fmt::Display for QuotaNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.retry_after {
            Some(wait) => write!(
                f,
                "quota exhausted for {}, retry after {}s",
                self.provider,
                wait.as_secs()
            ),
            None => write!(
                f,
                "quota exhausted for {}, retry after unknown",
                self.provider
            ),
        }
    }
}

/// Terminal failure of an image-generation call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImageError {
    /// The caller named a provider that cannot generate images.
    #[error("provider '{provider}' cannot generate images; valid providers: {}", .valid.join(", "))]
    Validation {
        /// Provider that was requested.
        provider: String,
        /// Providers that can generate images.
        valid: Vec<String>,
    },

    /// At least one provider reported an exhausted quota and none succeeded.
    #[error("image generation quota exhausted ({} providers)", .notes.len())]
    QuotaExhausted {
        /// One note per quota report, in the order received.
        notes: Vec<QuotaNote>,
    },

    /// Every attempt failed for other reasons.
    #[error("image generation failed: {}", .last_error.as_deref().unwrap_or("no provider returned an image"))]
    Exhausted {
        /// Description of the last failure.
        last_error: Option<String>,
        /// Providers attempted, in order.
        providers_tried: Vec<String>,
    },
}

impl ImageError {
    /// Text suitable for showing to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { provider, valid } => format!(
                "Provider {provider} is not available for image generation. Available: {}",
                valid.join(", ")
            ),
            Self::QuotaExhausted { .. } => {
                "Image generation quota exhausted. Please try again later.".to_string()
            }
            Self::Exhausted { .. } => {
                "Could not generate an image. Please try a different prompt.".to_string()
            }
        }
    }
}
