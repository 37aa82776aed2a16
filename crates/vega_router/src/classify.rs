//! Failure classification.
//!
//! Backends report failures in many shapes. Typed [`BackendError`] variants
//! are mapped directly; anything else is classified by keywords in its
//! rendered message. Keyword lists live in [`FailureClassifier`] so they can
//! be replaced without touching the routing loop.

use crate::result::QuotaNote;
use core::time::Duration;
use regex::Regex;
use std::sync::LazyLock;
use vega_models::backend::BackendError;

/// Outcome of one failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The provider answered with nothing but whitespace.
    Empty,
    /// The attempt ran out of time.
    Timeout,
    /// The provider is throttling; quarantined for the rest of the cycle.
    RateLimited,
    /// The provider refused access.
    Blocked,
    /// The provider cannot handle the attached image.
    VisionUnsupported,
    /// Transport-level trouble; followed by a short pause.
    Network,
    /// The outbound proxy failed.
    Proxy,
    /// No backend serves the provider identity.
    UnknownProvider,
    /// Anything else.
    Other,
}

impl FailureKind {
    /// Short label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Timeout => "timeout",
            Self::RateLimited => "rate_limited",
            Self::Blocked => "blocked",
            Self::VisionUnsupported => "vision_unsupported",
            Self::Network => "network",
            Self::Proxy => "proxy",
            Self::UnknownProvider => "unknown_provider",
            Self::Other => "other",
        }
    }
}

impl core::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One keyword rule: any keyword found in the lowercased message selects `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordRule {
    /// Classification when a keyword matches.
    pub kind: FailureKind,
    /// Lowercase substrings to look for.
    pub keywords: Vec<String>,
    /// Whether the rule only applies to requests carrying an image.
    pub image_only: bool,
}

impl KeywordRule {
    /// Creates a rule for all requests.
    #[must_use]
    pub fn new(kind: FailureKind, keywords: &[&str]) -> Self {
        Self {
            kind,
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            image_only: false,
        }
    }

    /// Restricts the rule to requests carrying an image.
    #[must_use]
    pub fn image_only(mut self) -> Self {
        self.image_only = true;
        self
    }

    fn matches(&self, lowered: &str, image_request: bool) -> bool {
        (!self.image_only || image_request) && self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// Ordered keyword rules; the first matching rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureClassifier {
    rules: Vec<KeywordRule>,
}

impl Default for FailureClassifier {
    fn default() -> Self {
        Self {
            rules: vec![
                KeywordRule::new(FailureKind::Proxy, &["proxy"]),
                KeywordRule::new(FailureKind::Network, &["connection", "network"]),
                KeywordRule::new(FailureKind::RateLimited, &["rate", "limit", "429"]),
                KeywordRule::new(FailureKind::Blocked, &["block", "forbidden"]),
                KeywordRule::new(FailureKind::RateLimited, &["available in"]),
                KeywordRule::new(
                    FailureKind::VisionUnsupported,
                    &["vision", "image", "multimodal", "unsupported"],
                )
                .image_only(),
            ],
        }
    }
}

impl FailureClassifier {
    /// Creates a classifier from explicit rules, evaluated in order.
    #[must_use]
    pub fn with_rules(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    /// The rules in evaluation order.
    #[must_use]
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Classifies a backend error.
    #[must_use]
    pub fn classify(&self, error: &BackendError, image_request: bool) -> FailureKind {
        match error {
            BackendError::Timeout(_) => FailureKind::Timeout,
            BackendError::RateLimited { .. } => FailureKind::RateLimited,
            BackendError::Connection(_) => FailureKind::Network,
            BackendError::Auth(_) => FailureKind::Blocked,
            BackendError::UnsupportedContent(_) if image_request => FailureKind::VisionUnsupported,
            BackendError::Provider {
                status: Some(429), ..
            } => FailureKind::RateLimited,
            BackendError::Provider {
                status: Some(401 | 403),
                ..
            } => FailureKind::Blocked,
            _ => self.classify_message(&error.to_string(), image_request),
        }
    }

    /// Classifies a free-form error message by keyword.
    #[must_use]
    pub fn classify_message(&self, message: &str, image_request: bool) -> FailureKind {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered, image_request))
            .map_or(FailureKind::Other, |rule| rule.kind)
    }
}

// ─────────────────────
// Quota detection
// ─────────────────────

static WAIT_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s*(s|sec|seconds|секунд)").expect("wait time pattern is valid")
});

/// Recognises quota exhaustion in image-generation responses and errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaDetector {
    body_keywords: Vec<String>,
    error_keywords: Vec<String>,
}

impl Default for QuotaDetector {
    fn default() -> Self {
        Self {
            body_keywords: ["quota", "квота", "exceeded", "limit", "wait", "ожидание"]
                .map(String::from)
                .to_vec(),
            error_keywords: ["quota", "квота", "exceeded", "gpu quota", "limit"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl QuotaDetector {
    /// Checks a successful response body for a quota message.
    #[must_use]
    pub fn from_body(&self, provider: &str, body: &str) -> Option<QuotaNote> {
        Self::detect(&self.body_keywords, provider, body)
    }

    /// Checks a backend error for quota exhaustion.
    #[must_use]
    pub fn from_error(&self, provider: &str, error: &BackendError) -> Option<QuotaNote> {
        Self::detect(&self.error_keywords, provider, &error.to_string())
    }

    fn detect(keywords: &[String], provider: &str, text: &str) -> Option<QuotaNote> {
        let lowered = text.to_lowercase();
        if !keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return None;
        }
        Some(QuotaNote {
            provider: provider.to_string(),
            retry_after: parse_wait(&lowered),
        })
    }
}

/// Extracts a wait time such as `30 seconds` or `45s` from `text`.
#[must_use]
pub fn parse_wait(text: &str) -> Option<Duration> {
    WAIT_TIME
        .captures(text)
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .map(Duration::from_secs)
}
