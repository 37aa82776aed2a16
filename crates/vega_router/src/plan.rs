//! Candidate selection, attempt plans and rate-limit quarantine.
//!
//! A plan is built once per request, before any backend is contacted, and is
//! never modified afterwards. The quarantine is the only per-call state that
//! changes while the plan is walked.

use crate::catalog::ProviderCatalog;
use crate::request::CompletionRequest;
use hashbrown::HashSet;

/// Default number of passes over the candidate list.
pub const DEFAULT_CYCLE_COUNT: usize = 3;

/// Default upper bound on plan length.
pub const DEFAULT_PLAN_CAP: usize = 30;

/// Model name that requests automatic provider and model selection.
pub const AUTO_MODEL: &str = "auto";

// ─────────────────────
// Candidates
// ─────────────────────

/// Which rule produced a [`CandidateSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateSource {
    /// An image is attached; vision providers only.
    Vision,
    /// The caller named the providers.
    Explicit,
    /// The caller named a model; every tier is eligible.
    Model,
    /// Automatic mode; working tiers with the default model.
    Auto,
}

/// Ordered providers eligible for one request and the model to ask them for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    /// Eligible providers in preference order.
    pub providers: Vec<String>,
    /// Model requested from each provider unless overridden per provider.
    pub model: String,
    /// The selection rule that applied.
    pub source: CandidateSource,
}

/// Chooses the providers eligible for `request`.
///
/// Precedence, highest first: an attached image restricts the set to vision
/// providers; an explicit provider list is used verbatim; an explicit model
/// other than `"auto"` opens all tiers; otherwise the working tiers are used
/// with the catalog's default model. Problematic providers are always removed.
#[must_use]
pub fn select_candidates(catalog: &ProviderCatalog, request: &CompletionRequest) -> CandidateSet {
    let explicit_model = request
        .model
        .as_deref()
        .filter(|model| !model.is_empty() && *model != AUTO_MODEL);

    let (providers, model, source) = if request.has_image() {
        (
            catalog.vision().to_vec(),
            catalog.vision_model.clone(),
            CandidateSource::Vision,
        )
    } else if let Some(providers) = request.providers.as_ref().filter(|p| !p.is_empty()) {
        (
            providers.clone(),
            explicit_model.map_or_else(|| catalog.default_model.clone(), str::to_string),
            CandidateSource::Explicit,
        )
    } else if let Some(model) = explicit_model {
        (catalog.tiered(), model.to_string(), CandidateSource::Model)
    } else {
        (
            catalog.working(),
            catalog.default_model.clone(),
            CandidateSource::Auto,
        )
    };

    let providers = providers
        .into_iter()
        .filter(|name| !catalog.is_problematic(name))
        .collect();

    CandidateSet {
        providers,
        model,
        source,
    }
}

// ─────────────────────
// Attempt plan
// ─────────────────────

/// One entry of an [`AttemptPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAttempt {
    /// Provider to try.
    pub provider: String,
    /// Zero-based position in the plan.
    pub index: usize,
}

/// Ordered, bounded sequence of provider attempts for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptPlan {
    attempts: Vec<PlannedAttempt>,
    candidate_len: usize,
}

impl AttemptPlan {
    /// Builds a plan over `candidates`.
    ///
    /// The candidate list is rotated to begin at `start` (or left as is when
    /// `start` is absent or not a candidate) and walked `cycles` times. A pass
    /// never lists the same provider twice; the first occurrence in each pass
    /// wins. The result is truncated to `cap` entries.
    #[must_use]
    pub fn build(candidates: &[String], start: Option<&str>, cycles: usize, cap: usize) -> Self {
        let len = candidates.len();
        let offset = start
            .and_then(|start| candidates.iter().position(|name| name == start))
            .unwrap_or(0);

        let mut attempts = Vec::with_capacity((len * cycles).min(cap));
        'passes: for _ in 0..cycles {
            let mut in_pass: HashSet<&str> = HashSet::with_capacity(len);
            for i in 0..len {
                if attempts.len() == cap {
                    break 'passes;
                }
                let provider = &candidates[(offset + i) % len];
                if !in_pass.insert(provider.as_str()) {
                    continue;
                }
                attempts.push(PlannedAttempt {
                    provider: provider.clone(),
                    index: attempts.len(),
                });
            }
        }

        Self {
            attempts,
            candidate_len: len,
        }
    }

    /// Number of planned attempts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    /// Whether nothing is planned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// Length of the candidate list the plan was built from.
    #[must_use]
    pub fn candidate_len(&self) -> usize {
        self.candidate_len
    }

    /// Whether the traversal reaches a new cycle at `index`, which clears the quarantine.
    ///
    /// Boundaries are multiples of the candidate-list length, so with
    /// suppressed duplicates they fall slightly ahead of the pass start.
    #[must_use]
    pub fn is_cycle_boundary(&self, index: usize) -> bool {
        self.candidate_len > 0 && index > 0 && index % self.candidate_len == 0
    }

    /// Iterates over the planned attempts in order.
    pub fn iter(&self) -> impl Iterator<Item = &PlannedAttempt> {
        self.attempts.iter()
    }

    /// Provider names in plan order.
    #[must_use]
    pub fn providers(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.provider.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a AttemptPlan {
    type Item = &'a PlannedAttempt;
    type IntoIter = core::slice::Iter<'a, PlannedAttempt>;

    fn into_iter(self) -> Self::IntoIter {
        self.attempts.iter()
    }
}

// ─────────────────────
// Quarantine
// ─────────────────────

/// Providers excluded for the rest of the current cycle after signalling a rate limit.
#[derive(Debug, Default)]
pub struct Quarantine {
    active: HashSet<String>,
    ever: HashSet<String>,
}

impl Quarantine {
    /// Creates an empty quarantine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Excludes `provider` until the next [`clear`](Self::clear).
    pub fn insert(&mut self, provider: &str) {
        self.active.insert(provider.to_string());
        self.ever.insert(provider.to_string());
    }

    /// Whether `provider` is currently excluded.
    #[must_use]
    pub fn contains(&self, provider: &str) -> bool {
        self.active.contains(provider)
    }

    /// Lifts every exclusion.
    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Number of providers currently excluded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no provider is currently excluded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Distinct providers quarantined at any point during the call.
    #[must_use]
    pub fn total(&self) -> usize {
        self.ever.len()
    }
}
