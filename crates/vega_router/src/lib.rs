//! Provider-failover routing for Vega.
//!
//! Chat requests are routed across many interchangeable, unreliable
//! providers until one answers. Image-generation prompts are routed across
//! the image-capable subset.
//!
//! # Overview
//!
//! - [`ProviderCatalog`]: static provider metadata (tiers, capabilities, model overrides).
//! - [`AttemptPlan`]: the bounded, ordered attempt sequence built before any backend call.
//! - [`FailureClassifier`]: maps backend failures to a [`FailureKind`].
//! - [`FailoverRouter`]: walks the plan with rate-limit quarantine and vision gating.
//! - [`ImageRouter`]: image generation with quota detection.
//! - [`ChatService`]: facade combining both routers with shared [`RouterState`].
//!
//! Successful chat responses pass through [`vega_format::format`] before
//! they are returned.

mod catalog;
mod classify;
mod config;
mod image;
mod plan;
mod request;
mod result;
mod router;
mod service;
mod state;
pub mod store;

pub use catalog::{CatalogError, ProviderCatalog, SpeedTier};
pub use classify::{FailureClassifier, FailureKind, KeywordRule, QuotaDetector, parse_wait};
pub use config::{ConfigError, RouterConfig};
pub use image::ImageRouter;
pub use plan::{
    AUTO_MODEL, AttemptPlan, CandidateSet, CandidateSource, DEFAULT_CYCLE_COUNT, DEFAULT_PLAN_CAP,
    PlannedAttempt, Quarantine, select_candidates,
};
pub use request::{CompletionRequest, Exchange, exchanges_to_messages, trim_history};
pub use result::{Completion, GeneratedImage, ImageError, QuotaNote, RouteError};
pub use router::FailoverRouter;
pub use service::{ChatService, ProviderInfo, ServiceError};
pub use state::RouterState;
pub use store::{ConversationStore, ExchangeRecord, StoreError};
