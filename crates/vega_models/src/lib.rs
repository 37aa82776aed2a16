//! Completion backend interface and registry for Vega.
//!
//! Decouples the failover router from the transports that actually talk to
//! upstream providers.
//!
//! # Overview
//!
//! - Provider-agnostic: the router depends only on [`CompletionBackend`], never on
//!   a concrete client.
//!
//! - Runtime registration: backends are registered by provider identifier in a
//!   [`BackendRegistry`], so the set of reachable providers is configuration.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vega_models::BackendRegistry;
//! use vega_models::backend::{BackendRequest, FnBackend};
//!
//! let mut registry = BackendRegistry::new();
//! registry.register(
//!     "Chatai",
//!     Arc::new(FnBackend::new(|_request: BackendRequest| async {
//!         Ok("hello".to_string())
//!     })),
//! );
//!
//! assert!(registry.has("Chatai"));
//! ```

pub mod backend;
pub mod error;
mod registry;

pub use backend::CompletionBackend;
pub use registry::BackendRegistry;
