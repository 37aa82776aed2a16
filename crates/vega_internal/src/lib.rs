//! # Vega Internal Library
//!
//! Re-exports the Vega crates for convenience.

/// Tracing setup and the mockable clock.
pub use vega_core;

/// Completion backend interface, message model and registry.
pub use vega_models;

/// Response formatting and image URL extraction.
pub use vega_format;

/// Provider catalog, failover routing and the chat service facade.
pub use vega_router;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use vega_core::{Clock, TracingConfig, TracingFormat};
    pub use vega_format::{extract_image_url, format};
    pub use vega_models::backend::{
        BackendError, BackendRequest, ChatMessage, FnBackend, ImageAttachment, ImageMediaType,
        Role,
    };
    pub use vega_models::{BackendRegistry, CompletionBackend};
    pub use vega_router::{
        ChatService, Completion, CompletionRequest, ConversationStore, ExchangeRecord,
        FailoverRouter, GeneratedImage, ImageError, ImageRouter, ProviderCatalog, RouteError,
        RouterConfig, RouterState,
    };
}
