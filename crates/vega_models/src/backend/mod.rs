//! Completion backends.
//!
//! A backend performs one upstream call for one provider: it receives the
//! conversation and the resolved model, and returns the raw response text.
//! Transport concerns (HTTP clients, proxies, credentials) stay behind this seam.

mod error;
mod provider;
mod types;

pub use error::BackendError;
pub use provider::{CompletionBackend, FnBackend};
pub use types::{
    BackendRequest, ChatMessage, ContentPart, DEFAULT_IMAGE_PROMPT, ImageAttachment,
    ImageMediaType, ImageUrl, MessageContent, Role,
};
