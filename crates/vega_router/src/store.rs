//! Conversation storage collaborator.
//!
//! Persistence lives outside the router. [`ChatService::respond`] reads prior
//! exchanges through [`ConversationStore`] and writes both sides of each turn
//! back through it.
//!
//! [`ChatService::respond`]: crate::ChatService::respond

use crate::request::Exchange;
use async_trait::async_trait;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use vega_models::backend::Role;

/// Errors reported by a [`ConversationStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The session does not exist.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// The storage layer failed.
    #[error("storage error: {message}")]
    Backend {
        /// Error message.
        message: String,
        /// The underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Creates a [`StoreError::Backend`] carrying only a message.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
            source: None,
        }
    }
}

/// One message to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Who wrote it.
    pub role: Role,
    /// Text as shown to the user.
    pub content: String,
    /// Provider output before formatting; assistant messages only.
    pub raw_content: Option<String>,
    /// Provider that answered; assistant messages only.
    pub provider: Option<String>,
    /// Model that answered; assistant messages only.
    pub model: Option<String>,
    /// Routing time; assistant messages only.
    pub elapsed: Option<Duration>,
    /// Successful attempt number; assistant messages only.
    pub attempt_number: Option<usize>,
}

impl ExchangeRecord {
    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            raw_content: None,
            provider: None,
            model: None,
            elapsed: None,
            attempt_number: None,
        }
    }

    /// An assistant reply produced by a routed completion.
    #[must_use]
    pub fn assistant(completion: &crate::Completion) -> Self {
        Self {
            role: Role::Assistant,
            content: completion.text.clone(),
            raw_content: Some(completion.raw_text.clone()),
            provider: Some(completion.provider.clone()),
            model: Some(completion.model.clone()),
            elapsed: Some(completion.elapsed),
            attempt_number: Some(completion.attempt_number),
        }
    }
}

/// Storage for conversation history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Prior exchanges of `session`, oldest first.
    async fn history(&self, session: &str) -> Result<Vec<Exchange>, StoreError>;

    /// Appends a message to `session`.
    async fn record(&self, session: &str, record: ExchangeRecord) -> Result<(), StoreError>;
}
