//! Chat requests and conversation history.

use serde::{Deserialize, Serialize};
use vega_models::backend::{ChatMessage, ImageAttachment};

/// One stored turn: the user's message and the reply, if there was one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    /// What the user wrote.
    pub message: String,
    /// What the provider answered.
    pub response: Option<String>,
}

impl Exchange {
    /// Creates an exchange.
    #[must_use]
    pub fn new(message: impl Into<String>, response: Option<String>) -> Self {
        Self {
            message: message.into(),
            response,
        }
    }
}

/// A chat turn to route.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Current user message.
    pub message: String,
    /// Earlier conversation, oldest first.
    pub history: Vec<ChatMessage>,
    /// Image to analyse alongside the message.
    pub image: Option<ImageAttachment>,
    /// Providers to try, in order, instead of the catalog's selection.
    pub providers: Option<Vec<String>>,
    /// Model to request; `None` or `"auto"` selects automatically.
    pub model: Option<String>,
}

impl CompletionRequest {
    /// Creates a request with no history, image or overrides.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            image: None,
            providers: None,
            model: None,
        }
    }

    /// Sets the earlier conversation.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Sets the earlier conversation from stored exchanges.
    ///
    /// Empty messages and missing responses are skipped.
    #[must_use]
    pub fn with_exchanges(mut self, exchanges: &[Exchange]) -> Self {
        self.history = exchanges_to_messages(exchanges);
        self
    }

    /// Attaches an image.
    #[must_use]
    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }

    /// Restricts routing to `providers`, tried in order.
    #[must_use]
    pub fn with_providers(mut self, providers: Vec<String>) -> Self {
        self.providers = Some(providers);
        self
    }

    /// Requests a specific model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Whether an image is attached.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// The conversation sent to a provider: history followed by the current message.
    ///
    /// With an image attached the current message becomes a text part plus an
    /// image part.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.extend(self.history.iter().cloned());
        messages.push(match &self.image {
            Some(image) => ChatMessage::user_with_image(self.message.as_str(), image),
            None => ChatMessage::user(self.message.as_str()),
        });
        messages
    }
}

/// Expands stored exchanges into alternating user and assistant messages.
#[must_use]
pub fn exchanges_to_messages(exchanges: &[Exchange]) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(exchanges.len() * 2);
    for exchange in exchanges {
        if !exchange.message.is_empty() {
            messages.push(ChatMessage::user(exchange.message.as_str()));
        }
        if let Some(response) = exchange.response.as_deref().filter(|r| !r.is_empty()) {
            messages.push(ChatMessage::assistant(response));
        }
    }
    messages
}

/// Trims history to at most `max_messages` of the newest messages, then drops
/// the oldest until the total content length fits in `max_chars`.
#[must_use]
pub fn trim_history(
    mut history: Vec<ChatMessage>,
    max_messages: usize,
    max_chars: usize,
) -> Vec<ChatMessage> {
    if history.len() > max_messages {
        history.drain(..history.len() - max_messages);
    }

    let mut total: usize = history.iter().map(ChatMessage::content_len).sum();
    let mut drop = 0;
    while drop < history.len() && total > max_chars {
        total -= history[drop].content_len();
        drop += 1;
    }
    history.drain(..drop);
    history
}
