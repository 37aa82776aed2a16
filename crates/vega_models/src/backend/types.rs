//! Core types for backend requests.

use base64::Engine;
use core::time::Duration;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Text used for the prompt part when an image is sent without any user text.
pub const DEFAULT_IMAGE_PROMPT: &str = "Describe in detail what you see in the image";

// ─────────────────────
// Request
// ─────────────────────

/// A single call to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRequest {
    /// Provider identifier as it appears in the catalog.
    pub provider: String,
    /// The model to request from the provider.
    pub model: String,
    /// The conversation, oldest first, ending with the current user message.
    pub messages: Vec<ChatMessage>,
    /// Upper bound the caller will wait for this call.
    pub timeout: Duration,
    /// Outbound proxy address, when the router decided to use one.
    pub proxy: Option<String>,
    /// Provider-specific parameters (e.g. image model selection).
    pub params: Map<String, Value>,
}

impl BackendRequest {
    /// Creates a request with no messages and a two minute timeout.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            messages: Vec::new(),
            timeout: Duration::from_secs(120),
            proxy: None,
            params: Map::new(),
        }
    }

    /// Sets the conversation.
    #[must_use]
    pub fn messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the timeout the backend should honour.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Routes the call through `proxy`.
    #[must_use]
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }

    /// Adds a provider-specific parameter.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the text of the last user message, if any.
    #[must_use]
    pub fn prompt(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(ChatMessage::text)
    }
}

// ─────────────────────
// Messages
// ─────────────────────

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions or error notes injected by the application.
    System,
    /// A message from the user.
    User,
    /// A reply from a provider.
    Assistant,
}

/// A message in the conversation sent to a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message.
    pub role: Role,
    /// Message body.
    pub content: MessageContent,
}

impl ChatMessage {
    /// Creates a plain text user message.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates a plain text assistant message.
    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates a plain text system message.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Creates a multi-part user message carrying text and an image.
    ///
    /// Blank `text` is replaced with [`DEFAULT_IMAGE_PROMPT`].
    #[must_use]
    pub fn user_with_image(text: impl Into<String>, image: &ImageAttachment) -> Self {
        let text = text.into();
        let text = if text.trim().is_empty() {
            DEFAULT_IMAGE_PROMPT.to_string()
        } else {
            text
        };

        Self {
            role: Role::User,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: image.data_url(),
                        detail: Some("high".to_string()),
                    },
                },
            ]),
        }
    }

    /// Returns the textual content, joining text parts and skipping images.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|part| match part {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Character count of the textual content, used for history budgeting.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.text().chars().count()
    }

    /// Whether the message carries an image part.
    #[must_use]
    pub fn has_image(&self) -> bool {
        matches!(&self.content, MessageContent::Parts(parts)
            if parts.iter().any(|part| matches!(part, ContentPart::ImageUrl { .. })))
    }
}

/// Body of a [`ChatMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text.
    Text(String),
    /// Ordered content parts (text and images).
    Parts(Vec<ContentPart>),
}

/// One part of a multi-part message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// A text fragment.
    Text {
        /// The text.
        text: String,
    },
    /// An image referenced by URL (usually a data URL).
    ImageUrl {
        /// Image location.
        image_url: ImageUrl,
    },
}

/// Image location inside a [`ContentPart::ImageUrl`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// `data:` or remote URL.
    pub url: String,
    /// Requested analysis fidelity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ─────────────────────
// Images
// ─────────────────────

/// An image attached to a user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    /// Base64 payload, or a complete `data:` URL.
    pub data: String,
    /// The image format.
    pub media_type: ImageMediaType,
}

impl ImageAttachment {
    /// Creates an attachment from base64 data (or an existing data URL).
    #[must_use]
    pub fn from_base64(data: impl Into<String>, media_type: ImageMediaType) -> Self {
        Self {
            data: data.into(),
            media_type,
        }
    }

    /// Creates an attachment by base64-encoding raw image bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl AsRef<[u8]>, media_type: ImageMediaType) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type,
        }
    }

    /// Returns the attachment as a `data:<mime>;base64,<payload>` URL.
    ///
    /// Data that already is a data URL is returned unchanged.
    #[must_use]
    pub fn data_url(&self) -> String {
        if self.data.starts_with("data:") {
            self.data.clone()
        } else {
            format!("data:{};base64,{}", self.media_type.mime(), self.data)
        }
    }
}

/// Supported image formats.
#[expect(missing_docs, reason = "variants are self-explanatory format names")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageMediaType {
    #[default]
    JPEG,
    PNG,
    GIF,
    WEBP,
}

impl ImageMediaType {
    /// Returns the MIME type.
    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            Self::JPEG => "image/jpeg",
            Self::PNG => "image/png",
            Self::GIF => "image/gif",
            Self::WEBP => "image/webp",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn data_url_wraps_plain_base64() {
        let image = ImageAttachment::from_base64("AAAA", ImageMediaType::PNG);
        assert_eq!(image.data_url(), "data:image/png;base64,AAAA");
    }

    #[test]
    fn data_url_passes_existing_url_through() {
        let image = ImageAttachment::from_base64("data:image/gif;base64,R0lG", ImageMediaType::JPEG);
        assert_eq!(image.data_url(), "data:image/gif;base64,R0lG");
    }

    #[test]
    fn from_bytes_encodes_standard_base64() {
        let image = ImageAttachment::from_bytes(b"hi!", ImageMediaType::JPEG);
        assert_eq!(image.data, "aGkh");
    }

    #[test]
    fn image_message_serializes_as_parts() {
        let image = ImageAttachment::from_base64("AAAA", ImageMediaType::JPEG);
        let message = ChatMessage::user_with_image("what is this?", &image);

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(
            value,
            json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": "what is this?" },
                    {
                        "type": "image_url",
                        "image_url": { "url": "data:image/jpeg;base64,AAAA", "detail": "high" }
                    }
                ]
            })
        );
        assert!(message.has_image());
    }

    #[test]
    fn blank_image_text_uses_default_prompt() {
        let image = ImageAttachment::from_base64("AAAA", ImageMediaType::JPEG);
        let message = ChatMessage::user_with_image("   ", &image);
        assert_eq!(message.text(), DEFAULT_IMAGE_PROMPT);
    }

    #[test]
    fn plain_message_round_trips_as_string_content() {
        let value = json!({ "role": "assistant", "content": "hello" });
        let message: ChatMessage = serde_json::from_value(value).unwrap();
        assert_eq!(message, ChatMessage::assistant("hello"));
        assert_eq!(message.content_len(), 5);
    }

    #[test]
    fn prompt_is_last_user_message() {
        let request = BackendRequest::new("ImageLabs", "gpt-4").messages(vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("draw a cat"),
        ]);
        assert_eq!(request.prompt().as_deref(), Some("draw a cat"));
    }
}
