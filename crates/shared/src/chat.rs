//! Chat wire types shared between the engine and the provider clients.

use serde::{Deserialize, Serialize};

/// One piece of user- or model-authored content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChatPart {
    Text(String),
    /// Base64-encoded image bytes plus their mime type.
    InlineImage { data: String, mime_type: String },
}

impl ChatPart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ChatPart::Text(t) => Some(t),
            ChatPart::InlineImage { .. } => None,
        }
    }
}

/// A single turn in a conversation. Roles are "system" | "user" |
/// "assistant"; providers translate to their own role vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub parts: Vec<ChatPart>,
}

impl ChatMessage {
    pub fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![ChatPart::Text(content.into())],
        }
    }

    pub fn user(parts: Vec<ChatPart>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text("assistant", content)
    }

    /// Concatenated text parts, ignoring inline images.
    pub fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(ChatPart::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// One increment of a streamed response.
///
/// Contract (same as the provider clients honor): transport failures before
/// the first chunk are returned as `Err` from the streaming call itself;
/// once streaming has started, failures arrive as `StreamChunk::Error` and
/// the call returns `Ok(())`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Text(String),
    Done { stop_reason: Option<String> },
    Error(String),
}

/// A web source backing a grounded answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub title: Option<String>,
    pub uri: String,
}

impl Citation {
    /// Link label: the title when present, the bare URI otherwise.
    pub fn label(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.uri)
    }
}

/// Full response from a search-grounded, single-shot request.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundedAnswer {
    pub text: String,
    pub citations: Vec<Citation>,
}

/// Output of an image-generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joined_text_skips_images() {
        let msg = ChatMessage {
            role: "user".into(),
            parts: vec![
                ChatPart::Text("look at ".into()),
                ChatPart::InlineImage {
                    data: "aGk=".into(),
                    mime_type: "image/png".into(),
                },
                ChatPart::Text("this".into()),
            ],
        };
        assert_eq!(msg.joined_text(), "look at this");
    }

    #[test]
    fn test_citation_label_prefers_title() {
        let titled = Citation {
            title: Some("Example".into()),
            uri: "https://example.com".into(),
        };
        let bare = Citation {
            title: None,
            uri: "https://example.com".into(),
        };
        assert_eq!(titled.label(), "Example");
        assert_eq!(bare.label(), "https://example.com");
    }
}
