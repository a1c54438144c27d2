//! The AI service boundary.
//!
//! The engine talks to a [`ChatBackend`] trait object so the dispatch and
//! accumulation logic is testable without a network; [`GeminiBackend`] is
//! the production implementation over the provider clients.

use anyhow::Result;
use async_trait::async_trait;
use providers::{GeminiClient, ImagenClient};
use shared::chat::{ChatMessage, GeneratedImage, GroundedAnswer, StreamChunk};
use shared::settings::AppSettings;
use tokio::sync::mpsc::UnboundedSender;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Streamed completion. Same contract as the provider clients: `Err`
    /// only before the first chunk; later failures arrive as
    /// [`StreamChunk::Error`].
    async fn stream_reply(
        &self,
        instruction: &str,
        messages: Vec<ChatMessage>,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()>;

    /// Stateless single-shot completion.
    async fn complete(&self, instruction: &str, messages: Vec<ChatMessage>) -> Result<String>;

    /// Stateless single-shot completion carrying the search-grounding tool.
    async fn grounded_reply(
        &self,
        instruction: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<GroundedAnswer>;

    /// Generate one image for the prompt.
    async fn render_image(&self, prompt: &str) -> Result<GeneratedImage>;
}

pub struct GeminiBackend {
    chat: GeminiClient,
    imagen: ImagenClient,
}

impl GeminiBackend {
    pub fn from_settings(settings: &AppSettings) -> Result<Self> {
        Ok(Self {
            chat: GeminiClient::from_auth(&settings.model.text_model, &settings.gemini_auth)?,
            imagen: ImagenClient::from_auth(&settings.model.image_model, &settings.gemini_auth)?,
        })
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn stream_reply(
        &self,
        instruction: &str,
        messages: Vec<ChatMessage>,
        tx: UnboundedSender<StreamChunk>,
    ) -> Result<()> {
        self.chat
            .generate_stream(Some(instruction), &messages, tx)
            .await
    }

    async fn complete(&self, instruction: &str, messages: Vec<ChatMessage>) -> Result<String> {
        self.chat.generate(Some(instruction), &messages).await
    }

    async fn grounded_reply(
        &self,
        instruction: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<GroundedAnswer> {
        self.chat
            .generate_grounded(Some(instruction), &messages)
            .await
    }

    async fn render_image(&self, prompt: &str) -> Result<GeneratedImage> {
        self.imagen.generate(prompt).await
    }
}
