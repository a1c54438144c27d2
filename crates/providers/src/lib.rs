//! HTTP clients for the hosted generative-AI service.
//!
//! `gemini` covers text generation (single-shot, streamed, and
//! search-grounded); `imagen` covers image generation; `sse` is the
//! incremental event-stream parser the streaming path uses.

pub mod gemini;
pub mod imagen;
pub mod sse;

pub use gemini::GeminiClient;
pub use imagen::ImagenClient;
