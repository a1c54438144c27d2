//! Guro core - chat session lifecycle over a generative-AI backend.
//!
//! This crate owns everything between the front end and the provider
//! clients:
//! - mode registry and user preset store (named system instructions)
//! - key-value preference persistence
//! - the session handle bound to the active mode's instruction
//! - request dispatch, streamed-response accumulation, and the transcript
//! - speech toggle semantics behind boundary traits
//!
//! The front end drives it exclusively through [`Engine::apply`] with
//! [`Command`] values and observes it through [`Effect`] values.

pub mod accumulator;
pub mod backend;
pub mod engine;
pub mod markup;
pub mod modes;
pub mod presets;
pub mod session;
pub mod speech;
pub mod store;
pub mod transcript;

pub use backend::{ChatBackend, GeminiBackend};
pub use engine::{
    Command, DocumentRef, Effect, EffectSink, Engine, ImageAttachment, UserDraft,
};
pub use presets::{PresetError, PresetStore};
pub use store::{FileStore, KvStore, MemoryStore};
pub use transcript::{EntryKind, Transcript, TranscriptEntry};
