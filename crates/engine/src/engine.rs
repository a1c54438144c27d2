//! Application state and command dispatch.
//!
//! All mutation funnels through [`Engine::apply`]; the front end observes
//! results purely through [`Effect`] values delivered to its sink. The
//! engine never touches the terminal.

use std::sync::Arc;

use shared::chat::{ChatPart, StreamChunk};
use shared::preset::Preset;
use shared::settings::{
    normalize_accent, Theme, ACCENT_KEY, LAST_MODE_KEY, THEME_KEY,
};
use tokio::sync::mpsc;

use crate::accumulator::ResponseAccumulator;
use crate::backend::ChatBackend;
use crate::modes::{ModeRegistry, DEFAULT_MODE, RETRIEVAL_MODE};
use crate::presets::{PresetError, PresetStore};
use crate::session::SessionHandle;
use crate::store::KvStore;
use crate::transcript::{Transcript, TranscriptEntry};

const WELCOME: &str = "Welcome to Guro! I'm here to help. Select a mode or ask me anything.";
const INIT_ERROR: &str = "Could not initialize AI. The API key might be missing or invalid.";
const NOT_READY: &str = "AI is not initialized. Check the API key configuration.";

// A grounded answer this short is not worth illustrating.
const IMAGE_MIN_CHARS: usize = 20;
const IMAGE_PROMPT_PREFIX_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq)]
pub struct ImageAttachment {
    /// Base64-encoded bytes, ready for the wire.
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRef {
    pub file_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserDraft {
    pub text: String,
    pub image: Option<ImageAttachment>,
    pub document: Option<DocumentRef>,
}

impl UserDraft {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Nothing to send: blank text and no attachment of either kind.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image.is_none() && self.document.is_none()
    }
}

/// The closed set of user intents.
#[derive(Debug, Clone)]
pub enum Command {
    Send(UserDraft),
    SwitchMode(String),
    ClearChat,
    SavePreset {
        slot: Option<usize>,
        name: String,
        instruction: String,
    },
    DeletePreset(usize),
    SetTheme(Theme),
    SetAccent(String),
}

/// Observable output of a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Input affordances should be disabled (`true`) for the duration of a
    /// dispatch. Advisory - the engine does not enforce it.
    InputLocked(bool),
    /// One streamed fragment, already appended to the in-flight buffer.
    Fragment(String),
    /// An entry was committed to the transcript.
    Entry(TranscriptEntry),
    TranscriptCleared,
    /// Transient, non-transcript notification.
    Notice(String),
    PresetsChanged(Vec<Preset>),
}

pub trait EffectSink: Send {
    fn handle(&mut self, effect: Effect);
}

impl EffectSink for Vec<Effect> {
    fn handle(&mut self, effect: Effect) {
        self.push(effect);
    }
}

pub struct Engine {
    backend: Option<Arc<dyn ChatBackend>>,
    kv: Box<dyn KvStore + Send>,
    registry: ModeRegistry,
    presets: PresetStore,
    session: Option<SessionHandle>,
    active_mode: String,
    transcript: Transcript,
    theme: Theme,
    accent: String,
    locked: bool,
}

impl Engine {
    /// Build the engine from persisted state. `backend: None` means the
    /// service client failed to initialize; the failure is surfaced once
    /// here and every session operation afterwards is a notifying no-op.
    pub fn new(backend: Option<Arc<dyn ChatBackend>>, kv: Box<dyn KvStore + Send>) -> Self {
        let presets = PresetStore::load(kv.as_ref());
        let mut registry = ModeRegistry::new();
        registry.sync(presets.list());

        let theme = kv
            .get(THEME_KEY)
            .map(|v| Theme::parse(&v))
            .unwrap_or_default();
        let accent = normalize_accent(&kv.get(ACCENT_KEY).unwrap_or_default()).to_string();

        // Last-selected mode wins when it still resolves; anything stale
        // drops to the default.
        let active_mode = match kv.get(LAST_MODE_KEY) {
            Some(stored) if registry.is_known(&stored) => stored,
            Some(stale) => {
                tracing::warn!(%stale, "stored mode no longer exists, using {}", DEFAULT_MODE);
                DEFAULT_MODE.to_string()
            }
            None => DEFAULT_MODE.to_string(),
        };

        let disabled = backend.is_none();
        let mut engine = Self {
            backend,
            kv,
            registry,
            presets,
            session: None,
            active_mode,
            transcript: Transcript::new(),
            theme,
            accent,
            locked: disabled,
        };
        let resolved_mode = engine.active_mode.clone();
        if let Err(err) = engine.kv.set(LAST_MODE_KEY, &resolved_mode) {
            tracing::warn!(%err, "failed to persist mode selection");
        }
        engine.session = engine.create_session();

        if disabled {
            engine.transcript.push(TranscriptEntry::error(INIT_ERROR));
        } else {
            engine.transcript.push(TranscriptEntry::info(WELCOME));
        }
        engine
    }

    pub fn active_mode(&self) -> &str {
        &self.active_mode
    }

    pub fn mode_names(&self) -> Vec<String> {
        self.registry.mode_names()
    }

    pub fn presets(&self) -> &[Preset] {
        self.presets.list()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn accent(&self) -> &str {
        &self.accent
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub async fn apply(&mut self, command: Command, sink: &mut dyn EffectSink) {
        match command {
            Command::Send(draft) => self.send(draft, sink).await,
            Command::SwitchMode(mode) => self.switch_mode(&mode, sink),
            Command::ClearChat => self.clear_chat(sink),
            Command::SavePreset {
                slot,
                name,
                instruction,
            } => {
                let _ = self.save_preset(slot, &name, &instruction, sink);
            }
            Command::DeletePreset(index) => {
                let _ = self.delete_preset(index, sink);
            }
            Command::SetTheme(theme) => self.set_theme(theme),
            Command::SetAccent(color) => self.set_accent(&color),
        }
    }

    // ── Mode / session lifecycle ─────────────────────────────────────

    /// A fresh handle for the active mode, or `None` for the retrieval
    /// mode and for a disabled engine.
    fn create_session(&self) -> Option<SessionHandle> {
        if self.backend.is_none() || self.active_mode == RETRIEVAL_MODE {
            return None;
        }
        Some(SessionHandle::new(self.registry.resolve(&self.active_mode)))
    }

    pub fn switch_mode(&mut self, mode: &str, sink: &mut dyn EffectSink) {
        if self.backend.is_none() {
            sink.handle(Effect::Notice(NOT_READY.to_string()));
            return;
        }
        self.active_mode = mode.to_string();
        if let Err(err) = self.kv.set(LAST_MODE_KEY, mode) {
            tracing::warn!(%err, "failed to persist mode selection");
        }
        self.transcript.clear();
        sink.handle(Effect::TranscriptCleared);
        self.session = self.create_session();
        self.push_entry(TranscriptEntry::info(format!("Switched to {} mode.", mode)), sink);
    }

    pub fn clear_chat(&mut self, sink: &mut dyn EffectSink) {
        if self.backend.is_none() {
            sink.handle(Effect::Notice(NOT_READY.to_string()));
            return;
        }
        self.transcript.clear();
        sink.handle(Effect::TranscriptCleared);
        self.session = self.create_session();
        self.push_entry(TranscriptEntry::info("Chat cleared."), sink);
    }

    // ── Presets ──────────────────────────────────────────────────────

    pub fn save_preset(
        &mut self,
        slot: Option<usize>,
        name: &str,
        instruction: &str,
        sink: &mut dyn EffectSink,
    ) -> Result<Preset, PresetError> {
        let preset = match self.presets.upsert(slot, name, instruction) {
            Ok(preset) => preset,
            Err(err) => {
                sink.handle(Effect::Notice(err.to_string()));
                return Err(err);
            }
        };
        self.commit_presets(sink);
        self.resync_session();
        let verb = if slot.is_some() { "updated" } else { "created" };
        sink.handle(Effect::Notice(format!("Mode \"{}\" {}.", preset.name, verb)));
        Ok(preset)
    }

    pub fn delete_preset(
        &mut self,
        index: usize,
        sink: &mut dyn EffectSink,
    ) -> Result<Preset, PresetError> {
        let removed = match self.presets.remove(index) {
            Ok(removed) => removed,
            Err(err) => {
                sink.handle(Effect::Notice(err.to_string()));
                return Err(err);
            }
        };
        self.commit_presets(sink);
        sink.handle(Effect::Notice(format!("Mode \"{}\" deleted.", removed.name)));

        // Deleting the preset backing the current selection drops the
        // selection to the default mode.
        if !self.registry.is_known(&self.active_mode) {
            self.switch_mode(DEFAULT_MODE, sink);
        } else {
            self.resync_session();
        }
        Ok(removed)
    }

    /// A preset mutation can change what the active mode resolves to. A
    /// live handle bound to a stale instruction is replaced on the spot.
    fn resync_session(&mut self) {
        let expected = self.registry.resolve(&self.active_mode);
        let stale = self
            .session
            .as_ref()
            .is_some_and(|session| session.instruction() != expected);
        if stale {
            self.session = Some(SessionHandle::new(expected));
        }
    }

    fn commit_presets(&mut self, sink: &mut dyn EffectSink) {
        if let Err(err) = self.presets.save(self.kv.as_mut()) {
            tracing::warn!(%err, "failed to persist custom modes");
            sink.handle(Effect::Notice(format!("Failed to save modes: {}", err)));
        }
        self.registry.sync(self.presets.list());
        sink.handle(Effect::PresetsChanged(self.presets.list().to_vec()));
    }

    // ── Preferences ──────────────────────────────────────────────────

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        if let Err(err) = self.kv.set(THEME_KEY, theme.as_str()) {
            tracing::warn!(%err, "failed to persist theme");
        }
    }

    pub fn set_accent(&mut self, color: &str) {
        let color = normalize_accent(color);
        self.accent = color.to_string();
        if let Err(err) = self.kv.set(ACCENT_KEY, color) {
            tracing::warn!(%err, "failed to persist accent color");
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────────

    pub async fn send(&mut self, draft: UserDraft, sink: &mut dyn EffectSink) {
        let Some(backend) = self.backend.clone() else {
            sink.handle(Effect::Notice(NOT_READY.to_string()));
            return;
        };
        if draft.is_empty() {
            return;
        }

        self.locked = true;
        sink.handle(Effect::InputLocked(true));

        // Echo the user's turn, with a placeholder when only an attachment
        // was provided.
        let prompt_text = draft.text.trim().to_string();
        let shown = if !prompt_text.is_empty() {
            prompt_text.clone()
        } else if draft.image.is_some() {
            "Analyze this image".to_string()
        } else {
            format!(
                "Regarding the file: {}",
                draft.document.as_ref().map(|d| d.file_name.as_str()).unwrap_or_default()
            )
        };
        self.push_entry(TranscriptEntry::user(shown), sink);

        let mut parts: Vec<ChatPart> = Vec::new();
        if !prompt_text.is_empty() {
            parts.push(ChatPart::Text(prompt_text));
        }
        if let Some(image) = &draft.image {
            parts.push(ChatPart::InlineImage {
                data: image.data.clone(),
                mime_type: image.mime_type.clone(),
            });
        }
        if let Some(doc) = &draft.document {
            // Document contents are never transmitted; the model only gets
            // a note naming the file.
            parts.push(ChatPart::Text(format!(
                "User uploaded a PDF named \"{0}\". You cannot read PDF content directly. \
                 Remind the user that for PDF content analysis, they need to manually \
                 extract and paste the relevant text.",
                doc.file_name
            )));
            self.push_entry(
                TranscriptEntry::info(format!(
                    "Note: Guro cannot read \"{}\" directly. Paste the relevant text if you \
                     want its content analyzed.",
                    doc.file_name
                )),
                sink,
            );
        }

        if self.active_mode == RETRIEVAL_MODE {
            self.send_grounded(backend, parts, sink).await;
        } else if self.session.is_some() {
            self.send_streaming(backend, parts, sink).await;
        } else {
            self.send_single_shot(backend, parts, sink).await;
        }

        self.locked = false;
        sink.handle(Effect::InputLocked(false));
    }

    async fn send_streaming(
        &mut self,
        backend: Arc<dyn ChatBackend>,
        parts: Vec<ChatPart>,
        sink: &mut dyn EffectSink,
    ) {
        let (instruction, messages) = match self.session.as_ref() {
            Some(session) => (
                session.instruction().to_string(),
                session.request_messages(parts.clone()),
            ),
            None => return,
        };

        let (tx, mut rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(async move {
            backend.stream_reply(&instruction, messages, tx).await
        });

        let mut buffer = ResponseAccumulator::new();
        let mut failure: Option<String> = None;
        while let Some(chunk) = rx.recv().await {
            match chunk {
                StreamChunk::Text(fragment) => {
                    buffer.push(&fragment);
                    sink.handle(Effect::Fragment(fragment));
                }
                StreamChunk::Done { stop_reason } => {
                    if let Some(reason) = stop_reason {
                        tracing::debug!(%reason, "stream finished");
                    }
                    break;
                }
                StreamChunk::Error(message) => {
                    failure = Some(message);
                    break;
                }
            }
        }
        drop(rx);

        match worker.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                if failure.is_none() {
                    failure = Some(err.to_string());
                }
            }
            Err(err) => {
                if failure.is_none() {
                    failure = Some(format!("response worker failed: {}", err));
                }
            }
        }

        if let Some(message) = failure {
            // Already-delivered fragments are committed as-is; an empty
            // buffer is discarded entirely.
            if !buffer.is_empty() {
                self.push_entry(TranscriptEntry::assistant(buffer.into_text()), sink);
            }
            self.push_entry(
                TranscriptEntry::error(format!("Guro error: {}", message)),
                sink,
            );
            return;
        }

        let text = buffer.into_text();
        if let Some(session) = self.session.as_mut() {
            session.record_turn(parts, &text);
        }
        self.push_entry(TranscriptEntry::assistant(text), sink);
    }

    /// Stateless fallback when a non-retrieval mode has no live session.
    async fn send_single_shot(
        &mut self,
        backend: Arc<dyn ChatBackend>,
        parts: Vec<ChatPart>,
        sink: &mut dyn EffectSink,
    ) {
        let instruction = self.registry.resolve(&self.active_mode);
        let messages = vec![shared::chat::ChatMessage::user(parts)];
        match backend.complete(&instruction, messages).await {
            Ok(text) => self.push_entry(TranscriptEntry::assistant(text), sink),
            Err(err) => self.push_entry(
                TranscriptEntry::error(format!("Guro error: {}", err)),
                sink,
            ),
        }
    }

    async fn send_grounded(
        &mut self,
        backend: Arc<dyn ChatBackend>,
        parts: Vec<ChatPart>,
        sink: &mut dyn EffectSink,
    ) {
        let instruction = self.registry.resolve(&self.active_mode);
        let messages = vec![shared::chat::ChatMessage::user(parts)];
        let answer = match backend.grounded_reply(&instruction, messages).await {
            Ok(answer) => answer,
            Err(err) => {
                self.push_entry(
                    TranscriptEntry::error(format!("Guro error: {}", err)),
                    sink,
                );
                return;
            }
        };

        let mut entry =
            TranscriptEntry::assistant(answer.text.clone()).with_citations(answer.citations);

        if answer.text.chars().count() > IMAGE_MIN_CHARS {
            let prefix: String = answer.text.chars().take(IMAGE_PROMPT_PREFIX_CHARS).collect();
            let prompt = format!("A news headline image related to: {}", prefix);
            // Best effort: a failed illustration never affects the answer.
            match backend.render_image(&prompt).await {
                Ok(image) => entry.image = Some(image),
                Err(err) => tracing::debug!(%err, "headline image generation failed"),
            }
        }
        self.push_entry(entry, sink);
    }

    fn push_entry(&mut self, entry: TranscriptEntry, sink: &mut dyn EffectSink) {
        let stored = self.transcript.push(entry);
        sink.handle(Effect::Entry(stored.clone()));
    }
}
