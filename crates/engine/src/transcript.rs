//! Append-only display log of the current conversation.

use chrono::{DateTime, Utc};
use shared::chat::{Citation, GeneratedImage};
use uuid::Uuid;

use crate::markup;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    Info,
    Error,
}

/// One immutable entry. Entries are never edited or retracted; a failed
/// stream commits whatever arrived and then appends a separate error entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptEntry {
    pub id: Uuid,
    pub kind: EntryKind,
    pub text: String,
    pub citations: Vec<Citation>,
    pub image: Option<GeneratedImage>,
    pub timestamp: DateTime<Utc>,
}

impl TranscriptEntry {
    fn new(kind: EntryKind, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            text: text.into(),
            citations: Vec::new(),
            image: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(EntryKind::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(EntryKind::Assistant, text)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(EntryKind::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(EntryKind::Error, text)
    }

    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    /// Styled form of the raw text.
    pub fn display_text(&self) -> String {
        markup::render(&self.text)
    }

    /// Markup-free form, fit for speech synthesis.
    pub fn speakable_text(&self) -> String {
        markup::strip(&self.text)
    }
}

#[derive(Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: TranscriptEntry) -> &TranscriptEntry {
        self.entries.push(entry);
        self.entries.last().expect("just pushed")
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    /// Most recent assistant entry, if any. Used by the speak-reply path.
    pub fn last_assistant(&self) -> Option<&TranscriptEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.kind == EntryKind::Assistant)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_keep_append_order() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::user("q"));
        transcript.push(TranscriptEntry::assistant("a"));
        transcript.push(TranscriptEntry::error("e"));
        let kinds: Vec<_> = transcript.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, [EntryKind::User, EntryKind::Assistant, EntryKind::Error]);
    }

    #[test]
    fn test_clear_empties_log() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::info("hello"));
        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_last_assistant_skips_trailing_error() {
        let mut transcript = Transcript::new();
        transcript.push(TranscriptEntry::assistant("partial"));
        transcript.push(TranscriptEntry::error("boom"));
        assert_eq!(transcript.last_assistant().unwrap().text, "partial");
    }

    #[test]
    fn test_speakable_text_strips_markup() {
        let entry = TranscriptEntry::assistant("**loud** and *soft*");
        assert_eq!(entry.speakable_text(), "loud and soft");
    }
}
