//! Speech boundaries.
//!
//! Both directions live behind traits so the core never touches an audio
//! stack: the app supplies process-backed implementations, tests supply
//! fakes. Recognition delivers a single final transcript (no interim
//! results); synthesis follows toggle semantics - asking to speak the text
//! that is currently being spoken stops playback instead of restarting it.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SpeechVoice: Send {
    /// Start speaking; returns once playback has been started, not once it
    /// has finished.
    async fn speak(&mut self, text: &str, language: &str) -> Result<()>;
    async fn cancel(&mut self);
    fn is_speaking(&mut self) -> bool;
}

#[async_trait]
pub trait Transcriber: Send {
    /// Record one utterance and return the final transcript.
    async fn listen(&mut self, language: &str) -> Result<String>;
}

pub struct SpeechController<V: SpeechVoice> {
    voice: V,
    current: Option<String>,
}

impl<V: SpeechVoice> SpeechController<V> {
    pub fn new(voice: V) -> Self {
        Self {
            voice,
            current: None,
        }
    }

    /// Speak `text`, or stop if `text` is already being spoken.
    pub async fn toggle(&mut self, text: &str, language: &str) -> Result<()> {
        if self.voice.is_speaking() && self.current.as_deref() == Some(text) {
            self.voice.cancel().await;
            self.current = None;
            return Ok(());
        }

        // A different utterance replaces whatever is playing.
        self.voice.cancel().await;
        self.voice.speak(text, language).await?;
        self.current = Some(text.to_string());
        Ok(())
    }

    pub fn current_text(&self) -> Option<&str> {
        self.current.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeVoice {
        speaking: Arc<AtomicBool>,
        spoken: Vec<(String, String)>,
        cancels: usize,
    }

    #[async_trait]
    impl SpeechVoice for FakeVoice {
        async fn speak(&mut self, text: &str, language: &str) -> Result<()> {
            self.spoken.push((text.to_string(), language.to_string()));
            self.speaking.store(true, Ordering::SeqCst);
            Ok(())
        }

        async fn cancel(&mut self) {
            self.cancels += 1;
            self.speaking.store(false, Ordering::SeqCst);
        }

        fn is_speaking(&mut self) -> bool {
            self.speaking.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_first_toggle_speaks() {
        let mut controller = SpeechController::new(FakeVoice::default());
        controller.toggle("hello", "en-US").await.unwrap();
        assert_eq!(controller.current_text(), Some("hello"));
        assert_eq!(controller.voice.spoken.len(), 1);
        assert_eq!(controller.voice.spoken[0].1, "en-US");
    }

    #[tokio::test]
    async fn test_same_text_while_speaking_cancels() {
        let mut controller = SpeechController::new(FakeVoice::default());
        controller.toggle("hello", "en-US").await.unwrap();
        controller.toggle("hello", "en-US").await.unwrap();
        assert_eq!(controller.current_text(), None);
        // Only the first toggle actually spoke.
        assert_eq!(controller.voice.spoken.len(), 1);
    }

    #[tokio::test]
    async fn test_different_text_replaces_playback() {
        let mut controller = SpeechController::new(FakeVoice::default());
        controller.toggle("first", "en-US").await.unwrap();
        controller.toggle("second", "en-US").await.unwrap();
        assert_eq!(controller.current_text(), Some("second"));
        assert_eq!(controller.voice.spoken.len(), 2);
    }

    #[tokio::test]
    async fn test_same_text_after_playback_finished_speaks_again() {
        let mut controller = SpeechController::new(FakeVoice::default());
        controller.toggle("hello", "en-US").await.unwrap();
        controller.voice.speaking.store(false, Ordering::SeqCst); // playback ended
        controller.toggle("hello", "en-US").await.unwrap();
        assert_eq!(controller.voice.spoken.len(), 2);
        assert_eq!(controller.current_text(), Some("hello"));
    }
}
