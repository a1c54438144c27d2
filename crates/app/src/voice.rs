//! Process-backed speech implementations.
//!
//! Commands are configured as templates: `{lang}` and `{text}` are replaced
//! per argument, and the text is appended as a final argument when no
//! `{text}` placeholder is present. Examples:
//! `espeak-ng -v {lang} {text}`, `say {text}`, `my-stt --lang {lang}`.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use engine::speech::{SpeechVoice, Transcriber};
use tokio::process::{Child, Command};

fn build_args(template: &str, language: &str, text: Option<&str>) -> Result<(String, Vec<String>)> {
    let mut words = template.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| anyhow!("empty speech command"))?
        .to_string();
    let mut args: Vec<String> = Vec::new();
    let mut text_placed = text.is_none();
    for word in words {
        let mut arg = word.replace("{lang}", language);
        if let Some(text) = text {
            if arg.contains("{text}") {
                arg = arg.replace("{text}", text);
                text_placed = true;
            }
        }
        args.push(arg);
    }
    if !text_placed {
        args.push(text.unwrap_or_default().to_string());
    }
    Ok((program, args))
}

/// Speaks by spawning the configured command; cancelling kills the child.
pub struct ProcessVoice {
    command: Option<String>,
    child: Option<Child>,
}

impl ProcessVoice {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            child: None,
        }
    }
}

#[async_trait]
impl SpeechVoice for ProcessVoice {
    async fn speak(&mut self, text: &str, language: &str) -> Result<()> {
        let Some(template) = &self.command else {
            bail!("no speech command configured");
        };
        let (program, args) = build_args(template, language, Some(text))?;
        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()?;
        self.child = Some(child);
        Ok(())
    }

    async fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill().await;
        }
    }

    fn is_speaking(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }
}

/// Runs the configured recognition command and reads one final transcript
/// from its stdout. No interim results.
pub struct CommandTranscriber {
    command: String,
}

impl CommandTranscriber {
    pub fn new(command: String) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Transcriber for CommandTranscriber {
    async fn listen(&mut self, language: &str) -> Result<String> {
        let (program, args) = build_args(&self.command, language, None)?;
        let output = Command::new(program).args(args).output().await?;
        if !output.status.success() {
            bail!(
                "speech recognition failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if transcript.is_empty() {
            bail!("no speech detected");
        }
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args_substitutes_placeholders() {
        let (program, args) =
            build_args("espeak-ng -v {lang} {text}", "en-US", Some("hello world")).unwrap();
        assert_eq!(program, "espeak-ng");
        assert_eq!(args, ["-v", "en-US", "hello world"]);
    }

    #[test]
    fn test_build_args_appends_text_without_placeholder() {
        let (program, args) = build_args("say", "en-US", Some("hi")).unwrap();
        assert_eq!(program, "say");
        assert_eq!(args, ["hi"]);
    }

    #[tokio::test]
    async fn test_transcriber_returns_stdout() {
        let mut transcriber = CommandTranscriber::new("echo {lang} ok".into());
        let transcript = transcriber.listen("en-US").await.unwrap();
        assert_eq!(transcript, "en-US ok");
    }

    #[tokio::test]
    async fn test_transcriber_empty_output_is_an_error() {
        let mut transcriber = CommandTranscriber::new("true".into());
        assert!(transcriber.listen("en-US").await.is_err());
    }

    #[tokio::test]
    async fn test_voice_cancel_stops_playback() {
        let mut voice = ProcessVoice::new(Some("sleep {text}".into()));
        voice.speak("5", "en-US").await.unwrap();
        assert!(voice.is_speaking());
        voice.cancel().await;
        assert!(!voice.is_speaking());
    }

    #[tokio::test]
    async fn test_voice_without_command_errors() {
        let mut voice = ProcessVoice::new(None);
        assert!(voice.speak("hi", "en-US").await.is_err());
    }
}
