//! Guro - terminal chat client for the Gemini API.

mod attach;
mod config;
mod render;
mod voice;

use anyhow::Result;
use engine::speech::{SpeechController, Transcriber};
use engine::{
    ChatBackend, Command, DocumentRef, Engine, FileStore, GeminiBackend, ImageAttachment,
    UserDraft,
};
use render::TerminalSink;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::Path;
use std::sync::Arc;
use voice::{CommandTranscriber, ProcessVoice};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = config::load_settings();
    let backend: Option<Arc<dyn ChatBackend>> = match GeminiBackend::from_settings(&settings) {
        Ok(backend) => Some(Arc::new(backend)),
        Err(err) => {
            tracing::error!(%err, "AI client initialization failed");
            None
        }
    };

    let engine = Engine::new(backend, Box::new(FileStore::open_default()));
    let mut sink = TerminalSink::new(engine.accent());
    for entry in engine.transcript().entries() {
        sink.print_entry(entry);
    }

    let mut app = App {
        engine,
        sink,
        voice: SpeechController::new(ProcessVoice::new(settings.speech.speak_command.clone())),
        transcriber: settings
            .speech
            .listen_command
            .clone()
            .map(CommandTranscriber::new),
        language: settings.speech.language.clone(),
        pending_image: None,
        pending_document: None,
    };
    app.run().await
}

enum LoopAction {
    Continue,
    Quit,
}

struct App {
    engine: Engine,
    sink: TerminalSink,
    voice: SpeechController<ProcessVoice>,
    transcriber: Option<CommandTranscriber>,
    language: String,
    pending_image: Option<ImageAttachment>,
    pending_document: Option<DocumentRef>,
}

impl App {
    async fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new()?;
        loop {
            let prompt = format!("[{}]> ", self.engine.active_mode());
            let line = match editor.readline(&prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            };
            let line = line.trim().to_string();
            if line.is_empty() {
                continue;
            }
            let _ = editor.add_history_entry(&line);
            match self.handle_line(&line).await? {
                LoopAction::Quit => break,
                LoopAction::Continue => {}
            }
        }
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Result<LoopAction> {
        if let Some(rest) = line.strip_prefix('/') {
            return self.handle_slash(rest.trim()).await;
        }
        let draft = UserDraft {
            text: line.to_string(),
            image: self.pending_image.take(),
            document: self.pending_document.take(),
        };
        self.engine.apply(Command::Send(draft), &mut self.sink).await;
        Ok(LoopAction::Continue)
    }

    async fn handle_slash(&mut self, input: &str) -> Result<LoopAction> {
        let (name, rest) = input.split_once(' ').unwrap_or((input, ""));
        let rest = rest.trim();
        match name {
            "quit" | "exit" => return Ok(LoopAction::Quit),
            "help" => self.print_help(),
            "modes" => {
                for mode in self.engine.mode_names() {
                    println!("  {mode}");
                }
            }
            "mode" => {
                if rest.is_empty() {
                    self.sink.notice("usage: /mode <name>");
                } else {
                    self.engine
                        .apply(Command::SwitchMode(rest.to_string()), &mut self.sink)
                        .await;
                }
            }
            "clear" => self.engine.apply(Command::ClearChat, &mut self.sink).await,
            "presets" => {
                if self.engine.presets().is_empty() {
                    self.sink.notice("No custom modes yet. Try /preset add.");
                }
                for (index, preset) in self.engine.presets().iter().enumerate() {
                    println!("  {index}: {} = {}", preset.name, preset.instruction);
                }
            }
            "preset" => self.handle_preset(rest),
            "theme" => {
                let theme = self.engine.theme().toggled();
                self.engine
                    .apply(Command::SetTheme(theme), &mut self.sink)
                    .await;
                self.sink
                    .notice(&format!("Theme set to {}.", theme.as_str()));
            }
            "accent" => {
                if rest.is_empty() {
                    self.sink
                        .notice("usage: /accent <red|green|blue|purple|orange|yellow>");
                } else {
                    self.engine
                        .apply(Command::SetAccent(rest.to_string()), &mut self.sink)
                        .await;
                    let accent = self.engine.accent().to_string();
                    self.sink.set_accent(&accent);
                    self.sink.notice(&format!("Accent set to {accent}."));
                }
            }
            "image" => match attach::load_image(Path::new(rest)) {
                Ok(image) => {
                    self.pending_image = Some(image);
                    self.sink.notice("Image attached to the next message.");
                }
                Err(err) => self.sink.notice(&format!("Could not attach image: {err}")),
            },
            "pdf" => match attach::document_ref(Path::new(rest)) {
                Ok(doc) => {
                    let file_name = doc.file_name.clone();
                    self.pending_document = Some(doc);
                    self.sink
                        .notice(&format!("Attached {file_name} to the next message."));
                }
                Err(err) => self.sink.notice(&format!("Could not attach file: {err}")),
            },
            "detach" => {
                self.pending_image = None;
                self.pending_document = None;
                self.sink.notice("Attachments cleared.");
            }
            "speak" => self.speak_last().await,
            "listen" => self.listen_and_send().await,
            other => self
                .sink
                .notice(&format!("Unknown command: /{other} (try /help)")),
        }
        Ok(LoopAction::Continue)
    }

    fn handle_preset(&mut self, rest: &str) {
        let (verb, args) = rest.split_once(' ').unwrap_or((rest, ""));
        let args = args.trim();
        match verb {
            "add" => match args.split_once('=') {
                Some((name, instruction)) => {
                    let _ =
                        self.engine
                            .save_preset(None, name.trim(), instruction.trim(), &mut self.sink);
                }
                None => self.sink.notice("usage: /preset add <name> = <instruction>"),
            },
            "edit" => {
                let (index, definition) = args.split_once(' ').unwrap_or((args, ""));
                match (index.parse::<usize>(), definition.split_once('=')) {
                    (Ok(index), Some((name, instruction))) => {
                        let _ = self.engine.save_preset(
                            Some(index),
                            name.trim(),
                            instruction.trim(),
                            &mut self.sink,
                        );
                    }
                    _ => self
                        .sink
                        .notice("usage: /preset edit <index> <name> = <instruction>"),
                }
            }
            "rm" => match args.parse::<usize>() {
                Ok(index) => {
                    let _ = self.engine.delete_preset(index, &mut self.sink);
                }
                Err(_) => self.sink.notice("usage: /preset rm <index>"),
            },
            _ => self.sink.notice("usage: /preset add|edit|rm ..."),
        }
    }

    async fn speak_last(&mut self) {
        let Some(text) = self
            .engine
            .transcript()
            .last_assistant()
            .map(|entry| entry.speakable_text())
        else {
            self.sink.notice("Nothing to speak yet.");
            return;
        };
        if let Err(err) = self.voice.toggle(&text, &self.language).await {
            tracing::debug!(%err, "speech synthesis failed");
            self.sink.notice("Text-to-speech is unavailable.");
        }
    }

    async fn listen_and_send(&mut self) {
        let Some(transcriber) = self.transcriber.as_mut() else {
            self.sink.notice("Speech recognition is not available.");
            return;
        };
        self.sink.notice("Listening...");
        match transcriber.listen(&self.language).await {
            Ok(transcript) => {
                self.sink.notice(&format!("Heard: {transcript}"));
                let draft = UserDraft {
                    text: transcript,
                    image: self.pending_image.take(),
                    document: self.pending_document.take(),
                };
                self.engine.apply(Command::Send(draft), &mut self.sink).await;
            }
            Err(err) => self.sink.notice(&format!("Speech error: {err}")),
        }
    }

    fn print_help(&self) {
        println!("  /mode <name>                        switch mode");
        println!("  /modes                              list modes");
        println!("  /clear                              clear the conversation");
        println!("  /presets                            list custom modes");
        println!("  /preset add <name> = <instruction>  create a custom mode");
        println!("  /preset edit <n> <name> = <instr>   edit a custom mode");
        println!("  /preset rm <n>                      delete a custom mode");
        println!("  /image <path>                       attach an image to the next message");
        println!("  /pdf <path>                         reference a document by name");
        println!("  /detach                             drop staged attachments");
        println!("  /speak                              speak (or stop speaking) the last reply");
        println!("  /listen                             voice input via the configured command");
        println!("  /theme                              toggle light/dark");
        println!("  /accent <color>                     set the accent color");
        println!("  /quit                               exit");
    }
}
