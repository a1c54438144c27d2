//! Terminal effect sink: turns engine effects into printed output.

use engine::{Effect, EffectSink, EntryKind, TranscriptEntry};
use std::fs;
use std::io::{self, Write};

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";

fn accent_code(color: &str) -> &'static str {
    match color {
        "green" => "\x1b[32m",
        "blue" => "\x1b[34m",
        "purple" => "\x1b[35m",
        "orange" => "\x1b[33m",
        "yellow" => "\x1b[93m",
        _ => "\x1b[31m", // red
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        _ => "jpg",
    }
}

pub struct TerminalSink {
    accent: &'static str,
    /// True while fragments of the current reply have been printed, so the
    /// committed entry is not printed a second time.
    streamed: bool,
}

impl TerminalSink {
    pub fn new(accent: &str) -> Self {
        Self {
            accent: accent_code(accent),
            streamed: false,
        }
    }

    pub fn set_accent(&mut self, color: &str) {
        self.accent = accent_code(color);
    }

    pub fn notice(&self, message: &str) {
        println!("{DIM}{message}{RESET}");
    }

    pub fn print_entry(&mut self, entry: &TranscriptEntry) {
        match entry.kind {
            EntryKind::User => {
                println!("{DIM}you> {}{RESET}", entry.text);
            }
            EntryKind::Assistant => {
                if self.streamed {
                    // Body already on screen fragment by fragment.
                    self.streamed = false;
                    println!();
                } else {
                    println!("{}guro>{} {}", self.accent, RESET, entry.display_text());
                }
                self.print_extras(entry);
            }
            EntryKind::Info => {
                println!("{DIM}· {}{RESET}", entry.text);
            }
            EntryKind::Error => {
                println!("{RED}error: {}{RESET}", entry.text);
            }
        }
    }

    fn print_extras(&self, entry: &TranscriptEntry) {
        if !entry.citations.is_empty() {
            println!("{DIM}Sources:{RESET}");
            for citation in &entry.citations {
                println!("  - {} ({})", citation.label(), citation.uri);
            }
        }
        if let Some(image) = &entry.image {
            let path = std::env::temp_dir().join(format!(
                "guro-{}.{}",
                entry.id,
                extension_for(&image.mime_type)
            ));
            match fs::write(&path, &image.bytes) {
                Ok(()) => println!("{DIM}Image saved to {}{RESET}", path.display()),
                Err(err) => tracing::debug!(%err, "could not save generated image"),
            }
        }
    }
}

impl EffectSink for TerminalSink {
    fn handle(&mut self, effect: Effect) {
        match effect {
            Effect::InputLocked(true) => {
                println!("{DIM}Guro is thinking...{RESET}");
            }
            Effect::InputLocked(false) => {}
            Effect::Fragment(fragment) => {
                if !self.streamed {
                    print!("{}guro>{} ", self.accent, RESET);
                    self.streamed = true;
                }
                print!("{fragment}");
                let _ = io::stdout().flush();
            }
            Effect::Entry(entry) => self.print_entry(&entry),
            Effect::TranscriptCleared => println!(),
            Effect::Notice(message) => self.notice(&message),
            Effect::PresetsChanged(_) => {}
        }
    }
}
