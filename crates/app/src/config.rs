//! Settings file handling.
//!
//! Settings live in one JSON file under the user config dir. A missing file
//! is created with defaults on first run so users have something to edit;
//! the API key itself normally comes from `GEMINI_API_KEY` (the provider
//! clients fall back to it when the file carries no key).

use shared::settings::AppSettings;
use std::fs;
use std::path::{Path, PathBuf};

pub fn settings_path() -> PathBuf {
    directories::ProjectDirs::from("com.local", "Guro", "Guro")
        .map(|dirs| dirs.config_dir().join("settings.json"))
        .unwrap_or_else(|| PathBuf::from("./guro-settings.json"))
}

pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> AppSettings {
    match fs::read_to_string(path) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(err) => {
                tracing::warn!(%err, path = %path.display(), "settings file unreadable, using defaults");
                AppSettings::default()
            }
        },
        Err(_) => {
            let settings = AppSettings::default();
            write_default(path, &settings);
            settings
        }
    }
}

fn write_default(path: &Path, settings: &AppSettings) {
    let Ok(json) = serde_json::to_string_pretty(settings) else {
        return;
    };
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::debug!(%err, "could not create config dir");
            return;
        }
    }
    if let Err(err) = fs::write(path, json) {
        tracing::debug!(%err, "could not write default settings file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults_and_writes_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = load_settings_from(&path);
        assert_eq!(settings.model.text_model, "gemini-2.5-flash-preview-04-17");
        assert!(path.exists());
    }

    #[test]
    fn test_existing_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut settings = AppSettings::default();
        settings.gemini_auth.api_key = Some("test-key".into());
        settings.speech.language = "sv-SE".into();
        fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();

        let loaded = load_settings_from(&path);
        assert_eq!(loaded.gemini_auth.api_key.as_deref(), Some("test-key"));
        assert_eq!(loaded.speech.language, "sv-SE");
    }

    #[test]
    fn test_corrupt_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{nope").unwrap();
        let settings = load_settings_from(&path);
        assert!(settings.gemini_auth.api_key.is_none());
    }
}
