pub mod chat;
pub mod preset;

pub mod settings {
    use serde::{Deserialize, Serialize};

    /// Preference-store keys. Values are opaque strings to everything but
    /// the code that wrote them.
    pub const THEME_KEY: &str = "guro-theme";
    pub const ACCENT_KEY: &str = "guro-accent-color";
    pub const CUSTOM_MODES_KEY: &str = "guro-custom-modes";
    pub const LAST_MODE_KEY: &str = "guro-last-mode";

    /// Accent colors the UI knows how to render. Anything else stored from
    /// an older build falls back to the first entry.
    pub const ACCENT_COLORS: &[&str] = &["red", "green", "blue", "purple", "orange", "yellow"];

    pub fn normalize_accent(color: &str) -> &'static str {
        ACCENT_COLORS
            .iter()
            .find(|c| **c == color)
            .copied()
            .unwrap_or(ACCENT_COLORS[0])
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
    pub enum Theme {
        Light,
        #[default]
        Dark,
    }

    impl Theme {
        pub fn as_str(&self) -> &'static str {
            match self {
                Theme::Light => "light",
                Theme::Dark => "dark",
            }
        }

        /// Parse a stored theme string, defaulting to dark for anything
        /// unrecognized.
        pub fn parse(value: &str) -> Self {
            match value {
                "light" => Theme::Light,
                _ => Theme::Dark,
            }
        }

        pub fn toggled(&self) -> Self {
            match self {
                Theme::Light => Theme::Dark,
                Theme::Dark => Theme::Light,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct GeminiAuth {
        pub api_key: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ModelConfig {
        pub text_model: String,  // e.g., "gemini-2.5-flash-preview-04-17"
        pub image_model: String, // e.g., "imagen-3.0-generate-002"
    }

    impl Default for ModelConfig {
        fn default() -> Self {
            Self {
                text_model: "gemini-2.5-flash-preview-04-17".into(),
                image_model: "imagen-3.0-generate-002".into(),
            }
        }
    }

    /// External speech programs. Both are optional: absent commands simply
    /// disable the corresponding feature.
    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct SpeechSettings {
        /// BCP-47 language tag passed to both directions, e.g. "en-US".
        #[serde(default = "default_language")]
        pub language: String,
        /// Command that speaks its final argument aloud.
        pub speak_command: Option<String>,
        /// Command that records one utterance and prints the transcript to
        /// stdout.
        pub listen_command: Option<String>,
    }

    fn default_language() -> String {
        "en-US".into()
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Default)]
    pub struct AppSettings {
        pub model: ModelConfig,
        pub gemini_auth: GeminiAuth,
        #[serde(default)]
        pub speech: SpeechSettings,
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_normalize_accent_falls_back() {
            assert_eq!(normalize_accent("blue"), "blue");
            assert_eq!(normalize_accent("pink"), "red");
        }

        #[test]
        fn test_theme_parse_unknown_is_dark() {
            assert_eq!(Theme::parse("light"), Theme::Light);
            assert_eq!(Theme::parse("solarized"), Theme::Dark);
        }
    }
}
