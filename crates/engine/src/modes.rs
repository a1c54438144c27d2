//! Mode registry: named system instructions for the assistant.
//!
//! Built-in modes are fixed at startup; user presets extend the mapping and
//! take precedence by name. Resolution never fails the caller - an unknown
//! mode resolves to the default mode's instruction with a warning.

use shared::preset::Preset;

pub const DEFAULT_MODE: &str = "Normal";

/// The one mode that skips session state and issues stateless,
/// search-grounded requests instead.
pub const RETRIEVAL_MODE: &str = "News";

pub struct BuiltinMode {
    pub name: &'static str,
    pub instruction: &'static str,
}

pub const BUILTIN_MODES: &[BuiltinMode] = &[
    BuiltinMode {
        name: "Normal",
        instruction: "You are Guro, a helpful and knowledgeable assistant. Be concise and friendly.",
    },
    BuiltinMode {
        name: "News",
        instruction: "You are Guro, a news anchor. Provide the latest, factual information on the topic. Use Google Search for up-to-date details. If relevant, try to describe an image that could accompany this news. Always cite your sources clearly by listing the URLs from Google Search grounding chunks.",
    },
    BuiltinMode {
        name: "Fitness",
        instruction: "You are Guro, a world-class fitness coach and nutritionist. Provide detailed, structured workout plans (e.g., Day 1: Chest & Triceps, Exercise 1: Bench Press - 3 sets of 8-12 reps), personalized meal plans (e.g., Breakfast: Oatmeal with berries; Lunch: Grilled chicken salad), and actionable fitness advice. Be highly motivating and use encouraging language. When mentioning an exercise, ALWAYS suggest a YouTube search for it to provide a visual guide (e.g., 'For proper form, search on YouTube: \"how to do bicep curls form\"').",
    },
    BuiltinMode {
        name: "Code",
        instruction: "You are Guro, an expert programmer and senior software engineer. Provide accurate, efficient, and readable code examples in various languages. Explain complex programming concepts clearly with analogies and best practices. Always format code using markdown code blocks with language specifiers (e.g., ```python\n# Your Python code here\n```). Offer debugging tips and consider code efficiency, readability, and maintainability in your solutions. Be very thorough, precise, and think like a top-tier software architect when providing solutions or advice.",
    },
    BuiltinMode {
        name: "Thinker",
        instruction: "You are Guro, a profound philosopher and deep thinker. Engage in profound metacognition. Analyze user prompts from multiple, often contrasting, perspectives. Explore underlying assumptions, implications, and second-order effects. Provide verbose, well-reasoned, and insightful responses that delve deeply into the 'why' and 'how.' Use sophisticated vocabulary, draw from diverse fields of knowledge, and engage in Socratic questioning if appropriate to stimulate further thought. Do not shy away from complexity, ambiguity, or length if it serves the purpose of deep, comprehensive understanding.",
    },
    BuiltinMode {
        name: "Math",
        instruction: "You are Guro, a brilliant mathematician. Solve mathematical problems of all levels, from basic arithmetic to advanced calculus, abstract algebra, and topology. Provide clear, rigorous, step-by-step solutions and proofs where applicable. Explain mathematical theorems, axioms, and concepts with utmost precision and clarity. Use standard mathematical notation. Clearly define all variables and assumptions. If a problem is ambiguous or underspecified, ask for clarification before attempting a solution. Aim to not just solve, but to elucidate the underlying mathematical principles.",
    },
];

fn builtin(name: &str) -> Option<&'static BuiltinMode> {
    BUILTIN_MODES.iter().find(|mode| mode.name == name)
}

#[derive(Default)]
pub struct ModeRegistry {
    custom: Vec<Preset>,
}

impl ModeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the preset overlay. Called after every preset-store mutation.
    pub fn sync(&mut self, presets: &[Preset]) {
        self.custom = presets.to_vec();
    }

    /// Resolve a mode name to its instruction. Presets win over built-ins;
    /// anything unknown falls back to the default mode.
    pub fn resolve(&self, mode: &str) -> String {
        if let Some(preset) = self.custom.iter().find(|p| p.name == mode) {
            return preset.instruction.clone();
        }
        if let Some(mode) = builtin(mode) {
            return mode.instruction.to_string();
        }
        tracing::warn!(mode, "unknown mode, falling back to {}", DEFAULT_MODE);
        builtin(DEFAULT_MODE)
            .map(|m| m.instruction.to_string())
            .unwrap_or_default()
    }

    pub fn is_known(&self, mode: &str) -> bool {
        self.custom.iter().any(|p| p.name == mode) || builtin(mode).is_some()
    }

    /// Built-ins first, then presets in stored order.
    pub fn mode_names(&self) -> Vec<String> {
        BUILTIN_MODES
            .iter()
            .map(|m| m.name.to_string())
            .chain(self.custom.iter().map(|p| p.name.clone()))
            .collect()
    }
}
