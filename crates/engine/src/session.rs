//! The conversational session handle.
//!
//! A handle is bound to exactly one instruction at creation and never
//! mutated afterwards; changing the instruction means replacing the handle.
//! At most one handle is live per engine.

use chrono::{DateTime, Utc};
use shared::chat::{ChatMessage, ChatPart};

pub struct SessionHandle {
    instruction: String,
    history: Vec<ChatMessage>,
    created_at: DateTime<Utc>,
}

impl SessionHandle {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Prior turns plus the new user turn, in request order.
    pub fn request_messages(&self, parts: Vec<ChatPart>) -> Vec<ChatMessage> {
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(parts));
        messages
    }

    /// Record one completed exchange.
    pub fn record_turn(&mut self, user_parts: Vec<ChatPart>, reply: &str) {
        self.history.push(ChatMessage::user(user_parts));
        self.history.push(ChatMessage::assistant(reply));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_binds_instruction() {
        let session = SessionHandle::new("Review code critically");
        assert_eq!(session.instruction(), "Review code critically");
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_record_turn_appends_both_roles() {
        let mut session = SessionHandle::new("x");
        session.record_turn(vec![ChatPart::Text("hi".into())], "hello there");
        let roles: Vec<_> = session.history().iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["user", "assistant"]);
        assert_eq!(session.history()[1].joined_text(), "hello there");
    }

    #[test]
    fn test_request_messages_end_with_new_turn() {
        let mut session = SessionHandle::new("x");
        session.record_turn(vec![ChatPart::Text("first".into())], "reply");
        let messages = session.request_messages(vec![ChatPart::Text("second".into())]);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages.last().unwrap().joined_text(), "second");
        // The handle itself is unchanged.
        assert_eq!(session.history().len(), 2);
    }
}
