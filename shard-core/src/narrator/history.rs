//! Conversation history with a bounded lookback window.
//!
//! The history is append-only apart from the single system message seeded
//! at construction. Sessions can run indefinitely; prompts only ever see
//! a fixed-size suffix.

use ollama::Message;

/// Messages handed to the generation backend per turn.
pub const HISTORY_WINDOW: usize = 6;

/// Messages rendered into the prompt's recent-context block.
pub const PROMPT_CONTEXT_WINDOW: usize = 4;

/// Ordered role-tagged conversation, most recent last.
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    /// Create a history seeded with a system message.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    /// The last `n` messages, or all of them if fewer exist.
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Append a committed turn: the player input and the serialized
    /// validated reply land together. An invalid turn must append nothing.
    pub fn commit_turn(&mut self, player_input: &str, assistant_reply: &str) {
        self.messages.push(Message::user(player_input));
        self.messages.push(Message::assistant(assistant_reply));
    }

    /// Render the last `n` messages as `role: content` lines for prompt
    /// text, or `none` when there is nothing to show.
    pub fn render_recent(&self, n: usize) -> String {
        let recent = self.recent(n);
        if recent.is_empty() {
            return "none".to_string();
        }
        recent
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ollama::Role;

    #[test]
    fn test_seeded_with_system_message() {
        let history = ConversationHistory::new("You are a narrator.");
        assert_eq!(history.len(), 1);
        assert_eq!(history.recent(10)[0].role, Role::System);
    }

    #[test]
    fn test_recent_returns_suffix() {
        let mut history = ConversationHistory::new("system");
        for i in 0..5 {
            history.commit_turn(&format!("input {i}"), &format!("reply {i}"));
        }
        assert_eq!(history.len(), 11);

        let recent = history.recent(HISTORY_WINDOW);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent.last().map(|m| m.content.as_str()), Some("reply 4"));
    }

    #[test]
    fn test_recent_with_fewer_messages_returns_all() {
        let history = ConversationHistory::new("system");
        assert_eq!(history.recent(HISTORY_WINDOW).len(), 1);
    }

    #[test]
    fn test_commit_appends_pair_in_order() {
        let mut history = ConversationHistory::new("system");
        history.commit_turn("hello", "{\"reply\":\"hi\"}");

        let recent = history.recent(2);
        assert_eq!(recent[0].role, Role::User);
        assert_eq!(recent[0].content, "hello");
        assert_eq!(recent[1].role, Role::Assistant);
    }

    #[test]
    fn test_render_recent_tags_roles() {
        let mut history = ConversationHistory::new("stay grounded");
        history.commit_turn("ask Eli", "{\"reply\":\"...\"}");

        let rendered = history.render_recent(PROMPT_CONTEXT_WINDOW);
        assert!(rendered.starts_with("system: stay grounded"));
        assert!(rendered.contains("user: ask Eli"));
        assert!(rendered.contains("assistant:"));
    }

    #[test]
    fn test_render_recent_zero_is_none() {
        let history = ConversationHistory::new("system");
        assert_eq!(history.render_recent(0), "none");
    }
}
