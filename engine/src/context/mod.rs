//! Conversation Context Store
//!
//! Holds the evolving conversation: an optional system instruction, the
//! selected model and tone, and the append-only turn history. Each new turn is
//! assembled as `[system] + history + new user message`; history is only
//! extended after a reply has been accepted, and is never trimmed.
//!
//! Model and tone are the conversation's current selection, recorded with the
//! last accepted exchange. They do not feed assembly; each request carries its
//! own. A failed turn leaves every field as it was.
//!
//! The store is not synchronized. The orchestrator owns it and takes `&mut self`
//! for a turn, so a new turn always observes the fully committed previous one.

use sdk::types::{Speaker, Tone, Turn};

use crate::llm::Message;

/// Conversation state for the single active conversation
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    /// System instruction, logically ahead of every turn
    system_instruction: Option<String>,

    /// Model used for the last accepted exchange
    model: Option<String>,

    /// Tone used for the last accepted exchange
    tone: Tone,

    /// All committed turns in submission order
    turns: Vec<Turn>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the system instruction; blank text clears it
    pub fn set_system_instruction(&mut self, instruction: Option<&str>) {
        self.system_instruction = non_blank(instruction).map(str::to_string);
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = Some(model.into());
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.tone = tone;
    }

    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    /// Committed turns, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    /// Build the ordered message list for the text backend.
    ///
    /// Does not modify the store.
    pub fn assemble(&self, new_user_text: &str) -> Vec<Message> {
        self.assemble_with(self.system_instruction.as_deref(), new_user_text)
    }

    /// Like [`assemble`](Self::assemble), but with `instruction` in place of
    /// the stored system instruction. Blank text means none.
    pub fn assemble_with(&self, instruction: Option<&str>, new_user_text: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.turns.len() + 2);

        if let Some(instruction) = non_blank(instruction) {
            messages.push(Message::system(instruction));
        }

        messages.extend(self.turns.iter().map(|turn| match turn.speaker {
            Speaker::User => Message::user(&turn.text),
            Speaker::Assistant => Message::assistant(&turn.text),
        }));

        messages.push(Message::user(new_user_text));
        messages
    }

    /// Append an accepted exchange to the history
    pub fn commit(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        self.turns.push(Turn::user(user_text));
        self.turns.push(Turn::assistant(assistant_text));
    }

    /// Forget the history; system instruction, model and tone are kept
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;

    #[test]
    fn test_assemble_empty_store() {
        let store = ContextStore::new();
        let messages = store.assemble("Hello");

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "Hello");
    }

    #[test]
    fn test_system_instruction_precedes_turns() {
        let mut store = ContextStore::new();
        store.set_system_instruction(Some("You are a pirate."));
        store.commit("Hi", "Ahoy!");

        let messages = store.assemble("Where is the treasure?");
        let roles: Vec<MessageRole> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                MessageRole::System,
                MessageRole::User,
                MessageRole::Assistant,
                MessageRole::User,
            ]
        );
        assert_eq!(messages[0].content, "You are a pirate.");
        assert_eq!(messages[3].content, "Where is the treasure?");
    }

    #[test]
    fn test_assemble_does_not_mutate() {
        let mut store = ContextStore::new();
        store.commit("a", "b");
        let _ = store.assemble("c");
        assert_eq!(store.turn_count(), 2);
    }

    #[test]
    fn test_assemble_with_overrides_stored_instruction() {
        let mut store = ContextStore::new();
        store.set_system_instruction(Some("Be brief"));
        store.commit("Hi", "Hello");

        let messages = store.assemble_with(Some("Be verbose"), "Again");
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, "Be verbose");
        assert_eq!(messages.len(), 4);

        let messages = store.assemble_with(Some("  "), "Again");
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(store.system_instruction(), Some("Be brief"));
    }

    #[test]
    fn test_commit_preserves_order() {
        let mut store = ContextStore::new();
        store.commit("u1", "a1");
        store.commit("u2", "a2");

        let texts: Vec<&str> = store.turns().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["u1", "a1", "u2", "a2"]);
        assert_eq!(store.turns()[0].speaker, Speaker::User);
        assert_eq!(store.turns()[1].speaker, Speaker::Assistant);
    }

    #[test]
    fn test_blank_system_instruction_is_cleared() {
        let mut store = ContextStore::new();
        store.set_system_instruction(Some("Be brief"));
        store.set_system_instruction(Some("   "));
        assert_eq!(store.system_instruction(), None);
    }

    #[test]
    fn test_clear_keeps_settings() {
        let mut store = ContextStore::new();
        store.set_system_instruction(Some("Be brief"));
        store.set_model("llama-3.1-8b-instant");
        store.set_tone(Tone::Casual);
        store.commit("u", "a");

        store.clear();

        assert_eq!(store.turn_count(), 0);
        assert_eq!(store.system_instruction(), Some("Be brief"));
        assert_eq!(store.model(), Some("llama-3.1-8b-instant"));
        assert_eq!(store.tone(), Tone::Casual);
    }
}
