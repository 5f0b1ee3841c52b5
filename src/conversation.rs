use serde::{Deserialize, Serialize};

/// Seed message for every conversation. Stored but never displayed.
pub const SYSTEM_PROMPT: &str = "You are an AI assistant named GPTsim. Acknowledge that you can make mistakes. You help users with their questions. Be concise and clear in your answers.";

/// Sidebar title for a conversation nobody has typed into yet.
pub const DEFAULT_TITLE: &str = "New Chat";

const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// An ordered message thread. The first message is always the system
/// prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::new(Role::System, SYSTEM_PROMPT)],
        }
    }

    /// Messages shown in the chat pane, skipping the system prompt.
    pub fn visible_messages(&self) -> &[Message] {
        self.messages.get(1..).unwrap_or(&[])
    }

    /// Sidebar title derived from the first user message, truncated so
    /// long questions fit the sidebar column.
    pub fn title(&self) -> String {
        match self.messages.get(1) {
            Some(message) => {
                if message.content.chars().count() > TITLE_MAX_CHARS {
                    let truncated: String =
                        message.content.chars().take(TITLE_MAX_CHARS).collect();
                    format!("{}...", truncated)
                } else {
                    message.content.clone()
                }
            }
            None => DEFAULT_TITLE.to_string(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// The ordered collection of conversations plus the index of the active
/// one.
///
/// Pure in-memory state. The caller persists after every mutating call;
/// a constructed store always has an active conversation.
#[derive(Debug, Clone)]
pub struct ConversationStore {
    conversations: Vec<Conversation>,
    active: Option<usize>,
}

impl ConversationStore {
    /// Store holding a single fresh conversation.
    pub fn new() -> Self {
        let mut store = Self {
            conversations: Vec::new(),
            active: None,
        };
        store.start_new();
        store
    }

    /// Rebuild from persisted state. An empty collection gets a fresh
    /// conversation; a missing or out-of-range index falls back to the
    /// first conversation.
    pub fn restore(conversations: Vec<Conversation>, active: Option<usize>) -> Self {
        let mut store = Self {
            conversations,
            active: None,
        };
        if store.conversations.is_empty() {
            store.start_new();
        } else {
            store.activate(active.unwrap_or(0));
        }
        store
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    pub fn active(&self) -> Option<&Conversation> {
        self.active.and_then(|index| self.conversations.get(index))
    }

    /// Append a fresh conversation and make it active.
    pub fn start_new(&mut self) {
        self.conversations.push(Conversation::new());
        self.active = Some(self.conversations.len() - 1);
    }

    /// Switch the active conversation. An out-of-range index falls back
    /// to the first conversation, or to a fresh one when the collection
    /// is empty.
    pub fn activate(&mut self, index: usize) {
        if index < self.conversations.len() {
            self.active = Some(index);
        } else if self.conversations.is_empty() {
            self.start_new();
        } else {
            self.active = Some(0);
        }
    }

    /// Remove the conversation at `index`. Deleting the last remaining
    /// conversation leaves a fresh one; deleting the active conversation
    /// activates the first; deleting above the active conversation only
    /// shifts the stored index.
    pub fn delete(&mut self, index: usize) {
        if index >= self.conversations.len() {
            return;
        }
        self.conversations.remove(index);

        if self.conversations.is_empty() {
            self.start_new();
        } else if self.active == Some(index) {
            self.activate(0);
        } else if let Some(active) = self.active {
            if active > index {
                self.active = Some(active - 1);
            }
        }
    }

    /// Drop every message of the active conversation except the system
    /// prompt.
    pub fn clear_active(&mut self) {
        if let Some(conversation) = self.active_mut() {
            conversation.messages.truncate(1);
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push_message(Message::new(Role::User, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push_message(Message::new(Role::Assistant, content));
    }

    fn push_message(&mut self, message: Message) {
        if let Some(conversation) = self.active_mut() {
            conversation.messages.push(message);
        }
    }

    fn active_mut(&mut self) -> Option<&mut Conversation> {
        self.active
            .and_then(|index| self.conversations.get_mut(index))
    }

    /// The two persisted parts: the collection and the active index.
    pub fn as_parts(&self) -> (&[Conversation], Option<usize>) {
        (&self.conversations, self.active)
    }
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_starts_with_system_prompt() {
        let conversation = Conversation::new();
        assert_eq!(conversation.messages.len(), 1);
        assert_eq!(conversation.messages[0].role, Role::System);
        assert_eq!(conversation.messages[0].content, SYSTEM_PROMPT);
        assert!(conversation.visible_messages().is_empty());
    }

    #[test]
    fn test_title_defaults_for_fresh_conversation() {
        assert_eq!(Conversation::new().title(), DEFAULT_TITLE);
    }

    #[test]
    fn test_title_uses_first_user_message() {
        let mut store = ConversationStore::new();
        store.push_user("What is psychology?");
        store.push_assistant("A long answer");
        assert_eq!(store.active().unwrap().title(), "What is psychology?");
    }

    #[test]
    fn test_title_truncates_long_messages() {
        let mut store = ConversationStore::new();
        store.push_user("a".repeat(31));
        assert_eq!(store.active().unwrap().title(), format!("{}...", "a".repeat(30)));

        let mut store = ConversationStore::new();
        store.push_user("b".repeat(30));
        assert_eq!(store.active().unwrap().title(), "b".repeat(30));
    }

    #[test]
    fn test_store_starts_with_one_active_conversation() {
        let store = ConversationStore::new();
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_index(), Some(0));
    }

    #[test]
    fn test_start_new_activates_the_new_conversation() {
        let mut store = ConversationStore::new();
        store.push_user("first");
        store.start_new();
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_index(), Some(1));
        assert!(store.active().unwrap().visible_messages().is_empty());
    }

    #[test]
    fn test_push_appends_to_active_conversation_only() {
        let mut store = ConversationStore::new();
        store.push_user("first chat");
        store.start_new();
        store.push_user("second chat");

        assert_eq!(store.conversations()[0].messages.len(), 2);
        assert_eq!(store.conversations()[1].messages.len(), 2);
        assert_eq!(store.conversations()[1].messages[1].content, "second chat");
    }

    #[test]
    fn test_activate_out_of_range_falls_back_to_first() {
        let mut store = ConversationStore::new();
        store.start_new();
        store.activate(99);
        assert_eq!(store.active_index(), Some(0));
    }

    #[test]
    fn test_delete_only_conversation_leaves_a_fresh_one() {
        let mut store = ConversationStore::new();
        store.push_user("about to vanish");
        store.delete(0);

        assert_eq!(store.len(), 1);
        assert_eq!(store.active_index(), Some(0));
        assert!(store.active().unwrap().visible_messages().is_empty());
    }

    #[test]
    fn test_delete_active_conversation_activates_first() {
        let mut store = ConversationStore::new();
        store.push_user("one");
        store.start_new();
        store.push_user("two");
        store.start_new();
        store.push_user("three");

        store.delete(2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.active_index(), Some(0));
        assert_eq!(store.active().unwrap().title(), "one");
    }

    #[test]
    fn test_delete_below_active_shifts_index() {
        let mut store = ConversationStore::new();
        store.push_user("one");
        store.start_new();
        store.push_user("two");
        store.start_new();
        store.push_user("three");

        store.delete(0);
        assert_eq!(store.active_index(), Some(1));
        assert_eq!(store.active().unwrap().title(), "three");
    }

    #[test]
    fn test_delete_above_active_keeps_active_conversation() {
        let mut store = ConversationStore::new();
        store.push_user("one");
        store.start_new();
        store.push_user("two");
        store.activate(0);

        store.delete(1);
        assert_eq!(store.active_index(), Some(0));
        assert_eq!(store.active().unwrap().title(), "one");
    }

    #[test]
    fn test_clear_active_keeps_only_system_prompt() {
        let mut store = ConversationStore::new();
        store.push_user("hello");
        store.push_assistant("hi");
        store.clear_active();

        let active = store.active().unwrap();
        assert_eq!(active.messages.len(), 1);
        assert_eq!(active.messages[0].role, Role::System);
    }

    #[test]
    fn test_restore_clamps_stale_index() {
        let conversations = vec![Conversation::new(), Conversation::new()];
        let store = ConversationStore::restore(conversations, Some(7));
        assert_eq!(store.active_index(), Some(0));

        let store = ConversationStore::restore(Vec::new(), None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.active_index(), Some(0));
    }

    #[test]
    fn test_roles_serialize_lowercase() {
        let message = Message::new(Role::Assistant, "hi");
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"role\":\"assistant\""));

        let parsed: Message = serde_json::from_str("{\"role\":\"user\",\"content\":\"hey\"}").unwrap();
        assert_eq!(parsed.role, Role::User);
    }

    #[test]
    fn test_conversation_round_trips_through_json() {
        let mut store = ConversationStore::new();
        store.push_user("What is CBT?");
        store.push_assistant("A kind of therapy.");

        let json = serde_json::to_string(store.conversations()).unwrap();
        let parsed: Vec<Conversation> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, store.conversations());
    }
}
