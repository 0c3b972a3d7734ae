use serde::{Deserialize, Serialize};
use shared::domain::{Conversation, ConversationId, Message, UserId};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationList {
    items: Vec<Conversation>,
}

impl ConversationList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Conversation] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, conversation_id: ConversationId) -> Option<&Conversation> {
        self.items.iter().find(|c| c.id == conversation_id)
    }

    pub fn ids(&self) -> Vec<ConversationId> {
        self.items.iter().map(|c| c.id).collect()
    }

    fn position(&self, conversation_id: ConversationId) -> Option<usize> {
        self.items.iter().position(|c| c.id == conversation_id)
    }

    fn get_mut(&mut self, conversation_id: ConversationId) -> Option<&mut Conversation> {
        self.items.iter_mut().find(|c| c.id == conversation_id)
    }

    pub fn set_all(&mut self, conversations: Vec<Conversation>) {
        self.items = conversations;
    }

    pub fn add_one(&mut self, conversation: Conversation) -> bool {
        if self.position(conversation.id).is_some() {
            return false;
        }
        self.items.insert(0, conversation);
        true
    }

    /// Inserts (or replaces) a conversation the server reported as already
    /// existing, then re-sorts by recency, newest first. Ties fall back to the
    /// higher conversation id first.
    pub fn add_one_sorted(&mut self, conversation: Conversation) {
        match self.position(conversation.id) {
            Some(index) => self.items[index] = conversation,
            None => self.items.push(conversation),
        }
        self.items.sort_by(|a, b| {
            b.recency()
                .cmp(&a.recency())
                .then_with(|| b.id.cmp(&a.id))
        });
    }

    pub fn remove(&mut self, conversation_id: ConversationId) -> bool {
        let before = self.items.len();
        self.items.retain(|c| c.id != conversation_id);
        self.items.len() != before
    }

    /// Moves the conversation to the front and makes `message` its preview.
    ///
    /// Last event wins: no timestamp comparison happens, so a late delivery of
    /// an older message still becomes the preview.
    pub fn apply_new_message(&mut self, conversation_id: ConversationId, message: Message) -> bool {
        let Some(index) = self.position(conversation_id) else {
            return false;
        };
        let mut conversation = self.items.remove(index);
        conversation.last_message = Some(message);
        self.items.insert(0, conversation);
        true
    }

    pub fn apply_updated_message(&mut self, conversation_id: ConversationId, message: Message) -> bool {
        let Some(conversation) = self.get_mut(conversation_id) else {
            return false;
        };
        match &conversation.last_message {
            Some(last) if last.id == message.id => {
                conversation.last_message = Some(message);
                true
            }
            _ => false,
        }
    }

    /// Installs the replacement preview supplied by the server. The local
    /// message log is never consulted.
    pub fn apply_deleted_message(
        &mut self,
        conversation_id: ConversationId,
        new_last_message: Option<Message>,
    ) -> bool {
        let Some(conversation) = self.get_mut(conversation_id) else {
            return false;
        };
        conversation.last_message = new_last_message;
        true
    }

    pub fn set_typing(
        &mut self,
        conversation_id: ConversationId,
        is_typing: bool,
        open_conversation: Option<ConversationId>,
    ) -> bool {
        if open_conversation == Some(conversation_id) {
            return false;
        }
        let Some(conversation) = self.get_mut(conversation_id) else {
            return false;
        };
        conversation.is_typing = is_typing;
        true
    }

    pub fn set_unread_count(
        &mut self,
        user_id: UserId,
        conversation_id: ConversationId,
        count: u32,
    ) -> bool {
        let Some(conversation) = self.get_mut(conversation_id) else {
            return false;
        };
        if !conversation.involves(user_id) {
            return false;
        }
        if conversation.creator.id == user_id {
            conversation.creator_unread_messages_count = count;
        } else {
            conversation.recipient_unread_messages_count = count;
        }
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
#[path = "tests/conversation_list_tests.rs"]
mod tests;
