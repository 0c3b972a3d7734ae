use serde::{Deserialize, Serialize};
use shared::domain::{Conversation, ConversationId, Message, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadTicket {
    pub conversation_id: ConversationId,
    generation: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenConversation {
    pub conversation: Conversation,
    /// Ascending by `created_at`, except for live messages which keep arrival order.
    pub messages: Vec<Message>,
    pub total_count: u64,
    pub is_typing: bool,
    pub editing: Option<MessageId>,
}

impl OpenConversation {
    pub fn id(&self) -> ConversationId {
        self.conversation.id
    }

    pub fn next_page_skip(&self) -> u64 {
        self.messages.len() as u64
    }

    pub fn has_older_messages(&self) -> bool {
        (self.messages.len() as u64) < self.total_count
    }

    pub fn message(&self, message_id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum ActivePhase {
    #[default]
    Closed,
    Loading {
        ticket: LoadTicket,
    },
    Open {
        ticket: LoadTicket,
        conversation: Box<OpenConversation>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Opened,
    Stale,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveConversation {
    phase: ActivePhase,
    generation: u64,
}

impl ActiveConversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &ActivePhase {
        &self.phase
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.phase, ActivePhase::Closed)
    }

    pub fn target(&self) -> Option<ConversationId> {
        match &self.phase {
            ActivePhase::Closed => None,
            ActivePhase::Loading { ticket } | ActivePhase::Open { ticket, .. } => {
                Some(ticket.conversation_id)
            }
        }
    }

    pub fn open_id(&self) -> Option<ConversationId> {
        self.open().map(OpenConversation::id)
    }

    pub fn open(&self) -> Option<&OpenConversation> {
        match &self.phase {
            ActivePhase::Open { conversation, .. } => Some(conversation.as_ref()),
            _ => None,
        }
    }

    fn open_mut(&mut self) -> Option<&mut OpenConversation> {
        match &mut self.phase {
            ActivePhase::Open { conversation, .. } => Some(conversation.as_mut()),
            _ => None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        self.open().map(|c| c.messages.as_slice()).unwrap_or(&[])
    }

    pub fn begin_loading(&mut self, conversation_id: ConversationId) -> LoadTicket {
        self.generation += 1;
        let ticket = LoadTicket {
            conversation_id,
            generation: self.generation,
        };
        self.phase = ActivePhase::Loading { ticket };
        ticket
    }

    pub fn current_ticket(&self) -> Option<LoadTicket> {
        match &self.phase {
            ActivePhase::Closed => None,
            ActivePhase::Loading { ticket } | ActivePhase::Open { ticket, .. } => Some(*ticket),
        }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        match &self.phase {
            ActivePhase::Loading { ticket: current } | ActivePhase::Open { ticket: current, .. } => {
                *current == ticket
            }
            ActivePhase::Closed => false,
        }
    }

    pub fn finish_loading(
        &mut self,
        ticket: LoadTicket,
        conversation: Conversation,
        mut messages: Vec<Message>,
        total_count: u64,
    ) -> LoadOutcome {
        let loading = matches!(&self.phase, ActivePhase::Loading { ticket: current } if *current == ticket);
        if !loading || conversation.id != ticket.conversation_id {
            return LoadOutcome::Stale;
        }
        messages.sort_by_key(|m| m.created_at);
        self.phase = ActivePhase::Open {
            ticket,
            conversation: Box::new(OpenConversation {
                conversation,
                messages,
                total_count,
                is_typing: false,
                editing: None,
            }),
        };
        LoadOutcome::Opened
    }

    pub fn fail_loading(&mut self, ticket: LoadTicket) -> bool {
        let loading = matches!(&self.phase, ActivePhase::Loading { ticket: current } if *current == ticket);
        if loading {
            self.phase = ActivePhase::Closed;
        }
        loading
    }

    pub fn close(&mut self) -> Option<ConversationId> {
        let previous = self.target();
        self.phase = ActivePhase::Closed;
        previous
    }

    /// Inserts an older page at the head. The page is expected to be ascending
    /// already and is not checked for overlap with the current log.
    pub fn prepend_older_page(&mut self, page: Vec<Message>) -> usize {
        let Some(open) = self.open_mut() else {
            return 0;
        };
        let inserted = page.len();
        open.messages.splice(0..0, page);
        inserted
    }

    /// Appends at the tail in arrival order; no re-sorting. Messages of other
    /// conversations and ids already present are ignored.
    pub fn append_live(&mut self, message: Message) -> bool {
        let Some(open) = self.open_mut() else {
            return false;
        };
        if message.conversation_id != open.id() || open.message(message.id).is_some() {
            return false;
        }
        open.messages.push(message);
        open.total_count += 1;
        true
    }

    pub fn replace_edited(&mut self, message: Message) -> bool {
        let Some(open) = self.open_mut() else {
            return false;
        };
        let Some(existing) = open.messages.iter_mut().find(|m| m.id == message.id) else {
            return false;
        };
        existing.content = message.content;
        existing.is_modified = true;
        if message.updated_at.is_some() {
            existing.updated_at = message.updated_at;
        }
        true
    }

    /// Leaves `total_count` untouched.
    pub fn remove_by_id(&mut self, message_id: MessageId) -> bool {
        let Some(open) = self.open_mut() else {
            return false;
        };
        let before = open.messages.len();
        open.messages.retain(|m| m.id != message_id);
        if open.editing == Some(message_id) {
            open.editing = None;
        }
        open.messages.len() != before
    }

    pub fn set_edit_cursor(&mut self, message_id: Option<MessageId>) -> Option<MessageId> {
        let Some(open) = self.open_mut() else {
            return None;
        };
        std::mem::replace(&mut open.editing, message_id)
    }

    pub fn set_typing(&mut self, is_typing: bool) -> bool {
        let Some(open) = self.open_mut() else {
            return false;
        };
        open.is_typing = is_typing;
        true
    }
}

#[cfg(test)]
#[path = "tests/active_conversation_tests.rs"]
mod tests;
