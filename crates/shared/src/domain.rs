use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(UserId);
id_newtype!(ConversationId);
id_newtype!(MessageId);
id_newtype!(AvatarId);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Avatar {
    pub id: AvatarId,
    pub key: String,
    /// Blurhash placeholder shown while the image loads.
    pub blurhash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Avatar>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub author_id: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_modified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Two-party conversation summary. `creator`/`recipient` carry no ordering
/// semantics beyond naming the two sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: ConversationId,
    pub creator: User,
    pub recipient: User,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub creator_unread_messages_count: u32,
    #[serde(default)]
    pub recipient_unread_messages_count: u32,
    /// Client-only peer typing flag; never sent by the server.
    #[serde(default, skip_serializing)]
    pub is_typing: bool,
}

impl Conversation {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.creator.id == user_id || self.recipient.id == user_id
    }

    pub fn unread_count_for(&self, user_id: UserId) -> Option<u32> {
        if self.creator.id == user_id {
            Some(self.creator_unread_messages_count)
        } else if self.recipient.id == user_id {
            Some(self.recipient_unread_messages_count)
        } else {
            None
        }
    }

    /// Timestamp used to order the conversation list: newest message, or the
    /// creation time for a conversation without messages.
    pub fn recency(&self) -> DateTime<Utc> {
        self.last_message
            .as_ref()
            .map(|message| message.created_at)
            .unwrap_or(self.created_at)
    }
}
