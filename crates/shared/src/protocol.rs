use serde::{Deserialize, Serialize};

use crate::{
    domain::{Conversation, ConversationId, Message, MessageId, User, UserId},
    error::{ErrorEntry, RpcError},
};

/// Events pushed by the server over the realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    OnMessageCreated {
        message: Message,
    },
    OnMessageCreatedSidebar {
        message: Message,
    },
    OnMessageUpdated {
        message: Message,
    },
    OnMessageUpdatedSidebar {
        conversation_id: ConversationId,
        message: Message,
    },
    OnMessageDeleted {
        message_id: MessageId,
    },
    OnMessageDeletedSidebar {
        conversation_id: ConversationId,
        #[serde(default)]
        new_last_message: Option<Message>,
    },
    /// Peer typing in the conversation this session has joined.
    OnTypingStart {
        #[serde(default)]
        conversation_id: Option<ConversationId>,
    },
    OnTypingStop {
        #[serde(default)]
        conversation_id: Option<ConversationId>,
    },
    OnTypingStartConversation {
        conversation_id: ConversationId,
    },
    OnTypingStopConversation {
        conversation_id: ConversationId,
    },
    OnFriendRequestAccepted {
        user_id: UserId,
        #[serde(default)]
        user: Option<User>,
    },
    OnFriendRequestDeclined {
        user_id: UserId,
    },
    OnFriendRequestCanceled {
        user_id: UserId,
    },
    OnFriendRequestSentReceived {
        user: User,
    },
    OnFriendRequestSended {
        user: User,
    },
    OnFriendRemoved {
        user_id: UserId,
    },
    OnConversationCreated {
        conversation: Conversation,
    },
    OnFriendsStatus {
        friends_status_ids: Vec<UserId>,
    },
    OnFriendsStatusConnected {
        user_id: UserId,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::OnMessageCreated { .. } => "onMessageCreated",
            ServerEvent::OnMessageCreatedSidebar { .. } => "onMessageCreatedSidebar",
            ServerEvent::OnMessageUpdated { .. } => "onMessageUpdated",
            ServerEvent::OnMessageUpdatedSidebar { .. } => "onMessageUpdatedSidebar",
            ServerEvent::OnMessageDeleted { .. } => "onMessageDeleted",
            ServerEvent::OnMessageDeletedSidebar { .. } => "onMessageDeletedSidebar",
            ServerEvent::OnTypingStart { .. } => "onTypingStart",
            ServerEvent::OnTypingStop { .. } => "onTypingStop",
            ServerEvent::OnTypingStartConversation { .. } => "onTypingStartConversation",
            ServerEvent::OnTypingStopConversation { .. } => "onTypingStopConversation",
            ServerEvent::OnFriendRequestAccepted { .. } => "onFriendRequestAccepted",
            ServerEvent::OnFriendRequestDeclined { .. } => "onFriendRequestDeclined",
            ServerEvent::OnFriendRequestCanceled { .. } => "onFriendRequestCanceled",
            ServerEvent::OnFriendRequestSentReceived { .. } => "onFriendRequestSentReceived",
            ServerEvent::OnFriendRequestSended { .. } => "onFriendRequestSended",
            ServerEvent::OnFriendRemoved { .. } => "onFriendRemoved",
            ServerEvent::OnConversationCreated { .. } => "onConversationCreated",
            ServerEvent::OnFriendsStatus { .. } => "onFriendsStatus",
            ServerEvent::OnFriendsStatusConnected { .. } => "onFriendsStatusConnected",
        }
    }
}

/// Events this client emits after the server confirmed the matching RPC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum OutboundEvent {
    CreateMessage {
        message: Message,
    },
    UpdateMessage {
        conversation_id: ConversationId,
        message: Message,
    },
    DeleteMessage {
        conversation_id: ConversationId,
        message_id: MessageId,
        new_last_message: Option<Message>,
    },
    OnTypingStart {
        conversation_id: ConversationId,
    },
    OnTypingStop {
        conversation_id: ConversationId,
    },
    OnConversationJoin {
        conversation_id: ConversationId,
    },
    OnConversationLeave {
        conversation_id: ConversationId,
    },
    SendFriendRequest {
        sender: User,
        recipient_id: UserId,
    },
    RemoveFriend {
        user_id: UserId,
        friend_id: UserId,
    },
    AcceptFriendRequest {
        user: User,
        requester_id: UserId,
    },
    DeclineFriendRequest {
        user_id: UserId,
        requester_id: UserId,
    },
    CancelFriendRequest {
        user_id: UserId,
        recipient_id: UserId,
    },
    GetFriendsStatus {
        friend_ids: Vec<UserId>,
    },
    CreateConversation {
        conversation: Conversation,
    },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::CreateMessage { .. } => "createMessage",
            OutboundEvent::UpdateMessage { .. } => "updateMessage",
            OutboundEvent::DeleteMessage { .. } => "deleteMessage",
            OutboundEvent::OnTypingStart { .. } => "onTypingStart",
            OutboundEvent::OnTypingStop { .. } => "onTypingStop",
            OutboundEvent::OnConversationJoin { .. } => "onConversationJoin",
            OutboundEvent::OnConversationLeave { .. } => "onConversationLeave",
            OutboundEvent::SendFriendRequest { .. } => "sendFriendRequest",
            OutboundEvent::RemoveFriend { .. } => "removeFriend",
            OutboundEvent::AcceptFriendRequest { .. } => "acceptFriendRequest",
            OutboundEvent::DeclineFriendRequest { .. } => "declineFriendRequest",
            OutboundEvent::CancelFriendRequest { .. } => "cancelFriendRequest",
            OutboundEvent::GetFriendsStatus { .. } => "getFriendsStatus",
            OutboundEvent::CreateConversation { .. } => "createConversation",
        }
    }
}

/// Query/mutation result envelope. `data` and `errors` may both be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorEntry>,
}

impl<T> RpcResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failed(errors: Vec<ErrorEntry>) -> Self {
        Self { data: None, errors }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Partial data, reachable even when errors were reported.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Succeeds only when no errors were reported and data is present.
    pub fn into_result(self) -> Result<T, RpcError> {
        if self.has_errors() {
            return Err(RpcError::from_entries(&self.errors));
        }
        self.data.ok_or(RpcError::MissingData)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: User,
    #[serde(default)]
    pub friends: Vec<User>,
    #[serde(default)]
    pub sent_requests: Vec<User>,
    #[serde(default)]
    pub received_requests: Vec<User>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMessage {
    pub message_id: MessageId,
    pub conversation_id: ConversationId,
    #[serde(default)]
    pub new_last_message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedConversation {
    pub conversation: Conversation,
    /// False when the server returned an already existing conversation.
    pub created: bool,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
