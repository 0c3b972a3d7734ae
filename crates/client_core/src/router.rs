use shared::{domain::ConversationId, protocol::ServerEvent};
use tracing::debug;

use crate::ChatState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Applied,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownConversation,
    UnknownMessage,
    NoOpenConversation,
    /// Sidebar typing for the conversation already shown inline.
    OpenConversationTyping,
    UnknownUser,
    AlreadyApplied,
}

impl Routed {
    fn from_applied(applied: bool, otherwise: IgnoreReason) -> Self {
        if applied {
            Routed::Applied
        } else {
            Routed::Ignored(otherwise)
        }
    }
}

pub fn route_event(state: &mut ChatState, event: ServerEvent) -> Routed {
    let name = event.name();
    let routed = apply(state, event);
    match routed {
        Routed::Applied => debug!(event = name, "realtime event applied"),
        Routed::Ignored(reason) => debug!(event = name, ?reason, "realtime event ignored"),
    }
    routed
}

fn apply(state: &mut ChatState, event: ServerEvent) -> Routed {
    let open_id = state.active.open_id();
    match event {
        ServerEvent::OnMessageCreated { message } => {
            if open_id.is_none() {
                return Routed::Ignored(IgnoreReason::NoOpenConversation);
            }
            if open_id != Some(message.conversation_id) {
                return Routed::Ignored(IgnoreReason::UnknownConversation);
            }
            Routed::from_applied(
                state.active.append_live(message),
                IgnoreReason::AlreadyApplied,
            )
        }
        ServerEvent::OnMessageCreatedSidebar { message } => Routed::from_applied(
            state
                .conversations
                .apply_new_message(message.conversation_id, message),
            IgnoreReason::UnknownConversation,
        ),
        ServerEvent::OnMessageUpdated { message } => {
            if open_id.is_none() {
                return Routed::Ignored(IgnoreReason::NoOpenConversation);
            }
            Routed::from_applied(
                state.active.replace_edited(message),
                IgnoreReason::UnknownMessage,
            )
        }
        ServerEvent::OnMessageUpdatedSidebar {
            conversation_id,
            message,
        } => {
            if state.conversations.get(conversation_id).is_none() {
                return Routed::Ignored(IgnoreReason::UnknownConversation);
            }
            Routed::from_applied(
                state
                    .conversations
                    .apply_updated_message(conversation_id, message),
                IgnoreReason::UnknownMessage,
            )
        }
        ServerEvent::OnMessageDeleted { message_id } => {
            if open_id.is_none() {
                return Routed::Ignored(IgnoreReason::NoOpenConversation);
            }
            Routed::from_applied(
                state.active.remove_by_id(message_id),
                IgnoreReason::UnknownMessage,
            )
        }
        ServerEvent::OnMessageDeletedSidebar {
            conversation_id,
            new_last_message,
        } => Routed::from_applied(
            state
                .conversations
                .apply_deleted_message(conversation_id, new_last_message),
            IgnoreReason::UnknownConversation,
        ),
        ServerEvent::OnTypingStart { conversation_id } => {
            set_active_typing(state, conversation_id, true)
        }
        ServerEvent::OnTypingStop { conversation_id } => {
            set_active_typing(state, conversation_id, false)
        }
        ServerEvent::OnTypingStartConversation { conversation_id } => {
            set_sidebar_typing(state, conversation_id, true)
        }
        ServerEvent::OnTypingStopConversation { conversation_id } => {
            set_sidebar_typing(state, conversation_id, false)
        }
        ServerEvent::OnFriendRequestAccepted { user_id, user } => {
            let resolved = state.session.pending_request(user_id).cloned().or(user);
            match resolved {
                Some(user) if user.id == user_id => {
                    state.session.accept_friend_request(user);
                    Routed::Applied
                }
                _ => Routed::Ignored(IgnoreReason::UnknownUser),
            }
        }
        ServerEvent::OnFriendRequestDeclined { user_id } => Routed::from_applied(
            state.session.decline_friend_request(user_id),
            IgnoreReason::UnknownUser,
        ),
        ServerEvent::OnFriendRequestCanceled { user_id } => Routed::from_applied(
            state.session.cancel_friend_request(user_id),
            IgnoreReason::UnknownUser,
        ),
        ServerEvent::OnFriendRequestSentReceived { user } => Routed::from_applied(
            state.session.add_received_request(user),
            IgnoreReason::AlreadyApplied,
        ),
        ServerEvent::OnFriendRequestSended { user } => Routed::from_applied(
            state.session.add_sent_request(user),
            IgnoreReason::AlreadyApplied,
        ),
        ServerEvent::OnFriendRemoved { user_id } => Routed::from_applied(
            state.session.remove_friend(user_id),
            IgnoreReason::UnknownUser,
        ),
        ServerEvent::OnConversationCreated { conversation } => Routed::from_applied(
            state.conversations.add_one(conversation),
            IgnoreReason::AlreadyApplied,
        ),
        ServerEvent::OnFriendsStatus { friends_status_ids } => {
            state.session.set_online_friends(&friends_status_ids);
            Routed::Applied
        }
        ServerEvent::OnFriendsStatusConnected { user_id } => {
            if !state.session.is_friend(user_id) {
                return Routed::Ignored(IgnoreReason::UnknownUser);
            }
            state.session.set_friend_online(user_id);
            Routed::Applied
        }
    }
}

fn set_active_typing(
    state: &mut ChatState,
    conversation_id: Option<ConversationId>,
    is_typing: bool,
) -> Routed {
    let Some(open_id) = state.active.open_id() else {
        return Routed::Ignored(IgnoreReason::NoOpenConversation);
    };
    if conversation_id.is_some_and(|id| id != open_id) {
        return Routed::Ignored(IgnoreReason::UnknownConversation);
    }
    state.active.set_typing(is_typing);
    Routed::Applied
}

fn set_sidebar_typing(
    state: &mut ChatState,
    conversation_id: ConversationId,
    is_typing: bool,
) -> Routed {
    // a conversation still loading counts as open
    let current = state.active.target();
    if current == Some(conversation_id) {
        return Routed::Ignored(IgnoreReason::OpenConversationTyping);
    }
    Routed::from_applied(
        state
            .conversations
            .set_typing(conversation_id, is_typing, current),
        IgnoreReason::UnknownConversation,
    )
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
