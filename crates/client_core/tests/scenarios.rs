use chrono::{DateTime, TimeZone, Utc};
use client_core::{route_event, ActiveConversation, ChatState, ConversationList, Routed, Session};
use shared::{
    domain::{Conversation, ConversationId, Message, MessageId, User, UserId},
    protocol::{Profile, ServerEvent},
};

const ME: UserId = UserId(1);

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().expect("valid timestamp")
}

fn user(id: i64, username: &str) -> User {
    User {
        id: UserId(id),
        username: username.into(),
        avatar: None,
        created_at: at(0),
        updated_at: None,
    }
}

fn message(id: i64, conversation_id: i64, content: &str, secs: i64) -> Message {
    Message {
        id: MessageId(id),
        conversation_id: ConversationId(conversation_id),
        author_id: UserId(2),
        content: content.into(),
        created_at: at(secs),
        is_modified: false,
        updated_at: None,
    }
}

fn conversation(id: i64, last: Option<Message>) -> Conversation {
    Conversation {
        id: ConversationId(id),
        creator: user(ME.0, "me"),
        recipient: user(id + 1, "peer"),
        created_at: at(0),
        last_message: last,
        creator_unread_messages_count: 0,
        recipient_unread_messages_count: 0,
        is_typing: false,
    }
}

fn open_with(conversation_id: i64, messages: Vec<Message>, total_count: u64) -> ActiveConversation {
    let mut active = ActiveConversation::new();
    let ticket = active.begin_loading(ConversationId(conversation_id));
    active.finish_loading(ticket, conversation(conversation_id, None), messages, total_count);
    active
}

fn ids(messages: &[Message]) -> Vec<i64> {
    messages.iter().map(|m| m.id.0).collect()
}

#[test]
fn sidebar_message_updates_preview_and_order() {
    let mut state = ChatState::default();
    state
        .conversations
        .set_all(vec![conversation(1, Some(message(10, 1, "hi", 10)))]);
    route_event(
        &mut state,
        ServerEvent::OnMessageCreatedSidebar {
            message: message(11, 1, "yo", 20),
        },
    );
    let only = &state.conversations.as_slice()[0];
    assert_eq!(only.id, ConversationId(1));
    let last = only.last_message.as_ref().expect("preview");
    assert_eq!((last.content.as_str(), last.created_at), ("yo", at(20)));

    let mut state = ChatState::default();
    state.conversations.set_all(vec![
        conversation(1, Some(message(10, 1, "hi", 10))),
        conversation(2, Some(message(20, 2, "hey", 5))),
    ]);
    route_event(
        &mut state,
        ServerEvent::OnMessageCreatedSidebar {
            message: message(21, 2, "yo", 20),
        },
    );
    assert_eq!(
        state.conversations.ids(),
        vec![ConversationId(2), ConversationId(1)]
    );
}

#[test]
fn live_events_after_backfill_keep_seam_order() {
    let mut state = ChatState::default();
    state.active = open_with(1, vec![message(5, 1, "old", 50)], 10);
    state
        .active
        .prepend_older_page(vec![message(1, 1, "a", 10), message(2, 1, "b", 20)]);

    for (id, secs) in [(6, 60), (7, 70), (8, 80)] {
        let routed = route_event(
            &mut state,
            ServerEvent::OnMessageCreated {
                message: message(id, 1, "live", secs),
            },
        );
        assert_eq!(routed, Routed::Applied);
    }
    assert_eq!(ids(state.active.messages()), vec![1, 2, 5, 6, 7, 8]);
    let times: Vec<_> = state.active.messages().iter().map(|m| m.created_at).collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted);
}

#[test]
fn repeated_delete_event_is_idempotent() {
    let mut state = ChatState::default();
    state.active = open_with(1, vec![message(1, 1, "a", 1), message(2, 1, "b", 2)], 2);
    let delete = ServerEvent::OnMessageDeleted {
        message_id: MessageId(1),
    };

    assert_eq!(route_event(&mut state, delete.clone()), Routed::Applied);
    let once = state.clone();
    assert!(matches!(route_event(&mut state, delete), Routed::Ignored(_)));
    assert_eq!(state, once);
    assert_eq!(ids(state.active.messages()), vec![2]);
}

#[test]
fn deleted_preview_ignores_local_log() {
    let replacement = Some(message(3, 1, "older", 3));

    let mut empty = ConversationList::new();
    empty.set_all(vec![conversation(1, Some(message(4, 1, "gone", 4)))]);
    empty.apply_deleted_message(ConversationId(1), replacement.clone());

    let mut state = ChatState::default();
    state
        .conversations
        .set_all(vec![conversation(1, Some(message(4, 1, "gone", 4)))]);
    state.active = open_with(
        1,
        vec![message(1, 1, "a", 1), message(2, 1, "b", 2), message(4, 1, "gone", 4)],
        3,
    );
    state
        .conversations
        .apply_deleted_message(ConversationId(1), replacement.clone());

    assert_eq!(
        empty.get(ConversationId(1)).map(|c| c.last_message.clone()),
        state.conversations.get(ConversationId(1)).map(|c| c.last_message.clone())
    );
}

#[test]
fn accepting_leaves_user_only_in_friends() {
    let carol = user(3, "carol");
    let starts: [(Vec<User>, Vec<User>); 3] = [
        (vec![carol.clone()], vec![]),
        (vec![], vec![carol.clone()]),
        (vec![], vec![]),
    ];
    for (sent, received) in starts {
        let mut session = Session::new();
        session.load_profile(Profile {
            user: user(ME.0, "me"),
            friends: vec![],
            sent_requests: sent,
            received_requests: received,
        });
        session.accept_friend_request(carol.clone());
        assert!(session.is_friend(carol.id));
        assert!(session.sent_requests().is_empty());
        assert!(session.received_requests().is_empty());
    }
}

#[test]
fn events_for_unknown_entities_leave_state_unchanged() {
    let mut state = ChatState::default();
    state
        .conversations
        .set_all(vec![conversation(1, Some(message(10, 1, "hi", 10)))]);
    let before = state.clone();

    let events = vec![
        ServerEvent::OnMessageCreatedSidebar {
            message: message(1, 77, "x", 1),
        },
        ServerEvent::OnMessageDeleted {
            message_id: MessageId(5),
        },
        ServerEvent::OnTypingStopConversation {
            conversation_id: ConversationId(77),
        },
        ServerEvent::OnFriendRemoved { user_id: UserId(9) },
    ];
    for event in events {
        assert!(matches!(route_event(&mut state, event), Routed::Ignored(_)));
    }
    assert_eq!(state, before);
}
