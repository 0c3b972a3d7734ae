use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{Conversation, ConversationId, Message, MessageId, User, UserId},
    error::RpcError,
    protocol::{DeletedMessage, OutboundEvent, RpcResponse, ServerEvent},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::Instant,
};
use tracing::{debug, info, warn};

pub mod active_conversation;
pub mod config;
pub mod conversation_list;
pub mod error;
pub mod router;
pub mod session;
pub mod transport;
pub mod typing;

pub use active_conversation::{ActiveConversation, ActivePhase, LoadOutcome, OpenConversation};
pub use config::ClientSettings;
pub use conversation_list::ConversationList;
pub use error::{ClientError, ClientResult};
pub use router::{route_event, IgnoreReason, Routed};
pub use session::Session;
pub use transport::{ChannelConnection, ChatRpc, RealtimeConnection, WsConnection};

use typing::TypingDebouncer;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatState {
    pub session: Session,
    pub conversations: ConversationList,
    pub active: ActiveConversation,
}

impl ChatState {
    pub fn clear(&mut self) {
        self.session.clear();
        self.conversations.clear();
        self.active.close();
    }
}

/// Notices for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    StateChanged,
    LoggedOut,
    /// The conversation could not be opened; the caller should navigate away.
    ConversationUnavailable(ConversationId),
}

struct TypingState {
    debouncer: TypingDebouncer,
    conversation_id: Option<ConversationId>,
    timer: Option<JoinHandle<()>>,
}

pub struct ChatClient {
    rpc: Arc<dyn ChatRpc>,
    connection: Arc<dyn RealtimeConnection>,
    settings: ClientSettings,
    inner: Mutex<ChatState>,
    typing: Mutex<TypingState>,
    events: broadcast::Sender<ClientEvent>,
}

impl ChatClient {
    pub fn new(
        rpc: Arc<dyn ChatRpc>,
        connection: Arc<dyn RealtimeConnection>,
        settings: ClientSettings,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            rpc,
            connection,
            inner: Mutex::new(ChatState::default()),
            typing: Mutex::new(TypingState {
                debouncer: TypingDebouncer::new(settings.typing_idle_window()),
                conversation_id: None,
                timer: None,
            }),
            settings,
            events,
        })
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ChatState {
        self.inner.lock().await.clone()
    }

    fn notify(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    fn emit(&self, event: OutboundEvent) {
        let name = event.name();
        match self.connection.emit(event) {
            Ok(()) => debug!(event = name, "outbound event emitted"),
            Err(err) => warn!(event = name, "failed to emit outbound event: {err}"),
        }
    }

    /// Unwraps an RPC result. An authentication failure here means the
    /// transport already gave up refreshing, so the session is dropped.
    async fn settle<T>(&self, response: anyhow::Result<RpcResponse<T>>) -> ClientResult<T> {
        let response = response.map_err(ClientError::Transport)?;
        match response.into_result() {
            Ok(data) => Ok(data),
            Err(err @ RpcError::Unauthorized(_)) => {
                warn!("rpc rejected credentials; clearing session");
                self.logout().await;
                Err(err.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn my_identity(&self) -> ClientResult<User> {
        self.inner
            .lock()
            .await
            .session
            .me()
            .cloned()
            .ok_or(ClientError::NotLoggedIn)
    }

    async fn open_conversation_id(&self) -> ClientResult<ConversationId> {
        self.inner
            .lock()
            .await
            .active
            .open_id()
            .ok_or(ClientError::NotOpen)
    }

    pub async fn bootstrap(&self) -> ClientResult<()> {
        let profile = self.settle(self.rpc.me().await).await?;
        let conversations = self.settle(self.rpc.list_conversations().await).await?;
        {
            let mut state = self.inner.lock().await;
            info!(
                user_id = profile.user.id.0,
                friends = profile.friends.len(),
                conversations = conversations.len(),
                "session bootstrapped"
            );
            state.session.load_profile(profile);
            state.conversations.set_all(conversations);
        }
        self.notify(ClientEvent::StateChanged);
        Ok(())
    }

    pub async fn apply_event(&self, event: ServerEvent) -> Routed {
        let routed = {
            let mut state = self.inner.lock().await;
            route_event(&mut state, event)
        };
        if routed == Routed::Applied {
            self.notify(ClientEvent::StateChanged);
        }
        routed
    }

    pub fn spawn_event_pump(self: &Arc<Self>) -> JoinHandle<()> {
        let mut inbound = self.connection.subscribe();
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok(event) => {
                        client.apply_event(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "realtime event pump lagged; events were dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            info!("realtime event pump stopped");
        })
    }

    pub async fn open_conversation(&self, conversation_id: ConversationId) -> ClientResult<()> {
        let (ticket, previous) = {
            let mut state = self.inner.lock().await;
            let previous = state.active.target();
            (state.active.begin_loading(conversation_id), previous)
        };
        if let Some(previous) = previous.filter(|previous| *previous != conversation_id) {
            self.stop_typing().await;
            self.emit(OutboundEvent::OnConversationLeave {
                conversation_id: previous,
            });
        }

        let response = self
            .rpc
            .get_conversation(conversation_id, self.settings.message_page_size)
            .await;
        let result = self.settle(response).await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(page) => {
                let outcome = state.active.finish_loading(
                    ticket,
                    page.conversation,
                    page.messages,
                    page.total_count,
                );
                if outcome == LoadOutcome::Stale {
                    info!(
                        conversation_id = conversation_id.0,
                        "discarding conversation load that is no longer targeted"
                    );
                    return Err(ClientError::Stale(conversation_id));
                }
                if let Some(me) = state.session.my_id() {
                    state.conversations.set_unread_count(me, conversation_id, 0);
                }
                drop(state);
                self.emit(OutboundEvent::OnConversationJoin { conversation_id });
                self.notify(ClientEvent::StateChanged);
                Ok(())
            }
            Err(err) => {
                let was_current = state.active.fail_loading(ticket);
                drop(state);
                if was_current {
                    info!(
                        conversation_id = conversation_id.0,
                        "conversation unavailable: {err}"
                    );
                    self.notify(ClientEvent::ConversationUnavailable(conversation_id));
                }
                Err(err)
            }
        }
    }

    pub async fn leave_conversation(&self) {
        let previous = self.inner.lock().await.active.close();
        self.stop_typing().await;
        if let Some(conversation_id) = previous {
            self.emit(OutboundEvent::OnConversationLeave { conversation_id });
            self.notify(ClientEvent::StateChanged);
        }
    }

    /// Fetches the page preceding the oldest local message. `skip` is the local
    /// message count, so concurrent inserts can shift the window.
    pub async fn load_older_messages(&self) -> ClientResult<usize> {
        let (ticket, conversation_id, skip) = {
            let state = self.inner.lock().await;
            let Some(open) = state.active.open() else {
                return Err(ClientError::NotOpen);
            };
            if !open.has_older_messages() {
                return Ok(0);
            }
            let ticket = state.active.current_ticket().ok_or(ClientError::NotOpen)?;
            (ticket, open.id(), open.next_page_skip())
        };

        let response = self
            .rpc
            .list_messages(conversation_id, skip, self.settings.message_page_size)
            .await;
        let page = self.settle(response).await?;

        let inserted = {
            let mut state = self.inner.lock().await;
            if !state.active.is_current(ticket) || state.active.open_id() != Some(conversation_id) {
                info!(conversation_id = conversation_id.0, "discarding stale history page");
                return Err(ClientError::Stale(conversation_id));
            }
            state.active.prepend_older_page(page.messages)
        };
        self.notify(ClientEvent::StateChanged);
        Ok(inserted)
    }

    pub async fn send_message(&self, content: &str) -> ClientResult<Message> {
        let conversation_id = self.open_conversation_id().await?;
        let message = self
            .settle(self.rpc.create_message(conversation_id, content).await)
            .await?;
        {
            let mut state = self.inner.lock().await;
            state.active.append_live(message.clone());
            state
                .conversations
                .apply_new_message(conversation_id, message.clone());
        }
        self.stop_typing().await;
        self.emit(OutboundEvent::CreateMessage {
            message: message.clone(),
        });
        self.notify(ClientEvent::StateChanged);
        Ok(message)
    }

    pub async fn begin_edit(&self, message_id: MessageId) -> ClientResult<Option<MessageId>> {
        let mut state = self.inner.lock().await;
        let open = state.active.open().ok_or(ClientError::NotOpen)?;
        if open.message(message_id).is_none() {
            return Err(ClientError::UnknownMessage(message_id));
        }
        Ok(state.active.set_edit_cursor(Some(message_id)))
    }

    pub async fn cancel_edit(&self) -> Option<MessageId> {
        self.inner.lock().await.active.set_edit_cursor(None)
    }

    pub async fn edit_message(&self, message_id: MessageId, content: &str) -> ClientResult<Message> {
        let message = self
            .settle(self.rpc.update_message(message_id, content).await)
            .await?;
        let conversation_id = message.conversation_id;
        {
            let mut state = self.inner.lock().await;
            state.active.replace_edited(message.clone());
            if state.active.open().and_then(|open| open.editing) == Some(message_id) {
                state.active.set_edit_cursor(None);
            }
            state
                .conversations
                .apply_updated_message(conversation_id, message.clone());
        }
        self.emit(OutboundEvent::UpdateMessage {
            conversation_id,
            message: message.clone(),
        });
        self.notify(ClientEvent::StateChanged);
        Ok(message)
    }

    pub async fn delete_message(&self, message_id: MessageId) -> ClientResult<DeletedMessage> {
        let deleted = self
            .settle(self.rpc.delete_message(message_id).await)
            .await?;
        {
            let mut state = self.inner.lock().await;
            state.active.remove_by_id(deleted.message_id);
            state
                .conversations
                .apply_deleted_message(deleted.conversation_id, deleted.new_last_message.clone());
        }
        self.emit(OutboundEvent::DeleteMessage {
            conversation_id: deleted.conversation_id,
            message_id: deleted.message_id,
            new_last_message: deleted.new_last_message.clone(),
        });
        self.notify(ClientEvent::StateChanged);
        Ok(deleted)
    }

    pub async fn start_conversation(&self, recipient_id: UserId) -> ClientResult<Conversation> {
        let created = self
            .settle(self.rpc.create_conversation(recipient_id).await)
            .await?;
        let conversation = created.conversation;
        {
            let mut state = self.inner.lock().await;
            if created.created {
                state.conversations.add_one(conversation.clone());
            } else {
                state.conversations.add_one_sorted(conversation.clone());
            }
        }
        if created.created {
            self.emit(OutboundEvent::CreateConversation {
                conversation: conversation.clone(),
            });
        }
        self.notify(ClientEvent::StateChanged);
        Ok(conversation)
    }

    pub async fn close_conversation(&self, conversation_id: ConversationId) -> ClientResult<()> {
        self.settle(self.rpc.close_conversation(conversation_id).await)
            .await?;
        let was_active = {
            let mut state = self.inner.lock().await;
            state.conversations.remove(conversation_id);
            if state.active.target() == Some(conversation_id) {
                state.active.close();
                true
            } else {
                false
            }
        };
        if was_active {
            self.stop_typing().await;
            self.emit(OutboundEvent::OnConversationLeave { conversation_id });
        }
        self.notify(ClientEvent::StateChanged);
        Ok(())
    }

    pub async fn send_friend_request(&self, username: &str) -> ClientResult<User> {
        let me = self.my_identity().await?;
        let user = self
            .settle(self.rpc.send_friend_request(username).await)
            .await?;
        self.inner
            .lock()
            .await
            .session
            .add_sent_request(user.clone());
        self.emit(OutboundEvent::SendFriendRequest {
            sender: me,
            recipient_id: user.id,
        });
        self.notify(ClientEvent::StateChanged);
        Ok(user)
    }

    pub async fn accept_friend_request(&self, user_id: UserId) -> ClientResult<User> {
        let me = self.my_identity().await?;
        let user = self
            .settle(self.rpc.accept_friend_request(user_id).await)
            .await?;
        self.inner
            .lock()
            .await
            .session
            .accept_friend_request(user.clone());
        self.emit(OutboundEvent::AcceptFriendRequest {
            user: me,
            requester_id: user.id,
        });
        self.notify(ClientEvent::StateChanged);
        Ok(user)
    }

    pub async fn decline_friend_request(&self, user_id: UserId) -> ClientResult<()> {
        let me = self.my_identity().await?;
        self.settle(self.rpc.decline_friend_request(user_id).await)
            .await?;
        self.inner
            .lock()
            .await
            .session
            .decline_friend_request(user_id);
        self.emit(OutboundEvent::DeclineFriendRequest {
            user_id: me.id,
            requester_id: user_id,
        });
        self.notify(ClientEvent::StateChanged);
        Ok(())
    }

    pub async fn cancel_friend_request(&self, user_id: UserId) -> ClientResult<()> {
        let me = self.my_identity().await?;
        self.settle(self.rpc.cancel_friend_request(user_id).await)
            .await?;
        self.inner
            .lock()
            .await
            .session
            .cancel_friend_request(user_id);
        self.emit(OutboundEvent::CancelFriendRequest {
            user_id: me.id,
            recipient_id: user_id,
        });
        self.notify(ClientEvent::StateChanged);
        Ok(())
    }

    pub async fn remove_friend(&self, user_id: UserId) -> ClientResult<()> {
        let me = self.my_identity().await?;
        self.settle(self.rpc.remove_friend(user_id).await).await?;
        self.inner.lock().await.session.remove_friend(user_id);
        self.emit(OutboundEvent::RemoveFriend {
            user_id: me.id,
            friend_id: user_id,
        });
        self.notify(ClientEvent::StateChanged);
        Ok(())
    }

    pub async fn refresh_presence(&self) {
        let friend_ids = {
            let state = self.inner.lock().await;
            if state.session.me().is_none() {
                return;
            }
            state.session.friend_ids()
        };
        self.emit(OutboundEvent::GetFriendsStatus { friend_ids });
    }

    pub fn spawn_presence_poller(self: &Arc<Self>) -> JoinHandle<()> {
        let client = Arc::clone(self);
        let period = self.settings.presence_poll_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                client.refresh_presence().await;
            }
        })
    }

    pub async fn composer_input(self: &Arc<Self>) -> ClientResult<()> {
        let conversation_id = self.open_conversation_id().await?;
        let mut typing = self.typing.lock().await;

        if typing.conversation_id != Some(conversation_id) && typing.debouncer.stop() {
            if let Some(previous) = typing.conversation_id.take() {
                self.emit(OutboundEvent::OnTypingStop {
                    conversation_id: previous,
                });
            }
        }

        if typing.debouncer.keystroke(Instant::now()) {
            self.emit(OutboundEvent::OnTypingStart { conversation_id });
        }
        typing.conversation_id = Some(conversation_id);

        if let Some(timer) = typing.timer.take() {
            timer.abort();
        }
        let client = Arc::clone(self);
        let window = typing.debouncer.window();
        typing.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            client.expire_typing().await;
        }));
        Ok(())
    }

    async fn expire_typing(&self) {
        let mut typing = self.typing.lock().await;
        if typing.debouncer.expire(Instant::now()) {
            typing.timer = None;
            if let Some(conversation_id) = typing.conversation_id.take() {
                self.emit(OutboundEvent::OnTypingStop { conversation_id });
            }
        }
    }

    async fn stop_typing(&self) {
        let mut typing = self.typing.lock().await;
        if let Some(timer) = typing.timer.take() {
            timer.abort();
        }
        let was_typing = typing.debouncer.stop();
        let conversation_id = typing.conversation_id.take();
        if let (true, Some(conversation_id)) = (was_typing, conversation_id) {
            self.emit(OutboundEvent::OnTypingStop { conversation_id });
        }
    }

    pub async fn logout(&self) {
        self.inner.lock().await.clear();
        self.stop_typing().await;
        info!("session cleared");
        self.notify(ClientEvent::LoggedOut);
    }
}

#[cfg(test)]
#[path = "tests/fixtures.rs"]
mod fixtures;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
