use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::{
    domain::{Conversation, ConversationId, Message, MessageId, User, UserId},
    protocol::{
        ConversationPage, CreatedConversation, DeletedMessage, MessagePage, OutboundEvent,
        Profile, RpcResponse, ServerEvent,
    },
};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{info, warn};
use url::Url;

const INBOUND_BUFFER: usize = 1024;

#[async_trait]
pub trait ChatRpc: Send + Sync {
    async fn me(&self) -> Result<RpcResponse<Profile>>;
    async fn list_conversations(&self) -> Result<RpcResponse<Vec<Conversation>>>;
    async fn get_conversation(
        &self,
        conversation_id: ConversationId,
        take: u32,
    ) -> Result<RpcResponse<ConversationPage>>;
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        skip: u64,
        take: u32,
    ) -> Result<RpcResponse<MessagePage>>;
    async fn create_message(
        &self,
        conversation_id: ConversationId,
        content: &str,
    ) -> Result<RpcResponse<Message>>;
    async fn update_message(&self, message_id: MessageId, content: &str)
        -> Result<RpcResponse<Message>>;
    async fn delete_message(&self, message_id: MessageId) -> Result<RpcResponse<DeletedMessage>>;
    async fn create_conversation(
        &self,
        recipient_id: UserId,
    ) -> Result<RpcResponse<CreatedConversation>>;
    async fn close_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> Result<RpcResponse<ConversationId>>;
    async fn send_friend_request(&self, username: &str) -> Result<RpcResponse<User>>;
    async fn accept_friend_request(&self, user_id: UserId) -> Result<RpcResponse<User>>;
    async fn decline_friend_request(&self, user_id: UserId) -> Result<RpcResponse<User>>;
    async fn cancel_friend_request(&self, user_id: UserId) -> Result<RpcResponse<User>>;
    async fn remove_friend(&self, user_id: UserId) -> Result<RpcResponse<User>>;
}

/// Supplies the access token; refreshing it is the provider's business.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<Option<String>>;
}

pub struct NoCredentials;

#[async_trait]
impl CredentialProvider for NoCredentials {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

pub struct StaticToken(pub String);

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<Option<String>> {
        Ok(Some(self.0.clone()))
    }
}

pub trait RealtimeConnection: Send + Sync {
    fn emit(&self, event: OutboundEvent) -> Result<()>;
    fn subscribe(&self) -> broadcast::Receiver<ServerEvent>;
}

/// In-process connection for tests and tooling.
pub struct ChannelConnection {
    inbound: broadcast::Sender<ServerEvent>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
}

impl ChannelConnection {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundEvent>) {
        let (inbound, _) = broadcast::channel(INBOUND_BUFFER);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        (Self { inbound, outbound }, outbound_rx)
    }

    /// Returns the number of subscribers that will see the event.
    pub fn deliver(&self, event: ServerEvent) -> usize {
        self.inbound.send(event).unwrap_or(0)
    }
}

impl RealtimeConnection for ChannelConnection {
    fn emit(&self, event: OutboundEvent) -> Result<()> {
        self.outbound
            .send(event)
            .map_err(|err| anyhow!("outbound channel closed, dropped {}", err.0.name()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.inbound.subscribe()
    }
}

pub struct WsConnection {
    // the reader task holds the only strong sender
    inbound: broadcast::WeakSender<ServerEvent>,
    outbound: mpsc::UnboundedSender<OutboundEvent>,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

impl WsConnection {
    pub async fn connect(ws_url: &str, credentials: &dyn CredentialProvider) -> Result<Self> {
        let mut url = Url::parse(ws_url).with_context(|| format!("invalid websocket url: {ws_url}"))?;
        if let Some(token) = credentials.access_token().await? {
            url.query_pairs_mut().append_pair("token", &token);
        }

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("failed to connect websocket: {ws_url}"))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();

        let (inbound_tx, _) = broadcast::channel(INBOUND_BUFFER);
        let inbound = inbound_tx.downgrade();
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<OutboundEvent>();

        let writer_task = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                let name = event.name();
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(event = name, "failed to encode outbound event: {err}");
                        continue;
                    }
                };
                if let Err(err) = ws_writer.send(WsMessage::Text(text)).await {
                    warn!(event = name, "websocket send failed: {err}");
                    break;
                }
            }
            let _ = ws_writer.close().await;
        });

        let reader_task = tokio::spawn(async move {
            while let Some(frame) = ws_reader.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            let _ = inbound_tx.send(event);
                        }
                        Err(err) => warn!("invalid server event: {err}"),
                    },
                    Ok(WsMessage::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!("websocket receive failed: {err}");
                        break;
                    }
                }
            }
            info!("realtime connection closed");
        });

        info!(url = ws_url, "realtime connection established");
        Ok(Self {
            inbound,
            outbound,
            reader_task,
            writer_task,
        })
    }
}

impl RealtimeConnection for WsConnection {
    fn emit(&self, event: OutboundEvent) -> Result<()> {
        self.outbound
            .send(event)
            .map_err(|err| anyhow!("websocket writer stopped, dropped {}", err.0.name()))
    }

    fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        match self.inbound.upgrade() {
            Some(inbound) => inbound.subscribe(),
            None => broadcast::channel(1).1,
        }
    }
}

impl Drop for WsConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
        self.writer_task.abort();
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
