use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{
        ws::{Message as AxumWsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

#[derive(Clone)]
struct WsServerState {
    token_tx: Arc<Mutex<Option<oneshot::Sender<Option<String>>>>>,
    frame_tx: Arc<Mutex<Option<oneshot::Sender<String>>>>,
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<WsServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    if let Some(tx) = state.token_tx.lock().await.take() {
        let _ = tx.send(query.get("token").cloned());
    }
    ws.on_upgrade(move |socket| ws_session(state, socket))
}

async fn ws_session(state: WsServerState, mut socket: WebSocket) {
    // Wait for the client's first frame, then push one garbage frame and one event.
    while let Some(Ok(frame)) = socket.recv().await {
        if let AxumWsMessage::Text(text) = frame {
            if let Some(tx) = state.frame_tx.lock().await.take() {
                let _ = tx.send(text);
            }
            break;
        }
    }
    let _ = socket
        .send(AxumWsMessage::Text("{\"event\":\"notAThing\"}".to_string()))
        .await;
    let event = ServerEvent::OnFriendRemoved {
        user_id: UserId(5),
    };
    let text = serde_json::to_string(&event).expect("encode");
    let _ = socket.send(AxumWsMessage::Text(text)).await;
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn spawn_ws_server() -> Result<(String, oneshot::Receiver<Option<String>>, oneshot::Receiver<String>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (token_tx, token_rx) = oneshot::channel();
    let (frame_tx, frame_rx) = oneshot::channel();
    let state = WsServerState {
        token_tx: Arc::new(Mutex::new(Some(token_tx))),
        frame_tx: Arc::new(Mutex::new(Some(frame_tx))),
    };
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("ws://{addr}/ws"), token_rx, frame_rx))
}

async fn hang_up_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let _ = socket.send(AxumWsMessage::Close(None)).await;
    })
}

async fn spawn_hanging_up_ws_server() -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new().route("/ws", get(hang_up_handler));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("ws://{addr}/ws"))
}

#[tokio::test]
async fn channel_connection_fans_out_and_records() {
    let (connection, mut outbound) = ChannelConnection::new();
    let mut first = connection.subscribe();
    let mut second = connection.subscribe();

    let event = ServerEvent::OnFriendsStatusConnected { user_id: UserId(3) };
    assert_eq!(connection.deliver(event.clone()), 2);
    assert_eq!(first.recv().await.expect("first"), event);
    assert_eq!(second.recv().await.expect("second"), event);

    connection
        .emit(OutboundEvent::GetFriendsStatus {
            friend_ids: vec![UserId(3)],
        })
        .expect("emit");
    assert_eq!(
        outbound.try_recv().expect("outbound"),
        OutboundEvent::GetFriendsStatus {
            friend_ids: vec![UserId(3)]
        }
    );
}

#[tokio::test]
async fn channel_connection_emit_fails_once_receiver_is_gone() {
    let (connection, outbound) = ChannelConnection::new();
    drop(outbound);
    let err = connection
        .emit(OutboundEvent::OnConversationLeave {
            conversation_id: ConversationId(1),
        })
        .expect_err("must fail");
    assert!(err.to_string().contains("onConversationLeave"));
}

#[tokio::test]
async fn ws_connection_exchanges_json_frames_and_skips_garbage() {
    let (ws_url, token_rx, frame_rx) = spawn_ws_server().await.expect("spawn server");
    let connection = WsConnection::connect(&ws_url, &StaticToken("secret".to_string()))
        .await
        .expect("connect");
    let mut events = connection.subscribe();

    assert_eq!(token_rx.await.expect("token"), Some("secret".to_string()));

    connection
        .emit(OutboundEvent::OnConversationJoin {
            conversation_id: ConversationId(8),
        })
        .expect("emit");
    let frame = frame_rx.await.expect("frame");
    let sent: OutboundEvent = serde_json::from_str(&frame).expect("decode frame");
    assert_eq!(
        sent,
        OutboundEvent::OnConversationJoin {
            conversation_id: ConversationId(8)
        }
    );

    let received = tokio::time::timeout(std::time::Duration::from_secs(5), events.recv())
        .await
        .expect("timely event")
        .expect("event");
    assert_eq!(received, ServerEvent::OnFriendRemoved { user_id: UserId(5) });
}

#[tokio::test]
async fn ws_connection_rejects_malformed_url() {
    let result = WsConnection::connect("not a url", &NoCredentials).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn ws_connection_reports_closed_after_server_hangs_up() {
    let ws_url = spawn_hanging_up_ws_server().await.expect("spawn server");
    let connection = WsConnection::connect(&ws_url, &NoCredentials)
        .await
        .expect("connect");
    let mut events = connection.subscribe();

    let received = tokio::time::timeout(std::time::Duration::from_secs(3), events.recv())
        .await
        .expect("subscriber sees the closed connection");
    assert!(matches!(received, Err(broadcast::error::RecvError::Closed)));

    let mut late = connection.subscribe();
    assert!(matches!(
        late.recv().await,
        Err(broadcast::error::RecvError::Closed)
    ));
}
