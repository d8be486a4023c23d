use std::sync::Arc;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};

use crate::game_loop::GameCommand;
use crate::protocol::{encode, ClientMsg, ServerMsg};
use crate::registry::OUTBOX_CAPACITY;

/// Malformed messages tolerated before a connection is closed
pub const MAX_PARSE_ERRORS: u32 = 5;

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub connection_semaphore: Arc<Semaphore>,
    pub max_message_bytes: usize,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(ws: WebSocketUpgrade, State(app_state): State<AppState>) -> Response {
    let permit = match Arc::clone(&app_state.connection_semaphore).try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Connection limit reached, rejecting upgrade");
            return (StatusCode::SERVICE_UNAVAILABLE, "Server full").into_response();
        }
    };
    ws.on_upgrade(move |socket| handle_socket(socket, app_state, permit))
}

async fn close_with(sink: &mut SplitSink<WebSocket, Message>, code: u16, reason: &'static str) {
    let frame = CloseFrame {
        code,
        reason: reason.into(),
    };
    let _ = sink.send(Message::Close(Some(frame))).await;
}

async fn handle_socket(socket: WebSocket, app_state: AppState, _permit: OwnedSemaphorePermit) {
    let (mut sink, mut stream) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<ServerMsg>(OUTBOX_CAPACITY);

    let (resp_tx, resp_rx) = oneshot::channel();
    let connect = GameCommand::Connect {
        outbox: outbox_tx,
        response: resp_tx,
    };
    if app_state.game_tx.send(connect).await.is_err() {
        tracing::error!("Failed to send Connect command");
        return;
    }

    let (my_id, welcome) = match resp_rx.await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!("Failed to receive welcome");
            return;
        }
    };

    tracing::info!("Connection {} opened", my_id);

    let Some(welcome_json) = encode(&ServerMsg::Welcome(welcome)) else {
        let _ = app_state
            .game_tx
            .send(GameCommand::Disconnect { id: my_id })
            .await;
        return;
    };
    if sink.send(Message::Text(welcome_json.into())).await.is_err() {
        let _ = app_state
            .game_tx
            .send(GameCommand::Disconnect { id: my_id })
            .await;
        return;
    }

    let mut parse_errors: u32 = 0;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > app_state.max_message_bytes {
                            tracing::warn!(
                                "Connection {} sent {} bytes, closing",
                                my_id,
                                text.len()
                            );
                            close_with(&mut sink, close_code::SIZE, "message too large").await;
                            break;
                        }
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(msg) => {
                                let cmd = GameCommand::Client { id: my_id, msg };
                                if app_state.game_tx.send(cmd).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                parse_errors += 1;
                                tracing::debug!("Connection {} sent bad message: {}", my_id, e);
                                if parse_errors >= MAX_PARSE_ERRORS {
                                    tracing::warn!(
                                        "Connection {} exceeded {} parse errors, closing",
                                        my_id,
                                        MAX_PARSE_ERRORS
                                    );
                                    close_with(&mut sink, close_code::POLICY, "too many invalid messages").await;
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Connection {} socket error: {}", my_id, e);
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client
            out = outbox_rx.recv() => {
                match out {
                    Some(msg) => {
                        let Some(json) = encode(&msg) else {
                            continue;
                        };
                        if sink.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::Disconnect { id: my_id })
        .await;
    tracing::info!("Connection {} closed", my_id);
}
