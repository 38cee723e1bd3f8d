//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{MatchHandle, PlayerInput};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Match to attach to
    pub match_id: Uuid,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    match state.match_registry.get(&query.match_id) {
        Some(handle) => {
            info!(match_id = %query.match_id, "WebSocket upgrade for match");
            ws.on_upgrade(move |socket| handle_socket(socket, handle))
        }
        None => {
            warn!(match_id = %query.match_id, "WebSocket upgrade for unknown match");
            (StatusCode::NOT_FOUND, "Unknown match").into_response()
        }
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, handle: MatchHandle) {
    let connection_id = Uuid::new_v4();
    info!(match_id = %handle.id, connection_id = %connection_id, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();
    // Subscribe before anything else so no event is missed
    let event_rx = handle.event_tx.subscribe();

    let welcome = ServerMsg::Welcome {
        match_id: handle.id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(connection_id = %connection_id, error = %e, "Failed to send welcome");
        return;
    }

    // Replies meant for this connection only
    let (reply_tx, reply_rx) = mpsc::channel::<ServerMsg>(16);

    let sync = PlayerInput {
        connection_id,
        msg: ClientMsg::RequestState,
        received_at: unix_millis(),
        reply_tx: reply_tx.clone(),
    };
    if handle.input_tx.send(sync).await.is_err() {
        debug!(connection_id = %connection_id, "Match closed before sync");
        return;
    }

    run_session(
        connection_id,
        ws_sink,
        ws_stream,
        handle.input_tx.clone(),
        event_rx,
        reply_tx,
        reply_rx,
    )
    .await;

    info!(match_id = %handle.id, connection_id = %connection_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    connection_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    input_tx: mpsc::Sender<PlayerInput>,
    mut event_rx: broadcast::Receiver<ServerMsg>,
    reply_tx: mpsc::Sender<ServerMsg>,
    mut reply_rx: mpsc::Receiver<ServerMsg>,
) {
    let rate_limiter = ConnectionRateLimiter::new();

    // Spawn writer task: match events and replies -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                event = event_rx.recv() => match event {
                    Ok(msg) => msg,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(
                            connection_id = %connection_id,
                            lagged_count = n,
                            "Client lagged, skipping {} messages", n
                        );
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(connection_id = %connection_id, "Event channel closed");
                        break;
                    }
                },
                Some(reply) = reply_rx.recv() => reply,
            };

            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> match task
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match decode_client_msg(&text, &rate_limiter) {
                Ok(msg) => {
                    let input = PlayerInput {
                        connection_id,
                        msg,
                        received_at: unix_millis(),
                        reply_tx: reply_tx.clone(),
                    };

                    if input_tx.send(input).await.is_err() {
                        debug!(connection_id = %connection_id, "Input channel closed");
                        break;
                    }
                }
                Err(reply) => {
                    warn!(connection_id = %connection_id, reply = ?reply, "Rejected client message");
                    let _ = reply_tx.try_send(reply);
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Rate-check and parse one text frame; rejections carry the error reply
fn decode_client_msg(text: &str, limiter: &ConnectionRateLimiter) -> Result<ClientMsg, ServerMsg> {
    if !limiter.check_input() {
        return Err(error_msg("rate_limited", "Too many messages"));
    }
    serde_json::from_str(text).map_err(|e| error_msg("bad_message", &e.to_string()))
}

fn error_msg(code: &str, message: &str) -> ServerMsg {
    ServerMsg::Error {
        code: code.to_string(),
        message: message.to_string(),
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
