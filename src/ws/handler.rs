//! WebSocket upgrade handler and session loop

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Command, Transport};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session = %session_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let mut outbound = state.hub.register(session_id);

    // Writer task: hub channel -> WebSocket
    let writer_session = session_id;
    let writer = tokio::spawn(async move {
        while let Some(json) = outbound.recv().await {
            if let Err(e) = ws_sink.send(Message::Text(json)).await {
                debug!(session = %writer_session, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Tell the client its session id.
    state.hub.send(session_id, &ServerMsg::Init { id: session_id });

    // Reader loop: WebSocket -> game loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        let cmd = Command::Inbound {
                            session: session_id,
                            msg,
                        };
                        if state.commands.send(cmd).await.is_err() {
                            debug!(session = %session_id, "Command channel closed");
                            break;
                        }
                    }
                    // Unparsable payloads are dropped without a reply;
                    // the connection stays open.
                    Err(e) => {
                        debug!(session = %session_id, error = %e, "Malformed client message dropped");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                debug!(session = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Cleanup on disconnect.
    state.hub.unregister(session_id);
    let _ = state
        .commands
        .send(Command::Disconnect {
            session: session_id,
        })
        .await;
    writer.abort();

    info!(session = %session_id, "WebSocket connection closed");
}
