use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, oneshot, Semaphore};

use crate::session_loop::{HostBroadcast, HostCommand};
use tabletop_shared::protocol::{ClientMsg, ServerMsg};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub cmd_tx: mpsc::Sender<HostCommand>,
    pub broadcast_tx: broadcast::Sender<HostBroadcast>,
    pub connection_semaphore: Arc<Semaphore>,
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct JoinParams {
    #[serde(default)]
    pub name: String,
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<JoinParams>,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, params, app_state))
}

/// Turn a participant message into a session command.
fn to_command(id: u32, msg: ClientMsg) -> HostCommand {
    match msg {
        ClientMsg::RequestSeat { current, requested } => HostCommand::RequestSeat {
            id,
            current,
            requested,
        },
        ClientMsg::RegisterColor { preferred, seat } => HostCommand::RegisterColor {
            id,
            preferred,
            seat,
        },
        ClientMsg::SetPaletteColor { slot, color } => {
            HostCommand::SetPaletteColor { id, slot, color }
        }
        ClientMsg::SetActivePlayer { index } => HostCommand::SetActivePlayer { id, index },
    }
}

fn to_server_msg(broadcast: HostBroadcast) -> ServerMsg {
    match broadcast {
        HostBroadcast::State(snapshot) => ServerMsg::SessionState(snapshot),
        HostBroadcast::ColorConflict(msg) => ServerMsg::ColorConflict(msg),
    }
}

async fn handle_socket(socket: WebSocket, params: JoinParams, app_state: AppState) {
    let _permit = match app_state.connection_semaphore.clone().try_acquire_owned() {
        Ok(permit) => permit,
        Err(_) => {
            tracing::warn!("Connection limit reached, refusing participant");
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();

    // Subscribe before joining so no state published after the welcome is missed.
    // Anything older than the welcome snapshot is dropped by the replica's version check.
    let mut broadcast_rx = app_state.broadcast_tx.subscribe();

    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .cmd_tx
        .send(HostCommand::Join {
            name: params.name,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send Join command");
        return;
    }

    let welcome = match resp_rx.await {
        Ok(welcome) => welcome,
        Err(_) => {
            tracing::error!("Failed to receive welcome");
            return;
        }
    };
    let my_id = welcome.self_id;

    tracing::info!("Participant {} connected", my_id);

    let welcome_sent = match serde_json::to_string(&ServerMsg::Welcome(welcome)) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to encode welcome: {}", e);
            false
        }
    };

    if welcome_sent {
        loop {
            tokio::select! {
                // Participant -> Host
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<ClientMsg>(&text) {
                                Ok(client_msg) => {
                                    if app_state.cmd_tx.send(to_command(my_id, client_msg)).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!("Ignoring malformed message from {}: {}", my_id, e);
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(_)) => break,
                        _ => {} // Ignore ping/pong/binary
                    }
                }

                // Host -> Participant (broadcast)
                result = broadcast_rx.recv() => {
                    match result {
                        Ok(broadcast) => {
                            match serde_json::to_string(&to_server_msg(broadcast)) {
                                Ok(json) => {
                                    if sink.send(Message::Text(json.into())).await.is_err() {
                                        break;
                                    }
                                }
                                Err(e) => tracing::error!("Failed to encode broadcast: {}", e),
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Snapshots are full state; the next one catches the replica up.
                            tracing::warn!("Participant {} lagged by {} messages", my_id, n);
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    // Cleanup on disconnect
    let _ = app_state
        .cmd_tx
        .send(HostCommand::Leave { id: my_id })
        .await;
    tracing::info!("Participant {} disconnected", my_id);
}
