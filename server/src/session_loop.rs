use crate::config::ServerConfig;
use crate::state::SessionState;
use tabletop_shared::color::Color;
use tabletop_shared::error::SessionError;
use tabletop_shared::protocol::{ColorConflictMsg, SessionSnapshot, WelcomeMsg, PROTOCOL_VERSION};
use tabletop_shared::seat::{ParticipantId, SeatIndex, SeatRequest};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Commands from participant connections to the session loop.
/// The loop is the only writer, so each command is applied whole.
#[derive(Debug)]
pub enum HostCommand {
    Join {
        name: String,
        response: oneshot::Sender<WelcomeMsg>,
    },
    Leave {
        id: ParticipantId,
    },
    RequestSeat {
        id: ParticipantId,
        current: Option<SeatIndex>,
        requested: SeatRequest,
    },
    RegisterColor {
        id: ParticipantId,
        preferred: Color,
        seat: Option<SeatIndex>,
    },
    SetPaletteColor {
        id: ParticipantId,
        slot: u8,
        color: Color,
    },
    SetActivePlayer {
        id: ParticipantId,
        index: Option<SeatIndex>,
    },
    Snapshot {
        response: oneshot::Sender<SessionSnapshot>,
    },
}

/// Broadcasts from the session loop to all participants
#[derive(Debug, Clone)]
pub enum HostBroadcast {
    State(SessionSnapshot),
    ColorConflict(ColorConflictMsg),
}

fn publish(broadcast_tx: &broadcast::Sender<HostBroadcast>, state: &SessionState) {
    // No receivers is fine: nobody is connected to hear it.
    let _ = broadcast_tx.send(HostBroadcast::State(state.snapshot()));
}

fn require_host(state: &SessionState, id: ParticipantId) -> Result<(), SessionError> {
    if state.is_host_participant(id) {
        Ok(())
    } else {
        Err(SessionError::NotHost)
    }
}

/// Run the session loop. Owns all session state.
pub async fn run_session_loop(
    mut cmd_rx: mpsc::Receiver<HostCommand>,
    broadcast_tx: broadcast::Sender<HostBroadcast>,
    server_config: ServerConfig,
) {
    let mut state = SessionState::new(&server_config);

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            HostCommand::Join { name, response } => {
                let handle = state.join(&name);
                let welcome = WelcomeMsg {
                    protocol_version: PROTOCOL_VERSION,
                    server_version: env!("CARGO_PKG_VERSION").to_string(),
                    self_id: handle.id,
                    is_host: state.is_host_participant(handle.id),
                    config: state.config.clone(),
                    snapshot: state.snapshot(),
                };
                if response.send(welcome).is_err() {
                    tracing::warn!("Participant {} went away before welcome", handle.id);
                }
                tracing::info!("Participant {} ({}) joined", handle.id, handle.name);
                publish(&broadcast_tx, &state);
            }
            HostCommand::Leave { id } => {
                if state.leave(id) {
                    tracing::info!("Participant {} left", id);
                    publish(&broadcast_tx, &state);
                }
            }
            HostCommand::RequestSeat {
                id,
                current,
                requested,
            } => match state.claim_seat(id, current, requested) {
                Ok(outcome) if outcome.change.is_noop() => {
                    tracing::debug!("Seat request {:?} from {} changed nothing", requested, id);
                }
                Ok(outcome) => {
                    publish(&broadcast_tx, &state);
                    if let Some(msg) = outcome.color.and_then(|c| c.conflict_msg()) {
                        let _ = broadcast_tx.send(HostBroadcast::ColorConflict(msg));
                    }
                }
                Err(e) => {
                    tracing::warn!("Dropped seat request {:?} from {}: {}", requested, id, e);
                }
            },
            HostCommand::RegisterColor {
                id,
                preferred,
                seat,
            } => match state.register_color(id, preferred, seat) {
                Ok(assignment) => {
                    publish(&broadcast_tx, &state);
                    if let Some(msg) = assignment.conflict_msg() {
                        tracing::info!(
                            "Participant {} asked for {} and got {}",
                            id,
                            msg.requested,
                            msg.assigned
                        );
                        let _ = broadcast_tx.send(HostBroadcast::ColorConflict(msg));
                    }
                }
                Err(e) => {
                    tracing::warn!("Dropped color registration from {}: {}", id, e);
                }
            },
            HostCommand::SetPaletteColor { id, slot, color } => {
                let result = require_host(&state, id)
                    .and_then(|_| state.set_palette_color(slot as usize, color));
                match result {
                    Ok(true) => publish(&broadcast_tx, &state),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Dropped palette change from {}: {}", id, e),
                }
            }
            HostCommand::SetActivePlayer { id, index } => {
                let result = require_host(&state, id).and_then(|_| state.set_active_player(index));
                match result {
                    Ok(true) => publish(&broadcast_tx, &state),
                    Ok(false) => {}
                    Err(e) => tracing::warn!("Dropped active player change from {}: {}", id, e),
                }
            }
            HostCommand::Snapshot { response } => {
                let _ = response.send(state.snapshot());
            }
        }
    }

    tracing::info!("Session loop ended");
}
