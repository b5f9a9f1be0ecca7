use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::color::Color;
use crate::config::TableConfig;
use crate::seat::{ParticipantId, SeatIndex, SeatRequest};

/// Protocol version - increment when making breaking changes.
pub const PROTOCOL_VERSION: u32 = 1;

// === Host -> Participant ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ServerMsg {
    #[serde(rename = "welcome")]
    Welcome(WelcomeMsg),
    #[serde(rename = "session_state")]
    SessionState(SessionSnapshot),
    #[serde(rename = "color_conflict")]
    ColorConflict(ColorConflictMsg),
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeMsg {
    pub protocol_version: u32,
    pub server_version: String,
    pub self_id: ParticipantId,
    pub is_host: bool,
    pub config: TableConfig,
    pub snapshot: SessionSnapshot,
}

/// Full session state. `version` increases with every host mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub version: u64,
    pub seats: Vec<SeatWire>,
    pub colors: Vec<PlayerColorWire>,
    pub palette: Vec<Color>,
    pub active_player: Option<SeatIndex>,
    pub occupant_count: u32,
    /// Seat count the layout is computed for
    pub layout_count: u32,
    pub participants: Vec<ParticipantWire>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SeatWire {
    pub index: SeatIndex,
    pub occupant: Option<ParticipantId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PlayerColorWire {
    pub participant: ParticipantId,
    pub color: Color,
    pub preferred: Color,
    /// True when the preferred color was granted as requested
    pub custom: bool,
    pub seat: Option<SeatIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParticipantWire {
    pub id: ParticipantId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ColorConflictMsg {
    pub participant: ParticipantId,
    pub requested: Color,
    pub assigned: Color,
}

impl SessionSnapshot {
    pub fn occupant(&self, index: SeatIndex) -> Option<ParticipantId> {
        self.seats
            .iter()
            .find(|s| s.index == index)
            .and_then(|s| s.occupant)
    }

    pub fn seat_of(&self, participant: ParticipantId) -> Option<SeatIndex> {
        self.seats
            .iter()
            .find(|s| s.occupant == Some(participant))
            .map(|s| s.index)
    }

    pub fn color_of(&self, participant: ParticipantId) -> Option<Color> {
        self.colors
            .iter()
            .find(|c| c.participant == participant)
            .map(|c| c.color)
    }
}

// === Participant -> Host ===

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type")]
pub enum ClientMsg {
    #[serde(rename = "request_seat")]
    RequestSeat {
        current: Option<SeatIndex>,
        requested: SeatRequest,
    },
    #[serde(rename = "register_color")]
    RegisterColor {
        preferred: Color,
        seat: Option<SeatIndex>,
    },
    #[serde(rename = "set_palette_color")]
    SetPaletteColor { slot: u8, color: Color },
    #[serde(rename = "set_active_player")]
    SetActivePlayer { index: Option<SeatIndex> },
}
