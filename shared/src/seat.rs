use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{SessionError, SessionResult};

/// Number of physical seat slots at the table.
pub const SEAT_COUNT: usize = 8;

/// Host-assigned participant identity.
pub type ParticipantId = u32;

/// Physical seat slot, always `< SEAT_COUNT` once validated.
pub type SeatIndex = u8;

/// What a participant asks the host for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SeatRequest {
    /// Any free seat, host picks.
    Any,
    /// Leave the table but stay in the session.
    Spectator,
    /// A fixed slot identity.
    Physical { index: SeatIndex },
    /// A seat in UI order; mapped to a physical slot by the host.
    Logical { index: SeatIndex },
}

/// Check a physical slot index against the table size.
pub fn validate_seat_index(index: SeatIndex) -> SessionResult<SeatIndex> {
    if (index as usize) < SEAT_COUNT {
        Ok(index)
    } else {
        Err(SessionError::InvalidSeatIndex(index as i64))
    }
}
