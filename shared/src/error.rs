use thiserror::Error;

use crate::seat::{ParticipantId, SeatIndex};

/// Failures of session operations. None of these are fatal: the host drops the
/// offending request and keeps serving everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("seat {seat} is held by participant {holder}")]
    SeatUnavailable { seat: SeatIndex, holder: ParticipantId },

    #[error("no free seat left at the table")]
    NoSeatsAvailable,

    /// Usually transient on replicas: the roster has not caught up yet.
    #[error("unknown participant {0}")]
    UnknownParticipant(ParticipantId),

    #[error("seat index {0} is out of range")]
    InvalidSeatIndex(i64),

    #[error("palette slot {0} is out of range")]
    InvalidPaletteSlot(usize),

    #[error("operation requires host authority")]
    NotHost,

    #[error("invalid color: {0}")]
    InvalidColor(String),
}

pub type SessionResult<T> = Result<T, SessionError>;
