use tabletop_shared::error::SessionResult;
use tabletop_shared::layout::logical_to_physical;
use tabletop_shared::protocol::ClientMsg;
use tabletop_shared::seat::{validate_seat_index, SeatIndex, SeatRequest};

/// Seat the requester expects the host to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    AnySeat,
    NoSeat,
    Seat(SeatIndex),
}

impl Expected {
    fn is_met_by(self, seat: Option<SeatIndex>) -> bool {
        match self {
            Expected::AnySeat => seat.is_some(),
            Expected::NoSeat => seat.is_none(),
            Expected::Seat(s) => seat == Some(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestPhase {
    Idle,
    Requesting {
        requested: SeatRequest,
        expected: Expected,
    },
    Assigned {
        seat: Option<SeatIndex>,
    },
    Rejected {
        requested: SeatRequest,
    },
}

/// Per-participant seat request state machine.
///
/// `Idle -> Requesting -> Assigned | Rejected -> Idle`. The host never
/// answers a rejected request, so `Rejected` is reached through
/// [`SeatRequester::time_out`], driven by the caller's own timer.
#[derive(Debug, Clone)]
pub struct SeatRequester {
    current: Option<SeatIndex>,
    phase: RequestPhase,
}

impl Default for SeatRequester {
    fn default() -> Self {
        Self::new()
    }
}

impl SeatRequester {
    pub fn new() -> Self {
        Self {
            current: None,
            phase: RequestPhase::Idle,
        }
    }

    /// Seat the host last confirmed for this participant.
    pub fn current(&self) -> Option<SeatIndex> {
        self.current
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, RequestPhase::Requesting { .. })
    }

    /// Start a request. `layout_count` is the replica's layout input, used to
    /// predict where a logical index lands.
    ///
    /// Returns `None` when the current seat already satisfies the request;
    /// the host would not broadcast anything for it.
    pub fn request(
        &mut self,
        requested: SeatRequest,
        layout_count: usize,
    ) -> SessionResult<Option<ClientMsg>> {
        let expected = match requested {
            SeatRequest::Any => Expected::AnySeat,
            SeatRequest::Spectator => Expected::NoSeat,
            SeatRequest::Physical { index } => Expected::Seat(validate_seat_index(index)?),
            SeatRequest::Logical { index } => {
                Expected::Seat(logical_to_physical(index, layout_count)?)
            }
        };

        if expected.is_met_by(self.current) {
            self.phase = RequestPhase::Assigned {
                seat: self.current,
            };
            return Ok(None);
        }

        if let RequestPhase::Requesting { requested: prev, .. } = self.phase {
            tracing::debug!("Seat request {:?} superseded by {:?}", prev, requested);
        }
        self.phase = RequestPhase::Requesting {
            requested,
            expected,
        };
        Ok(Some(ClientMsg::RequestSeat {
            current: self.current,
            requested,
        }))
    }

    /// Record the seat host state now shows. Returns the previous seat when it changed.
    pub fn observe(&mut self, seat: Option<SeatIndex>) -> Option<Option<SeatIndex>> {
        let previous = self.current;
        self.current = seat;
        if let RequestPhase::Requesting { expected, .. } = self.phase {
            if expected.is_met_by(seat) {
                self.phase = RequestPhase::Assigned { seat };
            }
        }
        (previous != seat).then_some(previous)
    }

    /// Give up on a pending request.
    pub fn time_out(&mut self) {
        if let RequestPhase::Requesting { requested, .. } = self.phase {
            tracing::warn!("Seat request {:?} got no answer", requested);
            self.phase = RequestPhase::Rejected { requested };
        }
    }

    /// Return to `Idle` after the caller has handled the outcome.
    pub fn acknowledge(&mut self) {
        if matches!(
            self.phase,
            RequestPhase::Assigned { .. } | RequestPhase::Rejected { .. }
        ) {
            self.phase = RequestPhase::Idle;
        }
    }

    /// Forget everything, e.g. after losing the connection.
    pub fn reset(&mut self) {
        self.current = None;
        self.phase = RequestPhase::Idle;
    }
}
