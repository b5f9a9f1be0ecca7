use tabletop_shared::error::{SessionError, SessionResult};
use tabletop_shared::layout::FIXED_LAYOUT_MAX;
use tabletop_shared::protocol::SeatWire;
use tabletop_shared::seat::{validate_seat_index, ParticipantId, SeatIndex, SEAT_COUNT};

/// Seats an "any" claim tries first while the fixed table still has room.
const FIXED_PREFERENCE: [SeatIndex; FIXED_LAYOUT_MAX] = [0, 1, 2, 3];

/// A claim target after logical indices have been mapped to physical ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatTarget {
    Any,
    Spectator,
    Seat(SeatIndex),
}

/// Result of a claim: where the participant sat before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeatChange {
    pub participant: ParticipantId,
    pub old_seat: Option<SeatIndex>,
    pub new_seat: Option<SeatIndex>,
}

impl SeatChange {
    pub fn is_noop(&self) -> bool {
        self.old_seat == self.new_seat
    }
}

/// Host-owned occupancy of the eight physical seats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeatLedger {
    slots: [Option<ParticipantId>; SEAT_COUNT],
}

impl SeatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn occupant(&self, index: SeatIndex) -> Option<ParticipantId> {
        self.slots.get(index as usize).copied().flatten()
    }

    pub fn seat_of(&self, participant: ParticipantId) -> Option<SeatIndex> {
        self.slots
            .iter()
            .position(|s| *s == Some(participant))
            .map(|i| i as SeatIndex)
    }

    pub fn occupant_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Seat count the layout must show so every occupied seat has a pose:
    /// the occupant count, widened to cover the highest occupied index.
    pub fn layout_count(&self) -> usize {
        let extent = self
            .slots
            .iter()
            .rposition(|s| s.is_some())
            .map_or(0, |i| i + 1);
        extent.max(self.occupant_count())
    }

    pub fn first_occupied(&self) -> Option<SeatIndex> {
        self.slots
            .iter()
            .position(|s| s.is_some())
            .map(|i| i as SeatIndex)
    }

    /// Seat an "any" claim lands on. While fewer than four seats are taken the
    /// fixed-table order is tried first; past that it is plain first-available.
    pub fn find_any_seat(&self) -> Option<SeatIndex> {
        let is_free = |i: SeatIndex| self.slots[i as usize].is_none();
        if self.occupant_count() < FIXED_LAYOUT_MAX {
            if let Some(seat) = FIXED_PREFERENCE.iter().copied().find(|&i| is_free(i)) {
                return Some(seat);
            }
        }
        (0..SEAT_COUNT as SeatIndex).find(|&i| is_free(i))
    }

    /// Move `participant` to `target`, vacating their previous seat in the same step.
    /// A participant asking for "any" while seated keeps their seat.
    pub fn claim(&mut self, participant: ParticipantId, target: SeatTarget) -> SessionResult<SeatChange> {
        let current = self.seat_of(participant);
        let resolved = match target {
            SeatTarget::Spectator => None,
            SeatTarget::Any => match current {
                Some(seat) => Some(seat),
                None => Some(self.find_any_seat().ok_or(SessionError::NoSeatsAvailable)?),
            },
            SeatTarget::Seat(index) => {
                let index = validate_seat_index(index)?;
                match self.slots[index as usize] {
                    Some(holder) if holder != participant => {
                        return Err(SessionError::SeatUnavailable {
                            seat: index,
                            holder,
                        });
                    }
                    _ => Some(index),
                }
            }
        };

        let change = SeatChange {
            participant,
            old_seat: current,
            new_seat: resolved,
        };
        if change.is_noop() {
            return Ok(change);
        }
        if let Some(old) = current {
            self.slots[old as usize] = None;
        }
        if let Some(new) = resolved {
            self.slots[new as usize] = Some(participant);
        }
        Ok(change)
    }

    /// Empty a seat. Vacating an empty seat is a no-op.
    pub fn vacate(&mut self, index: SeatIndex) -> SessionResult<Option<ParticipantId>> {
        let index = validate_seat_index(index)?;
        Ok(self.slots[index as usize].take())
    }

    pub fn vacate_participant(&mut self, participant: ParticipantId) -> Option<SeatIndex> {
        let seat = self.seat_of(participant)?;
        self.slots[seat as usize] = None;
        Some(seat)
    }

    pub fn to_wire(&self) -> Vec<SeatWire> {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, occupant)| SeatWire {
                index: i as SeatIndex,
                occupant: *occupant,
            })
            .collect()
    }
}
