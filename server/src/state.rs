use rand_chacha::ChaCha8Rng;

use crate::colors::{ColorAssignment, ColorRegistry};
use crate::config::ServerConfig;
use crate::ledger::{SeatChange, SeatLedger, SeatTarget};
use tabletop_shared::color::Color;
use tabletop_shared::config::TableConfig;
use tabletop_shared::error::{SessionError, SessionResult};
use tabletop_shared::layout::{compute_layout, logical_to_physical, Layout};
use tabletop_shared::presence::{ParticipantHandle, PresenceBridge, Roster};
use tabletop_shared::protocol::SessionSnapshot;
use tabletop_shared::seat::{validate_seat_index, ParticipantId, SeatIndex, SeatRequest};

/// Outcome of a seat claim that went through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeatOutcome {
    pub change: SeatChange,
    /// Set when sitting down registered a color that had to be resolved
    pub color: Option<ColorAssignment>,
    pub layout_changed: bool,
}

/// Host-authoritative session state, owned by the session loop task.
/// Every successful mutation bumps `version` exactly once.
pub struct SessionState {
    pub ledger: SeatLedger,
    pub colors: ColorRegistry,
    pub roster: Roster,
    pub config: TableConfig,
    pub rng: ChaCha8Rng,
    layout: Layout,
    active_player: Option<SeatIndex>,
    version: u64,
    next_participant_id: ParticipantId,
    host_participant: Option<ParticipantId>,
}

impl SessionState {
    pub fn new(server_config: &ServerConfig) -> Self {
        use rand::SeedableRng;
        let config = server_config.table.clone();
        let ledger = SeatLedger::new();
        Self {
            layout: compute_layout(ledger.layout_count(), &config),
            colors: ColorRegistry::new(&config),
            ledger,
            roster: Roster::new(),
            rng: ChaCha8Rng::seed_from_u64(server_config.rng_seed),
            config,
            active_player: None,
            version: 0,
            next_participant_id: 1,
            host_participant: None,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn active_player(&self) -> Option<SeatIndex> {
        self.active_player
    }

    /// The first participant to join holds host privileges for the session.
    pub fn is_host_participant(&self, id: ParticipantId) -> bool {
        self.host_participant == Some(id)
    }

    /// Register a newly connected participant.
    pub fn join(&mut self, name: &str) -> ParticipantHandle {
        let id = self.next_participant_id;
        self.next_participant_id += 1;

        let name = if name.trim().is_empty() {
            format!("Player {}", id)
        } else {
            name.trim().to_string()
        };
        let handle = ParticipantHandle { id, name };
        self.roster.insert(handle.clone());
        if self.host_participant.is_none() {
            self.host_participant = Some(id);
        }
        self.version += 1;
        handle
    }

    /// A disconnect vacates the participant's seat and releases its color.
    /// Returns false for unknown participants.
    pub fn leave(&mut self, id: ParticipantId) -> bool {
        if self.roster.remove(id).is_none() {
            return false;
        }
        if let Some(seat) = self.ledger.vacate_participant(id) {
            tracing::info!("Participant {} vacated seat {}", id, seat);
        }
        self.colors.unregister(id);
        self.refresh_topology();
        if self.is_host_participant(id) {
            tracing::warn!("Host participant {} left; host privileges are not handed over", id);
        }
        self.version += 1;
        true
    }

    /// Map a wire request onto a physical claim target using the current layout.
    fn resolve_target(&self, request: SeatRequest) -> SessionResult<SeatTarget> {
        Ok(match request {
            SeatRequest::Any => SeatTarget::Any,
            SeatRequest::Spectator => SeatTarget::Spectator,
            SeatRequest::Physical { index } => SeatTarget::Seat(validate_seat_index(index)?),
            SeatRequest::Logical { index } => {
                SeatTarget::Seat(logical_to_physical(index, self.ledger.layout_count())?)
            }
        })
    }

    /// Claim, swap or give up a seat as one transaction: ledger, color
    /// association, layout and active player all move together.
    pub fn claim_seat(
        &mut self,
        id: ParticipantId,
        current: Option<SeatIndex>,
        request: SeatRequest,
    ) -> SessionResult<SeatOutcome> {
        if !self.roster.contains(id) {
            return Err(SessionError::UnknownParticipant(id));
        }
        let held = self.ledger.seat_of(id);
        if current != held {
            tracing::debug!(
                "Participant {} reported seat {:?}, ledger has {:?}",
                id,
                current,
                held
            );
        }

        let target = self.resolve_target(request)?;
        let change = self.ledger.claim(id, target)?;
        if change.is_noop() {
            return Ok(SeatOutcome {
                change,
                color: None,
                layout_changed: false,
            });
        }

        let color = match change.new_seat {
            Some(seat) if !self.colors.is_registered(id) => {
                let preferred = self.colors.palette()[seat as usize];
                Some(self.colors.register(id, preferred, Some(seat), &mut self.rng))
            }
            _ => {
                self.colors.update_seat(id, change.new_seat);
                None
            }
        };
        let layout_changed = self.refresh_topology();
        self.version += 1;

        tracing::info!(
            "Participant {} seat {:?} -> {:?}",
            id,
            change.old_seat,
            change.new_seat
        );
        Ok(SeatOutcome {
            change,
            color,
            layout_changed,
        })
    }

    /// Host-side color registration. Without an explicit seat the
    /// participant's current seat biases the fallback.
    pub fn register_color(
        &mut self,
        id: ParticipantId,
        preferred: Color,
        seat: Option<SeatIndex>,
    ) -> SessionResult<ColorAssignment> {
        if !self.roster.contains(id) {
            return Err(SessionError::UnknownParticipant(id));
        }
        let held = self.ledger.seat_of(id);
        let hint = match seat {
            Some(s) => Some(validate_seat_index(s)?),
            None => held,
        };
        if held.is_some() && hint != held {
            tracing::debug!(
                "Participant {} registered a color for seat {:?} but sits at {:?}",
                id,
                hint,
                held
            );
        }
        // The client seat only picks the fallback palette entry; the recorded
        // association always follows the ledger.
        let assignment = self.colors.register(id, preferred, held.or(hint), &mut self.rng);
        self.colors.update_seat(id, held);
        self.version += 1;
        Ok(assignment)
    }

    pub fn set_palette_color(&mut self, slot: usize, color: Color) -> SessionResult<bool> {
        let changed = self.colors.set_palette_color(slot, color)?;
        if changed {
            self.version += 1;
        }
        Ok(changed)
    }

    /// Point the active-player highlight at an occupied seat, or clear it.
    pub fn set_active_player(&mut self, index: Option<SeatIndex>) -> SessionResult<bool> {
        if let Some(seat) = index {
            let seat = validate_seat_index(seat)?;
            if self.ledger.occupant(seat).is_none() {
                return Err(SessionError::InvalidSeatIndex(seat as i64));
            }
        }
        if self.active_player == index {
            return Ok(false);
        }
        self.active_player = index;
        self.version += 1;
        Ok(true)
    }

    /// Recompute layout and active player after a ledger change.
    /// Returns true when the layout seat count changed.
    fn refresh_topology(&mut self) -> bool {
        let count = self.ledger.layout_count();
        let layout = compute_layout(count, &self.config);
        let changed = layout.seat_count != self.layout.seat_count;
        if layout.regime != self.layout.regime {
            tracing::info!("Layout switched to {:?} with {} seats", layout.regime, layout.seat_count);
        }
        self.layout = layout;
        self.active_player = self.ledger.first_occupied();
        changed
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: self.version,
            seats: self.ledger.to_wire(),
            colors: self.colors.to_wire(),
            palette: self.colors.palette().to_vec(),
            active_player: self.active_player,
            occupant_count: self.ledger.occupant_count() as u32,
            layout_count: self.ledger.layout_count() as u32,
            participants: self.roster.to_wire(),
        }
    }
}

impl PresenceBridge for SessionState {
    fn is_host(&self) -> bool {
        true
    }

    fn resolve_participant(&self, id: ParticipantId) -> SessionResult<ParticipantHandle> {
        self.roster.resolve(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_shared::layout::{seat_angle, LayoutRegime};

    fn test_state() -> SessionState {
        let server_config = ServerConfig {
            rng_seed: 12345,
            ..Default::default()
        };
        SessionState::new(&server_config)
    }

    fn join_n(state: &mut SessionState, n: usize) -> Vec<ParticipantId> {
        (0..n).map(|i| state.join(&format!("p{}", i + 1)).id).collect()
    }

    #[test]
    fn first_joiner_is_host_participant() {
        let mut state = test_state();
        let ids = join_n(&mut state, 2);
        assert!(state.is_host_participant(ids[0]));
        assert!(!state.is_host_participant(ids[1]));
        assert_eq!(state.resolve_participant(ids[1]).unwrap().name, "p2");
    }

    #[test]
    fn blank_names_get_a_default() {
        let mut state = test_state();
        let handle = state.join("   ");
        assert_eq!(handle.name, format!("Player {}", handle.id));
    }

    #[test]
    fn four_any_claims_use_fixed_table() {
        let mut state = test_state();
        let ids = join_n(&mut state, 4);
        let seats: Vec<Option<SeatIndex>> = ids
            .iter()
            .map(|&id| state.claim_seat(id, None, SeatRequest::Any).unwrap().change.new_seat)
            .collect();
        assert_eq!(seats, vec![Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(state.layout().regime, LayoutRegime::Fixed);
        let rotations: Vec<f64> = (0..4).map(|i| state.layout().pose(i).unwrap().rotation_deg).collect();
        assert_eq!(rotations, vec![0.0, 180.0, 270.0, 90.0]);
    }

    #[test]
    fn fifth_claim_switches_to_polygon() {
        let mut state = test_state();
        let ids = join_n(&mut state, 5);
        for &id in &ids[..4] {
            state.claim_seat(id, None, SeatRequest::Any).unwrap();
        }
        let outcome = state.claim_seat(ids[4], None, SeatRequest::Any).unwrap();
        assert!(outcome.layout_changed);
        assert_eq!(state.layout().regime, LayoutRegime::Polygon);
        for i in 0..5 {
            let pose = state.layout().pose(i).unwrap();
            assert!((pose.rotation_deg - i as f64 * 72.0).abs() < 1e-9);
            assert_eq!(pose.rotation_deg, seat_angle(i as usize, 5));
        }
    }

    #[test]
    fn sitting_down_registers_seat_color() {
        let mut state = test_state();
        let id = join_n(&mut state, 1)[0];
        let outcome = state
            .claim_seat(id, None, SeatRequest::Physical { index: 2 })
            .unwrap();
        assert_eq!(outcome.color.unwrap().assigned, state.colors.palette()[2]);
        assert_eq!(state.colors.seat_of(id), Some(2));
    }

    #[test]
    fn swap_keeps_color_and_moves_association() {
        let mut state = test_state();
        let id = join_n(&mut state, 1)[0];
        state.register_color(id, Color::PINK, None).unwrap();
        state.claim_seat(id, None, SeatRequest::Physical { index: 0 }).unwrap();
        let before = state.version();
        let outcome = state
            .claim_seat(id, Some(0), SeatRequest::Physical { index: 2 })
            .unwrap();
        assert_eq!(state.version(), before + 1);
        assert!(outcome.color.is_none());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.occupant(0), None);
        assert_eq!(snapshot.occupant(2), Some(id));
        assert_eq!(snapshot.color_of(id), Some(Color::PINK));
        assert_eq!(state.colors.seat_of(id), Some(2));
    }

    #[test]
    fn registered_color_seat_follows_ledger() {
        let mut state = test_state();
        let id = join_n(&mut state, 1)[0];
        state.claim_seat(id, None, SeatRequest::Physical { index: 0 }).unwrap();
        state.register_color(id, Color::PINK, Some(5)).unwrap();
        let snapshot = state.snapshot();
        let wire = snapshot.colors.iter().find(|c| c.participant == id).unwrap();
        assert_eq!(snapshot.seat_of(id), Some(0));
        assert_eq!(wire.seat, snapshot.seat_of(id));
        assert_eq!(state.colors.seat_of(id), Some(0));
    }

    #[test]
    fn unseated_color_hint_is_not_recorded() {
        let mut state = test_state();
        let ids = join_n(&mut state, 2);
        state.register_color(ids[0], Color::BLUE, None).unwrap();
        let a = state.register_color(ids[1], Color::BLUE, Some(3)).unwrap();
        assert_eq!(a.assigned, state.colors.palette()[3]);
        assert_eq!(state.colors.seat_of(ids[1]), None);
        assert_eq!(state.snapshot().seat_of(ids[1]), None);
    }

    #[test]
    fn rejected_claim_leaves_state_untouched() {
        let mut state = test_state();
        let ids = join_n(&mut state, 2);
        state.claim_seat(ids[0], None, SeatRequest::Physical { index: 1 }).unwrap();
        let before = state.snapshot();
        let err = state
            .claim_seat(ids[1], None, SeatRequest::Physical { index: 1 })
            .unwrap_err();
        assert_eq!(err, SessionError::SeatUnavailable { seat: 1, holder: ids[0] });
        assert_eq!(state.snapshot(), before);
    }

    #[test]
    fn logical_request_maps_to_physical() {
        let mut state = test_state();
        let ids = join_n(&mut state, 2);
        state.claim_seat(ids[0], None, SeatRequest::Any).unwrap();
        let outcome = state
            .claim_seat(ids[1], None, SeatRequest::Logical { index: 1 })
            .unwrap();
        assert_eq!(outcome.change.new_seat, Some(3));
        assert_eq!(state.layout().seat_count, 4);
        assert!(state.layout().is_active(3));
    }

    #[test]
    fn unknown_participant_cannot_claim() {
        let mut state = test_state();
        assert_eq!(
            state.claim_seat(99, None, SeatRequest::Any).unwrap_err(),
            SessionError::UnknownParticipant(99)
        );
    }

    #[test]
    fn leave_vacates_seat_and_frees_color() {
        let mut state = test_state();
        let ids = join_n(&mut state, 2);
        state.register_color(ids[0], Color::BLUE, None).unwrap();
        state.claim_seat(ids[0], None, SeatRequest::Any).unwrap();
        assert!(state.leave(ids[0]));
        assert!(!state.leave(ids[0]));
        assert_eq!(state.ledger.occupant_count(), 0);
        assert_eq!(state.active_player(), None);

        let newcomer = state.join("p6").id;
        let a = state.register_color(newcomer, Color::BLUE, None).unwrap();
        assert!(!a.is_conflict());
    }

    #[test]
    fn active_player_follows_first_occupied_seat() {
        let mut state = test_state();
        let ids = join_n(&mut state, 2);
        state.claim_seat(ids[0], None, SeatRequest::Physical { index: 3 }).unwrap();
        assert_eq!(state.active_player(), Some(3));
        state.claim_seat(ids[1], None, SeatRequest::Physical { index: 1 }).unwrap();
        assert_eq!(state.active_player(), Some(1));
        assert_eq!(state.set_active_player(Some(3)), Ok(true));
        assert_eq!(state.active_player(), Some(3));
        assert_eq!(
            state.set_active_player(Some(5)),
            Err(SessionError::InvalidSeatIndex(5))
        );
        assert_eq!(state.set_active_player(None), Ok(true));
    }

    #[test]
    fn noop_claim_does_not_bump_version() {
        let mut state = test_state();
        let id = join_n(&mut state, 1)[0];
        state.claim_seat(id, None, SeatRequest::Any).unwrap();
        let before = state.version();
        let outcome = state.claim_seat(id, Some(0), SeatRequest::Any).unwrap();
        assert!(outcome.change.is_noop());
        assert_eq!(state.version(), before);
    }

    #[test]
    fn palette_override_bumps_version_once() {
        let mut state = test_state();
        let before = state.version();
        assert_eq!(state.set_palette_color(4, Color(0x123456)), Ok(true));
        assert_eq!(state.set_palette_color(4, Color(0x123456)), Ok(false));
        assert_eq!(state.version(), before + 1);
        assert_eq!(state.snapshot().palette[4], Color(0x123456));
    }
}
