use tabletop_shared::color::{Color, PALETTE_SIZE};
use tabletop_shared::config::TableConfig;
use tabletop_shared::error::{SessionError, SessionResult};
use tabletop_shared::layout::rotation_delta;
use tabletop_shared::presence::{ParticipantHandle, PresenceBridge};
use tabletop_shared::protocol::{ClientMsg, ServerMsg};
use tabletop_shared::seat::{validate_seat_index, ParticipantId, SeatIndex, SeatRequest};
use tabletop_shared::vec3::{Vec3, UP};

use crate::events::{EventBus, SessionEvent};
use crate::preferences::{load_preferred_color, save_preferred_color, PreferenceStore};
use crate::replica::SessionReplica;
use crate::seat_request::SeatRequester;
use crate::viewpoint::ViewpointController;

/// The local end of a session: replica, seat requests, viewpoint and
/// the stored color preference.
///
/// Host messages go in through [`LocalParticipant::handle_server_msg`]; anything
/// the participant wants from the host comes back out as [`ClientMsg`]s for the
/// caller to send.
pub struct LocalParticipant<V, P> {
    self_id: Option<ParticipantId>,
    is_host: bool,
    replica: SessionReplica,
    requester: SeatRequester,
    bus: EventBus,
    viewpoint: V,
    preferences: P,
    preferred_color: Option<Color>,
    /// Rotation the viewpoint was last snapped to
    view_rotation: Option<f64>,
}

impl<V: ViewpointController, P: PreferenceStore> LocalParticipant<V, P> {
    pub fn new(viewpoint: V, preferences: P, bus: EventBus) -> Self {
        let preferred_color = load_preferred_color(&preferences);
        Self {
            self_id: None,
            is_host: false,
            replica: SessionReplica::new(TableConfig::default()),
            requester: SeatRequester::new(),
            bus,
            viewpoint,
            preferences,
            preferred_color,
            view_rotation: None,
        }
    }

    pub fn self_id(&self) -> Option<ParticipantId> {
        self.self_id
    }

    pub fn replica(&self) -> &SessionReplica {
        &self.replica
    }

    pub fn requester(&self) -> &SeatRequester {
        &self.requester
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn viewpoint(&self) -> &V {
        &self.viewpoint
    }

    pub fn preferences(&self) -> &P {
        &self.preferences
    }

    pub fn preferred_color(&self) -> Option<Color> {
        self.preferred_color
    }

    pub fn current_seat(&self) -> Option<SeatIndex> {
        self.requester.current()
    }

    /// Apply one host message. Returns follow-up messages for the host.
    pub fn handle_server_msg(&mut self, msg: ServerMsg) -> SessionResult<Vec<ClientMsg>> {
        match msg {
            ServerMsg::Welcome(welcome) => {
                tracing::info!(
                    "Joined as participant {} (host: {}, server {})",
                    welcome.self_id,
                    welcome.is_host,
                    welcome.server_version
                );
                self.self_id = Some(welcome.self_id);
                self.is_host = welcome.is_host;
                self.replica = SessionReplica::new(welcome.config);
                self.requester.reset();
                self.view_rotation = None;

                let events = self.replica.apply(&welcome.snapshot)?;
                self.process(&events);

                let mut out = Vec::new();
                if let Some(preferred) = self.preferred_color {
                    if self.replica.color_of(welcome.self_id) != Some(preferred) {
                        out.push(ClientMsg::RegisterColor {
                            preferred,
                            seat: self.requester.current(),
                        });
                    }
                }
                Ok(out)
            }
            ServerMsg::SessionState(snapshot) => {
                let events = self.replica.apply(&snapshot)?;
                self.process(&events);
                Ok(Vec::new())
            }
            ServerMsg::ColorConflict(conflict) => {
                if Some(conflict.participant) == self.self_id {
                    tracing::info!(
                        "Asked for {} but the host assigned {}",
                        conflict.requested,
                        conflict.assigned
                    );
                }
                self.bus.publish(&SessionEvent::ColorConflictResolved {
                    participant: conflict.participant,
                    requested: conflict.requested,
                    assigned: conflict.assigned,
                });
                Ok(Vec::new())
            }
        }
    }

    /// Connection lost. The next welcome starts a fresh replica.
    pub fn disconnected(&mut self) {
        self.self_id = None;
        self.is_host = false;
        self.requester.reset();
        self.view_rotation = None;
    }

    /// Ask for a seat. `None` means the current seat already satisfies it.
    pub fn request_seat(&mut self, requested: SeatRequest) -> SessionResult<Option<ClientMsg>> {
        self.requester
            .request(requested, self.replica.layout_count())
    }

    /// The caller's timer ran out on a pending seat request.
    pub fn seat_request_timed_out(&mut self) {
        self.requester.time_out();
    }

    pub fn acknowledge_seat_request(&mut self) {
        self.requester.acknowledge();
    }

    /// The preference is stored only once the host confirms a color.
    pub fn register_color(&mut self, preferred: Color) -> ClientMsg {
        self.preferred_color = Some(preferred);
        ClientMsg::RegisterColor {
            preferred,
            seat: self.requester.current(),
        }
    }

    pub fn set_palette_color(&self, slot: usize, color: Color) -> SessionResult<ClientMsg> {
        if !self.is_host {
            return Err(SessionError::NotHost);
        }
        if slot >= PALETTE_SIZE {
            return Err(SessionError::InvalidPaletteSlot(slot));
        }
        Ok(ClientMsg::SetPaletteColor {
            slot: slot as u8,
            color,
        })
    }

    pub fn set_active_player(&self, index: Option<SeatIndex>) -> SessionResult<ClientMsg> {
        if !self.is_host {
            return Err(SessionError::NotHost);
        }
        if let Some(seat) = index {
            let seat = validate_seat_index(seat)?;
            if self.replica.occupant(seat).is_none() {
                return Err(SessionError::InvalidSeatIndex(seat as i64));
            }
        }
        Ok(ClientMsg::SetActivePlayer { index })
    }

    fn process(&mut self, events: &[SessionEvent]) {
        for event in events {
            self.bus.publish(event);
        }

        let Some(me) = self.self_id else {
            return;
        };

        let layout_changed = events
            .iter()
            .any(|e| matches!(e, SessionEvent::LayoutChanged { .. }));
        match self.requester.observe(self.replica.seat_of(me)) {
            Some(old) => {
                tracing::info!("Own seat {:?} -> {:?}", old, self.requester.current());
                self.move_viewpoint(true);
            }
            None if layout_changed => self.move_viewpoint(false),
            None => {}
        }

        for event in events {
            if let SessionEvent::PlayerColorChanged {
                participant,
                color: Some(color),
            } = event
            {
                if *participant == me {
                    self.confirm_color(*color);
                }
            }
        }
    }

    /// Bring the viewpoint to the participant's seat, orbiting from the
    /// previous seat first when `orbit` is set.
    fn move_viewpoint(&mut self, orbit: bool) {
        let Some(me) = self.self_id else {
            return;
        };
        let Some(pose) = self.replica.pose_of(me) else {
            return;
        };
        if orbit {
            if let Some(from) = self.view_rotation {
                let pivot = Vec3::from_array(self.replica.config().table_center);
                self.viewpoint.rotate_viewpoint_around(
                    pivot,
                    UP,
                    rotation_delta(from, pose.rotation_deg),
                );
            }
        }
        self.viewpoint
            .snap_viewpoint_to(pose.position, pose.rotation_deg);
        self.view_rotation = Some(pose.rotation_deg);
    }

    fn confirm_color(&mut self, color: Color) {
        let stored = load_preferred_color(&self.preferences);
        self.preferred_color = Some(color);
        if stored == Some(color) {
            return;
        }
        if let Err(e) = save_preferred_color(&mut self.preferences, color) {
            tracing::warn!("Failed to store preferred color {}: {}", color, e);
        }
    }
}

impl<V, P> PresenceBridge for LocalParticipant<V, P> {
    fn is_host(&self) -> bool {
        self.is_host
    }

    fn resolve_participant(&self, id: ParticipantId) -> SessionResult<ParticipantHandle> {
        self.replica.roster().resolve(id)
    }
}
