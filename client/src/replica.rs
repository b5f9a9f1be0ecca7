use std::collections::{BTreeMap, BTreeSet};

use tabletop_shared::color::Color;
use tabletop_shared::config::TableConfig;
use tabletop_shared::error::SessionResult;
use tabletop_shared::layout::{compute_layout, Layout, SeatPose};
use tabletop_shared::presence::Roster;
use tabletop_shared::protocol::{PlayerColorWire, SessionSnapshot};
use tabletop_shared::seat::{validate_seat_index, ParticipantId, SeatIndex, SEAT_COUNT};

use crate::events::SessionEvent;

/// Read-only copy of host state. Never resolves anything itself: it takes
/// snapshots verbatim and reports what changed.
#[derive(Debug, Clone)]
pub struct SessionReplica {
    config: TableConfig,
    version: Option<u64>,
    seats: [Option<ParticipantId>; SEAT_COUNT],
    colors: BTreeMap<ParticipantId, PlayerColorWire>,
    palette: Vec<Color>,
    active_player: Option<SeatIndex>,
    layout_count: usize,
    layout: Layout,
    roster: Roster,
}

impl SessionReplica {
    pub fn new(config: TableConfig) -> Self {
        let layout = compute_layout(0, &config);
        let palette = config.palette.to_vec();
        Self {
            config,
            version: None,
            seats: [None; SEAT_COUNT],
            colors: BTreeMap::new(),
            palette,
            active_player: None,
            layout_count: 0,
            layout,
            roster: Roster::new(),
        }
    }

    /// Version of the last applied snapshot.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn occupant(&self, seat: SeatIndex) -> Option<ParticipantId> {
        self.seats.get(seat as usize).copied().flatten()
    }

    pub fn seat_of(&self, participant: ParticipantId) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(|s| *s == Some(participant))
            .map(|i| i as SeatIndex)
    }

    pub fn occupant_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn color_of(&self, participant: ParticipantId) -> Option<Color> {
        self.colors.get(&participant).map(|c| c.color)
    }

    pub fn player_color(&self, participant: ParticipantId) -> Option<&PlayerColorWire> {
        self.colors.get(&participant)
    }

    pub fn palette(&self) -> &[Color] {
        &self.palette
    }

    pub fn active_player(&self) -> Option<SeatIndex> {
        self.active_player
    }

    /// Layout input the host last published.
    pub fn layout_count(&self) -> usize {
        self.layout_count
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Pose of the seat a participant holds, if the layout shows it.
    pub fn pose_of(&self, participant: ParticipantId) -> Option<SeatPose> {
        self.seat_of(participant).and_then(|s| self.layout.pose(s))
    }

    /// Apply a host snapshot. Snapshots not newer than the applied one are
    /// ignored, so replays and reordered deliveries change nothing.
    ///
    /// Events come out in a fixed order: seat occupancy, player seats,
    /// player colors, palette, layout, active player.
    pub fn apply(&mut self, snapshot: &SessionSnapshot) -> SessionResult<Vec<SessionEvent>> {
        if let Some(applied) = self.version {
            if snapshot.version <= applied {
                return Ok(Vec::new());
            }
        }

        let mut seats = [None; SEAT_COUNT];
        for seat in &snapshot.seats {
            let index = validate_seat_index(seat.index)?;
            seats[index as usize] = seat.occupant;
        }
        let colors: BTreeMap<ParticipantId, PlayerColorWire> = snapshot
            .colors
            .iter()
            .map(|c| (c.participant, *c))
            .collect();
        let layout = compute_layout(snapshot.layout_count as usize, &self.config);

        let mut events = Vec::new();

        for (slot, (old, new)) in self.seats.iter().zip(seats.iter()).enumerate() {
            if old != new {
                events.push(SessionEvent::SeatOccupancyChanged {
                    slot: slot as SeatIndex,
                    occupied: new.is_some(),
                    participant: new.or(*old),
                });
            }
        }

        let seat_in = |table: &[Option<ParticipantId>; SEAT_COUNT], id: ParticipantId| {
            table
                .iter()
                .position(|s| *s == Some(id))
                .map(|i| i as SeatIndex)
        };
        let seated: BTreeSet<ParticipantId> =
            self.seats.iter().chain(seats.iter()).flatten().copied().collect();
        for id in seated {
            let old = seat_in(&self.seats, id);
            let new = seat_in(&seats, id);
            if old != new {
                events.push(SessionEvent::PlayerSeatChanged {
                    participant: id,
                    old,
                    new,
                });
            }
        }

        let colored: BTreeSet<ParticipantId> =
            self.colors.keys().chain(colors.keys()).copied().collect();
        for id in colored {
            let old = self.colors.get(&id).map(|c| c.color);
            let new = colors.get(&id).map(|c| c.color);
            if old != new {
                events.push(SessionEvent::PlayerColorChanged {
                    participant: id,
                    color: new,
                });
            }
        }

        if self.palette != snapshot.palette {
            events.push(SessionEvent::ColorPaletteChanged);
        }

        if self.layout.seat_count != layout.seat_count {
            events.push(SessionEvent::LayoutChanged {
                count: layout.seat_count,
            });
        }

        if self.active_player != snapshot.active_player {
            events.push(SessionEvent::ActivePlayerChanged {
                index: snapshot.active_player,
            });
        }

        self.version = Some(snapshot.version);
        self.seats = seats;
        self.colors = colors;
        self.palette = snapshot.palette.clone();
        self.active_player = snapshot.active_player;
        self.layout_count = snapshot.layout_count as usize;
        self.layout = layout;
        self.roster = Roster::from_wire(&snapshot.participants);

        Ok(events)
    }
}
