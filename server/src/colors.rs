use rand::Rng;
use std::collections::{BTreeMap, HashMap};

use tabletop_shared::color::{Color, PALETTE_SIZE};
use tabletop_shared::config::TableConfig;
use tabletop_shared::error::{SessionError, SessionResult};
use tabletop_shared::protocol::{ColorConflictMsg, PlayerColorWire};
use tabletop_shared::seat::{ParticipantId, SeatIndex};

/// How a registration ended up with its color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorResolution {
    /// Preferred color was free
    Verbatim,
    /// Palette entry of the participant's seat
    SeatPalette,
    /// First free palette entry
    PaletteScan,
    /// Randomly generated; `exhausted` when no candidate cleared the distance check
    Generated { exhausted: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorAssignment {
    pub participant: ParticipantId,
    pub requested: Color,
    pub assigned: Color,
    pub resolution: ColorResolution,
}

impl ColorAssignment {
    pub fn is_conflict(&self) -> bool {
        self.resolution != ColorResolution::Verbatim
    }

    pub fn conflict_msg(&self) -> Option<ColorConflictMsg> {
        self.is_conflict().then_some(ColorConflictMsg {
            participant: self.participant,
            requested: self.requested,
            assigned: self.assigned,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PlayerColor {
    color: Color,
    preferred: Color,
    custom: bool,
    seat: Option<SeatIndex>,
}

/// Host-owned participant → color assignments.
#[derive(Debug, Clone)]
pub struct ColorRegistry {
    palette: [Color; PALETTE_SIZE],
    players: BTreeMap<ParticipantId, PlayerColor>,
    owners: HashMap<Color, ParticipantId>,
    min_distance: f64,
    max_attempts: u32,
}

impl ColorRegistry {
    pub fn new(config: &TableConfig) -> Self {
        Self {
            palette: config.palette,
            players: BTreeMap::new(),
            owners: HashMap::new(),
            min_distance: config.min_color_distance,
            max_attempts: config.color_generation_attempts,
        }
    }

    pub fn palette(&self) -> &[Color; PALETTE_SIZE] {
        &self.palette
    }

    pub fn palette_color(&self, slot: usize) -> Option<Color> {
        self.palette.get(slot).copied()
    }

    pub fn color_of(&self, participant: ParticipantId) -> Option<Color> {
        self.players.get(&participant).map(|p| p.color)
    }

    pub fn owner_of(&self, color: Color) -> Option<ParticipantId> {
        self.owners.get(&color).copied()
    }

    pub fn is_registered(&self, participant: ParticipantId) -> bool {
        self.players.contains_key(&participant)
    }

    pub fn seat_of(&self, participant: ParticipantId) -> Option<SeatIndex> {
        self.players.get(&participant).and_then(|p| p.seat)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    fn is_free(&self, color: Color) -> bool {
        !self.owners.contains_key(&color)
    }

    /// Give `participant` its preferred color, or the closest thing available:
    /// the palette entry of its seat, the first free palette entry, and finally
    /// a generated color kept away from every assigned one.
    /// Re-registering releases the participant's previous color first.
    pub fn register(
        &mut self,
        participant: ParticipantId,
        preferred: Color,
        seat: Option<SeatIndex>,
        rng: &mut impl Rng,
    ) -> ColorAssignment {
        let previous = self.players.remove(&participant);
        if let Some(prev) = previous {
            self.owners.remove(&prev.color);
        }
        let seat = seat.or(previous.and_then(|p| p.seat));

        let (assigned, resolution) = if self.is_free(preferred) {
            (preferred, ColorResolution::Verbatim)
        } else if let Some(c) = seat
            .and_then(|s| self.palette_color(s as usize))
            .filter(|&c| self.is_free(c))
        {
            (c, ColorResolution::SeatPalette)
        } else if let Some(c) = self.palette.iter().copied().find(|&c| self.is_free(c)) {
            (c, ColorResolution::PaletteScan)
        } else {
            let (c, exhausted) = self.generate_distinct(rng);
            if exhausted {
                tracing::warn!(
                    "No color at distance {} found for participant {} after {} attempts, using {}",
                    self.min_distance,
                    participant,
                    self.max_attempts,
                    c
                );
            }
            (c, ColorResolution::Generated { exhausted })
        };

        self.players.insert(
            participant,
            PlayerColor {
                color: assigned,
                preferred,
                custom: resolution == ColorResolution::Verbatim,
                seat,
            },
        );
        self.owners.insert(assigned, participant);

        ColorAssignment {
            participant,
            requested: preferred,
            assigned,
            resolution,
        }
    }

    /// Random RGB samples until one is at least `min_distance` from every
    /// assigned color. After `max_attempts` the last candidate is taken anyway.
    fn generate_distinct(&self, rng: &mut impl Rng) -> (Color, bool) {
        let mut candidate = Color(0);
        for _ in 0..self.max_attempts {
            candidate = Color::from_unit(rng.gen(), rng.gen(), rng.gen());
            if self.is_free(candidate)
                && self
                    .owners
                    .keys()
                    .all(|&c| c.distance(candidate) >= self.min_distance)
            {
                return (candidate, false);
            }
        }
        (candidate, true)
    }

    /// Drop a participant's color and seat association. Unknown ids are ignored.
    pub fn unregister(&mut self, participant: ParticipantId) -> Option<Color> {
        let entry = self.players.remove(&participant)?;
        if self.owners.get(&entry.color) == Some(&participant) {
            self.owners.remove(&entry.color);
        }
        Some(entry.color)
    }

    /// Update only the seat association. Returns false when nothing changed.
    pub fn update_seat(&mut self, participant: ParticipantId, seat: Option<SeatIndex>) -> bool {
        match self.players.get_mut(&participant) {
            Some(entry) if entry.seat != seat => {
                entry.seat = seat;
                true
            }
            _ => false,
        }
    }

    /// Override one base palette entry. Assigned colors are left alone.
    pub fn set_palette_color(&mut self, slot: usize, color: Color) -> SessionResult<bool> {
        let entry = self
            .palette
            .get_mut(slot)
            .ok_or(SessionError::InvalidPaletteSlot(slot))?;
        if *entry == color {
            return Ok(false);
        }
        *entry = color;
        Ok(true)
    }

    pub fn to_wire(&self) -> Vec<PlayerColorWire> {
        self.players
            .iter()
            .map(|(&participant, p)| PlayerColorWire {
                participant,
                color: p.color,
                preferred: p.preferred,
                custom: p.custom,
                seat: p.seat,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn test_rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn registry() -> ColorRegistry {
        ColorRegistry::new(&TableConfig::default())
    }

    #[test]
    fn free_preferred_color_is_verbatim() {
        let mut colors = registry();
        let a = colors.register(1, Color::BLUE, None, &mut test_rng());
        assert_eq!(a.assigned, Color::BLUE);
        assert_eq!(a.resolution, ColorResolution::Verbatim);
        assert!(!a.is_conflict());
        assert!(colors.to_wire()[0].custom);
    }

    #[test]
    fn taken_color_falls_to_next_palette_entry() {
        let mut colors = registry();
        let mut rng = test_rng();
        colors.register(1, Color::BLUE, None, &mut rng);
        let a = colors.register(2, Color::BLUE, None, &mut rng);
        assert_eq!(a.assigned, Color::ORANGE);
        assert_eq!(a.resolution, ColorResolution::PaletteScan);
        let msg = a.conflict_msg().unwrap();
        assert_eq!((msg.requested, msg.assigned), (Color::BLUE, Color::ORANGE));
        assert!(!colors.to_wire()[1].custom);
    }

    #[test]
    fn seat_palette_is_tried_before_scan() {
        let mut colors = registry();
        let mut rng = test_rng();
        colors.register(1, Color::BLUE, None, &mut rng);
        let a = colors.register(2, Color::BLUE, Some(3), &mut rng);
        assert_eq!(a.assigned, Color::RED);
        assert_eq!(a.resolution, ColorResolution::SeatPalette);
    }

    #[test]
    fn released_color_is_reusable() {
        let mut colors = registry();
        let mut rng = test_rng();
        colors.register(1, Color::BLUE, None, &mut rng);
        assert_eq!(colors.unregister(1), Some(Color::BLUE));
        let a = colors.register(6, Color::BLUE, None, &mut rng);
        assert_eq!(a.resolution, ColorResolution::Verbatim);
        assert_eq!(colors.owner_of(Color::BLUE), Some(6));
    }

    #[test]
    fn reregistering_own_color_is_verbatim() {
        let mut colors = registry();
        let mut rng = test_rng();
        colors.register(1, Color::GREEN, Some(2), &mut rng);
        let a = colors.register(1, Color::GREEN, None, &mut rng);
        assert_eq!(a.resolution, ColorResolution::Verbatim);
        assert_eq!(colors.seat_of(1), Some(2));
        assert_eq!(colors.len(), 1);
    }

    #[test]
    fn unregister_unknown_is_noop() {
        let mut colors = registry();
        assert_eq!(colors.unregister(42), None);
        assert!(colors.is_empty());
    }

    #[test]
    fn exhausted_palette_generates_distant_colors() {
        let mut colors = registry();
        let mut rng = test_rng();
        for p in 0..8 {
            colors.register(p, Color::BLUE, None, &mut rng);
        }
        let a = colors.register(100, Color::BLUE, None, &mut rng);
        assert_eq!(a.resolution, ColorResolution::Generated { exhausted: false });
        for (&c, &owner) in &colors.owners {
            if owner != 100 {
                assert!(c.distance(a.assigned) >= 0.3);
            }
        }
    }

    #[test]
    fn generation_gives_up_after_bounded_attempts() {
        let config = TableConfig {
            min_color_distance: 1.7,
            color_generation_attempts: 5,
            ..Default::default()
        };
        let mut colors = ColorRegistry::new(&config);
        let mut rng = test_rng();
        for p in 0..9 {
            colors.register(p, Color::BLUE, None, &mut rng);
        }
        let a = colors.register(9, Color::BLUE, None, &mut rng);
        assert_eq!(a.resolution, ColorResolution::Generated { exhausted: true });
        assert_eq!(colors.color_of(9), Some(a.assigned));
    }

    #[test]
    fn no_two_participants_share_a_color() {
        let mut colors = registry();
        let mut rng = test_rng();
        for p in 0..20 {
            colors.register(p, Color::ORANGE, Some((p % 8) as SeatIndex), &mut rng);
            if p % 3 == 0 {
                colors.unregister(p / 2);
            }
        }
        let wire = colors.to_wire();
        for (i, a) in wire.iter().enumerate() {
            for b in &wire[i + 1..] {
                assert_ne!(a.color, b.color);
            }
        }
        assert_eq!(colors.owners.len(), wire.len());
    }

    #[test]
    fn update_seat_only_touches_association() {
        let mut colors = registry();
        colors.register(1, Color::CYAN, Some(0), &mut test_rng());
        assert!(colors.update_seat(1, Some(4)));
        assert!(!colors.update_seat(1, Some(4)));
        assert!(!colors.update_seat(2, Some(4)));
        assert_eq!(colors.seat_of(1), Some(4));
        assert_eq!(colors.color_of(1), Some(Color::CYAN));
    }

    #[test]
    fn palette_override_does_not_recolor_players() {
        let mut colors = registry();
        colors.register(1, Color::BLUE, None, &mut test_rng());
        assert_eq!(colors.set_palette_color(0, Color(0x101010)), Ok(true));
        assert_eq!(colors.set_palette_color(0, Color(0x101010)), Ok(false));
        assert_eq!(colors.palette_color(0), Some(Color(0x101010)));
        assert_eq!(colors.color_of(1), Some(Color::BLUE));
        assert_eq!(
            colors.set_palette_color(8, Color::RED),
            Err(SessionError::InvalidPaletteSlot(8))
        );
    }
}
