//! Seat geometry.
//!
//! The layout is a pure function of how many seats the table shows:
//! - up to four seats use a fixed table where seats face each other in pairs
//!   (physical 0 → 0°, 1 → 180°, 2 → 270°, 3 → 90°),
//! - five to eight seats sit on a regular polygon, seat `i` at `i × 360°/K`.
//!
//! Angles are clockwise around the vertical axis, starting at the front seat.
//! In the fixed regime the clockwise (logical) order of physical seats is
//! 0, 3, 1, 2; with five or more seats logical and physical indices agree.

use crate::config::TableConfig;
use crate::error::{SessionError, SessionResult};
use crate::seat::{SeatIndex, SEAT_COUNT};
use crate::vec3::{add, rotate_around_axis, Vec3, UP};

/// Smallest seat count a layout is computed for.
pub const MIN_LAYOUT_COUNT: usize = 2;
/// Largest seat count served by the fixed four-seat table.
pub const FIXED_LAYOUT_MAX: usize = 4;

/// Rotation of each fixed-table seat, by physical index.
const FIXED_ANGLES: [f64; FIXED_LAYOUT_MAX] = [0.0, 180.0, 270.0, 90.0];
const FIXED_LOGICAL_TO_PHYSICAL: [SeatIndex; FIXED_LAYOUT_MAX] = [0, 3, 1, 2];
const FIXED_PHYSICAL_TO_LOGICAL: [SeatIndex; FIXED_LAYOUT_MAX] = [0, 2, 3, 1];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRegime {
    Fixed,
    Polygon,
}

/// World-space seat transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeatPose {
    pub position: Vec3,
    /// Degrees, clockwise around +Y
    pub rotation_deg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Seat count after clamping to [2, 8]
    pub seat_count: usize,
    pub regime: LayoutRegime,
    /// Pose per physical index; `None` for seats the layout does not show
    pub poses: [Option<SeatPose>; SEAT_COUNT],
}

impl Layout {
    pub fn pose(&self, physical: SeatIndex) -> Option<SeatPose> {
        self.poses.get(physical as usize).copied().flatten()
    }

    pub fn is_active(&self, physical: SeatIndex) -> bool {
        self.pose(physical).is_some()
    }
}

pub fn clamp_seat_count(count: usize) -> usize {
    count.clamp(MIN_LAYOUT_COUNT, SEAT_COUNT)
}

pub fn regime_for(count: usize) -> LayoutRegime {
    if clamp_seat_count(count) <= FIXED_LAYOUT_MAX {
        LayoutRegime::Fixed
    } else {
        LayoutRegime::Polygon
    }
}

/// Seat rotation in degrees for a physical index.
/// Indices outside the fixed table fall back to 0°; only invalid input gets there.
pub fn seat_angle(physical: usize, count: usize) -> f64 {
    let k = clamp_seat_count(count);
    match regime_for(k) {
        LayoutRegime::Fixed => FIXED_ANGLES.get(physical).copied().unwrap_or(0.0),
        LayoutRegime::Polygon => physical as f64 * 360.0 / k as f64,
    }
}

/// Pose of a seat at `angle_deg` around the table.
pub fn seat_pose(angle_deg: f64, table: &TableConfig) -> SeatPose {
    let front = Vec3::new(0.0, 0.0, -table.seat_distance);
    let offset = rotate_around_axis(front, UP, angle_deg.to_radians());
    SeatPose {
        position: add(Vec3::from_array(table.table_center), offset),
        rotation_deg: angle_deg,
    }
}

pub fn compute_layout(count: usize, table: &TableConfig) -> Layout {
    let k = clamp_seat_count(count);
    let mut poses = [None; SEAT_COUNT];
    for (physical, pose) in poses.iter_mut().enumerate().take(k) {
        *pose = Some(seat_pose(seat_angle(physical, k), table));
    }
    Layout {
        seat_count: k,
        regime: regime_for(k),
        poses,
    }
}

/// Number of logical seats addressable for a seat count: the whole fixed table,
/// or every polygon seat.
fn addressable_seats(count: usize) -> usize {
    let k = clamp_seat_count(count);
    match regime_for(k) {
        LayoutRegime::Fixed => FIXED_LAYOUT_MAX,
        LayoutRegime::Polygon => k,
    }
}

pub fn logical_to_physical(logical: SeatIndex, count: usize) -> SessionResult<SeatIndex> {
    if logical as usize >= addressable_seats(count) {
        return Err(SessionError::InvalidSeatIndex(logical as i64));
    }
    Ok(match regime_for(count) {
        LayoutRegime::Fixed => FIXED_LOGICAL_TO_PHYSICAL[logical as usize],
        LayoutRegime::Polygon => logical,
    })
}

pub fn physical_to_logical(physical: SeatIndex, count: usize) -> SessionResult<SeatIndex> {
    if physical as usize >= addressable_seats(count) {
        return Err(SessionError::InvalidSeatIndex(physical as i64));
    }
    Ok(match regime_for(count) {
        LayoutRegime::Fixed => FIXED_PHYSICAL_TO_LOGICAL[physical as usize],
        LayoutRegime::Polygon => physical,
    })
}

/// Shortest signed rotation from `from_deg` to `to_deg`, in (-180, 180].
pub fn rotation_delta(from_deg: f64, to_deg: f64) -> f64 {
    let delta = (to_deg - from_deg).rem_euclid(360.0);
    if delta > 180.0 {
        delta - 360.0
    } else {
        delta
    }
}
