use tabletop_shared::vec3::Vec3;

/// Moves the local camera. Only the local participant's own seat changes
/// drive it.
pub trait ViewpointController {
    /// Orbit the viewpoint around `pivot` by `degrees` (clockwise about `axis`).
    fn rotate_viewpoint_around(&mut self, pivot: Vec3, axis: Vec3, degrees: f64);

    /// Place the viewpoint exactly at a seat pose.
    fn snap_viewpoint_to(&mut self, position: Vec3, rotation_deg: f64);
}

/// Headless viewpoint: remembers where it is and logs each move.
#[derive(Debug, Clone, Default)]
pub struct LoggingViewpoint {
    pub position: Vec3,
    pub rotation_deg: f64,
}

impl ViewpointController for LoggingViewpoint {
    fn rotate_viewpoint_around(&mut self, pivot: Vec3, axis: Vec3, degrees: f64) {
        tracing::info!(
            "Viewpoint orbit {:.1} deg around ({:.2}, {:.2}, {:.2}) axis ({:.1}, {:.1}, {:.1})",
            degrees,
            pivot.x,
            pivot.y,
            pivot.z,
            axis.x,
            axis.y,
            axis.z
        );
        self.rotation_deg = (self.rotation_deg + degrees).rem_euclid(360.0);
    }

    fn snap_viewpoint_to(&mut self, position: Vec3, rotation_deg: f64) {
        tracing::info!(
            "Viewpoint at ({:.2}, {:.2}, {:.2}) facing {:.1} deg",
            position.x,
            position.y,
            position.z,
            rotation_deg
        );
        self.position = position;
        self.rotation_deg = rotation_deg;
    }
}
