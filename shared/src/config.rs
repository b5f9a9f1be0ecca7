use crate::color::{Color, DEFAULT_PALETTE, PALETTE_SIZE};

/// Table geometry and color arbitration parameters.
/// Sent to every participant in the welcome message so replicas compute the
/// same layout as the host.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// Distance from table center to each seat (meters)
    pub seat_distance: f64,
    /// Table center in world space
    pub table_center: [f64; 3],
    /// Minimum normalized RGB distance between generated colors and any assigned color
    pub min_color_distance: f64,
    /// Random samples tried before a generated color is accepted anyway
    pub color_generation_attempts: u32,
    /// Base palette, one entry per physical seat
    pub palette: [Color; PALETTE_SIZE],
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            seat_distance: 1.2,
            table_center: [0.0, 0.0, 0.0],
            min_color_distance: 0.3,
            color_generation_attempts: 64,
            palette: DEFAULT_PALETTE,
        }
    }
}

impl TableConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.seat_distance.is_finite() || self.seat_distance <= 0.0 {
            return Err("seat_distance must be finite and > 0".to_string());
        }
        if self.table_center.iter().any(|c| !c.is_finite()) {
            return Err("table_center must be finite".to_string());
        }
        if !self.min_color_distance.is_finite()
            || self.min_color_distance < 0.0
            || self.min_color_distance > 3f64.sqrt()
        {
            return Err("min_color_distance must be within [0, sqrt(3)]".to_string());
        }
        if self.color_generation_attempts == 0 {
            return Err("color_generation_attempts must be >= 1".to_string());
        }
        Ok(())
    }
}
