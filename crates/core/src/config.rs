use hearth_protocol::ThemeToken;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidInput, Result, check_extent};

/// How ordinary (non-root) frames pick their base color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Rotate through the flame palette by stack depth.
    #[default]
    ByDepth,
    /// Same frame identity, same color, wherever it appears.
    ByFrameHash,
    Uniform(ThemeToken),
}

/// Presentation settings shared by geometry, hit-testing and painting.
///
/// All extents are in canvas pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlameGraphConfig {
    pub frame_height: f64,
    /// Gap drawn between neighbouring frames.
    pub frame_gap: f64,
    /// Frames narrower than this are not painted (they stay hit-testable).
    pub visibility_threshold: f64,
    pub minimap_frame_height: f64,
    pub color_mode: ColorMode,
}

impl Default for FlameGraphConfig {
    fn default() -> Self {
        Self {
            frame_height: 20.0,
            frame_gap: 1.0,
            visibility_threshold: 2.0,
            minimap_frame_height: 1.0,
            color_mode: ColorMode::ByDepth,
        }
    }
}

impl FlameGraphConfig {
    pub fn validate(&self) -> Result<()> {
        check_extent("frame height", self.frame_height)?;
        check_extent("minimap frame height", self.minimap_frame_height)?;
        check_extent("visibility threshold", self.visibility_threshold)?;
        if !(self.frame_gap.is_finite() && self.frame_gap >= 0.0) {
            return Err(InvalidInput::InvalidExtent {
                what: "frame gap",
                value: self.frame_gap,
            }
            .into());
        }
        Ok(())
    }
}
