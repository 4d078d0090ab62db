use serde::{Deserialize, Serialize};

use crate::flags::RenderFlags;
use crate::theme::ThemeToken;
use crate::types::Rect;

/// Stable identity of a laid-out frame.
///
/// Derived from the frame's call path rather than its position, so it
/// survives relayouts (zoom, resize) and rebuilding the same tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FrameKey(pub u64);

impl std::fmt::Display for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// One frame the renderer should draw.
///
/// `rect` is the full frame in canvas pixels; `visible` is the part of it
/// inside the current view, which is where the label goes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FramePaint {
    pub key: FrameKey,
    pub depth: u32,
    pub rect: Rect,
    pub visible: Rect,
    pub color: ThemeToken,
    pub flags: RenderFlags,
}
