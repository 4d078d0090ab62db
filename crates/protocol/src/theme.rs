use serde::{Deserialize, Serialize};

/// Semantic color tokens resolved by the renderer's active theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeToken {
    FlameHot,
    FlameWarm,
    FlameCold,
    FlameNeutral,

    /// Background of the depth-0 frame, which represents the whole profile.
    FrameRoot,
    FrameBorder,

    TextPrimary,
    TextMuted,

    SelectionHighlight,
    HoverHighlight,
    SearchHighlight,

    Background,
    MinimapBackground,
}

impl ThemeToken {
    /// Rotating palette used for ordinary frames.
    pub const FLAME_PALETTE: [ThemeToken; 4] = [
        ThemeToken::FlameHot,
        ThemeToken::FlameWarm,
        ThemeToken::FlameCold,
        ThemeToken::FlameNeutral,
    ];

    /// Palette entry for an arbitrary index (wraps around).
    pub fn flame(index: usize) -> ThemeToken {
        Self::FLAME_PALETTE[index % Self::FLAME_PALETTE.len()]
    }
}
