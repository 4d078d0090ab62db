use bitflags::bitflags;

bitflags! {
    /// Per-frame rendering state handed to the renderer alongside each
    /// painted frame.
    ///
    /// Bits mirror what a frame renderer needs to choose colors and fonts:
    /// whether search highlighting or a selection focus is active at all,
    /// and whether this particular frame is part of it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[derive(serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct RenderFlags: u16 {
        const MINIMAP_MODE = 1;
        /// A search highlight is active somewhere in the graph.
        const HIGHLIGHTING = 1 << 1;
        const HIGHLIGHTED_FRAME = 1 << 2;
        const HOVERED = 1 << 3;
        /// A frame is selected somewhere in the graph.
        const FOCUSING = 1 << 4;
        /// This frame is the selection or lies inside it.
        const FOCUSED_FRAME = 1 << 5;
        /// The frame's left edge is clipped by the view.
        const PARTIAL_FRAME = 1 << 6;
        const DIMMED = 1 << 7;
    }
}

impl RenderFlags {
    /// Copy of `self` with `other` set or cleared according to `on`.
    #[must_use]
    pub fn with(mut self, other: RenderFlags, on: bool) -> Self {
        self.set(other, on);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_and_query() {
        let flags = RenderFlags::empty()
            .with(RenderFlags::HOVERED, true)
            .with(RenderFlags::DIMMED, false)
            | RenderFlags::FOCUSING;
        assert!(flags.contains(RenderFlags::HOVERED));
        assert!(flags.contains(RenderFlags::FOCUSING));
        assert!(!flags.contains(RenderFlags::DIMMED));
        assert_eq!(flags.bits(), (1 << 3) | (1 << 4));
    }

    #[test]
    fn with_clears_as_well_as_sets() {
        let flags = (RenderFlags::DIMMED | RenderFlags::HOVERED).with(RenderFlags::DIMMED, false);
        assert_eq!(flags, RenderFlags::HOVERED);
    }

    #[test]
    fn serializes_as_names() {
        let flags = RenderFlags::HOVERED | RenderFlags::FOCUSING;
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, "\"HOVERED | FOCUSING\"");
        let back: RenderFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
    }
}
