use std::collections::HashSet;

use hearth_protocol::{FrameKey, Point, RenderFlags};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::layout::{FrameBox, FrameLayout};
use crate::model::{CallTree, FrameIdentity};
use crate::views::viewport::HitGeometry;

/// Hover and selection slots of one flame graph.
///
/// The two slots are independent: a frame may be hovered and selected at
/// once. Both hold [`FrameKey`]s, so they survive relayouts and resolve
/// against whichever layout is current.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionState {
    hovered: Option<FrameKey>,
    selected: Option<FrameKey>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hovered(&self) -> Option<FrameKey> {
        self.hovered
    }

    pub fn selected(&self) -> Option<FrameKey> {
        self.selected
    }

    /// Hover the frame under `point`, or clear the hover when there is none.
    /// Returns whether the hovered frame changed.
    pub fn hover_at(&mut self, layout: &FrameLayout, geometry: &HitGeometry, point: Point) -> bool {
        let hit = geometry.frame_at(layout.boxes(), point).map(|b| b.key);
        if hit == self.hovered {
            return false;
        }
        trace!(from = ?self.hovered, to = ?hit, "hover changed");
        self.hovered = hit;
        true
    }

    /// Select the frame under `point`; clicking the selected frame again
    /// deselects it. A click on empty space changes nothing.
    pub fn toggle_select_at(
        &mut self,
        layout: &FrameLayout,
        geometry: &HitGeometry,
        point: Point,
    ) -> Option<FrameKey> {
        let hit = geometry.frame_at(layout.boxes(), point)?.key;
        self.selected = if self.selected == Some(hit) {
            None
        } else {
            Some(hit)
        };
        trace!(frame = %hit, selected = self.selected.is_some(), "selection toggled");
        self.selected
    }

    pub fn select(&mut self, key: FrameKey) {
        self.selected = Some(key);
    }

    pub fn clear_hover(&mut self) {
        self.hovered = None;
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn hovered_box<'a>(&self, layout: &'a FrameLayout) -> Option<&'a FrameBox> {
        self.hovered.and_then(|key| layout.get(key))
    }

    pub fn selected_box<'a>(&self, layout: &'a FrameLayout) -> Option<&'a FrameBox> {
        self.selected.and_then(|key| layout.get(key))
    }

    /// Forget frames that are gone from `layout`.
    pub fn retain(&mut self, layout: &FrameLayout) {
        if self.hovered.is_some_and(|key| !layout.contains(key)) {
            self.hovered = None;
        }
        if self.selected.is_some_and(|key| !layout.contains(key)) {
            trace!("selected frame no longer in layout");
            self.selected = None;
        }
    }

    /// Render flags of `frame` given this state and the search highlights.
    /// Minimap and partial-frame bits are left to the painter, which also
    /// drops `DIMMED` from minimap frames.
    pub fn frame_flags(
        &self,
        frame: &FrameBox,
        layout: &FrameLayout,
        highlights: &Highlights,
    ) -> RenderFlags {
        let selected = self.selected_box(layout);
        let mut flags = RenderFlags::empty()
            .with(RenderFlags::HIGHLIGHTING, !highlights.is_empty())
            .with(RenderFlags::HIGHLIGHTED_FRAME, highlights.contains(frame.key))
            .with(RenderFlags::HOVERED, self.hovered == Some(frame.key))
            .with(RenderFlags::FOCUSING, selected.is_some())
            .with(
                RenderFlags::FOCUSED_FRAME,
                selected.is_some_and(|sel| !is_dimmed_by(frame, sel)),
            );
        if !frame.is_root() && should_dim(flags) {
            flags.insert(RenderFlags::DIMMED);
        }
        flags
    }
}

/// Whether `frame` falls outside `selected`: above it, or on a disjoint
/// interval.
pub fn is_dimmed_by(frame: &FrameBox, selected: &FrameBox) -> bool {
    frame.depth < selected.depth
        || frame.end_x <= selected.start_x
        || frame.start_x >= selected.end_x
}

/// Dim a frame left out by an active highlight or an active focus, unless
/// both are active and the frame belongs to either one.
pub fn should_dim(flags: RenderFlags) -> bool {
    let highlighting = flags.contains(RenderFlags::HIGHLIGHTING);
    let highlighted = flags.contains(RenderFlags::HIGHLIGHTED_FRAME);
    let focusing = flags.contains(RenderFlags::FOCUSING);
    let focused = flags.contains(RenderFlags::FOCUSED_FRAME);

    let dimmed_for_highlight = highlighting && !highlighted;
    let dimmed_for_focus = focusing && !focused;
    (dimmed_for_highlight || dimmed_for_focus)
        && !(highlighting && focusing && (highlighted || focused))
}

/// Frames matched by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlights {
    keys: HashSet<FrameKey>,
}

impl Highlights {
    /// Laid-out frames, root excluded, whose identity satisfies `matches`.
    pub fn matching<F: FrameIdentity>(
        tree: &CallTree<F>,
        layout: &FrameLayout,
        mut matches: impl FnMut(&F) -> bool,
    ) -> Self {
        let keys = layout
            .boxes()
            .iter()
            .filter(|b| !b.is_root())
            .filter(|b| tree.node(b.node).is_some_and(|n| matches(&n.frame)))
            .map(|b| b.key)
            .collect();
        Self { keys }
    }

    pub fn contains(&self, key: FrameKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn retain(&mut self, layout: &FrameLayout) {
        self.keys.retain(|&key| layout.contains(key));
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}
