use std::hash::{DefaultHasher, Hash, Hasher};

use hearth_protocol::{FramePaint, Rect, RenderFlags, ThemeToken};
use tracing::trace;

use crate::config::{ColorMode, FlameGraphConfig};
use crate::layout::{FrameBox, FrameLayout};
use crate::model::{CallTree, FrameIdentity};
use crate::views::selection::{Highlights, SelectionState};
use crate::views::viewport::frame_rect;

/// Everything needed to turn a layout into draw commands.
pub struct PaintContext<'a, F> {
    pub tree: &'a CallTree<F>,
    pub layout: &'a FrameLayout,
    pub config: &'a FlameGraphConfig,
    pub selection: &'a SelectionState,
    pub highlights: &'a Highlights,
}

impl<F: FrameIdentity> PaintContext<'_, F> {
    /// Frames to draw for the part of the canvas inside `view`, in layout
    /// order.
    ///
    /// The root is always drawn when in view. Other frames narrower than
    /// the visibility threshold are skipped.
    pub fn frames(&self, logical_width: f64, view: Rect) -> Vec<FramePaint> {
        let out = self.collect(
            logical_width,
            view,
            self.config.frame_height,
            self.config.frame_gap,
            false,
        );
        trace!(painted = out.len(), total = self.layout.len(), "paint plan");
        out
    }

    /// The whole graph squeezed into `width` pixels at minimap row height.
    /// Nothing is culled for width.
    pub fn minimap(&self, width: f64) -> Vec<FramePaint> {
        let height = self.config.minimap_frame_height;
        let whole = Rect::new(
            0.0,
            0.0,
            width,
            f64::from(self.layout.max_depth() + 1) * height,
        );
        self.collect(width, whole, height, 0.0, true)
    }

    fn collect(
        &self,
        logical_width: f64,
        view: Rect,
        frame_height: f64,
        gap: f64,
        minimap: bool,
    ) -> Vec<FramePaint> {
        let threshold = self.config.visibility_threshold;
        let mut out = Vec::new();
        for frame in self.layout.boxes() {
            let snapped_width =
                (logical_width * frame.end_x).floor() - (logical_width * frame.start_x).floor();
            if !frame.is_root() && !minimap && snapped_width < threshold {
                continue;
            }

            let rect = frame_rect(frame, logical_width, frame_height, gap);
            let Some(visible) = rect.intersection(&view) else {
                continue;
            };

            // The minimap is never dimmed.
            let mut flags = self
                .selection
                .frame_flags(frame, self.layout, self.highlights)
                .with(RenderFlags::PARTIAL_FRAME, rect.x < visible.x);
            if minimap {
                flags.remove(RenderFlags::DIMMED);
                flags.insert(RenderFlags::MINIMAP_MODE);
            }

            out.push(FramePaint {
                key: frame.key,
                depth: frame.depth,
                rect,
                visible,
                color: self.color_of(frame),
                flags,
            });
        }
        out
    }

    fn color_of(&self, frame: &FrameBox) -> ThemeToken {
        if frame.is_root() {
            return ThemeToken::FrameRoot;
        }
        match self.config.color_mode {
            ColorMode::ByDepth => ThemeToken::flame(frame.depth as usize),
            ColorMode::ByFrameHash => match self.tree.node(frame.node) {
                Some(node) => ThemeToken::flame(frame_hash(&node.frame) as usize),
                None => ThemeToken::FlameNeutral,
            },
            ColorMode::Uniform(token) => token,
        }
    }
}

fn frame_hash<F: Hash>(frame: &F) -> u64 {
    let mut hasher = DefaultHasher::new();
    frame.hash(&mut hasher);
    hasher.finish()
}
