use std::sync::Arc;

use hearth_protocol::{FrameKey, FramePaint, Point, Rect, RenderFlags};
use tracing::{debug, info};

use crate::butterfly::{self, ButterflyModel};
use crate::config::FlameGraphConfig;
use crate::error::{InvalidInput, Result};
use crate::layout::{self, FrameBox, FrameLayout};
use crate::memo::Memo;
use crate::model::{CallTree, FrameIdentity};
use crate::views::paint::PaintContext;
use crate::views::selection::{Highlights, SelectionState};
use crate::views::viewport::{self, HitGeometry, ZoomTarget, ZoomViewState};

/// One interactive flame graph: a call tree, its layout, and the view,
/// selection and search state layered on top.
///
/// Points passed in are canvas coordinates, i.e. already offset by the
/// current scroll position.
#[derive(Debug)]
pub struct FlameGraph<F> {
    tree: Arc<CallTree<F>>,
    config: FlameGraphConfig,
    layout: Memo<FrameLayout>,
    view: ZoomViewState,
    selection: SelectionState,
    highlights: Highlights,
}

impl<F: FrameIdentity> FlameGraph<F> {
    pub fn new(
        tree: impl Into<Arc<CallTree<F>>>,
        config: FlameGraphConfig,
        visible_width: f64,
    ) -> Result<Self> {
        config.validate()?;
        let tree = tree.into();
        if tree.is_empty() {
            return Err(InvalidInput::EmptyTree.into());
        }
        info!(nodes = tree.len(), visible_width, "flame graph created");
        let mut graph = Self {
            tree,
            config,
            layout: Memo::new(),
            view: ZoomViewState::new(visible_width)?,
            selection: SelectionState::new(),
            highlights: Highlights::default(),
        };
        graph.refresh_visible_depth()?;
        Ok(graph)
    }

    pub fn tree(&self) -> &Arc<CallTree<F>> {
        &self.tree
    }

    pub fn config(&self) -> &FlameGraphConfig {
        &self.config
    }

    pub fn view(&self) -> &ZoomViewState {
        &self.view
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn highlights(&self) -> &Highlights {
        &self.highlights
    }

    /// Swap in a new tree. Selection, hover and highlights survive for
    /// frames whose call path still exists.
    pub fn set_tree(&mut self, tree: impl Into<Arc<CallTree<F>>>) -> Result<()> {
        let tree = tree.into();
        if tree.is_empty() {
            return Err(InvalidInput::EmptyTree.into());
        }
        self.tree = tree;
        self.layout.invalidate();
        let frames = self.layout()?;
        self.selection.retain(&frames);
        self.highlights.retain(&frames);
        self.refresh_visible_depth()?;
        debug!(nodes = self.tree.len(), "tree replaced");
        Ok(())
    }

    /// The laid-out frames, shared between callers. After the tree changes,
    /// concurrent callers wait for a single computation.
    pub fn layout(&self) -> Result<Arc<FrameLayout>> {
        self.layout.get_or_try_init(|| layout::layout(self.tree.as_ref()))
    }

    fn geometry(&self) -> HitGeometry {
        HitGeometry {
            canvas_width: self.view.logical_width,
            frame_height: self.config.frame_height,
        }
    }

    fn refresh_visible_depth(&mut self) -> Result<u32> {
        let frames = self.layout()?;
        Ok(self
            .view
            .update_visible_depth(frames.boxes(), self.config.visibility_threshold))
    }

    pub fn frame_at(&self, point: Point) -> Result<Option<FrameBox>> {
        let frames = self.layout()?;
        Ok(self.geometry().frame_at(frames.boxes(), point).copied())
    }

    /// Returns whether the hovered frame changed.
    pub fn hover_at(&mut self, point: Point) -> Result<bool> {
        let frames = self.layout()?;
        let geometry = self.geometry();
        Ok(self.selection.hover_at(&frames, &geometry, point))
    }

    pub fn clear_hover(&mut self) {
        self.selection.clear_hover();
    }

    /// Returns the selection after the click.
    pub fn toggle_select_at(&mut self, point: Point) -> Result<Option<FrameKey>> {
        let frames = self.layout()?;
        let geometry = self.geometry();
        self.selection.toggle_select_at(&frames, &geometry, point);
        Ok(self.selection.selected())
    }

    /// Zoom so the frame fills the view. The returned target tells the
    /// renderer where to scroll.
    pub fn zoom_to_frame(&mut self, key: FrameKey) -> Result<ZoomTarget> {
        let frames = self.layout()?;
        let frame = frames.get(key).ok_or(InvalidInput::UnknownFrame(key))?;
        let target = viewport::zoom_to_frame(&self.view, frame, self.config.frame_height)?;
        self.view.apply(&target);
        self.refresh_visible_depth()?;
        debug!(frame = %key, zoom = target.zoom_factor, "zoomed to frame");
        Ok(target)
    }

    /// Select the frame under `point` and zoom to it. Nothing happens on a
    /// miss.
    pub fn zoom_to_frame_at(&mut self, point: Point) -> Result<Option<ZoomTarget>> {
        let Some(frame) = self.frame_at(point)? else {
            return Ok(None);
        };
        self.selection.select(frame.key);
        self.zoom_to_frame(frame.key).map(Some)
    }

    pub fn reset_zoom(&mut self) -> Result<()> {
        self.view.reset();
        self.refresh_visible_depth()?;
        Ok(())
    }

    pub fn resize(&mut self, visible_width: f64) -> Result<()> {
        self.view.resize(visible_width)?;
        self.refresh_visible_depth()?;
        Ok(())
    }

    /// Highlight every frame whose identity satisfies `matches`. Returns
    /// how many frames matched.
    pub fn highlight_matching(&mut self, matches: impl FnMut(&F) -> bool) -> Result<usize> {
        let frames = self.layout()?;
        self.highlights = Highlights::matching(self.tree.as_ref(), &frames, matches);
        debug!(matched = self.highlights.len(), "highlight updated");
        Ok(self.highlights.len())
    }

    pub fn clear_highlight(&mut self) {
        self.highlights.clear();
    }

    pub fn is_dimmed(&self, key: FrameKey) -> Result<bool> {
        let frames = self.layout()?;
        let frame = frames.get(key).ok_or(InvalidInput::UnknownFrame(key))?;
        let flags = self.selection.frame_flags(frame, &frames, &self.highlights);
        Ok(flags.contains(RenderFlags::DIMMED))
    }

    /// Height of a canvas showing every row that has a paintable frame at
    /// the current zoom.
    pub fn canvas_height(&self) -> Result<f64> {
        let frames = self.layout()?;
        let depth = viewport::visible_depth(
            frames.boxes(),
            self.view.logical_width,
            self.config.visibility_threshold,
        );
        Ok(viewport::canvas_height(depth, self.config.frame_height))
    }

    /// Draw commands for the canvas area `view`.
    pub fn paint(&self, view: Rect) -> Result<Vec<FramePaint>> {
        let frames = self.layout()?;
        Ok(self.paint_context(&frames).frames(self.view.logical_width, view))
    }

    pub fn paint_minimap(&self, width: f64) -> Result<Vec<FramePaint>> {
        let frames = self.layout()?;
        Ok(self.paint_context(&frames).minimap(width))
    }

    pub fn minimap_height(&self) -> Result<f64> {
        let frames = self.layout()?;
        Ok(viewport::minimap_height(
            frames.max_depth(),
            self.config.minimap_frame_height,
        ))
    }

    fn paint_context<'a>(&'a self, frames: &'a FrameLayout) -> PaintContext<'a, F> {
        PaintContext {
            tree: &self.tree,
            layout: frames,
            config: &self.config,
            selection: &self.selection,
            highlights: &self.highlights,
        }
    }

    /// Callers and callees of the frames accepted by `matches`.
    pub fn butterfly(&self, matches: impl FnMut(&F) -> bool) -> Result<ButterflyModel<F>> {
        butterfly::build(self.tree.as_ref(), matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlameError;
    use crate::model::CallTreeBuilder;

    fn graph() -> FlameGraph<&'static str> {
        let mut builder = CallTreeBuilder::new("all").unwrap();
        builder.add_stack(["main", "parse", "lex"], 30.0).unwrap();
        builder.add_stack(["main", "parse"], 10.0).unwrap();
        builder.add_stack(["main", "emit"], 60.0).unwrap();
        FlameGraph::new(builder.build(), FlameGraphConfig::default(), 1000.0).unwrap()
    }

    #[test]
    fn layout_is_memoized() {
        let graph = graph();
        let first = graph.layout().unwrap();
        let second = graph.layout().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn empty_tree_is_rejected() {
        let err = FlameGraph::new(CallTree::<&str>::new(), FlameGraphConfig::default(), 100.0)
            .unwrap_err();
        assert_eq!(err, FlameError::InvalidInput(InvalidInput::EmptyTree));
    }

    #[test]
    fn zoom_to_unknown_frame_fails() {
        let mut graph = graph();
        let err = graph.zoom_to_frame(FrameKey(1)).unwrap_err();
        assert_eq!(
            err,
            FlameError::InvalidInput(InvalidInput::UnknownFrame(FrameKey(1)))
        );
    }

    #[test]
    fn zoom_at_selects_and_left_aligns() {
        let mut graph = graph();
        // depth 2, x = 0.2: parse spans [0, 0.4].
        let target = graph.zoom_to_frame_at(Point::new(200.0, 45.0)).unwrap().unwrap();
        let selected = graph.selection().selected().unwrap();
        let frames = graph.layout().unwrap();
        let parse = frames.get(selected).unwrap();
        assert_eq!(graph.tree().node(parse.node).unwrap().frame, "parse");
        assert!((target.zoom_factor - 2.5).abs() < 1e-9);
        assert!((graph.view().frame_left_in_view(parse, target.scroll.x)).abs() < 1e-9);

        graph.reset_zoom().unwrap();
        assert_eq!(graph.view().zoom_factor, 1.0);
        assert!(graph.zoom_to_frame_at(Point::new(200.0, 500.0)).unwrap().is_none());
    }

    #[test]
    fn set_tree_keeps_surviving_selection() {
        let mut graph = graph();
        graph.toggle_select_at(Point::new(900.0, 45.0)).unwrap();
        let emit = graph.selection().selected().unwrap();

        let mut builder = CallTreeBuilder::new("all").unwrap();
        builder.add_stack(["main", "emit"], 5.0).unwrap();
        graph.set_tree(builder.build()).unwrap();
        assert_eq!(graph.selection().selected(), Some(emit));

        let mut builder = CallTreeBuilder::new("all").unwrap();
        builder.add_stack(["other"], 5.0).unwrap();
        graph.set_tree(builder.build()).unwrap();
        assert_eq!(graph.selection().selected(), None);
    }

    #[test]
    fn highlight_dims_the_rest() {
        let mut graph = graph();
        assert_eq!(graph.highlight_matching(|f| *f == "lex").unwrap(), 1);
        let frames = graph.layout().unwrap();
        let lex = frames.boxes().iter().find(|b| b.depth == 3).unwrap().key;
        let main = frames.boxes()[1].key;
        assert!(!graph.is_dimmed(lex).unwrap());
        assert!(graph.is_dimmed(main).unwrap());
        assert!(!graph.is_dimmed(frames.root().key).unwrap());

        graph.clear_highlight();
        assert!(!graph.is_dimmed(main).unwrap());
    }

    #[test]
    fn new_graph_publishes_visible_depth() {
        let graph = graph();
        assert_eq!(graph.view().visible_depth, 3);
        assert_eq!(
            graph.view().canvas_height(graph.config().frame_height),
            graph.canvas_height().unwrap()
        );
    }

    #[test]
    fn canvas_height_tracks_visible_depth() {
        let mut graph = graph();
        assert_eq!(graph.canvas_height().unwrap(), 80.0);
        graph.resize(4.0).unwrap();
        // Only frames at least two pixels wide count.
        assert_eq!(graph.view().visible_depth, 2);
        assert_eq!(graph.minimap_height().unwrap(), 4.0);
    }

    #[test]
    fn butterfly_of_graph_tree() {
        let graph = graph();
        let model = graph.butterfly(|f| *f == "parse").unwrap();
        assert_eq!(model.focus(), &"parse");
        assert_eq!(model.successors().len(), 2);
    }
}
