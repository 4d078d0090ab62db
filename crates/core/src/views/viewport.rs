use hearth_protocol::{Point, Rect};
use serde::{Deserialize, Serialize};

use crate::error::{InvalidInput, Result, check_extent};
use crate::layout::FrameBox;

/// Zoom state of one flame-graph view.
///
/// The flame graph is drawn on a logical canvas `zoom_factor` times as wide
/// as the visible viewport; the viewport scrolls over it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomViewState {
    pub zoom_factor: f64,
    pub logical_width: f64,
    pub visible_width: f64,
    /// Deepest row with at least one frame wide enough to paint.
    pub visible_depth: u32,
}

impl ZoomViewState {
    pub fn new(visible_width: f64) -> Result<Self> {
        let visible_width = check_extent("visible width", visible_width)?;
        Ok(Self {
            zoom_factor: 1.0,
            logical_width: visible_width,
            visible_width,
            visible_depth: 0,
        })
    }

    /// Follow a viewport resize, keeping the zoom factor.
    pub fn resize(&mut self, visible_width: f64) -> Result<()> {
        self.visible_width = check_extent("visible width", visible_width)?;
        self.logical_width = self.visible_width * self.zoom_factor;
        Ok(())
    }

    pub fn apply(&mut self, target: &ZoomTarget) {
        self.logical_width = target.logical_width;
        self.zoom_factor = target.zoom_factor;
    }

    pub fn reset(&mut self) {
        self.zoom_factor = 1.0;
        self.logical_width = self.visible_width;
    }

    /// Recompute `visible_depth` for the current logical width.
    pub fn update_visible_depth(&mut self, boxes: &[FrameBox], threshold: f64) -> u32 {
        self.visible_depth = visible_depth(boxes, self.logical_width, threshold);
        self.visible_depth
    }

    pub fn canvas_height(&self, frame_height: f64) -> f64 {
        canvas_height(self.visible_depth, frame_height)
    }

    /// Horizontal position of `frame`'s left edge inside the viewport when
    /// the canvas is scrolled to `scroll_x`.
    pub fn frame_left_in_view(&self, frame: &FrameBox, scroll_x: f64) -> f64 {
        frame.start_x * self.logical_width - scroll_x
    }
}

/// Where the view should end up after zooming to a frame. Applying it
/// (snapping or animating the scroll) is the renderer's business.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomTarget {
    pub logical_width: f64,
    pub zoom_factor: f64,
    /// Canvas position to scroll to.
    pub scroll: Point,
}

/// Canvas size used for hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitGeometry {
    pub canvas_width: f64,
    pub frame_height: f64,
}

impl HitGeometry {
    pub fn frame_at<'a>(&self, boxes: &'a [FrameBox], point: Point) -> Option<&'a FrameBox> {
        frame_at(boxes, point, self.canvas_width, self.frame_height)
    }
}

/// The frame under `point`, if any.
///
/// The row is `point.y / frame_height` rounded down; the first frame on
/// that row whose closed interval contains `point.x / width` wins, so a
/// point on the edge shared by two siblings resolves to the left one.
/// Frames too narrow to paint are still found.
pub fn frame_at(
    boxes: &[FrameBox],
    point: Point,
    width: f64,
    frame_height: f64,
) -> Option<&FrameBox> {
    if !(width > 0.0 && frame_height > 0.0) {
        return None;
    }
    let row = (point.y / frame_height).floor();
    if !(row >= 0.0 && row <= f64::from(u32::MAX)) {
        return None;
    }
    let depth = row as u32;
    let x_fraction = point.x / width;
    boxes
        .iter()
        .find(|frame| frame.depth == depth && frame.contains_x(x_fraction))
}

/// Zoom so `frame` fills the visible width, scrolled to its left edge and
/// its row.
pub fn zoom_to_frame(view: &ZoomViewState, frame: &FrameBox, frame_height: f64) -> Result<ZoomTarget> {
    zoom_to_frame_with_context(view, frame, frame_height, 0)
}

/// Like [`zoom_to_frame`], keeping `context_rows` caller rows visible
/// above the frame.
pub fn zoom_to_frame_with_context(
    view: &ZoomViewState,
    frame: &FrameBox,
    frame_height: f64,
    context_rows: u32,
) -> Result<ZoomTarget> {
    let frame_width = frame.width();
    if !(frame_width > 0.0) {
        return Err(InvalidInput::ZeroWidthFrame.into());
    }
    let frame_height = check_extent("frame height", frame_height)?;

    let logical_width = (view.visible_width / frame_width).max(view.visible_width);
    let zoom_factor = logical_width / view.visible_width;
    let y = frame_height * f64::from(frame.depth.saturating_sub(context_rows));

    Ok(ZoomTarget {
        logical_width,
        zoom_factor,
        scroll: Point::new(frame.start_x * logical_width, y.max(0.0)),
    })
}

/// Deepest depth that has a frame at least `threshold` pixels wide.
pub fn visible_depth(boxes: &[FrameBox], logical_width: f64, threshold: f64) -> u32 {
    boxes
        .iter()
        .filter(|frame| frame.width() * logical_width >= threshold)
        .map(|frame| frame.depth)
        .max()
        .unwrap_or(0)
}

/// Height of a canvas showing rows `0..=visible_depth`.
pub fn canvas_height(visible_depth: u32, frame_height: f64) -> f64 {
    f64::from(visible_depth + 1) * frame_height
}

/// Height of the minimap, which always shows every row.
pub fn minimap_height(max_depth: u32, minimap_frame_height: f64) -> f64 {
    canvas_height(max_depth, minimap_frame_height)
}

/// Pixel rectangle of `frame`, snapped to whole pixels and inset by `gap`
/// on the right and bottom.
pub fn frame_rect(frame: &FrameBox, logical_width: f64, frame_height: f64, gap: f64) -> Rect {
    let x = (logical_width * frame.start_x).floor();
    let right = (logical_width * frame.end_x).floor();
    Rect::new(
        x,
        frame_height * f64::from(frame.depth),
        (right - x - gap).max(0.0),
        (frame_height - gap).max(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeId;
    use hearth_protocol::FrameKey;

    fn frame(id: u32, start_x: f64, end_x: f64, depth: u32) -> FrameBox {
        FrameBox {
            node: NodeId::new(id),
            key: FrameKey(u64::from(id)),
            start_x,
            end_x,
            depth,
        }
    }

    fn boxes() -> Vec<FrameBox> {
        vec![
            frame(0, 0.0, 1.0, 0),
            frame(1, 0.0, 0.5, 1),
            frame(2, 0.5, 1.0, 1),
            frame(3, 0.5, 0.501, 2),
        ]
    }

    #[test]
    fn finds_frame_by_row_and_fraction() {
        let boxes = boxes();
        let hit = frame_at(&boxes, Point::new(700.0, 25.0), 1000.0, 20.0);
        assert_eq!(hit.map(|b| b.node), Some(NodeId::new(2)));
        let root = frame_at(&boxes, Point::new(10.0, 19.9), 1000.0, 20.0);
        assert_eq!(root.map(|b| b.node), Some(NodeId::ROOT));
    }

    #[test]
    fn shared_edge_resolves_to_first_in_order() {
        let boxes = boxes();
        let hit = frame_at(&boxes, Point::new(500.0, 30.0), 1000.0, 20.0);
        assert_eq!(hit.map(|b| b.node), Some(NodeId::new(1)));
    }

    #[test]
    fn misses_return_none() {
        let boxes = boxes();
        assert!(frame_at(&boxes, Point::new(100.0, 45.0), 1000.0, 20.0).is_none());
        assert!(frame_at(&boxes, Point::new(100.0, 200.0), 1000.0, 20.0).is_none());
        assert!(frame_at(&boxes, Point::new(100.0, -1.0), 1000.0, 20.0).is_none());
        assert!(frame_at(&boxes, Point::new(100.0, 5.0), 0.0, 20.0).is_none());
    }

    #[test]
    fn narrow_frames_are_hit_testable() {
        let boxes = boxes();
        // One pixel wide at 1000px: below the paint threshold, still hit.
        let hit = frame_at(&boxes, Point::new(500.5, 45.0), 1000.0, 20.0);
        assert_eq!(hit.map(|b| b.node), Some(NodeId::new(3)));
        assert_eq!(visible_depth(&boxes, 1000.0, 2.0), 1);
        assert_eq!(visible_depth(&boxes, 10_000.0, 2.0), 2);
    }

    #[test]
    fn zoom_fills_visible_width_with_frame() {
        let view = ZoomViewState::new(800.0).unwrap();
        let target = zoom_to_frame(&view, &frame(2, 0.5, 0.75, 1), 20.0).unwrap();
        assert_eq!(target.logical_width, 3200.0);
        assert_eq!(target.zoom_factor, 4.0);
        assert_eq!(target.scroll, Point::new(1600.0, 20.0));
    }

    #[test]
    fn zoom_never_shrinks_below_visible_width() {
        let view = ZoomViewState::new(800.0).unwrap();
        let target = zoom_to_frame(&view, &frame(0, 0.0, 1.0, 0), 20.0).unwrap();
        assert_eq!(target.logical_width, 800.0);
        assert_eq!(target.zoom_factor, 1.0);
        assert_eq!(target.scroll, Point::new(0.0, 0.0));
    }

    #[test]
    fn zoom_round_trip_left_aligns_frame() {
        let mut view = ZoomViewState::new(640.0).unwrap();
        let target_frame = frame(3, 0.3, 0.45, 2);
        let target = zoom_to_frame(&view, &target_frame, 20.0).unwrap();
        view.apply(&target);
        let left = view.frame_left_in_view(&target_frame, target.scroll.x);
        assert!(left.abs() < 1e-9);
        let right = target_frame.end_x * view.logical_width - target.scroll.x;
        assert!((right - view.visible_width).abs() < 1e-6);
    }

    #[test]
    fn context_rows_clamp_at_top() {
        let view = ZoomViewState::new(800.0).unwrap();
        let target = zoom_to_frame_with_context(&view, &frame(1, 0.0, 0.5, 1), 20.0, 3).unwrap();
        assert_eq!(target.scroll.y, 0.0);
    }

    #[test]
    fn zero_width_frame_cannot_be_zoomed() {
        let view = ZoomViewState::new(800.0).unwrap();
        assert!(zoom_to_frame(&view, &frame(1, 0.4, 0.4, 1), 20.0).is_err());
    }

    #[test]
    fn resize_keeps_zoom_factor() {
        let mut view = ZoomViewState::new(800.0).unwrap();
        view.apply(&zoom_to_frame(&view, &frame(1, 0.0, 0.5, 1), 20.0).unwrap());
        view.resize(1000.0).unwrap();
        assert_eq!(view.zoom_factor, 2.0);
        assert_eq!(view.logical_width, 2000.0);
        view.reset();
        assert_eq!(view.logical_width, 1000.0);
    }

    #[test]
    fn rect_is_pixel_snapped_with_gap() {
        let rect = frame_rect(&frame(1, 0.25, 0.5, 2), 1001.0, 20.0, 1.0);
        assert_eq!(rect, Rect::new(250.0, 40.0, 249.0, 19.0));
        assert_eq!(canvas_height(2, 20.0), 60.0);
    }
}
