use std::collections::HashMap;

use hearth_protocol::FrameKey;
use serde::Serialize;
use tracing::debug;

use crate::error::{InvalidInput, Result, WeightField, check_weight};
use crate::model::{CallTree, FrameIdentity, NodeId};

/// A node's position in the flame graph: a horizontal interval in
/// normalized `[0, 1]` space and a stack depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameBox {
    pub node: NodeId,
    pub key: FrameKey,
    pub start_x: f64,
    pub end_x: f64,
    pub depth: u32,
}

impl FrameBox {
    pub fn width(&self) -> f64 {
        self.end_x - self.start_x
    }

    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    /// Closed on both ends: a fraction on a shared edge is inside both
    /// neighbours.
    pub fn contains_x(&self, x_fraction: f64) -> bool {
        self.start_x <= x_fraction && x_fraction <= self.end_x
    }
}

/// The flattened, positioned frames of one tree, root first, then
/// depth-first over children in their given order.
#[derive(Debug, Clone, Serialize)]
pub struct FrameLayout {
    boxes: Vec<FrameBox>,
    max_depth: u32,
    #[serde(skip)]
    by_key: HashMap<FrameKey, usize>,
}

impl FrameLayout {
    pub fn boxes(&self) -> &[FrameBox] {
        &self.boxes
    }

    /// The root's box, always `[0, 1]` at depth 0.
    pub fn root(&self) -> &FrameBox {
        // `layout` never produces an empty sequence.
        &self.boxes[0]
    }

    pub fn get(&self, key: FrameKey) -> Option<&FrameBox> {
        self.by_key.get(&key).map(|&index| &self.boxes[index])
    }

    pub fn contains(&self, key: FrameKey) -> bool {
        self.by_key.contains_key(&key)
    }

    /// Deepest depth present in the layout.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Always false for a layout built by [`layout`], which emits the root.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl PartialEq for FrameLayout {
    fn eq(&self, other: &Self) -> bool {
        self.boxes == other.boxes
    }
}

/// Flatten `tree` into positioned frames.
///
/// Children split their parent's interval in proportion to their
/// cumulative weights, in list order. Children whose weights sum to zero
/// have no width and are left out, together with their subtrees.
pub fn layout<F: FrameIdentity>(tree: &CallTree<F>) -> Result<FrameLayout> {
    let root = tree.root().ok_or(InvalidInput::EmptyTree)?;

    let mut boxes = Vec::with_capacity(tree.len());
    let mut max_depth = 0;
    let mut stack = vec![(root, 0.0_f64, 1.0_f64, 0_u32)];
    let mut spans = Vec::new();

    while let Some((id, start_x, end_x, depth)) = stack.pop() {
        let node = tree.get(id)?;
        boxes.push(FrameBox {
            node: id,
            key: node.key,
            start_x,
            end_x,
            depth,
        });
        max_depth = max_depth.max(depth);

        let children = node.children();
        if children.is_empty() {
            continue;
        }

        let mut total = 0.0;
        for &child in children {
            let weight = tree.get(child)?.cumulative_weight;
            total += check_weight(child, WeightField::CumulativeWeight, weight)?;
        }
        if total == 0.0 {
            continue;
        }

        let parent_width = end_x - start_x;
        let last = children.len() - 1;
        let mut child_start = start_x;
        spans.clear();
        for (i, &child) in children.iter().enumerate() {
            let child_end = if i == last {
                end_x
            } else {
                let weight = tree.get(child)?.cumulative_weight;
                (child_start + parent_width * (weight / total)).min(end_x)
            };
            spans.push((child, child_start, child_end, depth + 1));
            child_start = child_end;
        }
        // Reversed so the first child is popped, and emitted, first.
        stack.extend(spans.iter().rev().copied());
    }

    let by_key = boxes
        .iter()
        .enumerate()
        .rev()
        .map(|(index, frame)| (frame.key, index))
        .collect();

    debug!(frames = boxes.len(), max_depth, "laid out call tree");
    Ok(FrameLayout {
        boxes,
        max_depth,
        by_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlameError;

    const EPS: f64 = 1e-9;

    fn sample() -> CallTree<&'static str> {
        let mut tree = CallTree::with_root("root", 0.0, 100.0).unwrap();
        let a = tree.add_child(NodeId::ROOT, "a", 10.0, 60.0).unwrap();
        tree.add_child(a, "a1", 30.0, 30.0).unwrap();
        tree.add_child(a, "a2", 20.0, 20.0).unwrap();
        let b = tree.add_child(NodeId::ROOT, "b", 15.0, 40.0).unwrap();
        tree.add_child(b, "b1", 25.0, 25.0).unwrap();
        tree
    }

    fn frame_of(tree: &CallTree<&'static str>, b: &FrameBox) -> &'static str {
        tree.node(b.node).unwrap().frame
    }

    #[test]
    fn root_box_spans_everything() {
        let tree = sample();
        let frames = layout(&tree).unwrap();
        let root = frames.boxes()[0];
        assert_eq!(root.node, NodeId::ROOT);
        assert_eq!((root.start_x, root.end_x, root.depth), (0.0, 1.0, 0));
        assert_eq!(frames.root(), &root);
    }

    #[test]
    fn emits_pre_order() {
        let tree = sample();
        let frames = layout(&tree).unwrap();
        let names: Vec<_> = frames.boxes().iter().map(|b| frame_of(&tree, b)).collect();
        assert_eq!(names, vec!["root", "a", "a1", "a2", "b", "b1"]);
    }

    #[test]
    fn children_partition_parent_interval() {
        let tree = sample();
        let frames = layout(&tree).unwrap();
        let by_node: HashMap<_, _> = frames.boxes().iter().map(|b| (b.node, *b)).collect();

        for (id, _) in tree.iter() {
            let children = tree.children(id);
            if children.is_empty() {
                continue;
            }
            let parent = by_node[&id];
            let covered: f64 = children.iter().map(|c| by_node[c].width()).sum();
            assert!((covered - parent.width()).abs() < EPS, "partition of {id}");

            // Contiguous, in order, starting at the parent's edge.
            let mut edge = parent.start_x;
            for child in children {
                let child = by_node[child];
                assert!((child.start_x - edge).abs() < EPS);
                assert_eq!(child.depth, parent.depth + 1);
                edge = child.end_x;
            }
            assert_eq!(edge, parent.end_x);
        }
    }

    #[test]
    fn widths_follow_cumulative_weight() {
        let tree = sample();
        let frames = layout(&tree).unwrap();
        let a = frames.boxes()[1];
        let b = frames.boxes()[4];
        assert!((a.width() - 0.6).abs() < EPS);
        assert!((b.start_x - 0.6).abs() < EPS);
        assert!((b.width() - 0.4).abs() < EPS);
        // a1 and a2 share a's 0.6 as 30:20.
        assert!((frames.boxes()[2].width() - 0.36).abs() < EPS);
    }

    #[test]
    fn equal_weights_keep_list_order() {
        let mut tree = CallTree::with_root("root", 0.0, 2.0).unwrap();
        tree.add_child(NodeId::ROOT, "second", 1.0, 1.0).unwrap();
        tree.add_child(NodeId::ROOT, "first", 1.0, 1.0).unwrap();
        let frames = layout(&tree).unwrap();
        assert_eq!(frame_of(&tree, &frames.boxes()[1]), "second");
        assert_eq!(frames.boxes()[1].start_x, 0.0);
        assert_eq!(frame_of(&tree, &frames.boxes()[2]), "first");
    }

    #[test]
    fn zero_weight_children_are_omitted() {
        let mut tree = CallTree::with_root("root", 5.0, 5.0).unwrap();
        let a = tree.add_child(NodeId::ROOT, "a", 0.0, 0.0).unwrap();
        tree.add_child(a, "deep", 0.0, 0.0).unwrap();
        tree.add_child(NodeId::ROOT, "b", 0.0, 0.0).unwrap();
        let frames = layout(&tree).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames.max_depth(), 0);
    }

    #[test]
    fn empty_tree_is_invalid_input() {
        let tree: CallTree<&str> = CallTree::new();
        assert_eq!(
            layout(&tree).unwrap_err(),
            FlameError::InvalidInput(InvalidInput::EmptyTree)
        );
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut tree = CallTree::with_root(0_u32, 0.0, 1.0).unwrap();
        let mut cursor = NodeId::ROOT;
        for depth in 1..=50_000 {
            cursor = tree.add_child(cursor, depth, 0.0, 1.0).unwrap();
        }
        let frames = layout(&tree).unwrap();
        assert_eq!(frames.len(), 50_001);
        assert_eq!(frames.max_depth(), 50_000);
        assert!(frames.boxes().iter().all(|b| b.start_x == 0.0 && b.end_x == 1.0));
    }

    #[test]
    fn lookup_by_key_survives_relayout() {
        let tree = sample();
        let first = layout(&tree).unwrap();
        let second = layout(&tree).unwrap();
        let target = first.boxes()[3];
        assert_eq!(second.get(target.key), Some(&target));
        assert_eq!(first, second);
    }
}
