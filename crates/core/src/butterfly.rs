//! Butterfly view: callers and callees of one focus frame, merged across
//! every place the frame occurs in a call tree.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{FlameError, InvalidInput, Result};
use crate::model::{CallTree, FrameIdentity, NodeId};

/// Callers and callees of a focus frame, as two trees rooted at it.
///
/// `predecessors` grows upward: each child is a caller of its parent.
/// `successors` is the union of every subtree below an occurrence of the
/// focus frame, with same-frame siblings merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ButterflyModel<F> {
    focus: F,
    predecessors: CallTree<F>,
    successors: CallTree<F>,
}

impl<F: FrameIdentity> ButterflyModel<F> {
    pub fn focus(&self) -> &F {
        &self.focus
    }

    pub fn predecessors(&self) -> &CallTree<F> {
        &self.predecessors
    }

    pub fn successors(&self) -> &CallTree<F> {
        &self.successors
    }
}

/// Build the butterfly model of the frames in `source` accepted by
/// `matches`.
///
/// Every matching node contributes, including matches nested under other
/// matches. The source root is never materialized as a caller. If the
/// predicate accepts several distinct frames, all of them accumulate under
/// the first one met in pre-order.
pub fn build<F: FrameIdentity>(
    source: &CallTree<F>,
    mut matches: impl FnMut(&F) -> bool,
) -> Result<ButterflyModel<F>> {
    let root = source.root().ok_or(InvalidInput::EmptyTree)?;

    let mut predecessors: Option<SynthTree<F>> = None;
    let mut successors: Option<SynthTree<F>> = None;
    let mut occurrences = 0_usize;
    let mut mixed_focus = false;

    for id in source.pre_order() {
        let node = source.get(id)?;
        if !matches(&node.frame) {
            continue;
        }
        occurrences += 1;

        let callers = predecessors.get_or_insert_with(|| SynthTree::new(node.frame.clone()));
        if callers.nodes[SynthTree::<F>::ROOT].frame != node.frame && !mixed_focus {
            warn!(
                focus = ?callers.nodes[SynthTree::<F>::ROOT].frame,
                other = ?node.frame,
                "predicate matches several frames; merging under the first"
            );
            mixed_focus = true;
        }
        callers.accumulate(SynthTree::<F>::ROOT, node.weight, node.cumulative_weight);
        let mut cursor = SynthTree::<F>::ROOT;
        for ancestor in source.ancestors(id) {
            if ancestor == root {
                break;
            }
            let caller = source.get(ancestor)?;
            cursor = callers.find_or_create(cursor, &caller.frame);
            callers.accumulate(cursor, caller.weight, caller.cumulative_weight);
        }

        let callees = successors.get_or_insert_with(|| SynthTree::new(node.frame.clone()));
        callees.accumulate(SynthTree::<F>::ROOT, node.weight, node.cumulative_weight);
        callees.copy_children(source, id)?;
    }

    let (Some(predecessors), Some(mut successors)) = (predecessors, successors) else {
        return Err(FlameError::NoFocusFrame);
    };
    successors.merge_children();

    let focus = predecessors.nodes[SynthTree::<F>::ROOT].frame.clone();
    let model = ButterflyModel {
        focus,
        predecessors: predecessors.into_tree()?,
        successors: successors.into_tree()?,
    };
    debug!(
        occurrences,
        callers = model.predecessors.len(),
        callees = model.successors.len(),
        "built butterfly model"
    );
    Ok(model)
}

#[derive(Debug, Clone)]
struct SynthNode<F> {
    frame: F,
    weight: f64,
    cumulative_weight: f64,
    children: Vec<usize>,
}

/// Scratch tree the butterfly halves are accumulated into before being
/// frozen into [`CallTree`]s. Nodes merged away stay in the arena but are
/// no longer linked from the root.
#[derive(Debug, Clone)]
struct SynthTree<F> {
    nodes: Vec<SynthNode<F>>,
}

impl<F: FrameIdentity> SynthTree<F> {
    const ROOT: usize = 0;

    fn new(frame: F) -> Self {
        Self {
            nodes: vec![SynthNode {
                frame,
                weight: 0.0,
                cumulative_weight: 0.0,
                children: Vec::new(),
            }],
        }
    }

    fn push(&mut self, parent: usize, frame: F, weight: f64, cumulative_weight: f64) -> usize {
        let index = self.nodes.len();
        self.nodes.push(SynthNode {
            frame,
            weight,
            cumulative_weight,
            children: Vec::new(),
        });
        self.nodes[parent].children.push(index);
        index
    }

    fn accumulate(&mut self, index: usize, weight: f64, cumulative_weight: f64) {
        let node = &mut self.nodes[index];
        node.weight += weight;
        node.cumulative_weight += cumulative_weight;
    }

    fn find_or_create(&mut self, parent: usize, frame: &F) -> usize {
        let existing = self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].frame == *frame);
        existing.unwrap_or_else(|| self.push(parent, frame.clone(), 0.0, 0.0))
    }

    /// Copy the subtree below `from` under the synthetic root. Callee
    /// trees report cumulative weight at every level, so both weights of a
    /// copy come from the source's cumulative weight.
    fn copy_children(&mut self, source: &CallTree<F>, from: NodeId) -> Result<()> {
        let mut stack = vec![(from, Self::ROOT)];
        while let Some((source_id, parent)) = stack.pop() {
            for &child in source.children(source_id) {
                let node = source.get(child)?;
                let copy = self.push(
                    parent,
                    node.frame.clone(),
                    node.cumulative_weight,
                    node.cumulative_weight,
                );
                stack.push((child, copy));
            }
        }
        Ok(())
    }

    /// Merge same-frame siblings level by level from the root down. A
    /// merged node sums both weights and keeps the children of every
    /// member, which are merged in turn. Sibling order is first
    /// encounter.
    fn merge_children(&mut self) {
        let mut queue = vec![Self::ROOT];
        while let Some(parent) = queue.pop() {
            let children = std::mem::take(&mut self.nodes[parent].children);
            let mut survivors: Vec<usize> = Vec::with_capacity(children.len());
            let mut by_frame: HashMap<F, usize> = HashMap::new();

            for child in children {
                let kept = by_frame.get(&self.nodes[child].frame).copied();
                match kept {
                    Some(kept) => {
                        let absorbed = std::mem::take(&mut self.nodes[child].children);
                        let (weight, cumulative) =
                            (self.nodes[child].weight, self.nodes[child].cumulative_weight);
                        self.accumulate(kept, weight, cumulative);
                        self.nodes[kept].children.extend(absorbed);
                    }
                    None => {
                        by_frame.insert(self.nodes[child].frame.clone(), child);
                        survivors.push(child);
                    }
                }
            }

            queue.extend(survivors.iter().copied());
            self.nodes[parent].children = survivors;
        }
    }

    fn into_tree(self) -> Result<CallTree<F>> {
        let root = &self.nodes[Self::ROOT];
        let mut tree = CallTree::with_root(root.frame.clone(), root.weight, root.cumulative_weight)?;
        let mut stack = vec![(Self::ROOT, NodeId::ROOT)];
        while let Some((index, parent)) = stack.pop() {
            for &child in &self.nodes[index].children {
                let node = &self.nodes[child];
                let id =
                    tree.add_child(parent, node.frame.clone(), node.weight, node.cumulative_weight)?;
                stack.push((child, id));
            }
        }
        Ok(tree)
    }
}
