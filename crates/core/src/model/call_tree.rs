use std::hash::{DefaultHasher, Hash, Hasher};

use hearth_protocol::FrameKey;
use serde::{Deserialize, Serialize};

use crate::error::{InvalidInput, Result, WeightField, check_weight};
use crate::model::FrameIdentity;

/// Index of a node inside its [`CallTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// The first node pushed into a tree is always its root.
    pub const ROOT: NodeId = NodeId(0);

    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One node of a weighted call tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallTreeNode<F> {
    pub frame: F,
    /// Self weight: samples (or time) attributed directly to this frame.
    pub weight: f64,
    /// Self weight plus the cumulative weight of all descendants.
    pub cumulative_weight: f64,
    /// Path-derived identity: hash of the parent's key and this frame.
    pub key: FrameKey,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl<F> CallTreeNode<F> {
    /// Back-reference to the caller; `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Callees in insertion order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// A weighted call tree stored as an arena.
///
/// Children are owned through the arena and listed by index on their
/// parent; the parent link is a plain index used for upward lookups only.
/// Nodes are append-only, so a `NodeId` stays valid for the life of the
/// tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallTree<F> {
    nodes: Vec<CallTreeNode<F>>,
}

impl<F: FrameIdentity> CallTree<F> {
    /// An empty tree. Most operations on it fail with
    /// [`InvalidInput::EmptyTree`].
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn with_root(frame: F, weight: f64, cumulative_weight: f64) -> Result<Self> {
        let mut tree = Self::new();
        tree.push(None, frame, weight, cumulative_weight)?;
        Ok(tree)
    }

    /// Append a callee under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        frame: F,
        weight: f64,
        cumulative_weight: f64,
    ) -> Result<NodeId> {
        if parent.index() >= self.nodes.len() {
            return Err(InvalidInput::UnknownNode(parent).into());
        }
        self.push(Some(parent), frame, weight, cumulative_weight)
    }

    fn push(
        &mut self,
        parent: Option<NodeId>,
        frame: F,
        weight: f64,
        cumulative_weight: f64,
    ) -> Result<NodeId> {
        let index = u32::try_from(self.nodes.len())
            .map_err(|_| InvalidInput::UnknownNode(NodeId(u32::MAX)))?;
        let id = NodeId(index);
        check_weight(id, WeightField::Weight, weight)?;
        check_weight(id, WeightField::CumulativeWeight, cumulative_weight)?;

        let key = match parent {
            Some(parent) => {
                let siblings = &self.nodes[parent.index()].children;
                let ordinal = siblings
                    .iter()
                    .filter(|s| self.nodes[s.index()].frame == frame)
                    .count();
                derive_key(Some(self.nodes[parent.index()].key), &frame, ordinal)
            }
            None => derive_key(None, &frame, 0),
        };

        self.nodes.push(CallTreeNode {
            frame,
            weight,
            cumulative_weight,
            key,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        Ok(id)
    }

    pub fn root(&self) -> Option<NodeId> {
        (!self.nodes.is_empty()).then_some(NodeId::ROOT)
    }

    pub fn node(&self, id: NodeId) -> Option<&CallTreeNode<F>> {
        self.nodes.get(id.index())
    }

    /// Like [`CallTree::node`], but an unknown id is an input error.
    pub fn get(&self, id: NodeId) -> Result<&CallTreeNode<F>> {
        self.node(id)
            .ok_or_else(|| InvalidInput::UnknownNode(id).into())
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut CallTreeNode<F>> {
        self.nodes.get_mut(id.index())
    }

    /// Children of `id`; empty for leaves and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[] as &[NodeId], |n| n.children())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(CallTreeNode::parent)
    }

    /// Callers of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_, F> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// Depth-first, root-first traversal in children order.
    pub fn pre_order(&self) -> PreOrder<'_, F> {
        PreOrder {
            tree: self,
            stack: self.root().into_iter().collect(),
        }
    }

    /// Number of callers between `id` and the root.
    pub fn depth(&self, id: NodeId) -> u32 {
        self.ancestors(id).count() as u32
    }

    pub fn max_depth(&self) -> u32 {
        let mut depths = vec![0u32; self.nodes.len()];
        let mut max = 0;
        // Parents are always pushed before their children.
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                depths[index] = depths[parent.index()] + 1;
                max = max.max(depths[index]);
            }
        }
        max
    }

    pub fn find_by_key(&self, key: FrameKey) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.key == key)
            .map(|index| NodeId(index as u32))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CallTreeNode<F>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index as u32), node))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl<F: FrameIdentity> Default for CallTree<F> {
    fn default() -> Self {
        Self::new()
    }
}

fn derive_key<F: Hash>(parent: Option<FrameKey>, frame: &F, ordinal: usize) -> FrameKey {
    // `DefaultHasher::new()` uses fixed keys, so keys are reproducible
    // across runs and rebuilt trees.
    let mut hasher = DefaultHasher::new();
    parent.map(|k| k.0).hash(&mut hasher);
    frame.hash(&mut hasher);
    if ordinal > 0 {
        ordinal.hash(&mut hasher);
    }
    FrameKey(hasher.finish())
}

pub struct Ancestors<'a, F> {
    tree: &'a CallTree<F>,
    next: Option<NodeId>,
}

impl<F: FrameIdentity> Iterator for Ancestors<'_, F> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

pub struct PreOrder<'a, F> {
    tree: &'a CallTree<F>,
    stack: Vec<NodeId>,
}

impl<F: FrameIdentity> Iterator for PreOrder<'_, F> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(current).iter().rev().copied());
        Some(current)
    }
}
