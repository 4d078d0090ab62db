use crate::error::{Result, WeightField, check_weight};
use crate::model::{CallTree, FrameIdentity, NodeId};

/// Aggregates stack samples into a [`CallTree`].
///
/// Each stack is given outermost frame first, without the root. Stacks
/// sharing a prefix share the nodes for it; every node on a stack gains the
/// sample weight in its cumulative weight and the innermost frame gains it
/// as self weight.
#[derive(Debug, Clone)]
pub struct CallTreeBuilder<F> {
    tree: CallTree<F>,
}

impl<F: FrameIdentity> CallTreeBuilder<F> {
    /// Start a tree whose root stands for "all samples".
    pub fn new(root: F) -> Result<Self> {
        Ok(Self {
            tree: CallTree::with_root(root, 0.0, 0.0)?,
        })
    }

    pub fn add_stack(&mut self, stack: impl IntoIterator<Item = F>, weight: f64) -> Result<()> {
        check_weight(NodeId::ROOT, WeightField::Weight, weight)?;

        let mut cursor = NodeId::ROOT;
        self.bump(cursor, weight, false);
        for frame in stack {
            let existing = self
                .tree
                .children(cursor)
                .iter()
                .copied()
                .find(|&child| self.tree.node(child).is_some_and(|n| n.frame == frame));
            cursor = match existing {
                Some(child) => child,
                None => self.tree.add_child(cursor, frame, 0.0, 0.0)?,
            };
            self.bump(cursor, weight, false);
        }
        self.bump(cursor, weight, true);
        Ok(())
    }

    fn bump(&mut self, id: NodeId, weight: f64, self_weight: bool) {
        if let Some(node) = self.tree.node_mut(id) {
            if self_weight {
                node.weight += weight;
            } else {
                node.cumulative_weight += weight;
            }
        }
    }

    pub fn build(self) -> CallTree<F> {
        self.tree
    }
}
