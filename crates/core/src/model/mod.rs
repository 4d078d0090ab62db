pub mod builder;
pub mod call_tree;
pub mod frame;

pub use builder::CallTreeBuilder;
pub use call_tree::{CallTree, CallTreeNode, NodeId};
pub use frame::{FrameIdentity, MethodFrame};
