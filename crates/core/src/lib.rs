//! Flame graph core: lays out weighted call trees, hit-tests and zooms the
//! view, tracks hover, selection and search highlights, and builds
//! butterfly (callers/callees) trees around a focus frame.
//!
//! Rendering is left to the caller, which consumes the [`FramePaint`]
//! plans produced here.

pub mod butterfly;
pub mod config;
pub mod error;
pub mod flamegraph;
pub mod layout;
pub mod memo;
pub mod model;
pub mod views;

pub use butterfly::ButterflyModel;
pub use config::{ColorMode, FlameGraphConfig};
pub use error::{FlameError, InvalidInput, Result};
pub use flamegraph::FlameGraph;
pub use hearth_protocol::{FrameKey, FramePaint, Point, Rect, RenderFlags, ThemeToken};
pub use layout::{FrameBox, FrameLayout, layout};
pub use memo::Memo;
pub use model::{CallTree, CallTreeBuilder, CallTreeNode, FrameIdentity, MethodFrame, NodeId};
pub use views::{HitGeometry, SelectionState, ZoomTarget, ZoomViewState};
