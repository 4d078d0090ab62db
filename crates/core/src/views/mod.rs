pub mod paint;
pub mod selection;
pub mod viewport;

pub use paint::PaintContext;
pub use selection::{Highlights, SelectionState};
pub use viewport::{HitGeometry, ZoomTarget, ZoomViewState};
