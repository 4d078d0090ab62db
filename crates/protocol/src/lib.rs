pub mod flags;
pub mod paint;
pub mod shared_str;
pub mod theme;
pub mod types;

pub use flags::RenderFlags;
pub use paint::{FrameKey, FramePaint};
pub use shared_str::SharedStr;
pub use theme::ThemeToken;
pub use types::{Point, Rect};
