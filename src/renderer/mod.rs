pub mod camera;
pub mod scene;

pub use camera::{Rect, Viewport};
pub use scene::{ButtonNode, RenderStats, Renderer, TileNode};
