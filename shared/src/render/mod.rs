//! Sprite render cache.
//! Rendered sprites are looked up in memory first, then in a persistent
//! image store, and only then rendered by a pool of worker threads. Requests
//! for a sprite that is already being rendered wait for that job instead of
//! starting another one.

mod cache;
mod error;
mod store;

pub use cache::{Delivery, RenderCache, RenderConfig, RenderStatus, SpriteId};
pub use error::RenderError;
pub use store::{ImageStore, MemoryImageStore};

/// Pixel size of a rendered sprite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Draws theme elements into images. Implementations are shared by every
/// render worker.
pub trait Renderer: Send + Sync + 'static {
    type Image: Clone + Send + 'static;

    fn element_exists(&self, element_key: &str) -> bool;

    /// Renders an element at `size`, or `None` if it cannot be drawn
    fn render(&self, element_key: &str, size: Size) -> Option<Self::Image>;
}
