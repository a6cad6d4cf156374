//! Caret placement hooks.
//!
//! Where exactly the caret lands inside a surface belongs to the rendering
//! layer. The document model only says which block it should be in.

/// Moves the caret between blocks.
pub trait Caret: Send + Sync {
    /// Place the caret in the block at `index`.
    fn set_to_block(&self, index: usize);

    /// Move the caret into the block before the current one.
    fn navigate_previous(&self);
}

/// Caret for headless use. Logs and does nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCaret;

impl Caret for NoopCaret {
    fn set_to_block(&self, index: usize) {
        tracing::trace!("caret -> block {}", index);
    }

    fn navigate_previous(&self) {
        tracing::trace!("caret -> previous block");
    }
}
