//! Renderer trait abstraction.

use inkslate_core::bitmap::BitmapError;
use inkslate_core::command::CommandLog;
use kurbo::Rect;
use thiserror::Error;

/// Renderer errors.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("Log has {0} unfinished image draws")]
    PendingAsync(usize),
    #[error("Invalid surface size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Image error: {0}")]
    Bitmap(#[from] BitmapError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RendererError>;

/// Turns a complete command log into an output document.
///
/// Implementations read the log from the start with their own shadow state
/// and never touch the live surface.
pub trait LogRenderer {
    type Output;

    fn render(&mut self, log: &CommandLog) -> RenderResult<Self::Output>;
}

/// Refuse logs whose image draws have not all resolved.
pub(crate) fn ensure_settled(log: &CommandLog) -> RenderResult<()> {
    match log.pending_async() {
        0 => Ok(()),
        n => Err(RendererError::PendingAsync(n)),
    }
}

/// Whether `rect` covers all of `bounds`.
pub(crate) fn covers(rect: Rect, bounds: Rect) -> bool {
    rect.x0 <= bounds.x0 && rect.y0 <= bounds.y0 && rect.x1 >= bounds.x1 && rect.y1 >= bounds.y1
}
