use crate::core::render::{RawImage, RenderFlags};
use crate::error::DocumentError;

/// Paginated document as seen by the viewport.
///
/// Parsing, loading and saving live behind this trait. Implementations are
/// shared with render threads and must not be mutated by rendering.
pub trait Document: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Height of the crop box of the given page, in points. `None` if the
    /// page does not exist.
    fn crop_height(&self, page_index: usize) -> Option<f64>;

    /// Rasterize the crop box of the given page at the given resolution.
    fn render_raw(
        &self,
        page_index: usize,
        dpi: f64,
        flags: RenderFlags,
    ) -> Result<RawImage, DocumentError>;
}
