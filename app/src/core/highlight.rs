//! Search-result highlighting.
//!
//! Regions are given in document space: points, origin at the bottom left of
//! the crop box, y pointing up. Bitmaps use pixel space: origin at the top
//! left, y pointing down. The crop box height is the reference for flipping
//! the vertical axis.

use nalgebra::{point, vector};
use tracing::trace;

use crate::types::{Bounds, Rect};

use super::render::{Color, PageBitmap};

/// Default highlight fill.
pub const HIGHLIGHT_COLOR: Color = Color::new_rgba(1, 133, 204, 128);

/// Rectangle to highlight, in document space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightRegion {
    pub page_index: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl HighlightRegion {
    pub fn new(page_index: usize, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            page_index,
            x,
            y,
            width,
            height,
        }
    }

    pub fn rect(&self) -> Rect<f64> {
        Rect::new(point![self.x, self.y], vector![self.width, self.height])
    }
}

/// Provider of the current set of highlight regions, e.g. a search session.
pub trait HighlightSource {
    fn current_highlight_regions(&self) -> Vec<HighlightRegion>;
}

impl HighlightSource for [HighlightRegion] {
    fn current_highlight_regions(&self) -> Vec<HighlightRegion> {
        self.to_vec()
    }
}

impl HighlightSource for Vec<HighlightRegion> {
    fn current_highlight_regions(&self) -> Vec<HighlightRegion> {
        self.clone()
    }
}

/// Map a document-space rectangle to pixel space.
pub fn document_to_pixel(rect: &Rect<f64>, crop_height: f64, dpi: f64) -> Rect<f64> {
    let scale = dpi / 72.0;

    Rect::new(
        point![
            rect.offs.x * scale,
            (crop_height - rect.offs.y - rect.size.y) * scale
        ],
        rect.size * scale,
    )
}

/// Map a pixel-space rectangle back to document space. Inverse of
/// [`document_to_pixel()`].
pub fn pixel_to_document(rect: &Rect<f64>, crop_height: f64, dpi: f64) -> Rect<f64> {
    let scale = dpi / 72.0;
    let size = rect.size / scale;

    Rect::new(
        point![rect.offs.x / scale, crop_height - rect.offs.y / scale - size.y],
        size,
    )
}

/// Draws highlight regions onto page bitmaps.
#[derive(Debug, Clone)]
pub struct HighlightCompositor {
    color: Color,
}

impl HighlightCompositor {
    pub fn new(color: Color) -> Self {
        Self { color }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Composite all regions belonging to `page_index` onto a copy of
    /// `bitmap`, in order. The source bitmap is left untouched.
    pub fn composite(
        &self,
        bitmap: &PageBitmap,
        page_index: usize,
        crop_height: f64,
        regions: &[HighlightRegion],
    ) -> PageBitmap {
        let mut regions = regions
            .iter()
            .filter(|r| r.page_index == page_index)
            .peekable();

        // nothing to draw: share the pixels of the source
        if regions.peek().is_none() {
            return bitmap.clone();
        }

        let frame = Bounds::pixel_frame(bitmap.width(), bitmap.height());

        let stride = bitmap.stride() as usize;
        let mut buffer = bitmap.pixels().to_vec();
        let mut drawn = 0;

        for region in regions {
            let rect = document_to_pixel(&region.rect(), crop_height, bitmap.dpi());
            let area = rect.bounds().to_pixels().clip(&frame);

            if area.is_empty() {
                continue;
            }

            for (y, x) in area.range_iter() {
                let i = y as usize * stride + x as usize * 4;
                let px = &mut buffer[i..i + 4];

                let dst = Color::new_rgba(px[0], px[1], px[2], px[3]);
                px.copy_from_slice(&self.color.over(dst).to_rgba());
            }

            drawn += 1;
        }

        trace!(page = page_index, regions = drawn, "composited highlights");

        PageBitmap::from_rgba(bitmap.width(), bitmap.height(), bitmap.dpi(), buffer)
            .expect("buffer copied from a valid bitmap")
    }
}

impl Default for HighlightCompositor {
    fn default() -> Self {
        Self::new(HIGHLIGHT_COLOR)
    }
}
