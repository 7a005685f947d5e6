use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use nalgebra::{point, vector, Vector2};

use crate::core::highlight::document_to_pixel;
use crate::core::render::{BitmapFormat, Color, RawImage, RenderFlags};
use crate::error::DocumentError;
use crate::types::{Bounds, Rect};

use super::Document;

/// Page of a [`MemoryDocument`].
#[derive(Debug, Clone)]
pub struct MemoryPage {
    /// Crop box size in points.
    pub size: Vector2<f64>,

    /// Paper color.
    pub fill: Color,

    /// Opaque boxes drawn on the page, in document space.
    pub ink: Vec<Rect<f64>>,

    /// Fail rasterization as if the content stream were broken.
    pub malformed: bool,

    /// Artificial rasterization latency.
    pub delay: Option<Duration>,
}

impl MemoryPage {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            size: vector![width, height],
            fill: Color::WHITE,
            ink: Vec::new(),
            malformed: false,
            delay: None,
        }
    }

    pub fn with_fill(mut self, fill: Color) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_ink(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.ink.push(Rect::new(point![x, y], vector![width, height]));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn malformed(mut self) -> Self {
        self.malformed = true;
        self
    }
}

/// In-memory document with simple synthetic page content.
///
/// Pages are rasterized to BGRA, matching what native rasterizers typically
/// hand out.
#[derive(Debug)]
pub struct MemoryDocument {
    pages: Vec<MemoryPage>,
    renders: AtomicUsize,
}

impl MemoryDocument {
    pub fn new(pages: Vec<MemoryPage>) -> Self {
        Self {
            pages,
            renders: AtomicUsize::new(0),
        }
    }

    /// Document with `count` pages of the same size. Every page gets its own
    /// paper color and a few lines of "text".
    pub fn uniform(count: usize, width: f64, height: f64) -> Self {
        let pages = (0..count)
            .map(|i| {
                let mut page = MemoryPage::new(width, height).with_fill(Self::page_color(i));

                let mut y = height - 72.0 - 12.0;
                while y > 72.0 {
                    page = page.with_ink(72.0, y, width - 144.0, 8.0);
                    y -= 18.0;
                }

                page
            })
            .collect();

        Self::new(pages)
    }

    /// Paper color used by [`uniform()`][Self::uniform()] for the given page.
    pub fn page_color(index: usize) -> Color {
        let i = index as u32;
        Color::new_rgb(
            (255 - (i * 37) % 64) as u8,
            (255 - (i * 53) % 64) as u8,
            (255 - (i * 17) % 64) as u8,
        )
    }

    /// Number of rasterizations performed so far.
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn pages(&self) -> &[MemoryPage] {
        &self.pages
    }
}

impl Document for MemoryDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn crop_height(&self, page_index: usize) -> Option<f64> {
        self.pages.get(page_index).map(|p| p.size.y)
    }

    fn render_raw(
        &self,
        page_index: usize,
        dpi: f64,
        _flags: RenderFlags,
    ) -> Result<RawImage, DocumentError> {
        let page = self.pages.get(page_index).ok_or(DocumentError::Page)?;

        self.renders.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = page.delay {
            std::thread::sleep(delay);
        }

        if page.malformed {
            return Err(DocumentError::Malformed(format!(
                "unterminated content stream on page {page_index}"
            )));
        }

        let scale = dpi / 72.0;
        let width = (page.size.x * scale).round() as u32;
        let height = (page.size.y * scale).round() as u32;
        let stride = width * 4;

        let paper = [page.fill.b, page.fill.g, page.fill.r, page.fill.a];
        let mut data = paper.repeat(width as usize * height as usize);

        let frame = Bounds::pixel_frame(width, height);

        for ink in &page.ink {
            let rect = document_to_pixel(ink, page.size.y, dpi).bounds();
            let rect = rect.to_pixels().clip(&frame);

            for (y, x) in rect.range_iter() {
                let i = y as usize * stride as usize + x as usize * 4;
                data[i..i + 4].copy_from_slice(&[0x20, 0x20, 0x20, 0xff]);
            }
        }

        Ok(RawImage {
            width,
            height,
            stride,
            format: BitmapFormat::Bgra,
            data,
        })
    }
}
