use itertools::Itertools;
use tracing::trace;

use crate::error::RenderError;
use crate::pdf::Document;

use super::interop::{Color, PageBitmap, RawImage};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct RenderFlags: u32 {
        /// Render annotations
        const ANNOTATIONS = 1 << 0;

        /// Use text rendering optimized for LCD displays.
        const LCD_TEXT = 1 << 1;

        /// Grayscale output. Applied by the renderer after rasterization,
        /// so documents are free to ignore it.
        const GRAYSCALE = 1 << 2;

        /// Disable anti-aliasing on text.
        const NO_SMOOTH_TEXT = 1 << 3;

        /// Disable anti-aliasing on images.
        const NO_SMOOTH_IMAGE = 1 << 4;

        /// Disable anti-aliasing on paths.
        const NO_SMOOTH_PATH = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    pub flags: RenderFlags,
    pub background: Color,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            flags: RenderFlags::ANNOTATIONS | RenderFlags::LCD_TEXT,
            background: Color::WHITE,
        }
    }
}

/// Description of a bitmap needed for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRequest {
    pub page_index: usize,
    pub target_dpi: f64,
}

/// Successfully rendered page, together with what is needed to map document
/// coordinates onto it.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub request: RenderRequest,
    pub bitmap: PageBitmap,
    pub crop_height: f64,
}

/// Rasterizes document pages into [`PageBitmap`]s.
#[derive(Debug, Clone, Default)]
pub struct PageRenderer {
    opts: RenderOptions,
}

impl PageRenderer {
    pub fn new(opts: RenderOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.opts
    }

    /// Render a single page at the given resolution.
    pub fn render(
        &self,
        document: &dyn Document,
        page_index: usize,
        target_dpi: f64,
    ) -> Result<PageBitmap, RenderError> {
        let count = document.page_count();
        if page_index >= count {
            return Err(RenderError::PageOutOfRange {
                index: page_index,
                count,
            });
        }

        if !target_dpi.is_finite() || target_dpi <= 0.0 {
            return Err(RenderError::InvalidResolution(target_dpi));
        }

        let raw = document
            .render_raw(page_index, target_dpi, self.opts.flags)
            .map_err(|source| RenderError::Rasterize {
                page: page_index,
                source,
            })?;

        trace!(
            page = page_index,
            dpi = target_dpi,
            width = raw.width,
            height = raw.height,
            format = ?raw.format,
            "decoding raster"
        );

        self.decode(page_index, target_dpi, &raw)
    }

    /// Render the page described by `request` and resolve its crop box.
    pub fn render_page(
        &self,
        document: &dyn Document,
        request: RenderRequest,
    ) -> Result<RenderedPage, RenderError> {
        let bitmap = self.render(document, request.page_index, request.target_dpi)?;

        let crop_height =
            document
                .crop_height(request.page_index)
                .ok_or(RenderError::PageOutOfRange {
                    index: request.page_index,
                    count: document.page_count(),
                })?;

        Ok(RenderedPage {
            request,
            bitmap,
            crop_height,
        })
    }

    fn decode(&self, page: usize, dpi: f64, raw: &RawImage) -> Result<PageBitmap, RenderError> {
        let fail = |reason: &str| RenderError::Decode {
            page,
            reason: reason.to_owned(),
        };

        if raw.width == 0 || raw.height == 0 {
            return Err(fail("empty raster"));
        }

        let bpp = raw.format.bytes_per_pixel();
        let row_len = raw.width as usize * bpp;
        let stride = raw.stride as usize;

        if stride < row_len {
            return Err(fail("stride shorter than a row"));
        }

        // the last row does not need to be padded to the full stride
        let required = stride * (raw.height as usize - 1) + row_len;
        if raw.data.len() < required {
            return Err(fail("truncated pixel data"));
        }

        let grayscale = self.opts.flags.contains(RenderFlags::GRAYSCALE);
        let background = self.opts.background;

        let mut buffer = Vec::with_capacity(raw.width as usize * raw.height as usize * 4);

        for (y, x) in (0..raw.height as usize).cartesian_product(0..raw.width as usize) {
            let i = y * stride + x * bpp;
            let mut color = raw.format.read(&raw.data[i..i + bpp]);

            if color.a < 255 {
                color = color.over(background);
            }

            if grayscale {
                color = color.grayscale();
            }

            buffer.extend_from_slice(&color.to_rgba());
        }

        PageBitmap::from_rgba(raw.width, raw.height, dpi, buffer)
            .ok_or_else(|| fail("pixel buffer size mismatch"))
    }
}
