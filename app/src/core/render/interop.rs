use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new_rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::new_rgb(255, 255, 255);
    pub const BLACK: Color = Color::new_rgb(0, 0, 0);

    pub const fn new_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn new_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Composite this color over `dst` using straight-alpha source-over
    /// blending.
    pub fn over(self, dst: Color) -> Color {
        let a = self.a as u32;
        let inv = 255 - a;

        let mix = |s: u8, d: u8| ((s as u32 * a + d as u32 * inv + 127) / 255) as u8;

        Color {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: (a + (dst.a as u32 * inv + 127) / 255) as u8,
        }
    }

    /// Luma of this color (ITU-R BT.601), alpha is kept.
    pub fn grayscale(self) -> Color {
        let l = (self.r as u32 * 299 + self.g as u32 * 587 + self.b as u32 * 114 + 500) / 1000;
        let l = l as u8;

        Color::new_rgba(l, l, l, self.a)
    }

    pub(crate) fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Pixel layout of raw raster data handed out by a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitmapFormat {
    Gray,
    Bgr,
    Bgrx,
    Bgra,
    Rgba,
}

impl BitmapFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            BitmapFormat::Gray => 1,
            BitmapFormat::Bgr => 3,
            BitmapFormat::Bgrx => 4,
            BitmapFormat::Bgra => 4,
            BitmapFormat::Rgba => 4,
        }
    }

    pub(crate) fn read(&self, px: &[u8]) -> Color {
        match self {
            BitmapFormat::Gray => Color::new_rgb(px[0], px[0], px[0]),
            BitmapFormat::Bgr => Color::new_rgb(px[2], px[1], px[0]),
            BitmapFormat::Bgrx => Color::new_rgb(px[2], px[1], px[0]),
            BitmapFormat::Bgra => Color::new_rgba(px[2], px[1], px[0], px[3]),
            BitmapFormat::Rgba => Color::new_rgba(px[0], px[1], px[2], px[3]),
        }
    }
}

/// Raster output of a document, before decoding.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    pub format: BitmapFormat,
    pub data: Vec<u8>,
}

/// Immutable RGBA page raster.
///
/// The pixel buffer is shared between clones, so handing out copies of a
/// published bitmap is cheap. There is no way to mutate a bitmap in place,
/// compositing always produces a new one.
#[derive(Clone, PartialEq)]
pub struct PageBitmap {
    width: u32,
    height: u32,
    dpi: f64,
    buffer: Arc<[u8]>,
}

impl PageBitmap {
    /// Wrap a tightly packed RGBA buffer.
    ///
    /// Returns `None` if the buffer size does not match the dimensions.
    pub fn from_rgba(width: u32, height: u32, dpi: f64, buffer: Vec<u8>) -> Option<Self> {
        if buffer.len() != width as usize * height as usize * 4 {
            return None;
        }

        Some(Self {
            width,
            height,
            dpi,
            buffer: buffer.into(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.width * 4
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    pub fn pixels(&self) -> &[u8] {
        &self.buffer
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let i = y as usize * self.stride() as usize + x as usize * 4;
        let px = &self.buffer[i..i + 4];

        Some(Color::new_rgba(px[0], px[1], px[2], px[3]))
    }

    /// Whether both bitmaps share the same pixel storage.
    pub fn shares_pixels(&self, other: &PageBitmap) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

impl fmt::Debug for PageBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageBitmap")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dpi", &self.dpi)
            .finish_non_exhaustive()
    }
}
