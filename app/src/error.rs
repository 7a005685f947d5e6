use thiserror::Error;

/// Errors reported by a [`Document`][crate::pdf::Document] implementation.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Page not found or content error")]
    Page,

    #[error("File not in PDF format or corrupted")]
    Format,

    #[error("Malformed content stream: {0}")]
    Malformed(String),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Errors raised when producing a page bitmap.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Page index {index} out of range, document has {count} pages")]
    PageOutOfRange { index: usize, count: usize },

    #[error("Invalid render resolution: {0} dpi")]
    InvalidResolution(f64),

    #[error("Failed to rasterize page {page}")]
    Rasterize {
        page: usize,
        #[source]
        source: DocumentError,
    },

    #[error("Invalid raster data for page {page}: {reason}")]
    Decode { page: usize, reason: String },
}

/// Errors raised when validating a [`Config`][crate::config::Config].
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid scale bounds [{min}, {max}]")]
    ScaleBounds { min: f64, max: f64 },

    #[error("Invalid zoom intensity: {0}")]
    ZoomIntensity(f64),

    #[error("Invalid render resolution: {0} dpi")]
    Resolution(f64),
}
