use crate::core::highlight::HIGHLIGHT_COLOR;
use crate::core::render::{Color, RenderOptions};
use crate::error::ConfigError;

/// Viewport configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Smallest allowed zoom scale.
    pub scale_min: f64,

    /// Largest allowed zoom scale.
    pub scale_max: f64,

    /// Zoom factor per wheel unit is `exp(delta * zoom_intensity)`.
    pub zoom_intensity: f64,

    /// Resolution at which pages are rasterized.
    pub dpi: f64,

    /// Fill used for search-result highlights.
    pub highlight_color: Color,

    /// Rasterization options.
    pub render: RenderOptions,

    /// Number of render threads. Zero renders on the calling thread.
    pub render_threads: u32,

    /// Render the next page in the background after the current one.
    pub prefetch: bool,

    /// Fit the page to the viewport height at scale 1.0. Otherwise one
    /// bitmap pixel maps to one screen pixel.
    pub fit_height: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (min, max) = (self.scale_min, self.scale_max);

        if !(min.is_finite() && max.is_finite() && min > 0.0 && min <= max) {
            return Err(ConfigError::ScaleBounds { min, max });
        }

        if !self.zoom_intensity.is_finite() || self.zoom_intensity <= 0.0 {
            return Err(ConfigError::ZoomIntensity(self.zoom_intensity));
        }

        if !self.dpi.is_finite() || self.dpi <= 0.0 {
            return Err(ConfigError::Resolution(self.dpi));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale_min: 0.1,
            scale_max: 10.0,
            zoom_intensity: 0.02,
            dpi: 144.0,
            highlight_color: HIGHLIGHT_COLOR,
            render: RenderOptions::default(),
            render_threads: 1,
            prefetch: true,
            fit_height: true,
        }
    }
}
