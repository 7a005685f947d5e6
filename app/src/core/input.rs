use nalgebra::Vector2;

/// Mouse-wheel or touchpad scroll, as delivered by the display surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollEvent {
    /// Scroll amount. Negative `y` scrolls towards the end of the document.
    pub delta: Vector2<f64>,

    /// Pointer position in screen coordinates.
    pub point: Vector2<f64>,

    /// Whether the zoom modifier (Ctrl) is held.
    pub ctrl_held: bool,
}

impl ScrollEvent {
    pub fn new(delta: Vector2<f64>, point: Vector2<f64>, ctrl_held: bool) -> Self {
        Self {
            delta,
            point,
            ctrl_held,
        }
    }
}
