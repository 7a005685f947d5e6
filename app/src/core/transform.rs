//! Zoom and scroll state of the viewport.
//!
//! We have 2 coordinate systems:
//!
//! - Screen coordinates, in pixels relative to the viewport with origin
//!   (0, 0) as its upper left corner.
//!
//! - Content coordinates, in unscaled content pixels with origin (0, 0) as
//!   the upper left corner of the content. The relation between screen and
//!   content coordinates is defined by the scale and the content origin on
//!   screen, which in turn is derived from the scroll fractions.
//!
//! On each axis, content that is larger than the viewport is scrolled: the
//! scroll fraction maps `[0, 1]` onto the scrollable range. Content that fits
//! is centered and its scroll fraction is fixed at `0.5`.

use nalgebra::{vector, Vector2};
use tracing::trace;

/// Scroll fraction used for axes that do not scroll.
pub const CENTERED: f64 = 0.5;

/// Snapshot of the zoom and scroll state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportState {
    pub scale: f64,
    pub scroll_fraction_x: f64,
    pub scroll_fraction_y: f64,
}

/// Something that can be scrolled.
pub trait Scrollable {
    /// Normalized scroll position, `[0, 1]` per axis.
    fn scroll_fraction(&self) -> Vector2<f64>;

    /// Set the normalized scroll position. Values are clamped.
    fn set_scroll_fraction(&mut self, fraction: Vector2<f64>);

    /// Scroll by the given amount of screen pixels.
    fn scroll_by(&mut self, delta: Vector2<f64>);
}

/// Something that can be zoomed.
pub trait Zoomable {
    fn scale(&self) -> f64;

    /// Set the scale, keeping the center of the viewport fixed.
    fn set_scale(&mut self, scale: f64);

    /// Zoom by `exp(wheel_delta * intensity)`, keeping the content under
    /// `point` fixed on screen. Returns `false` if the zoom was rejected.
    fn zoom_at(&mut self, wheel_delta: f64, point: Vector2<f64>, intensity: f64) -> bool;
}

#[derive(Debug, Clone)]
pub struct ViewportTransform {
    scale: f64,
    scale_bounds: (f64, f64),
    fraction: Vector2<f64>,
    content: Vector2<f64>,
    viewport: Vector2<f64>,
}

impl ViewportTransform {
    /// Create a new transform with the given `(min, max)` scale bounds.
    ///
    /// Bounds are expected to be finite with `0 < min <= max`, see
    /// [`Config::validate()`][crate::config::Config::validate()].
    pub fn new(scale_bounds: (f64, f64)) -> Self {
        debug_assert!(scale_bounds.0 > 0.0 && scale_bounds.0 <= scale_bounds.1);

        Self {
            scale: 1.0_f64.clamp(scale_bounds.0, scale_bounds.1),
            scale_bounds,
            fraction: vector![CENTERED, CENTERED],
            content: Vector2::zeros(),
            viewport: Vector2::zeros(),
        }
    }

    pub fn scale_bounds(&self) -> (f64, f64) {
        self.scale_bounds
    }

    pub fn state(&self) -> ViewportState {
        ViewportState {
            scale: self.scale,
            scroll_fraction_x: self.fraction.x,
            scroll_fraction_y: self.fraction.y,
        }
    }

    /// Size of the visible area, in screen pixels.
    pub fn viewport_bounds(&self) -> Vector2<f64> {
        self.viewport
    }

    /// Size of the unscaled content.
    pub fn content_size(&self) -> Vector2<f64> {
        self.content
    }

    /// Size of the content at the current scale, in screen pixels.
    pub fn content_bounds(&self) -> Vector2<f64> {
        self.content * self.scale
    }

    /// Position of the content origin on screen.
    pub fn content_origin(&self) -> Vector2<f64> {
        let range = self.content_bounds() - self.viewport;

        let axis = |range: f64, fraction: f64| {
            if range > 0.0 {
                -fraction * range
            } else {
                -range / 2.0
            }
        };

        vector![axis(range.x, self.fraction.x), axis(range.y, self.fraction.y)]
    }

    pub fn screen_to_content(&self, point: Vector2<f64>) -> Vector2<f64> {
        (point - self.content_origin()) / self.scale
    }

    pub fn content_to_screen(&self, point: Vector2<f64>) -> Vector2<f64> {
        self.content_origin() + point * self.scale
    }

    pub fn resize_viewport(&mut self, width: f64, height: f64) {
        self.viewport = vector![sanitize_len(width), sanitize_len(height)];
        self.fraction = self.clamp_fraction(self.fraction);
    }

    pub fn set_content_size(&mut self, width: f64, height: f64) {
        self.content = vector![sanitize_len(width), sanitize_len(height)];
        self.fraction = self.clamp_fraction(self.fraction);
    }

    /// Reset to 100% scale with centered scroll position.
    pub fn reset(&mut self) {
        self.scale = 1.0_f64.clamp(self.scale_bounds.0, self.scale_bounds.1);
        self.fraction = vector![CENTERED, CENTERED];
    }

    /// Set the scale, keeping the content under `focal_point` fixed on
    /// screen where the scroll range allows it.
    pub fn zoom_with_focus(&mut self, scale: f64, focal_point: Vector2<f64>) -> bool {
        if !scale.is_finite() || scale <= 0.0 {
            trace!(scale, "rejecting zoom to invalid scale");
            return false;
        }

        // calculate fixpoint in content coordinates
        let fixp = self.screen_to_content(focal_point);

        // calculate new scale value
        self.scale = scale.clamp(self.scale_bounds.0, self.scale_bounds.1);

        // calculate content origin that keeps the fixpoint under the focus
        let origin = focal_point - fixp * self.scale;

        // convert back to scroll fractions
        let range = self.content_bounds() - self.viewport;

        let axis = |range: f64, origin: f64| {
            if range > 0.0 {
                (-origin / range).clamp(0.0, 1.0)
            } else {
                CENTERED
            }
        };

        self.fraction = vector![axis(range.x, origin.x), axis(range.y, origin.y)];

        trace!(
            scale = self.scale,
            fx = self.fraction.x,
            fy = self.fraction.y,
            "zoomed viewport"
        );

        true
    }

    fn clamp_fraction(&self, fraction: Vector2<f64>) -> Vector2<f64> {
        let range = self.content_bounds() - self.viewport;

        let axis = |range: f64, fraction: f64| {
            if range > 0.0 && fraction.is_finite() {
                fraction.clamp(0.0, 1.0)
            } else {
                CENTERED
            }
        };

        vector![axis(range.x, fraction.x), axis(range.y, fraction.y)]
    }
}

impl Scrollable for ViewportTransform {
    fn scroll_fraction(&self) -> Vector2<f64> {
        self.fraction
    }

    fn set_scroll_fraction(&mut self, fraction: Vector2<f64>) {
        self.fraction = self.clamp_fraction(fraction);
    }

    fn scroll_by(&mut self, delta: Vector2<f64>) {
        let range = self.content_bounds() - self.viewport;

        let axis = |range: f64, fraction: f64, delta: f64| {
            if range > 0.0 && delta.is_finite() {
                fraction + delta / range
            } else {
                fraction
            }
        };

        let fraction = vector![
            axis(range.x, self.fraction.x, delta.x),
            axis(range.y, self.fraction.y, delta.y)
        ];

        self.fraction = self.clamp_fraction(fraction);
    }
}

impl Zoomable for ViewportTransform {
    fn scale(&self) -> f64 {
        self.scale
    }

    fn set_scale(&mut self, scale: f64) {
        self.zoom_with_focus(scale, self.viewport / 2.0);
    }

    fn zoom_at(&mut self, wheel_delta: f64, point: Vector2<f64>, intensity: f64) -> bool {
        let factor = (wheel_delta * intensity).exp();

        if factor.is_nan() {
            trace!(wheel_delta, intensity, "rejecting zoom with invalid factor");
            return false;
        }

        // saturate at the bounds if the factor over- or underflows
        let scale = self.scale * factor;
        let scale = if scale.is_infinite() {
            self.scale_bounds.1
        } else if scale <= 0.0 {
            self.scale_bounds.0
        } else {
            scale
        };

        self.zoom_with_focus(scale, point)
    }
}

fn sanitize_len(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use proptest::prelude::*;

    fn transform(viewport: (f64, f64), content: (f64, f64)) -> ViewportTransform {
        let mut t = ViewportTransform::new((0.1, 10.0));
        t.resize_viewport(viewport.0, viewport.1);
        t.set_content_size(content.0, content.1);
        t
    }

    #[test]
    fn zoom_anchors_cursor() {
        let mut t = transform((800.0, 600.0), (1600.0, 1200.0));
        t.set_scroll_fraction(vector![0.0, 0.0]);

        let cursor = vector![400.0, 300.0];
        let before = t.screen_to_content(cursor);

        assert!(t.zoom_at(50.0, cursor, 0.02));
        assert!((t.scale() - std::f64::consts::E).abs() < 1e-12);

        let after = t.content_to_screen(before);
        assert!((after - cursor).norm() < 1.0);
        assert!((t.screen_to_content(cursor) - before).norm() < 1e-9);
    }

    #[test]
    fn scale_is_clamped() {
        let mut t = transform((800.0, 600.0), (1600.0, 1200.0));

        t.zoom_at(1e4, vector![0.0, 0.0], 0.02);
        assert_eq!(t.scale(), 10.0);

        t.zoom_at(-1e4, vector![0.0, 0.0], 0.02);
        assert_eq!(t.scale(), 0.1);
    }

    #[test]
    fn invalid_zoom_is_ignored() {
        let mut t = transform((800.0, 600.0), (1600.0, 1200.0));

        assert!(!t.zoom_at(f64::NAN, vector![0.0, 0.0], 0.02));
        assert!(!t.zoom_at(f64::INFINITY, vector![0.0, 0.0], 0.0));
        assert!(!t.zoom_with_focus(0.0, vector![0.0, 0.0]));
        assert_eq!(t.scale(), 1.0);
    }

    #[test]
    fn overflowing_zoom_saturates() {
        let mut t = transform((800.0, 600.0), (1600.0, 1200.0));
        let point = vector![400.0, 300.0];

        assert!(t.zoom_at(40_000.0, point, 0.02));
        assert_eq!(t.scale(), 10.0);

        assert!(t.zoom_at(-40_000.0, point, 0.02));
        assert_eq!(t.scale(), 0.1);

        assert!(t.zoom_at(f64::INFINITY, point, 1.0));
        assert_eq!(t.scale(), 10.0);

        assert!(t.zoom_at(f64::NEG_INFINITY, point, 1.0));
        assert_eq!(t.scale(), 0.1);
    }

    #[test]
    fn small_content_is_centered() {
        let mut t = transform((800.0, 600.0), (400.0, 200.0));
        t.set_scroll_fraction(vector![0.0, 1.0]);

        assert_eq!(t.scroll_fraction(), vector![CENTERED, CENTERED]);
        assert_eq!(t.content_origin(), vector![200.0, 200.0]);

        // wide enough to scroll horizontally after zooming, not vertically
        t.set_scale(2.5);
        assert!(t.content_bounds().x > 800.0);
        assert_eq!(t.scroll_fraction().y, CENTERED);
    }

    #[test]
    fn degenerate_sizes_do_not_divide_by_zero() {
        let mut t = transform((0.0, 0.0), (0.0, 0.0));

        assert!(t.zoom_at(10.0, vector![0.0, 0.0], 0.02));
        t.scroll_by(vector![10.0, 10.0]);
        assert_eq!(t.scroll_fraction(), vector![CENTERED, CENTERED]);

        t.resize_viewport(f64::NAN, -3.0);
        assert_eq!(t.viewport_bounds(), vector![0.0, 0.0]);
        assert!(t.scale().is_finite() && t.scale() > 0.0);
    }

    #[test]
    fn scroll_by_pixels() {
        let mut t = transform((100.0, 100.0), (300.0, 100.0));
        t.set_scroll_fraction(vector![0.0, 0.0]);

        t.scroll_by(vector![50.0, 50.0]);
        assert_eq!(t.scroll_fraction(), vector![0.25, CENTERED]);
        assert_eq!(t.content_origin(), vector![-50.0, 0.0]);

        t.scroll_by(vector![1000.0, 0.0]);
        assert_eq!(t.scroll_fraction().x, 1.0);
    }

    #[test]
    fn resize_reclamps() {
        let mut t = transform((100.0, 100.0), (300.0, 300.0));
        t.set_scroll_fraction(vector![0.8, 0.2]);

        t.resize_viewport(400.0, 100.0);
        assert_eq!(t.scroll_fraction(), vector![CENTERED, 0.2]);
    }

    #[test]
    fn reset_restores_defaults() {
        let mut t = transform((100.0, 100.0), (300.0, 300.0));
        t.zoom_at(30.0, vector![10.0, 10.0], 0.02);
        t.reset();

        assert_eq!(
            t.state(),
            ViewportState {
                scale: 1.0,
                scroll_fraction_x: CENTERED,
                scroll_fraction_y: CENTERED,
            }
        );
    }

    proptest! {
        #[test]
        fn zoom_in_keeps_anchor(
            vw in 100.0f64..2000.0,
            vh in 100.0f64..2000.0,
            cw in 1.01f64..4.0,
            ch in 1.01f64..4.0,
            fx in 0.0f64..=1.0,
            fy in 0.0f64..=1.0,
            px in 0.0f64..=1.0,
            py in 0.0f64..=1.0,
            delta in 0.0f64..300.0,
        ) {
            // content larger than the viewport: zooming in never runs out of
            // scroll range, so the anchor must hold exactly
            let mut t = ViewportTransform::new((0.1, 50.0));
            t.resize_viewport(vw, vh);
            t.set_content_size(vw * cw, vh * ch);
            t.set_scroll_fraction(vector![fx, fy]);

            let cursor = vector![px * vw, py * vh];
            let before = t.screen_to_content(cursor);

            prop_assert!(t.zoom_at(delta, cursor, 0.02));

            let after = t.content_to_screen(before);
            prop_assert!((after - cursor).norm() < 1e-6 * (1.0 + vw + vh) * t.scale());
        }

        #[test]
        fn scale_stays_in_bounds(
            deltas in proptest::collection::vec(-1e3f64..1e3, 1..50),
            intensity in 0.001f64..1.0,
        ) {
            let mut t = transform((800.0, 600.0), (1600.0, 1200.0));

            for delta in deltas {
                t.zoom_at(delta, vector![400.0, 300.0], intensity);

                let (min, max) = t.scale_bounds();
                prop_assert!(t.scale().is_finite());
                prop_assert!(min <= t.scale() && t.scale() <= max);
                prop_assert!((0.0..=1.0).contains(&t.scroll_fraction().x));
                prop_assert!((0.0..=1.0).contains(&t.scroll_fraction().y));
            }
        }
    }
}
