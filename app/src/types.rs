use std::ops::{Add, Range};

use itertools::{Itertools, Product};
use nalgebra::{Point2, Scalar, Vector2};
use num_traits::Float;

/// Axis-aligned box given by its edges. Minimum edges are inclusive, maximum
/// edges exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds<T> {
    pub x_min: T,
    pub y_min: T,
    pub x_max: T,
    pub y_max: T,
}

impl<T> Bounds<T> {
    pub fn range_x(&self) -> Range<T>
    where
        T: Copy,
    {
        (self.x_min)..(self.x_max)
    }

    pub fn range_y(&self) -> Range<T>
    where
        T: Copy,
    {
        (self.y_min)..(self.y_max)
    }

    /// Iterate over all integer positions inside the bounds, row by row.
    pub fn range_iter(&self) -> Product<Range<T>, Range<T>>
    where
        T: Copy,
        Range<T>: Iterator<Item = T>,
    {
        self.range_y().cartesian_product(self.range_x())
    }

    pub fn is_empty(&self) -> bool
    where
        T: PartialOrd,
    {
        !(self.x_min < self.x_max && self.y_min < self.y_max)
    }

    /// Intersection of both boxes. Empty if they do not overlap.
    pub fn clip(&self, other: &Bounds<T>) -> Self
    where
        T: Copy,
        T: PartialOrd,
    {
        let min = |a: T, b: T| if a < b { a } else { b };
        let max = |a: T, b: T| if a > b { a } else { b };

        Bounds {
            x_min: max(self.x_min, other.x_min),
            y_min: max(self.y_min, other.y_min),
            x_max: min(self.x_max, other.x_max),
            y_max: min(self.y_max, other.y_max),
        }
    }
}

impl Bounds<i64> {
    /// Pixel area of a `width` by `height` raster.
    pub fn pixel_frame(width: u32, height: u32) -> Self {
        Bounds {
            x_min: 0,
            y_min: 0,
            x_max: width as i64,
            y_max: height as i64,
        }
    }
}

impl<T: Float + Scalar> Bounds<T> {
    /// Snap the edges to the nearest integer positions.
    pub fn round(&self) -> Self {
        Self {
            x_min: self.x_min.round(),
            y_min: self.y_min.round(),
            x_max: self.x_max.round(),
            y_max: self.y_max.round(),
        }
    }

    /// Convert rounded edges to integer pixel bounds. Non-finite edges
    /// saturate.
    pub fn to_pixels(&self) -> Bounds<i64> {
        let round = self.round();
        let conv = |v: T| {
            v.to_i64().unwrap_or(if v > T::zero() {
                i64::MAX
            } else if v < T::zero() {
                i64::MIN
            } else {
                0
            })
        };

        Bounds {
            x_min: conv(round.x_min),
            y_min: conv(round.y_min),
            x_max: conv(round.x_max),
            y_max: conv(round.y_max),
        }
    }
}

/// Rectangle given by its offset and size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<T: Scalar> {
    pub offs: Point2<T>,
    pub size: Vector2<T>,
}

impl<T: Scalar> Rect<T> {
    pub fn new(offs: Point2<T>, size: Vector2<T>) -> Self {
        Self { offs, size }
    }

    pub fn bounds(&self) -> Bounds<T>
    where
        T: Copy,
        T: Add<T, Output = T>,
    {
        Bounds {
            x_min: self.offs.x,
            y_min: self.offs.y,
            x_max: self.offs.x + self.size.x,
            y_max: self.offs.y + self.size.y,
        }
    }
}
