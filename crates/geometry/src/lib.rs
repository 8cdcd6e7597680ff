//! Typed coordinates shared by the window system core and its backends.
//!
//! Two coordinate spaces matter to a window system: screen coordinates (what
//! window positions, content-area sizes and cursor positions are measured in)
//! and framebuffer pixels (what a rendering context actually draws into). They
//! differ whenever the content scale is not 1.0, so they are kept as distinct
//! unit types to stop one being passed where the other is expected.

use std::ops::{Add, Div, Sub};

use euclid::num::One;
pub use euclid::{Point2D as Point, Size2D as Extent, Vector2D as Offset};

/// Framebuffer pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Px();

/// Virtual screen coordinates. These are not necessarily physical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenPx();

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect<T, U>(euclid::Box2D<T, U>);

impl<T, U> Rect<T, U> {
    pub fn new(origin: Point<T, U>, extent: Extent<T, U>) -> Self
    where
        T: Copy + Add<T, Output = T>,
    {
        Self(euclid::Box2D::from_origin_and_size(origin, extent))
    }

    pub fn top_left(&self) -> Point<T, U>
    where
        T: Copy,
    {
        self.0.min
    }

    pub fn bottom_right(&self) -> Point<T, U>
    where
        T: Copy,
    {
        self.0.max
    }

    pub fn extent(&self) -> Extent<T, U>
    where
        T: Copy + Sub<T, Output = T>,
    {
        self.0.size()
    }

    pub fn center(&self) -> Point<T, U>
    where
        T: Copy + One + Add<Output = T> + Div<Output = T>,
    {
        self.0.center()
    }

    /// Returns true if the point lies inside the rectangle. The right and
    /// bottom edges are exclusive.
    pub fn contains(&self, point: Point<T, U>) -> bool
    where
        T: Copy + PartialOrd,
    {
        self.0.contains(point)
    }

    /// Moves the point to the nearest position within the rectangle, edges
    /// included.
    pub fn clamp(&self, point: Point<T, U>) -> Point<T, U>
    where
        T: Copy + PartialOrd,
    {
        let clamp = |v: T, lo: T, hi: T| {
            if v < lo {
                lo
            } else if v > hi {
                hi
            } else {
                v
            }
        };

        Point::new(
            clamp(point.x, self.0.min.x, self.0.max.x),
            clamp(point.y, self.0.min.y, self.0.max.y),
        )
    }
}

/// Converts a content-area size into framebuffer pixels for a given content
/// scale, rounding to the nearest pixel.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_framebuffer(size: Extent<i32, ScreenPx>, scale: (f32, f32)) -> Extent<i32, Px> {
    Extent::new(
        (size.width as f32 * scale.0).round() as i32,
        (size.height as f32 * scale.1).round() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_to_rect() {
        let rect = Rect::<f64, ScreenPx>::new(Point::new(0.0, 0.0), Extent::new(640.0, 480.0));

        assert_eq!(rect.clamp(Point::new(-5.0, 10.0)), Point::new(0.0, 10.0));
        assert_eq!(rect.clamp(Point::new(700.0, 900.0)), Point::new(640.0, 480.0));
        assert_eq!(rect.center(), Point::new(320.0, 240.0));
        assert!(rect.contains(Point::new(0.0, 0.0)));
        assert!(!rect.contains(Point::new(640.0, 0.0)));
    }

    #[test]
    fn framebuffer_scaling() {
        let size = Extent::<i32, ScreenPx>::new(800, 600);
        assert_eq!(to_framebuffer(size, (2.0, 2.0)), Extent::new(1600, 1200));
        assert_eq!(to_framebuffer(size, (1.25, 1.25)), Extent::new(1000, 750));
    }
}
