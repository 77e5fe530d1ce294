//! Rectangles.

use cgmath::{Point2, Vector2};

/// A rectangle in integer screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    /// Rectangle origin.
    pub origin: Point2<i32>,

    /// Rectangle size.
    pub size: Vector2<u32>,
}

impl Rect {
    /// Creates a new rectangle.
    pub fn new(origin: Point2<i32>, size: Vector2<u32>) -> Rect {
        Rect { origin, size }
    }

    /// Returns a zero-sized rectangle at the origin.
    pub fn zero() -> Rect {
        Rect {
            origin: Point2::new(0, 0),
            size: Vector2::new(0, 0),
        }
    }

    /// Returns true if the rectangle has no area.
    pub fn is_empty(&self) -> bool {
        self.size.x == 0 || self.size.y == 0
    }

    /// Returns true if the point is inside the rectangle.
    pub fn contains(&self, point: Point2<i32>) -> bool {
        let (x, y) = (i64::from(point.x), i64::from(point.y));
        let (ox, oy) = (i64::from(self.origin.x), i64::from(self.origin.y));
        x >= ox && y >= oy && x < ox + i64::from(self.size.x) && y < oy + i64::from(self.size.y)
    }

    /// Returns a new rectangle with the given origin.
    pub fn with_origin(&self, origin: Point2<i32>) -> Rect {
        Rect {
            origin,
            size: self.size,
        }
    }

    /// Returns the rectangle that sits at the given edge offsets inside a container of the given
    /// size, in the container's coordinate system.
    ///
    /// Dimensions that would end up negative are clamped to zero.
    pub fn inset_in(container: Vector2<u32>, offsets: EdgeOffsets) -> Rect {
        let span = |total: u32, a: i32, b: i32| {
            let len = i64::from(total) - i64::from(a) - i64::from(b);
            len.max(0).min(i64::from(u32::MAX)) as u32
        };

        Rect {
            origin: Point2::new(offsets.left, offsets.top),
            size: Vector2::new(
                span(container.x, offsets.left, offsets.right),
                span(container.y, offsets.top, offsets.bottom),
            ),
        }
    }
}

/// Distances from each edge of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EdgeOffsets {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl EdgeOffsets {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> EdgeOffsets {
        EdgeOffsets {
            left,
            top,
            right,
            bottom,
        }
    }
}

#[test]
fn test_rect_contains() {
    let rect = Rect::new(Point2::new(-5, 10), Vector2::new(10, 4));
    assert!(rect.contains(Point2::new(-5, 10)));
    assert!(rect.contains(Point2::new(4, 13)));
    assert!(!rect.contains(Point2::new(5, 13)), "right edge is exclusive");
    assert!(!rect.contains(Point2::new(0, 14)), "bottom edge is exclusive");
    assert!(Rect::zero().is_empty());
}

#[test]
fn test_rect_inset_in() {
    let rect = Rect::inset_in(Vector2::new(100, 60), EdgeOffsets::new(10, 5, 20, 15));
    assert_eq!(rect.origin, Point2::new(10, 5));
    assert_eq!(rect.size, Vector2::new(70, 40));

    let squashed = Rect::inset_in(Vector2::new(10, 10), EdgeOffsets::new(8, 0, 8, 0));
    assert_eq!(squashed.size, Vector2::new(0, 10), "overlapping offsets clamp to zero");
}
