//! Screen space <-> document space conversion.
//!
//! Screen coordinates are rendered pixels and depend on the zoom scale.
//! Document coordinates are scale-independent and are the only form that is
//! ever persisted.
//!
//! ```text
//! document = (screen - origin) / scale
//! screen   = document * scale + origin
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Inclusive containment on all four edges.
    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x
            && p.x <= self.x + self.width
            && p.y >= self.y
            && p.y <= self.y + self.height
    }

    /// Area overlap; rectangles that only share an edge do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// A rectangle can back a committed field only with a non-negative
    /// origin and a strictly positive size.
    pub fn is_committable(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }
}

fn check_scale(scale: f64) -> Result<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidScale(scale))
    }
}

pub fn to_document_space(screen: Point, scale: f64, origin: Point) -> Result<Point> {
    check_scale(scale)?;
    Ok(Point::new(
        (screen.x - origin.x) / scale,
        (screen.y - origin.y) / scale,
    ))
}

pub fn to_screen_space(document: Point, scale: f64, origin: Point) -> Result<Point> {
    check_scale(scale)?;
    Ok(Point::new(
        document.x * scale + origin.x,
        document.y * scale + origin.y,
    ))
}

/// Map a screen rectangle (e.g. a selection bounding box) to document space.
pub fn rect_to_document_space(screen: Rect, scale: f64, origin: Point) -> Result<Rect> {
    let corner = to_document_space(screen.top_left(), scale, origin)?;
    Ok(Rect::new(
        corner.x,
        corner.y,
        screen.width / scale,
        screen.height / scale,
    ))
}

/// Map a document rectangle to screen space for drawing overlays.
pub fn rect_to_screen_space(document: Rect, scale: f64, origin: Point) -> Result<Rect> {
    let corner = to_screen_space(document.top_left(), scale, origin)?;
    Ok(Rect::new(
        corner.x,
        corner.y,
        document.width * scale,
        document.height * scale,
    ))
}
