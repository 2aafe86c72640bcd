//! Geometric primitives for network layout.
//!
//! Coordinates are `f64` because raw inputs are geographic (degrees) and the
//! pipeline's degenerate-extent checks work at the 1e-6 scale.

use serde::{Deserialize, Serialize};

/// Bounding-box extents below this are considered degenerate: normalizing by
/// such a range would amplify floating-point noise into the layout.
pub const EXTENT_EPSILON: f64 = 1e-6;

/// Triangle areas at or below this count as collinear.
pub const AREA_EPSILON: f64 = 1e-9;

/// A 2D point or displacement vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    x: f64,
    y: f64,
}

impl Point {
    /// Creates a new point with the specified coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Builds a displacement vector from an angle (radians) and length.
    pub fn from_polar(angle: f64, length: f64) -> Self {
        Self {
            x: angle.cos() * length,
            y: angle.sin() * length,
        }
    }

    /// Returns the x-coordinate of the point.
    pub fn x(self) -> f64 {
        self.x
    }

    /// Returns the y-coordinate of the point.
    pub fn y(self) -> f64 {
        self.y
    }

    /// Checks that both coordinates are finite (no NaN or infinity).
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Adds another point to this point, returning a new point.
    pub fn add(self, other: Point) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    /// Subtracts another point from this point, returning a new point.
    pub fn sub(self, other: Point) -> Self {
        Self {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    /// Multiplies both coordinates by the given factor.
    pub fn scale(self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
        }
    }

    /// Calculates the midpoint between this point and another point.
    pub fn midpoint(self, other: Point) -> Self {
        Self {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// Length of this point interpreted as a vector from the origin.
    pub fn hypot(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point.
    pub fn distance(self, other: Point) -> f64 {
        other.sub(self).hypot()
    }

    /// Direction from this point to another, in radians.
    pub fn angle_to(self, other: Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// Clamps both coordinates to the unit interval [0, 1].
    pub fn clamp_unit(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }

    /// Rounds both coordinates to the nearest multiple of `cell`.
    pub fn snap_to_grid(self, cell: f64) -> Self {
        Self {
            x: (self.x / cell).round() * cell,
            y: (self.y / cell).round() * cell,
        }
    }

    /// Converts to the `[x, y]` array form used by spatial indexing.
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }
}

/// Rounds an angle (radians) to the nearest multiple of `step` (radians).
pub fn snap_angle(angle: f64, step: f64) -> f64 {
    (angle / step).round() * step
}

/// Twice-signed-area-based absolute triangle area; zero means collinear.
pub fn triangle_area(a: Point, b: Point, c: Point) -> f64 {
    ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() / 2.0
}

/// Axis-aligned bounding box over a set of points.
#[derive(Debug, Clone, Copy)]
pub struct Bounds {
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
}

impl Bounds {
    /// Computes the bounding box of the given points.
    ///
    /// Non-finite points are ignored; returns `None` when no finite point
    /// remains.
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for point in points {
            if !point.is_finite() {
                continue;
            }
            bounds = Some(match bounds {
                None => Bounds {
                    min_x: point.x,
                    min_y: point.y,
                    max_x: point.x,
                    max_y: point.y,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(point.x),
                    min_y: b.min_y.min(point.y),
                    max_x: b.max_x.max(point.x),
                    max_y: b.max_y.max(point.y),
                },
            });
        }
        bounds
    }

    /// Returns the minimum corner of the bounds.
    pub fn min_point(self) -> Point {
        Point {
            x: self.min_x,
            y: self.min_y,
        }
    }

    /// Returns the width of the bounds.
    pub fn width(self) -> f64 {
        self.max_x - self.min_x
    }

    /// Returns the height of the bounds.
    pub fn height(self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when either extent is too small to normalize against.
    pub fn is_degenerate(self, epsilon: f64) -> bool {
        self.width() < epsilon || self.height() < epsilon
    }
}
