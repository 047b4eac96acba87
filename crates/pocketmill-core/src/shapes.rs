//! Geometric primitives for toolpath computation.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const EPS: f64 = 1e-12;

/// Represents a 2D point with X and Y coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Creates a new point with the given X and Y coordinates.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the distance to another point.
    pub fn distance_to(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A 2D direction vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
}

impl Vector {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Vector from `from` towards `to`.
    pub fn between(from: Point, to: Point) -> Self {
        Self::new(to.x - from.x, to.y - from.y)
    }

    pub fn dot(&self, other: &Vector) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (determinant).
    pub fn det(&self, other: &Vector) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn angle(&self) -> f64 {
        self.y.atan2(self.x)
    }
}

/// Direction of rotation for arcs and mill moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

impl RotationDirection {
    pub fn opposite(&self) -> Self {
        match self {
            RotationDirection::Clockwise => RotationDirection::CounterClockwise,
            RotationDirection::CounterClockwise => RotationDirection::Clockwise,
        }
    }
}

/// Angle swept from `v0` to `v1` in the given rotation direction, in `[0, 2*PI)`.
pub fn angle_between(v0: &Vector, v1: &Vector, dir: RotationDirection) -> f64 {
    let mut angle = v0.det(v1).atan2(v0.dot(v1));
    if angle < 0.0 {
        angle += 2.0 * PI;
    }
    match dir {
        RotationDirection::CounterClockwise => angle,
        RotationDirection::Clockwise => 2.0 * PI - angle,
    }
}

/// A straight line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub p1: Point,
    pub p2: Point,
}

impl Line {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }

    pub fn length(&self) -> f64 {
        self.p1.distance_to(&self.p2)
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        (
            self.p1.x.min(self.p2.x),
            self.p1.y.min(self.p2.y),
            self.p1.x.max(self.p2.x),
            self.p1.y.max(self.p2.y),
        )
    }

    /// Distance from the segment to a point.
    pub fn distance_to_point(&self, pt: &Point) -> f64 {
        self.nearest_point(pt).distance_to(pt)
    }

    /// Closest point on the segment to `pt`.
    pub fn nearest_point(&self, pt: &Point) -> Point {
        let d = Vector::between(self.p1, self.p2);
        let len2 = d.dot(&d);
        if len2 < EPS {
            return self.p1;
        }
        let t = (Vector::between(self.p1, *pt).dot(&d) / len2).clamp(0.0, 1.0);
        Point::new(self.p1.x + d.x * t, self.p1.y + d.y * t)
    }

    /// Tests whether this segment properly crosses `other`.
    ///
    /// Touching at a shared endpoint within `tolerance` does not count as a
    /// crossing.
    pub fn crosses(&self, other: &Line, tolerance: f64) -> bool {
        let d1 = Vector::between(self.p1, self.p2);
        let d2 = Vector::between(other.p1, other.p2);
        let denom = d1.det(&d2);
        if denom.abs() < EPS {
            return false; // parallel or degenerate
        }
        let diff = Vector::between(self.p1, other.p1);
        let t = diff.det(&d2) / denom;
        let u = diff.det(&d1) / denom;
        let t_tol = tolerance / self.length().max(EPS);
        let u_tol = tolerance / other.length().max(EPS);
        t > t_tol && t < 1.0 - t_tol && u > u_tol && u < 1.0 - u_tol
    }
}

/// A circle with a center and radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Point,
    pub radius: f64,
}

impl Circle {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn contains_point(&self, pt: &Point, tolerance: f64) -> bool {
        self.center.distance_to(pt) < self.radius + tolerance
    }

    /// Intersection points of two circle boundaries.
    ///
    /// Returns `None` for disjoint, contained, concentric and tangent
    /// configurations; callers distinguish those cases by center distance.
    pub fn intersect_circle(&self, other: &Circle) -> Option<(Point, Point)> {
        let d = self.center.distance_to(&other.center);
        if d < EPS {
            return None;
        }
        let a = (d * d + self.radius * self.radius - other.radius * other.radius) / (2.0 * d);
        let h2 = self.radius * self.radius - a * a;
        if h2 <= EPS {
            return None;
        }
        let h = h2.sqrt();
        let ux = (other.center.x - self.center.x) / d;
        let uy = (other.center.y - self.center.y) / d;
        let mx = self.center.x + a * ux;
        let my = self.center.y + a * uy;
        Some((
            Point::new(mx + h * uy, my - h * ux),
            Point::new(mx - h * uy, my + h * ux),
        ))
    }

    /// Intersection points of the circle boundary with a line segment,
    /// ordered by the segment parameter.
    pub fn intersect_segment(&self, seg: &Line, tolerance: f64) -> Vec<Point> {
        let d = Vector::between(seg.p1, seg.p2);
        let f = Vector::between(self.center, seg.p1);
        let a = d.dot(&d);
        if a < EPS {
            return Vec::new();
        }
        let b = 2.0 * f.dot(&d);
        let c = f.dot(&f) - self.radius * self.radius;
        let disc = b * b - 4.0 * a * c;
        if disc < 0.0 {
            return Vec::new();
        }
        let sqrt_disc = disc.sqrt();
        let t_tol = tolerance / a.sqrt();
        let mut result = Vec::new();
        let mut push = |t: f64| {
            if t >= -t_tol && t <= 1.0 + t_tol {
                result.push(Point::new(seg.p1.x + d.x * t, seg.p1.y + d.y * t));
            }
        };
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);
        push(t1);
        if t2 - t1 > t_tol {
            push(t2);
        }
        result
    }
}

/// A circular arc from `p1` to `p2` around `center`, swept in direction `dir`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub center: Point,
    pub p1: Point,
    pub p2: Point,
    pub dir: RotationDirection,
}

impl Arc {
    pub fn new(center: Point, p1: Point, p2: Point, dir: RotationDirection) -> Self {
        Self { center, p1, p2, dir }
    }

    /// Builds an arc from a start angle and sweep, both in radians.
    pub fn from_angles(
        center: Point,
        radius: f64,
        start_angle: f64,
        sweep: f64,
        dir: RotationDirection,
    ) -> Self {
        let end_angle = match dir {
            RotationDirection::CounterClockwise => start_angle + sweep,
            RotationDirection::Clockwise => start_angle - sweep,
        };
        let at = |angle: f64| {
            Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            )
        };
        Self::new(center, at(start_angle), at(end_angle), dir)
    }

    pub fn radius(&self) -> f64 {
        self.center.distance_to(&self.p1)
    }

    /// Angular extent of the arc in `[0, 2*PI)`.
    pub fn sweep(&self) -> f64 {
        angle_between(
            &Vector::between(self.center, self.p1),
            &Vector::between(self.center, self.p2),
            self.dir,
        )
    }

    /// Tests whether the direction `v` from the arc center falls inside the
    /// swept angular range.
    pub fn contains_vector(&self, v: &Vector) -> bool {
        let start = Vector::between(self.center, self.p1);
        angle_between(&start, v, self.dir) <= self.sweep() + 1e-9
    }

    /// Point halfway along the arc.
    pub fn midpoint(&self) -> Point {
        let half = self.sweep() / 2.0;
        let start = Vector::between(self.center, self.p1).angle();
        let angle = match self.dir {
            RotationDirection::CounterClockwise => start + half,
            RotationDirection::Clockwise => start - half,
        };
        let r = self.radius();
        Point::new(
            self.center.x + r * angle.cos(),
            self.center.y + r * angle.sin(),
        )
    }

    /// The same arc traversed in the opposite direction.
    pub fn flipped(&self) -> Self {
        Self::new(self.center, self.p2, self.p1, self.dir.opposite())
    }

    /// Intersections of the arc with a circle boundary.
    pub fn intersect_circle(&self, circle: &Circle) -> Vec<Point> {
        let own = Circle::new(self.center, self.radius());
        let Some((a, b)) = own.intersect_circle(circle) else {
            return Vec::new();
        };
        [a, b]
            .into_iter()
            .filter(|p| self.contains_vector(&Vector::between(self.center, *p)))
            .collect()
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    ///
    /// Considers both endpoints plus any axis-extreme circle points the sweep
    /// passes through.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let r = self.radius();
        let mut min_x = self.p1.x.min(self.p2.x);
        let mut min_y = self.p1.y.min(self.p2.y);
        let mut max_x = self.p1.x.max(self.p2.x);
        let mut max_y = self.p1.y.max(self.p2.y);
        let axes = [
            (Vector::new(1.0, 0.0), self.center.x + r, 0),
            (Vector::new(0.0, 1.0), self.center.y + r, 1),
            (Vector::new(-1.0, 0.0), self.center.x - r, 2),
            (Vector::new(0.0, -1.0), self.center.y - r, 3),
        ];
        for (v, extreme, axis) in axes {
            if self.contains_vector(&v) {
                match axis {
                    0 => max_x = max_x.max(extreme),
                    1 => max_y = max_y.max(extreme),
                    2 => min_x = min_x.min(extreme),
                    _ => min_y = min_y.min(extreme),
                }
            }
        }
        (min_x, min_y, max_x, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_angle_between_directions() {
        let v0 = Vector::new(1.0, 0.0);
        let v1 = Vector::new(0.0, 1.0);
        let ccw = angle_between(&v0, &v1, RotationDirection::CounterClockwise);
        let cw = angle_between(&v0, &v1, RotationDirection::Clockwise);
        assert!((ccw - PI / 2.0).abs() < 1e-12);
        assert!((cw - 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_circle_circle_two_points() {
        let a = Circle::new(Point::new(0.0, 0.0), 2.0);
        let b = Circle::new(Point::new(2.0, 0.0), 2.0);
        let (p, q) = a.intersect_circle(&b).unwrap();
        assert!((p.x - 1.0).abs() < 1e-9 && (q.x - 1.0).abs() < 1e-9);
        assert!((p.y + q.y).abs() < 1e-9);
        assert!((p.y.abs() - 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_circle_circle_disjoint_and_contained() {
        let a = Circle::new(Point::new(0.0, 0.0), 1.0);
        let far = Circle::new(Point::new(5.0, 0.0), 1.0);
        let inner = Circle::new(Point::new(0.1, 0.0), 0.2);
        assert!(a.intersect_circle(&far).is_none());
        assert!(a.intersect_circle(&inner).is_none());
    }

    #[test]
    fn test_segment_intersections() {
        let c = Circle::new(Point::new(0.0, 0.0), 1.0);
        let through = Line::new(Point::new(-2.0, 0.0), Point::new(2.0, 0.0));
        let outside = Line::new(Point::new(-2.0, 2.0), Point::new(2.0, 2.0));
        let half = Line::new(Point::new(0.0, 0.0), Point::new(2.0, 0.0));
        assert_eq!(c.intersect_segment(&through, 1e-9).len(), 2);
        assert_eq!(c.intersect_segment(&outside, 1e-9).len(), 0);
        assert_eq!(c.intersect_segment(&half, 1e-9).len(), 1);
    }

    #[test]
    fn test_arc_contains_vector() {
        let arc = Arc::from_angles(
            Point::new(0.0, 0.0),
            1.0,
            0.0,
            PI / 2.0,
            RotationDirection::CounterClockwise,
        );
        assert!(arc.contains_vector(&Vector::new(1.0, 1.0)));
        assert!(!arc.contains_vector(&Vector::new(-1.0, -1.0)));
    }

    #[test]
    fn test_arc_midpoint_and_flip() {
        let arc = Arc::from_angles(
            Point::new(0.0, 0.0),
            2.0,
            0.0,
            PI,
            RotationDirection::CounterClockwise,
        );
        let mid = arc.midpoint();
        assert!((mid.x - 0.0).abs() < 1e-9 && (mid.y - 2.0).abs() < 1e-9);

        let flipped = arc.flipped();
        assert_eq!(flipped.dir, RotationDirection::Clockwise);
        assert!((flipped.sweep() - PI).abs() < 1e-9);
        let fmid = flipped.midpoint();
        assert!((fmid.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_arc_bounding_box() {
        let arc = Arc::from_angles(
            Point::new(0.0, 0.0),
            1.0,
            0.0,
            PI,
            RotationDirection::CounterClockwise,
        );
        let (min_x, min_y, max_x, max_y) = arc.bounding_box();
        assert!((min_x + 1.0).abs() < 1e-9);
        assert!((max_x - 1.0).abs() < 1e-9);
        assert!((min_y - 0.0).abs() < 1e-9);
        assert!((max_y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_segment_crossing() {
        let a = Line::new(Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        let b = Line::new(Point::new(0.0, 10.0), Point::new(10.0, 0.0));
        let c = Line::new(Point::new(20.0, 0.0), Point::new(30.0, 0.0));
        assert!(a.crosses(&b, 1e-6));
        assert!(!a.crosses(&c, 1e-6));
    }
}
