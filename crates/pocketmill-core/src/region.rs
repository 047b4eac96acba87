//! Closed curves and machining regions.
//!
//! A [`Region`] is one outer closed contour plus zero or more island contours
//! describing material to leave standing. Islands are assumed to lie inside
//! the outline without overlapping each other or the boundary; this is not
//! actively enforced.

use crate::shapes::{Line, Point};
use cavalier_contours::core::math::Vector2;
use cavalier_contours::polyline::{PlineSource, PlineSourceMut, PlineVertex, Polyline};
use thiserror::Error;

/// Errors raised while building region geometry.
#[derive(Error, Debug)]
pub enum RegionError {
    /// A contour collapsed to fewer than 3 distinct vertices.
    #[error("contour needs at least 3 distinct vertices, got {0}")]
    DegenerateContour(usize),
}

/// A closed polygonal curve.
#[derive(Debug, Clone)]
pub struct Contour {
    polyline: Polyline<f64>,
}

impl Contour {
    /// Builds a closed contour from a vertex loop.
    ///
    /// Consecutive duplicate vertices and a repeated closing vertex are
    /// dropped. Either winding orientation is accepted.
    pub fn new(points: &[Point]) -> Result<Self, RegionError> {
        const DUP_TOLERANCE: f64 = 1e-9;

        let mut clean: Vec<Point> = Vec::with_capacity(points.len());
        for p in points {
            if let Some(last) = clean.last() {
                if last.distance_to(p) <= DUP_TOLERANCE {
                    continue;
                }
            }
            clean.push(*p);
        }
        if clean.len() > 1 && clean[0].distance_to(clean.last().unwrap()) <= DUP_TOLERANCE {
            clean.pop();
        }
        if clean.len() < 3 {
            return Err(RegionError::DegenerateContour(clean.len()));
        }

        let mut polyline = Polyline::new();
        for p in &clean {
            polyline.add_vertex(PlineVertex::new(p.x, p.y, 0.0));
        }
        polyline.set_is_closed(true);
        Ok(Self { polyline })
    }

    /// Axis-aligned rectangle helper.
    pub fn rectangle(x: f64, y: f64, width: f64, height: f64) -> Result<Self, RegionError> {
        Self::new(&[
            Point::new(x, y),
            Point::new(x + width, y),
            Point::new(x + width, y + height),
            Point::new(x, y + height),
        ])
    }

    pub fn vertex_count(&self) -> usize {
        self.polyline.vertex_data.len()
    }

    /// Contour vertices in order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.polyline
            .vertex_data
            .iter()
            .map(|v| Point::new(v.x, v.y))
    }

    /// Edges of the contour, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = Line> + '_ {
        let n = self.vertex_count();
        (0..n).map(move |i| {
            let a = &self.polyline.vertex_data[i];
            let b = &self.polyline.vertex_data[(i + 1) % n];
            Line::new(Point::new(a.x, a.y), Point::new(b.x, b.y))
        })
    }

    /// Total boundary length.
    pub fn perimeter(&self) -> f64 {
        self.polyline.path_length()
    }

    /// Point-in-contour test via winding number.
    pub fn contains_point(&self, pt: &Point) -> bool {
        self.polyline.winding_number(Vector2::new(pt.x, pt.y)) != 0
    }

    /// Axis-aligned bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for v in &self.polyline.vertex_data {
            min_x = min_x.min(v.x);
            min_y = min_y.min(v.y);
            max_x = max_x.max(v.x);
            max_y = max_y.max(v.y);
        }
        (min_x, min_y, max_x, max_y)
    }

    /// Tests whether `seg` properly crosses any contour edge.
    pub fn crossed_by(&self, seg: &Line, tolerance: f64) -> bool {
        self.edges().any(|edge| seg.crosses(&edge, tolerance))
    }

    /// Divides the contour evenly into `ceil(perimeter / step)` segments and
    /// returns the segment start points.
    pub fn sample_evenly(&self, step: f64) -> Vec<Point> {
        let perimeter = self.perimeter();
        let nsegs = ((perimeter / step).ceil() as usize).max(1);
        let interval = perimeter / nsegs as f64;

        let mut samples = Vec::with_capacity(nsegs);
        let mut next_at = 0.0;
        let mut travelled = 0.0;
        for edge in self.edges() {
            let len = edge.length();
            if len <= 0.0 {
                continue;
            }
            while samples.len() < nsegs && next_at <= travelled + len {
                let t = (next_at - travelled) / len;
                samples.push(Point::new(
                    edge.p1.x + (edge.p2.x - edge.p1.x) * t,
                    edge.p1.y + (edge.p2.y - edge.p1.y) * t,
                ));
                next_at += interval;
            }
            travelled += len;
        }
        samples
    }
}

/// A machining region: an outer boundary and the islands inside it.
#[derive(Debug, Clone)]
pub struct Region {
    outline: Contour,
    islands: Vec<Contour>,
}

impl Region {
    pub fn new(outline: Contour, islands: Vec<Contour>) -> Self {
        Self { outline, islands }
    }

    pub fn outline(&self) -> &Contour {
        &self.outline
    }

    pub fn islands(&self) -> &[Contour] {
        &self.islands
    }

    /// All boundary edges: outline first, then every island.
    pub fn boundary_edges(&self) -> impl Iterator<Item = Line> + '_ {
        self.outline
            .edges()
            .chain(self.islands.iter().flat_map(|island| island.edges()))
    }

    /// Bounding box of the outline as `(min_x, min_y, max_x, max_y)`.
    pub fn bounding_box(&self) -> (f64, f64, f64, f64) {
        self.outline.bounding_box()
    }

    pub fn contains_point(&self, pt: &Point) -> bool {
        self.outline.contains_point(pt)
            && !self.islands.iter().any(|island| island.contains_point(pt))
    }

    /// Tests whether a segment lies fully inside the region.
    ///
    /// Both endpoints must be inside the outline and outside every island.
    /// With `analyze_intersections` the segment interior must additionally
    /// avoid crossing any boundary curve, which catches concave-outline cases
    /// at extra cost.
    pub fn contains_segment(&self, seg: &Line, tolerance: f64, analyze_intersections: bool) -> bool {
        if !self.outline.contains_point(&seg.p1) || !self.outline.contains_point(&seg.p2) {
            return false;
        }
        if analyze_intersections && self.outline.crossed_by(seg, tolerance) {
            return false;
        }
        for island in &self.islands {
            if island.contains_point(&seg.p1) || island.contains_point(&seg.p2) {
                return false;
            }
            if analyze_intersections && island.crossed_by(seg, tolerance) {
                return false;
            }
        }
        true
    }
}
