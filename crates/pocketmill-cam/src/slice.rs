//! Engagement discs.
//!
//! A slice models one step of the roll: the disc the cutter sweeps at a
//! centerline point, the exposed boundary arcs the tool actually cuts, and
//! the engagement measure against the previous disc. Trimming removes arc
//! spans already cleared by earlier slices while keeping a minimum untouched
//! lead at both arc ends.

use std::f64::consts::PI;

use pocketmill_core::{angle_between, Arc, Circle, Point, RotationDirection, Vector};
use smallvec::SmallVec;

/// One engagement step of the toolpath.
#[derive(Debug, Clone)]
pub struct Slice {
    ball: Circle,
    segments: SmallVec<[Arc; 3]>,
    engagement: f64,
    separation: f64,
    prev: Option<usize>,
    prev_ball: Option<Circle>,
    dir: RotationDirection,
}

impl Slice {
    /// Builds a trial slice following `prev`.
    ///
    /// Three outcomes, distinguished by [`engagement`](Self::engagement) and
    /// [`separation`](Self::separation):
    /// - two boundary intersections: one exposed arc on the side facing away
    ///   from the previous center, engagement `dist + (r - r0)`;
    /// - discs disjoint (`separation > 0`): no arc, zero engagement — the
    ///   step was too far;
    /// - one disc inside the other (`separation <= 0`): no arc, zero
    ///   engagement — degenerate continuation.
    pub fn new(
        prev_id: usize,
        prev: &Slice,
        center: Point,
        radius: f64,
        dir: RotationDirection,
    ) -> Self {
        let ball = Circle::new(center, radius);
        let dist = center.distance_to(&prev.center());
        let mut slice = Self {
            ball,
            segments: SmallVec::new(),
            engagement: 0.0,
            separation: dist - (radius + prev.radius()),
            prev: Some(prev_id),
            prev_ball: Some(prev.ball),
            dir,
        };

        let Some((i1, i2)) = prev.ball.intersect_circle(&ball) else {
            return slice;
        };

        let mut arc = Arc::new(center, i1, i2, dir);
        if !arc.contains_vector(&Vector::between(prev.center(), center)) {
            arc = Arc::new(center, i2, i1, dir);
        }
        slice.segments.push(arc);
        slice.engagement = dist + (radius - prev.radius());
        slice
    }

    /// Builds the root seed slice: a full circle modeled as three 120° arcs,
    /// with no previous link and zero engagement.
    pub fn full_circle(center: Point, radius: f64, dir: RotationDirection) -> Self {
        let step = 2.0 * PI / 3.0;
        let mut segments = SmallVec::new();
        for i in 0..3 {
            let start = match dir {
                RotationDirection::CounterClockwise => i as f64 * step,
                RotationDirection::Clockwise => -(i as f64) * step,
            };
            segments.push(Arc::from_angles(center, radius, start, step, dir));
        }
        Self {
            ball: Circle::new(center, radius),
            segments,
            engagement: 0.0,
            separation: 0.0,
            prev: None,
            prev_ball: None,
            dir,
        }
    }

    pub fn ball(&self) -> Circle {
        self.ball
    }

    pub fn center(&self) -> Point {
        self.ball.center
    }

    pub fn radius(&self) -> f64 {
        self.ball.radius
    }

    /// Engagement measure against the previous slice.
    pub fn engagement(&self) -> f64 {
        self.engagement
    }

    /// Center distance minus the radii sum: positive for disjoint discs,
    /// non-positive for overlapping or contained ones.
    pub fn separation(&self) -> f64 {
        self.separation
    }

    /// Id of the slice preceding this one along the roll sequence.
    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub fn direction(&self) -> RotationDirection {
        self.dir
    }

    /// Exposed boundary arcs, in cutting order.
    pub fn segments(&self) -> &[Arc] {
        &self.segments
    }

    /// Start of the first exposed arc.
    pub fn first_point(&self) -> Point {
        self.segments.first().map_or(self.ball.center, |a| a.p1)
    }

    /// End of the last exposed arc.
    pub fn last_point(&self) -> Point {
        self.segments.last().map_or(self.ball.center, |a| a.p2)
    }

    /// Reverses the cutting direction of all arcs.
    pub fn flip_direction(&mut self) {
        self.segments.reverse();
        for arc in self.segments.iter_mut() {
            *arc = arc.flipped();
        }
        self.dir = self.dir.opposite();
    }

    /// Bounding box of the whole disc, for spatial-index insertion.
    pub fn ball_bounding_box(&self) -> (f64, f64, f64, f64) {
        (
            self.ball.center.x - self.ball.radius,
            self.ball.center.y - self.ball.radius,
            self.ball.center.x + self.ball.radius,
            self.ball.center.y + self.ball.radius,
        )
    }

    /// Bounding box of the exposed arcs.
    pub fn arc_bounding_box(&self) -> (f64, f64, f64, f64) {
        let mut boxes = self.segments.iter().map(Arc::bounding_box);
        let first = boxes.next().unwrap_or_else(|| self.ball_bounding_box());
        boxes.fold(first, |acc, b| {
            (
                acc.0.min(b.0),
                acc.1.min(b.1),
                acc.2.max(b.2),
                acc.3.max(b.3),
            )
        })
    }

    /// Trims the exposed arc against already committed slices.
    ///
    /// Only the single collider removing the largest angular span is applied.
    /// Trimming never eats into the arc ends: intersection points closer than
    /// `end_clearance` (chordal) to an end are snapped to the clearance point,
    /// so the cutter keeps an untouched lead at both seams. If the point the
    /// engagement was measured at vanishes with the removed middle, the
    /// engagement is re-estimated as the mean of the prior value and the
    /// larger of the two cut-point engagements, then derated by `derating`
    /// for the shorter continuous contact of a segmented slice.
    pub fn refine(&mut self, colliders: &[(usize, &Slice)], end_clearance: f64, derating: f64) {
        if self.segments.len() != 1 {
            return;
        }
        let arc = self.segments[0];
        let Some(prev_ball) = self.prev_ball else {
            return;
        };
        let clearance = end_clearance;

        // an arc is too small to be worth trimming when fewer than 4
        // clearance-length chords plus end spacing fit around its circle: a
        // pentagon of clearance-length edges bounds the radius from below
        let r_min = clearance / 2.0 / (PI / 5.0).sin();
        if arc.radius() <= r_min {
            return;
        }

        // clearance points: where the arc leaves a clearance-radius circle
        // around each end
        let c1 = arc
            .intersect_circle(&Circle::new(arc.p1, clearance))
            .into_iter()
            .next();
        let c2 = arc
            .intersect_circle(&Circle::new(arc.p2, clearance))
            .into_iter()
            .next();
        let (Some(c1), Some(c2)) = (c1, c2) else {
            return; // arc shorter than its end clearances
        };

        let mut max_secant: Option<(Point, Point)> = None;
        let mut max_sweep = 0.0;

        for &(id, s) in colliders {
            if Some(id) == self.prev {
                continue;
            }
            let intersections = arc.intersect_circle(&s.ball);
            if intersections.is_empty() {
                continue;
            }

            let secant = if intersections.len() == 1 {
                // single intersection: the collider clips one arc end; snap
                // the open side to the clearance point so this becomes a
                // middle trim
                let splitpt = intersections[0];
                if arc.p1.distance_to(&s.center()) < arc.p2.distance_to(&s.center()) {
                    if splitpt.distance_to(&arc.p1) < clearance {
                        continue; // nothing left to remove
                    } else if splitpt.distance_to(&arc.p2) < clearance {
                        (c1, c2)
                    } else {
                        (c1, splitpt)
                    }
                } else if splitpt.distance_to(&arc.p2) < clearance {
                    continue;
                } else if splitpt.distance_to(&arc.p1) < clearance {
                    (c1, c2)
                } else {
                    (splitpt, c2)
                }
            } else {
                let snap = |pt: Point| {
                    if pt.distance_to(&arc.p1) < clearance {
                        c1
                    } else if pt.distance_to(&arc.p2) < clearance {
                        c2
                    } else {
                        pt
                    }
                };
                (snap(intersections[0]), snap(intersections[1]))
            };

            if secant.0.distance_to(&secant.1) < clearance * 2.0 {
                continue; // removed span too short to matter
            }

            // order the secant along the arc direction
            let v_p1 = Vector::between(arc.center, arc.p1);
            let v1 = Vector::between(arc.center, secant.0);
            let v2 = Vector::between(arc.center, secant.1);
            let mut secant = secant;
            let mut sweep = angle_between(&v1, &v2, arc.dir);
            if angle_between(&v_p1, &v1, arc.dir) > angle_between(&v_p1, &v2, arc.dir) {
                secant = (secant.1, secant.0);
                sweep = 2.0 * PI - sweep;
            }

            if sweep > max_sweep {
                // the angular-sweep heuristic can mismatch; the removed
                // middle must really be covered by this collider
                let removed = Arc::new(arc.center, secant.0, secant.1, arc.dir);
                if removed.midpoint().distance_to(&s.center()) < s.radius() {
                    max_sweep = sweep;
                    max_secant = Some(secant);
                }
            }
        }

        let Some(secant) = max_secant else {
            return;
        };

        let start_piece = Arc::new(arc.center, arc.p1, secant.0, arc.dir);
        let removed = Arc::new(arc.center, secant.0, secant.1, arc.dir);
        let end_piece = Arc::new(arc.center, secant.1, arc.p2, arc.dir);

        self.segments.clear();
        self.segments.push(start_piece);
        self.segments.push(end_piece);

        if removed.contains_vector(&Vector::between(arc.center, arc.midpoint())) {
            // the measured midpoint was cut away; blend with the engagement
            // at the surviving cut points to damp the optimistic drop
            let e0 = prev_ball.center.distance_to(&secant.0) - prev_ball.radius;
            let e1 = prev_ball.center.distance_to(&secant.1) - prev_ball.radius;
            self.engagement = (self.engagement + e0.max(e1)) / 2.0;
        }
        self.engagement *= derating;
    }
}
