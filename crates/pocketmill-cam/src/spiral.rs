//! Lead-in spiral generation.

use std::f64::consts::PI;

use pocketmill_core::{Point, RotationDirection};

/// Angular step of the tessellated spiral (5 degrees).
const ANGLE_STEP: f64 = PI / 36.0;

/// Builds a flat Archimedean spiral from `center` out to `target`.
///
/// The radius grows by `pitch` per revolution, so each winding engages at
/// most a pitch worth of fresh material. The spiral ends exactly at `target`
/// with its final heading matching the mill direction.
pub(crate) fn archimedean_spiral(
    center: Point,
    target: Point,
    pitch: f64,
    dir: RotationDirection,
) -> Vec<Point> {
    let r_end = center.distance_to(&target);
    if r_end < 1e-12 || pitch <= 0.0 {
        return vec![center, target];
    }

    let end_angle = (target.y - center.y).atan2(target.x - center.x);
    let turns = (r_end / pitch).ceil().max(1.0);
    let total_sweep = turns * 2.0 * PI;
    let steps = (total_sweep / ANGLE_STEP).ceil() as usize;

    let mut points = Vec::with_capacity(steps + 2);
    points.push(center);
    for i in 1..steps {
        let swept = total_sweep * i as f64 / steps as f64;
        let angle = match dir {
            RotationDirection::CounterClockwise => end_angle - total_sweep + swept,
            RotationDirection::Clockwise => end_angle + total_sweep - swept,
        };
        let r = r_end * swept / total_sweep;
        points.push(Point::new(
            center.x + r * angle.cos(),
            center.y + r * angle.sin(),
        ));
    }
    points.push(target);
    points
}
