//! Medial-axis extraction via Voronoi edge filtering.
//!
//! Region boundaries are sampled into a dense point cloud; the Voronoi
//! diagram of that cloud approximates the medial axis. Edges kept are those
//! lying fully inside the outline and outside every island.

use pocketmill_core::{Line, Point, Region};
use spade::handles::VoronoiVertex;
use spade::{DelaunayTriangulation, Point2, Triangulation};
use tracing::debug;

use crate::error::PocketError;

/// Padding applied around the sample cloud's bounding box.
pub(crate) const VORONOI_MARGIN: f64 = 1.0;

/// Reject skeleton segments whose interior crosses a boundary curve. Catches
/// concave-outline edge cases at extra cost; off by default.
const ANALYZE_INNER_INTERSECTIONS: bool = false;

/// Extracts the inner medial-axis segments of `region`.
///
/// Boundaries are sampled at `cutter_radius / 10`. The single bottommost
/// sample (ties broken by the leftmost) is nudged down by `tolerance` before
/// diagram construction: sweep-line Voronoi builders are sensitive to the
/// first sites the sweep encounters, and a distinct bottom point keeps the
/// partitioning sane. Numerical workaround only, no geometric meaning.
pub(crate) fn extract_segments(
    region: &Region,
    cutter_radius: f64,
    tolerance: f64,
) -> Result<Vec<Line>, PocketError> {
    let step = cutter_radius / 10.0;

    let mut points = region.outline().sample_evenly(step);
    for island in region.islands() {
        points.extend(island.sample_evenly(step));
    }
    debug!("sampled {} boundary points", points.len());

    if points.is_empty() {
        return Err(PocketError::SkeletonConstruction(
            "region boundary produced no samples".to_string(),
        ));
    }

    let mut hack_idx = 0;
    for (i, p) in points.iter().enumerate() {
        let h = &points[hack_idx];
        if p.y < h.y || (p.y == h.y && p.x < h.x) {
            hack_idx = i;
        }
    }
    points[hack_idx].y -= tolerance;

    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;
    for p in &points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    min_x -= VORONOI_MARGIN;
    min_y -= VORONOI_MARGIN;
    max_x += VORONOI_MARGIN;
    max_y += VORONOI_MARGIN;

    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    for p in &points {
        triangulation
            .insert(Point2::new(p.x, p.y))
            .map_err(|e| PocketError::Voronoi(format!("{e:?}")))?;
    }

    let in_box = |p: &Point| p.x >= min_x && p.x <= max_x && p.y >= min_y && p.y <= max_y;

    let mut inner_segments = Vec::new();
    let mut edge_count = 0usize;
    for edge in triangulation.undirected_voronoi_edges() {
        edge_count += 1;
        let [start, end] = edge.vertices();
        let (VoronoiVertex::Inner(f1), VoronoiVertex::Inner(f2)) = (start, end) else {
            continue; // unbounded edge
        };
        let c1 = f1.circumcenter();
        let c2 = f2.circumcenter();
        let seg = Line::new(Point::new(c1.x, c1.y), Point::new(c2.x, c2.y));

        if seg.length() < tolerance {
            continue;
        }
        if !in_box(&seg.p1) || !in_box(&seg.p2) {
            continue;
        }
        if !region.contains_segment(&seg, tolerance, ANALYZE_INNER_INTERSECTIONS) {
            continue;
        }
        inner_segments.push(seg);
    }

    debug!(
        "voronoi partitioning completed: {} edges, {} inner segments",
        edge_count,
        inner_segments.len()
    );

    Ok(inner_segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketmill_core::Contour;

    #[test]
    fn test_rectangle_skeleton_stays_inside() {
        let outline = Contour::rectangle(0.0, 0.0, 40.0, 20.0).unwrap();
        let region = Region::new(outline, Vec::new());
        let segments = extract_segments(&region, 1.5, 0.001).unwrap();

        assert!(!segments.is_empty());
        for seg in &segments {
            assert!(region.contains_point(&seg.p1));
            assert!(region.contains_point(&seg.p2));
            assert!(seg.length() >= 0.001);
        }
    }

    #[test]
    fn test_rectangle_skeleton_touches_long_axis() {
        let outline = Contour::rectangle(0.0, 0.0, 40.0, 20.0).unwrap();
        let region = Region::new(outline, Vec::new());
        let segments = extract_segments(&region, 1.5, 0.001).unwrap();

        // the central medial-axis segment of a rectangle runs along the
        // mid-height line
        let near_axis = segments
            .iter()
            .any(|seg| (seg.p1.y - 10.0).abs() < 1.0 && (seg.p2.y - 10.0).abs() < 1.0);
        assert!(near_axis);
    }

    #[test]
    fn test_island_excludes_segments() {
        let outline = Contour::rectangle(0.0, 0.0, 60.0, 60.0).unwrap();
        let island = Contour::rectangle(20.0, 20.0, 20.0, 20.0).unwrap();
        let region = Region::new(outline, vec![island.clone()]);
        let segments = extract_segments(&region, 1.5, 0.001).unwrap();

        assert!(!segments.is_empty());
        for seg in &segments {
            assert!(!island.contains_point(&seg.p1));
            assert!(!island.contains_point(&seg.p2));
        }
    }
}
