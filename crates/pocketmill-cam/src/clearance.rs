//! Maximal-inscribed-circle queries against the region boundary.
//!
//! The largest circle centered at a point that stays inside the region and
//! outside the islands is bounded by the nearest boundary feature. All
//! boundary edges live in a spatial index; a nearest query plus one subtract
//! turns the raw distance into the clearance radius available to the cutter.

use pocketmill_core::{Bounds, Line, Point, Region, SpatialIndex};

/// Spatially indexed region boundary for clearance-radius queries.
#[derive(Debug)]
pub struct BoundaryIndex {
    index: SpatialIndex,
    edges: Vec<Line>,
    cutter_radius: f64,
    margin: f64,
}

impl BoundaryIndex {
    pub fn new(region: &Region, cutter_radius: f64, margin: f64) -> Self {
        let bounds = Bounds::from_tuple(region.bounding_box()).inflated(1.0);
        let mut index = SpatialIndex::new(bounds, 8, 10);
        let edges: Vec<Line> = region.boundary_edges().collect();
        for (i, edge) in edges.iter().enumerate() {
            index.insert(i, &Bounds::from_tuple(edge.bounding_box()));
        }
        Self {
            index,
            edges,
            cutter_radius,
            margin,
        }
    }

    /// Distance from `pt` to the nearest boundary edge.
    ///
    /// Expanding-box search: double the probe box until it hits something,
    /// then re-probe at the best distance found so nothing closer hides in a
    /// corner the smaller box missed.
    pub fn nearest_boundary_distance(&self, pt: &Point) -> f64 {
        if self.edges.is_empty() {
            return f64::MAX;
        }
        let bounds = self.index.bounds();
        let limit = bounds.width().hypot(bounds.height());
        let mut half = (limit / 64.0).max(1e-9);
        loop {
            let probe = Bounds::new(pt.x - half, pt.y - half, pt.x + half, pt.y + half);
            let hits = self.index.query(&probe);
            if !hits.is_empty() {
                let best = hits
                    .iter()
                    .map(|&i| self.edges[i].distance_to_point(pt))
                    .fold(f64::MAX, f64::min);
                if best <= half {
                    return best;
                }
                half = best;
                continue;
            }
            half *= 2.0;
            if half > limit * 2.0 {
                // probe outgrew the whole region; fall back to a full scan
                return self
                    .edges
                    .iter()
                    .map(|edge| edge.distance_to_point(pt))
                    .fold(f64::MAX, f64::min);
            }
        }
    }

    /// Usable clearance radius at `pt`: the maximal-inscribed-circle radius
    /// minus cutter radius and margin. Negative when the cutter does not fit.
    pub fn clearance_radius(&self, pt: &Point) -> f64 {
        self.nearest_boundary_distance(pt) - self.cutter_radius - self.margin
    }
}
