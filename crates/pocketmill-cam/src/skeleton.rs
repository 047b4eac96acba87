//! Skeleton tree construction.
//!
//! Filtered medial-axis segments are chained into a rooted tree of branches.
//! Segments are indexed by their endpoints in a pool; only endpoints wide
//! enough for the cutter to pass are indexed, which keeps impassable channels
//! out of the tree. Growth is depth-first from the root point; after a node's
//! children are grown they are reordered so short side-branches are finished
//! before long ones.

use std::cmp::Ordering;
use std::collections::HashMap;

use pocketmill_core::{Line, Point, Region};
use tracing::{debug, warn};

use crate::clearance::BoundaryIndex;
use crate::error::PocketError;

/// Medial-axis segments indexed by their passable endpoints.
pub(crate) struct SegmentPool {
    tolerance: f64,
    segments: Vec<Line>,
    used: Vec<bool>,
    // cell key -> (segment id, anchored at p2)
    cells: HashMap<(i64, i64), Vec<(usize, bool)>>,
}

impl SegmentPool {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(1e-9),
            segments: Vec::new(),
            used: Vec::new(),
            cells: HashMap::new(),
        }
    }

    fn key(&self, pt: &Point) -> (i64, i64) {
        (
            (pt.x / self.tolerance).floor() as i64,
            (pt.y / self.tolerance).floor() as i64,
        )
    }

    /// Adds a segment, indexing it under whichever endpoints are enterable.
    pub fn add(&mut self, line: &Line, enter_from_p1: bool, enter_from_p2: bool) {
        let id = self.segments.len();
        let k1 = self.key(&line.p1);
        let k2 = self.key(&line.p2);
        self.segments.push(*line);
        self.used.push(false);
        if enter_from_p1 {
            self.cells.entry(k1).or_default().push((id, false));
        }
        if enter_from_p2 {
            self.cells.entry(k2).or_default().push((id, true));
        }
    }

    /// Number of endpoint index entries.
    pub fn hash_count(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    /// Pulls every unused segment anchored at `pt` out of the pool and
    /// returns the far endpoints to follow.
    pub fn pull_follow_points(&mut self, pt: &Point) -> Vec<Point> {
        let mut followers = Vec::new();
        let (cx, cy) = self.key(pt);
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(entries) = self.cells.get(&(cx + dx, cy + dy)) else {
                    continue;
                };
                for &(id, anchored_p2) in entries {
                    if self.used[id] {
                        continue;
                    }
                    let seg = &self.segments[id];
                    let (anchor, follow) = if anchored_p2 {
                        (seg.p2, seg.p1)
                    } else {
                        (seg.p1, seg.p2)
                    };
                    if anchor.distance_to(pt) < self.tolerance {
                        self.used[id] = true;
                        followers.push(follow);
                    }
                }
            }
        }
        followers
    }
}

/// One branch of the skeleton tree.
#[derive(Debug)]
pub(crate) struct Branch {
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    /// Ordered centerline points.
    pub curve: Vec<Point>,
    /// Committed slice ids, in roll order.
    pub slices: Vec<usize>,
    /// Travel polyline connecting this branch's first slice to the path so far.
    pub entry: Option<Vec<Point>>,
    cum_lengths: Vec<f64>,
}

impl Branch {
    fn new(parent: Option<usize>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            curve: Vec::new(),
            slices: Vec::new(),
            entry: None,
            cum_lengths: Vec::new(),
        }
    }

    pub fn start(&self) -> Point {
        self.curve[0]
    }

    fn curve_length(&self) -> f64 {
        self.curve
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }

    fn finalize(&mut self) {
        let mut cum = Vec::with_capacity(self.curve.len());
        let mut total = 0.0;
        cum.push(0.0);
        for w in self.curve.windows(2) {
            total += w[0].distance_to(&w[1]);
            cum.push(total);
        }
        self.cum_lengths = cum;
    }

    /// Point at normalized arc-length parameter `t` along the centerline.
    pub fn point_at(&self, t: f64) -> Point {
        let total = self.cum_lengths.last().copied().unwrap_or(0.0);
        if self.curve.len() < 2 || total <= 0.0 {
            return self.curve[0];
        }
        let target = t.clamp(0.0, 1.0) * total;
        let i = self
            .cum_lengths
            .partition_point(|&len| len < target)
            .clamp(1, self.curve.len() - 1);
        let seg_len = self.cum_lengths[i] - self.cum_lengths[i - 1];
        if seg_len <= 0.0 {
            return self.curve[i];
        }
        let f = (target - self.cum_lengths[i - 1]) / seg_len;
        let a = self.curve[i - 1];
        let b = self.curve[i];
        Point::new(a.x + (b.x - a.x) * f, a.y + (b.y - a.y) * f)
    }
}

/// The rooted branch tree plus its depth-first traversal order.
pub(crate) struct SkeletonTree {
    pub branches: Vec<Branch>,
    traversal: Vec<usize>,
}

impl SkeletonTree {
    pub fn traversal(&self) -> &[usize] {
        &self.traversal
    }
}

enum Frame {
    Grow(usize),
    Finish(usize),
}

/// Builds the skeleton tree from filtered medial-axis segments.
///
/// With no start point the root is the indexed endpoint with the globally
/// largest clearance radius. With a start point the root is the nearest
/// indexed endpoint reachable by a straight in-region segment; the start
/// point itself becomes the first centerline point.
pub(crate) fn build_tree(
    segments: &[Line],
    region: &Region,
    boundary: &BoundaryIndex,
    start_point: Option<Point>,
    tolerance: f64,
    min_passable: f64,
) -> Result<SkeletonTree, PocketError> {
    let mut pool = SegmentPool::new(tolerance);
    let mut branches = vec![Branch::new(None)];
    let mut tree_start: Option<Point> = None;

    debug!("analyzing {} skeleton segments", segments.len());

    match start_point {
        None => {
            let mut max_r = f64::MIN;
            for line in segments {
                let r1 = boundary.clearance_radius(&line.p1);
                let r2 = boundary.clearance_radius(&line.p2);
                let e1 = r1 >= min_passable;
                let e2 = r2 >= min_passable;
                if e1 || e2 {
                    pool.add(line, e1, e2);
                }
                if e1 && r1 > max_r {
                    max_r = r1;
                    tree_start = Some(line.p1);
                }
                if e2 && r2 > max_r {
                    max_r = r2;
                    tree_start = Some(line.p2);
                }
            }
        }
        Some(sp) => {
            if !region.contains_point(&sp) {
                warn!("start point is outside the pocket");
                return Err(PocketError::SkeletonConstruction(
                    "start point is outside the pocket".to_string(),
                ));
            }
            if boundary.clearance_radius(&sp) < min_passable {
                warn!("start point clearance is below the passable minimum");
                return Err(PocketError::SkeletonConstruction(
                    "start point clearance is below the passable minimum".to_string(),
                ));
            }

            // the start point heads the root centerline, connected to the
            // chosen segment endpoint below
            branches[0].curve.push(sp);

            let mut min_dist = f64::MAX;
            for line in segments {
                let r1 = boundary.clearance_radius(&line.p1);
                let r2 = boundary.clearance_radius(&line.p2);
                let e1 = r1 >= min_passable;
                let e2 = r2 >= min_passable;
                if e1 || e2 {
                    pool.add(line, e1, e2);
                }
                if e1 {
                    let d = sp.distance_to(&line.p1);
                    if d < min_dist
                        && region.contains_segment(&Line::new(sp, line.p1), tolerance, true)
                    {
                        min_dist = d;
                        tree_start = Some(line.p1);
                    }
                }
                if e2 {
                    let d = sp.distance_to(&line.p2);
                    if d < min_dist
                        && region.contains_segment(&Line::new(sp, line.p2), tolerance, true)
                    {
                        min_dist = d;
                        tree_start = Some(line.p2);
                    }
                }
            }
        }
    }

    let Some(tree_start) = tree_start else {
        warn!("failed to choose a tree start point");
        return Err(PocketError::SkeletonConstruction(
            "failed to choose a tree start point".to_string(),
        ));
    };

    debug!("indexed {} pool entries", pool.hash_count());

    branches[0].curve.push(tree_start);

    // depth-first growth with an explicit stack; subtree lengths accumulate
    // on the way back up so children can be ordered shortest-first
    let mut deep: Vec<f64> = vec![0.0];
    let mut stack = vec![Frame::Grow(0)];
    while let Some(frame) = stack.pop() {
        match frame {
            Frame::Grow(b) => {
                let mut running_end = *branches[b].curve.last().unwrap();
                let followers = loop {
                    let followers = pool.pull_follow_points(&running_end);
                    if followers.len() != 1 {
                        break followers;
                    }
                    running_end = followers[0];
                    branches[b].curve.push(running_end);
                };

                if followers.is_empty() {
                    deep[b] = branches[b].curve_length();
                    continue;
                }

                stack.push(Frame::Finish(b));
                let mut child_frames = Vec::with_capacity(followers.len());
                for pt in followers {
                    let id = branches.len();
                    let mut child = Branch::new(Some(b));
                    child.curve.push(running_end);
                    child.curve.push(pt);
                    branches.push(child);
                    deep.push(0.0);
                    branches[b].children.push(id);
                    child_frames.push(id);
                }
                // grow the first follower first
                for &id in child_frames.iter().rev() {
                    stack.push(Frame::Grow(id));
                }
            }
            Frame::Finish(b) => {
                let mut children = std::mem::take(&mut branches[b].children);
                children.sort_by(|&x, &y| deep[x].partial_cmp(&deep[y]).unwrap_or(Ordering::Equal));
                deep[b] = branches[b].curve_length()
                    + children.iter().map(|&c| deep[c]).sum::<f64>();
                branches[b].children = children;
            }
        }
    }

    for branch in &mut branches {
        branch.finalize();
    }

    let mut traversal = Vec::with_capacity(branches.len());
    let mut st = vec![0usize];
    while let Some(b) = st.pop() {
        traversal.push(b);
        for &c in branches[b].children.iter().rev() {
            st.push(c);
        }
    }

    debug!("built skeleton tree with {} branches", branches.len());

    Ok(SkeletonTree {
        branches,
        traversal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pocketmill_core::Contour;

    fn open_region() -> Region {
        Region::new(Contour::rectangle(-30.0, -30.0, 60.0, 60.0).unwrap(), Vec::new())
    }

    fn fork_segments() -> Vec<Line> {
        vec![
            Line::new(Point::new(0.0, 0.0), Point::new(10.0, 0.0)),
            Line::new(Point::new(10.0, 0.0), Point::new(18.0, 0.0)),
            Line::new(Point::new(10.0, 0.0), Point::new(10.0, 5.0)),
        ]
    }

    #[test]
    fn test_pool_pull_consumes_segments() {
        let mut pool = SegmentPool::new(0.001);
        let seg = Line::new(Point::new(0.0, 0.0), Point::new(5.0, 0.0));
        pool.add(&seg, true, true);

        let followers = pool.pull_follow_points(&Point::new(0.0, 0.0));
        assert_eq!(followers.len(), 1);
        assert_eq!(followers[0], Point::new(5.0, 0.0));

        // pulled from one end, gone from the other too
        assert!(pool.pull_follow_points(&Point::new(5.0, 0.0)).is_empty());
    }

    #[test]
    fn test_auto_root_picks_widest_endpoint() {
        let region = open_region();
        let boundary = BoundaryIndex::new(&region, 1.0, 0.0);
        let tree =
            build_tree(&fork_segments(), &region, &boundary, None, 0.001, 0.1).unwrap();

        // (0, 0) is the region center and has the largest clearance
        assert_eq!(tree.branches[0].start(), Point::new(0.0, 0.0));
    }

    #[test]
    fn test_fork_spawns_sorted_children() {
        let region = open_region();
        let boundary = BoundaryIndex::new(&region, 1.0, 0.0);
        let tree =
            build_tree(&fork_segments(), &region, &boundary, None, 0.001, 0.1).unwrap();

        assert_eq!(tree.branches.len(), 3);
        let root = &tree.branches[0];
        assert_eq!(root.children.len(), 2);

        // shorter side branch ordered first
        let first = &tree.branches[root.children[0]];
        let second = &tree.branches[root.children[1]];
        assert_eq!(*first.curve.last().unwrap(), Point::new(10.0, 5.0));
        assert_eq!(*second.curve.last().unwrap(), Point::new(18.0, 0.0));

        // preorder traversal: root, then children in order
        assert_eq!(
            tree.traversal().to_vec(),
            vec![0, root.children[0], root.children[1]]
        );
    }

    #[test]
    fn test_manual_start_outside_region_fails() {
        let region = open_region();
        let boundary = BoundaryIndex::new(&region, 1.0, 0.0);
        let result = build_tree(
            &fork_segments(),
            &region,
            &boundary,
            Some(Point::new(100.0, 100.0)),
            0.001,
            0.1,
        );
        assert!(matches!(result, Err(PocketError::SkeletonConstruction(_))));
    }

    #[test]
    fn test_manual_start_prepends_centerline() {
        let region = open_region();
        let boundary = BoundaryIndex::new(&region, 1.0, 0.0);
        let tree = build_tree(
            &fork_segments(),
            &region,
            &boundary,
            Some(Point::new(1.0, 1.0)),
            0.001,
            0.1,
        )
        .unwrap();

        assert_eq!(tree.branches[0].curve[0], Point::new(1.0, 1.0));
        // nearest reachable endpoint
        assert_eq!(tree.branches[0].curve[1], Point::new(0.0, 0.0));
    }

    #[test]
    fn test_point_at_interpolates_by_arc_length() {
        let mut branch = Branch::new(None);
        branch.curve = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
        ];
        branch.finalize();

        assert_eq!(branch.point_at(0.0), Point::new(0.0, 0.0));
        assert_eq!(branch.point_at(1.0), Point::new(10.0, 10.0));
        let mid = branch.point_at(0.5);
        assert!((mid.x - 10.0).abs() < 1e-9 && (mid.y - 0.0).abs() < 1e-9);
        let q = branch.point_at(0.25);
        assert!((q.x - 5.0).abs() < 1e-9 && (q.y - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_narrow_endpoints_not_indexed() {
        let region = open_region();
        let boundary = BoundaryIndex::new(&region, 1.0, 0.0);
        // endpoint at the boundary has negative clearance and must not be
        // followed
        let segments = vec![
            Line::new(Point::new(0.0, 0.0), Point::new(20.0, 0.0)),
            Line::new(Point::new(20.0, 0.0), Point::new(29.9, 0.0)),
        ];
        let tree = build_tree(&segments, &region, &boundary, None, 0.001, 0.1).unwrap();

        let root = &tree.branches[0];
        // the second segment's far end is too narrow to enter from, but the
        // chain is still followed up to it from the wide side
        assert_eq!(root.start(), Point::new(0.0, 0.0));
        assert_eq!(*root.curve.last().unwrap(), Point::new(29.9, 0.0));
    }
}
