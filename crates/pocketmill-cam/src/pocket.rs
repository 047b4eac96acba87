//! Constant-engagement pocket toolpath generation.
//!
//! The generator extracts the region's medial-axis skeleton, grows a branch
//! tree over it, and rolls engagement discs along each branch so the cutter
//! never engages more fresh material than the configured maximum. Travel
//! between branches follows previously cleared discs, shortcutting where a
//! straight move stays covered.

use std::cmp::Ordering;

use pocketmill_core::{Arc, Bounds, Line, Point, Region, RotationDirection, SpatialIndex};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clearance::BoundaryIndex;
use crate::error::{ParameterError, PocketError, PocketResult};
use crate::medial_axis;
use crate::skeleton::{self, SkeletonTree};
use crate::slice::Slice;
use crate::spiral::archimedean_spiral;

/// Strict engagement tolerance band below the maximum, as a fraction of the
/// maximum (0.1%). A slice inside this band ends the placement search.
pub const ENGAGEMENT_TOLERANCE: f64 = 0.001;

/// Relaxation factor on [`ENGAGEMENT_TOLERANCE`] for the overshoot abort: a
/// best candidate exceeding the maximum by more than the relaxed band stops
/// its branch. Empirically tuned; kept as a named constant.
pub const OVERSHOOT_RELAXATION: f64 = 10.0;

/// Selects which path item categories the generator emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitOptions {
    pub segments: bool,
    pub branch_entries: bool,
    pub chords: bool,
    pub segment_chords: bool,
    pub leadin_spiral: bool,
    pub return_to_base: bool,
    pub debug_skeleton: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            segments: true,
            branch_entries: true,
            chords: true,
            segment_chords: false,
            leadin_spiral: true,
            return_to_base: false,
            debug_skeleton: false,
        }
    }
}

impl EmitOptions {
    /// Enables every category, including debug output.
    pub fn all() -> Self {
        Self {
            segments: true,
            branch_entries: true,
            chords: true,
            segment_chords: true,
            leadin_spiral: true,
            return_to_base: true,
            debug_skeleton: true,
        }
    }
}

/// Pocketing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PocketParams {
    pub cutter_diameter: f64,
    pub general_tolerance: f64,
    /// Extra stock to leave at every boundary.
    pub margin: f64,
    /// Engagement ceiling per placed slice.
    pub max_engagement: f64,
    /// Slices engaging less than this end their branch (natural taper).
    pub min_engagement: f64,
    /// Engagement multiplier applied to slices split by trimming.
    pub segmented_derating: f64,
    /// `None` lets the generator pick whichever direction travels less.
    pub mill_direction: Option<RotationDirection>,
    /// Optional user start point; the default starts in the widest area.
    pub start_point: Option<Point>,
    pub emit: EmitOptions,
}

impl Default for PocketParams {
    fn default() -> Self {
        Self::for_cutter(3.0)
    }
}

impl PocketParams {
    /// Parameters scaled to a cutter diameter: engagement bounds default to
    /// 40% / 10% of the diameter.
    pub fn for_cutter(diameter: f64) -> Self {
        Self {
            cutter_diameter: diameter,
            general_tolerance: 0.001,
            margin: 0.0,
            max_engagement: diameter * 0.4,
            min_engagement: diameter * 0.1,
            segmented_derating: 0.5,
            mill_direction: Some(RotationDirection::Clockwise),
            start_point: None,
            emit: EmitOptions::default(),
        }
    }

    fn validate(&self) -> Result<(), ParameterError> {
        let positive = [
            ("cutter_diameter", self.cutter_diameter),
            ("general_tolerance", self.general_tolerance),
            ("max_engagement", self.max_engagement),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::OutOfRange {
                    name: name.to_string(),
                    value,
                    min: 0.0,
                    max: f64::MAX,
                });
            }
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(ParameterError::OutOfRange {
                name: "margin".to_string(),
                value: self.margin,
                min: 0.0,
                max: f64::MAX,
            });
        }
        if !self.min_engagement.is_finite()
            || self.min_engagement < 0.0
            || self.min_engagement > self.max_engagement
        {
            return Err(ParameterError::OutOfRange {
                name: "min_engagement".to_string(),
                value: self.min_engagement,
                min: 0.0,
                max: self.max_engagement,
            });
        }
        if !self.segmented_derating.is_finite()
            || self.segmented_derating <= 0.0
            || self.segmented_derating > 1.0
        {
            return Err(ParameterError::OutOfRange {
                name: "segmented_derating".to_string(),
                value: self.segmented_derating,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

/// Category tag of a [`PathItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathItemKind {
    Segment,
    BranchEntry,
    Chord,
    SegmentChord,
    LeadinSpiral,
    ReturnToBase,
    DebugSkeleton,
}

/// One move of the final toolpath, in physical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PathItem {
    /// Cutting arc along a slice boundary.
    Segment(Arc),
    /// Travel polyline connecting a branch's first slice to the path so far.
    BranchEntry(Vec<Point>),
    /// Straight connecting move between consecutive slices of a branch.
    Chord(Line),
    /// Straight connecting move between trimmed sub-arcs of one slice.
    SegmentChord(Line),
    /// Lead-in spiral from the root slice center to its first cut.
    LeadinSpiral(Vec<Point>),
    /// Travel polyline back to the root slice center.
    ReturnToBase(Vec<Point>),
    /// Skeleton centerline overlay for debugging.
    DebugSkeleton(Vec<Point>),
}

impl PathItem {
    pub fn kind(&self) -> PathItemKind {
        match self {
            PathItem::Segment(_) => PathItemKind::Segment,
            PathItem::BranchEntry(_) => PathItemKind::BranchEntry,
            PathItem::Chord(_) => PathItemKind::Chord,
            PathItem::SegmentChord(_) => PathItemKind::SegmentChord,
            PathItem::LeadinSpiral(_) => PathItemKind::LeadinSpiral,
            PathItem::ReturnToBase(_) => PathItemKind::ReturnToBase,
            PathItem::DebugSkeleton(_) => PathItemKind::DebugSkeleton,
        }
    }
}

/// The ordered toolpath.
pub type PocketPath = Vec<PathItem>;

/// Committed slices plus the indexes the roll maintains over them.
struct RollState {
    slices: Vec<Slice>,
    ready: SpatialIndex,
    /// First slice of every branch rolled so far.
    roadblocks: Vec<usize>,
    /// Most recently committed slice across all branches.
    last: Option<usize>,
}

impl RollState {
    fn commit(&mut self, slice: Slice) -> usize {
        let id = self.slices.len();
        let bounds = Bounds::from_tuple(slice.ball_bounding_box());
        self.slices.push(slice);
        self.ready.insert(id, &bounds);
        id
    }

    /// Prev-link chain of `start`, root-seed first.
    fn ancestry(&self, start: Option<usize>) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut cursor = start;
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self.slices[id].prev();
        }
        chain.reverse();
        chain
    }

    fn colliding_ids(&self, slice: &Slice) -> Vec<usize> {
        self.ready
            .query(&Bounds::from_tuple(slice.arc_bounding_box()))
    }
}

/// Tests whether the straight move from `a` to `b` stays continuously inside
/// the collider discs.
///
/// All disc/segment intersection events are swept in distance order while a
/// running set tracks which discs cover the travel point; an empty set before
/// the far end invalidates the shortcut. The verdict does not depend on the
/// order of `collider_ids`.
fn shortcut_is_covered(
    slices: &[Slice],
    collider_ids: &[usize],
    a: Point,
    b: Point,
    tolerance: f64,
) -> bool {
    let path = Line::new(a, b);
    let mut events: Vec<(f64, usize)> = Vec::new();
    let mut running: Vec<usize> = Vec::new();

    for &id in collider_ids {
        let ball = slices[id].ball();
        let intersections = ball.intersect_segment(&path, tolerance);
        match intersections.len() {
            0 => {
                // no boundary crossing: covered end to end by this one disc?
                if ball.contains_point(&a, tolerance) && ball.contains_point(&b, tolerance) {
                    return true;
                }
            }
            1 => {
                // one crossing: entering or leaving, depending on which end
                // is inside; a tangent with both ends outside is ignored
                if ball.contains_point(&a, tolerance) {
                    running.push(id);
                } else if !ball.contains_point(&b, tolerance) {
                    continue;
                }
                events.push((intersections[0].distance_to(&a), id));
            }
            _ => {
                events.push((intersections[0].distance_to(&a), id));
                events.push((intersections[1].distance_to(&a), id));
            }
        }
    }

    if running.is_empty() {
        return false;
    }

    events.sort_by(|x, y| x.partial_cmp(y).unwrap_or(Ordering::Equal));
    let total = a.distance_to(&b);

    let mut i = 0;
    while i < events.len() {
        let distance = events[i].0;
        while i < events.len() && events[i].0 == distance {
            let id = events[i].1;
            if let Some(pos) = running.iter().position(|&x| x == id) {
                running.swap_remove(pos);
            } else {
                running.push(id);
            }
            i += 1;
        }
        if running.is_empty() && distance + tolerance < total {
            return false;
        }
    }
    true
}

/// Generates constant-engagement pocket toolpaths for a region.
pub struct PocketGenerator {
    region: Region,
    params: PocketParams,
    boundary: BoundaryIndex,
}

impl PocketGenerator {
    /// Validates the parameters and indexes the region boundary.
    pub fn new(region: Region, params: PocketParams) -> Result<Self, ParameterError> {
        params.validate()?;
        let boundary = BoundaryIndex::new(
            &region,
            params.cutter_diameter / 2.0,
            params.margin,
        );
        Ok(Self {
            region,
            params,
            boundary,
        })
    }

    pub fn params(&self) -> &PocketParams {
        &self.params
    }

    fn cutter_radius(&self) -> f64 {
        self.params.cutter_diameter / 2.0
    }

    /// Narrowest clearance the tool can enter: 5% of the cutter diameter.
    fn min_passable_radius(&self) -> f64 {
        0.1 * self.cutter_radius()
    }

    fn initial_direction(&self) -> RotationDirection {
        self.params
            .mill_direction
            .unwrap_or(RotationDirection::Clockwise)
    }

    /// Computes the pocket toolpath.
    pub fn run(&self) -> PocketResult<PocketPath> {
        let segments = medial_axis::extract_segments(
            &self.region,
            self.cutter_radius(),
            self.params.general_tolerance,
        )?;
        info!("extracted {} medial-axis segments", segments.len());

        let mut tree = skeleton::build_tree(
            &segments,
            &self.region,
            &self.boundary,
            self.params.start_point,
            self.params.general_tolerance,
            self.min_passable_radius(),
        )?;

        let bounds = Bounds::from_tuple(self.region.bounding_box()).inflated(1.0);
        let mut state = RollState {
            slices: Vec::new(),
            ready: SpatialIndex::new(bounds, 8, 16),
            roadblocks: Vec::new(),
            last: None,
        };

        debug!("generating slices");
        let traversal: Vec<usize> = tree.traversal().to_vec();
        for branch_idx in traversal {
            self.roll(&mut tree, branch_idx, &mut state)?;
        }

        debug!("generating path from {} slices", state.slices.len());
        self.generate_path(&tree, &state)
    }

    /// Rolls engagement discs along one branch.
    fn roll(
        &self,
        tree: &mut SkeletonTree,
        branch_idx: usize,
        state: &mut RollState,
    ) -> PocketResult<()> {
        let branch = &mut tree.branches[branch_idx];
        if branch.curve.is_empty() {
            return Err(PocketError::SkeletonConstruction(
                "branch with an empty centerline".to_string(),
            ));
        }

        let start_pt = branch.start();
        let start_radius = self.boundary.clearance_radius(&start_pt);

        let mut prev_id = if branch.parent.is_none() {
            let seed = Slice::full_circle(start_pt, start_radius, self.initial_direction());
            let id = state.commit(seed);
            state.roadblocks.push(id);
            branch.slices.push(id);
            state.last = Some(id);
            id
        } else {
            let nearest = state.roadblocks.iter().copied().min_by(|&a, &b| {
                let da = state.slices[a].center().distance_to(&start_pt);
                let db = state.slices[b].center().distance_to(&start_pt);
                da.partial_cmp(&db).unwrap_or(Ordering::Equal)
            });
            match nearest {
                Some(id) => id,
                None => {
                    warn!("failed to attach branch to a roadblock slice");
                    return Ok(());
                }
            }
        };

        let max_engagement = self.params.max_engagement;
        let mut left = 0.0;

        loop {
            let dir = self.params.mill_direction.unwrap_or_else(|| {
                state
                    .last
                    .map(|id| state.slices[id].direction())
                    .unwrap_or(RotationDirection::Clockwise)
            });

            let mut candidate: Option<Slice> = None;
            let mut right: f64 = 1.0;

            loop {
                let mid = (left + right) / 2.0;
                let pt = branch.point_at(mid);
                let radius = self.boundary.clearance_radius(&pt);

                if radius < self.min_passable_radius() {
                    // impassable narrowing; branches start from passable
                    // mics, so search conservatively towards the start
                    right = mid;
                } else {
                    let mut s =
                        Slice::new(prev_id, &state.slices[prev_id], pt, radius, dir);
                    if s.engagement() == 0.0 {
                        if s.separation() <= 0.0 {
                            left = mid; // contained, can go farther
                        } else {
                            right = mid; // too far
                        }
                    } else {
                        let ids = state.colliding_ids(&s);
                        let colliders: Vec<(usize, &Slice)> =
                            ids.iter().map(|&i| (i, &state.slices[i])).collect();
                        s.refine(
                            &colliders,
                            self.cutter_radius(),
                            self.params.segmented_derating,
                        );
                        let engagement = s.engagement();
                        candidate = Some(s);

                        if engagement > max_engagement {
                            right = mid; // overshoot
                        } else if (max_engagement - engagement) / max_engagement
                            > ENGAGEMENT_TOLERANCE
                        {
                            left = mid; // undershoot outside the strict band
                        } else {
                            left = mid; // good slice inside the band
                            break;
                        }
                    }
                }

                let other = branch.point_at(if left == mid { right } else { left });
                if pt.distance_to(&other) < self.params.general_tolerance {
                    left = mid; // bracket has shrunk below tolerance
                    break;
                }
            }

            let Some(mut candidate) = candidate else {
                return Ok(()); // no more room on this branch
            };

            let overshoot = (candidate.engagement() - max_engagement) / max_engagement;
            if overshoot > ENGAGEMENT_TOLERANCE * OVERSHOOT_RELAXATION {
                error!("failed to create a slice within the stepover limit, stopping the branch");
                return Ok(());
            }
            if candidate.engagement() < self.params.min_engagement {
                return Ok(()); // natural taper
            }

            // with an unconstrained direction, flip if that shortens the
            // connecting move from the last cut end
            if self.params.mill_direction.is_none() {
                if let Some(last_id) = state.last {
                    let end = state.slices[last_id].last_point();
                    if !candidate.segments().is_empty()
                        && end.distance_to(&candidate.last_point())
                            < end.distance_to(&candidate.first_point())
                    {
                        candidate.flip_direction();
                    }
                }
            }

            if branch.slices.is_empty() {
                if let Some(last_id) = state.last {
                    branch.entry =
                        Some(self.switch_branch(state, &candidate, last_id, None, None));
                }
            }

            let id = state.commit(candidate);
            if branch.slices.is_empty() {
                state.roadblocks.push(id);
            }
            branch.slices.push(id);
            state.last = Some(id);
            prev_id = id;
        }
    }

    /// Travel polyline from `src` to `dst` along the slice ancestry, taking a
    /// straight shortcut as soon as one stays covered by cleared discs.
    fn switch_branch(
        &self,
        state: &RollState,
        dst: &Slice,
        src_id: usize,
        dst_pt: Option<Point>,
        src_pt: Option<Point>,
    ) -> Vec<Point> {
        let src = &state.slices[src_id];
        let mut current = src_pt.unwrap_or_else(|| src.last_point());
        let end = dst_pt.unwrap_or_else(|| dst.first_point());

        let mut points = vec![current];

        if dst.prev() != Some(src_id) {
            let src_ancestry = state.ancestry(src.prev());
            let dst_ancestry = state.ancestry(dst.prev());

            let mut lca = 0;
            while lca < src_ancestry.len().min(dst_ancestry.len())
                && src_ancestry[lca] == dst_ancestry[lca]
            {
                lca += 1;
            }

            // walk up from the source to the common ancestor, then down to
            // the destination
            let mut waypoints = Vec::new();
            for i in ((lca + 1)..src_ancestry.len()).rev() {
                waypoints.push(src_ancestry[i]);
            }
            for i in lca..dst_ancestry.len().saturating_sub(1) {
                waypoints.push(dst_ancestry[i]);
            }

            for &slice_id in &waypoints {
                if self.may_shortcut(state, current, end) {
                    break;
                }
                current = state.slices[slice_id].center();
                points.push(current);
            }
        }

        points.push(end);
        points
    }

    fn may_shortcut(&self, state: &RollState, a: Point, b: Point) -> bool {
        let probe = Bounds::new(
            a.x.min(b.x),
            a.y.min(b.y),
            a.x.max(b.x),
            a.y.max(b.y),
        );
        let colliders = state.ready.query(&probe);
        shortcut_is_covered(
            &state.slices,
            &colliders,
            a,
            b,
            self.params.general_tolerance,
        )
    }

    /// Concatenates the final path, gated by the emit options.
    fn generate_path(&self, tree: &SkeletonTree, state: &RollState) -> PocketResult<PocketPath> {
        let emit = &self.params.emit;
        let mut path: PocketPath = Vec::new();

        let root_branch = &tree.branches[tree.traversal()[0]];
        let root_slice_id = *root_branch.slices.first().ok_or_else(|| {
            PocketError::SkeletonConstruction("root branch produced no slices".to_string())
        })?;
        let root_slice = &state.slices[root_slice_id];

        if emit.leadin_spiral {
            let spiral = archimedean_spiral(
                root_slice.center(),
                root_slice.first_point(),
                self.params.max_engagement,
                self.initial_direction(),
            );
            path.push(PathItem::LeadinSpiral(spiral));
        }

        let mut last: Option<usize> = None;
        for &branch_idx in tree.traversal() {
            let branch = &tree.branches[branch_idx];

            if emit.debug_skeleton {
                path.push(PathItem::DebugSkeleton(branch.curve.clone()));
            }
            if emit.branch_entries {
                if let Some(entry) = &branch.entry {
                    path.push(PathItem::BranchEntry(entry.clone()));
                }
            }

            for (slice_idx, &slice_id) in branch.slices.iter().enumerate() {
                let slice = &state.slices[slice_id];

                if emit.chords && slice_idx > 0 {
                    if let Some(last_id) = last {
                        path.push(PathItem::Chord(Line::new(
                            state.slices[last_id].last_point(),
                            slice.first_point(),
                        )));
                    }
                }

                for (seg_idx, arc) in slice.segments().iter().enumerate() {
                    if emit.segment_chords && seg_idx > 0 {
                        path.push(PathItem::SegmentChord(Line::new(
                            slice.segments()[seg_idx - 1].p2,
                            arc.p1,
                        )));
                    }
                    if emit.segments {
                        path.push(PathItem::Segment(*arc));
                    }
                }
                last = Some(slice_id);
            }
        }

        if emit.return_to_base {
            if let Some(last_id) = last {
                let travel = self.switch_branch(
                    state,
                    root_slice,
                    last_id,
                    Some(root_slice.center()),
                    None,
                );
                path.push(PathItem::ReturnToBase(travel));
            }
        }

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CW: RotationDirection = RotationDirection::Clockwise;

    fn disc(x: f64, y: f64, r: f64) -> Slice {
        Slice::full_circle(Point::new(x, y), r, CW)
    }

    #[test]
    fn test_params_validation() {
        let mut params = PocketParams::default();
        assert!(params.validate().is_ok());

        params.cutter_diameter = 0.0;
        assert!(matches!(
            params.validate(),
            Err(ParameterError::OutOfRange { .. })
        ));

        let mut params = PocketParams::default();
        params.min_engagement = params.max_engagement * 2.0;
        assert!(params.validate().is_err());

        let mut params = PocketParams::default();
        params.segmented_derating = 0.0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_default_emit_mask() {
        let emit = EmitOptions::default();
        assert!(emit.segments && emit.branch_entries && emit.chords && emit.leadin_spiral);
        assert!(!emit.segment_chords && !emit.return_to_base && !emit.debug_skeleton);
    }

    #[test]
    fn test_shortcut_covered_by_chain() {
        let slices = vec![disc(0.0, 0.0, 2.0), disc(3.0, 0.0, 2.0), disc(6.0, 0.0, 2.0)];
        let ids = vec![0, 1, 2];
        assert!(shortcut_is_covered(
            &slices,
            &ids,
            Point::new(0.0, 0.0),
            Point::new(6.0, 0.0),
            1e-6,
        ));
    }

    #[test]
    fn test_shortcut_rejected_on_gap() {
        let slices = vec![disc(0.0, 0.0, 2.0), disc(10.0, 0.0, 2.0)];
        let ids = vec![0, 1];
        assert!(!shortcut_is_covered(
            &slices,
            &ids,
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            1e-6,
        ));
    }

    #[test]
    fn test_shortcut_single_disc_contains_both_ends() {
        let slices = vec![disc(5.0, 0.0, 10.0)];
        let ids = vec![0];
        assert!(shortcut_is_covered(
            &slices,
            &ids,
            Point::new(1.0, 0.0),
            Point::new(9.0, 0.0),
            1e-6,
        ));
    }

    #[test]
    fn test_shortcut_uncovered_start() {
        let slices = vec![disc(10.0, 0.0, 2.0)];
        let ids = vec![0];
        assert!(!shortcut_is_covered(
            &slices,
            &ids,
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            1e-6,
        ));
    }

    proptest! {
        // permuting the collider list must never change the verdict
        #[test]
        fn test_shortcut_order_independent(
            permutation in Just((0..6usize).collect::<Vec<_>>()).prop_shuffle()
        ) {
            let slices = vec![
                disc(0.0, 0.0, 2.0),
                disc(2.5, 0.5, 2.0),
                disc(5.0, 0.0, 2.0),
                disc(7.5, -0.5, 2.0),
                disc(10.0, 0.0, 2.0),
                disc(20.0, 20.0, 1.0),
            ];
            let a = Point::new(0.0, 0.0);
            let b = Point::new(10.0, 0.0);
            let baseline_ids: Vec<usize> = (0..6).collect();
            let baseline = shortcut_is_covered(&slices, &baseline_ids, a, b, 1e-6);
            let permuted = shortcut_is_covered(&slices, &permutation, a, b, 1e-6);
            prop_assert_eq!(baseline, permuted);
        }
    }
}
