//! Bounding-box spatial indexing for geometry queries.
//!
//! A loose quadtree over `usize` item ids. Items are keyed by axis-aligned
//! bounding boxes; queries return candidate ids whose boxes intersect the
//! probe box or point. Exact geometric tests stay with the caller.

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Builds bounds from a `(min_x, min_y, max_x, max_y)` tuple.
    pub fn from_tuple(extents: (f64, f64, f64, f64)) -> Self {
        Self::new(extents.0, extents.1, extents.2, extents.3)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Grows the box by `amount` on every side.
    pub fn inflated(&self, amount: f64) -> Self {
        Self::new(
            self.min_x - amount,
            self.min_y - amount,
            self.max_x + amount,
            self.max_y + amount,
        )
    }
}

/// Usage statistics for a spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpatialIndexStats {
    pub total_items: usize,
    pub node_count: usize,
    pub max_depth: usize,
}

#[derive(Debug, Clone)]
struct QuadtreeNode {
    bounds: Bounds,
    depth: usize,
    items: Vec<(usize, Bounds)>,
    children: Option<Box<[QuadtreeNode; 4]>>,
}

impl QuadtreeNode {
    fn new(bounds: Bounds, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    fn quadrants(&self) -> [Bounds; 4] {
        let (cx, cy) = self.bounds.center();
        [
            Bounds::new(self.bounds.min_x, self.bounds.min_y, cx, cy),
            Bounds::new(cx, self.bounds.min_y, self.bounds.max_x, cy),
            Bounds::new(self.bounds.min_x, cy, cx, self.bounds.max_y),
            Bounds::new(cx, cy, self.bounds.max_x, self.bounds.max_y),
        ]
    }

    fn insert(&mut self, item: usize, bounds: Bounds, max_items: usize, max_depth: usize) {
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.bounds.contains(&bounds) {
                    child.insert(item, bounds, max_items, max_depth);
                    return;
                }
            }
            self.items.push((item, bounds));
            return;
        }

        self.items.push((item, bounds));

        if self.items.len() > max_items && self.depth < max_depth {
            let quads = self.quadrants();
            let mut children = Box::new([
                QuadtreeNode::new(quads[0], self.depth + 1),
                QuadtreeNode::new(quads[1], self.depth + 1),
                QuadtreeNode::new(quads[2], self.depth + 1),
                QuadtreeNode::new(quads[3], self.depth + 1),
            ]);
            let items = std::mem::take(&mut self.items);
            for (id, item_bounds) in items {
                let mut placed = false;
                for child in children.iter_mut() {
                    if child.bounds.contains(&item_bounds) {
                        child.insert(id, item_bounds, max_items, max_depth);
                        placed = true;
                        break;
                    }
                }
                if !placed {
                    self.items.push((id, item_bounds));
                }
            }
            self.children = Some(children);
        }
    }

    fn query(&self, probe: &Bounds, out: &mut Vec<usize>) {
        // item boxes are checked directly: the root may hold boxes that
        // reach outside its own bounds
        for (id, bounds) in &self.items {
            if bounds.intersects(probe) {
                out.push(*id);
            }
        }
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                if child.bounds.intersects(probe) {
                    child.query(probe, out);
                }
            }
        }
    }

    fn collect_stats(&self, stats: &mut SpatialIndexStats) {
        stats.total_items += self.items.len();
        stats.node_count += 1;
        stats.max_depth = stats.max_depth.max(self.depth);
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.collect_stats(stats);
            }
        }
    }
}

/// A quadtree index over bounding-box keyed items.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    root: QuadtreeNode,
    max_items: usize,
    max_depth: usize,
}

impl SpatialIndex {
    /// Creates an index covering `bounds`, splitting nodes above `max_items`
    /// entries down to `max_depth` levels.
    pub fn new(bounds: Bounds, max_items: usize, max_depth: usize) -> Self {
        Self {
            root: QuadtreeNode::new(bounds, 0),
            max_items: max_items.max(1),
            max_depth,
        }
    }

    /// The box the index was built over.
    pub fn bounds(&self) -> Bounds {
        self.root.bounds
    }

    /// Inserts an item id keyed by its bounding box.
    ///
    /// Boxes reaching outside the root bounds are kept at the root level, so
    /// inserts never fail.
    pub fn insert(&mut self, item: usize, bounds: &Bounds) {
        self.root
            .insert(item, *bounds, self.max_items, self.max_depth);
    }

    /// Ids of all items whose boxes intersect `probe`.
    pub fn query(&self, probe: &Bounds) -> Vec<usize> {
        let mut out = Vec::new();
        self.root.query(probe, &mut out);
        out
    }

    /// Ids of all items whose boxes contain the point.
    pub fn query_point(&self, x: f64, y: f64) -> Vec<usize> {
        self.query(&Bounds::new(x, y, x, y))
    }

    pub fn stats(&self) -> SpatialIndexStats {
        let mut stats = SpatialIndexStats {
            total_items: 0,
            node_count: 0,
            max_depth: 0,
        };
        self.root.collect_stats(&mut stats);
        stats
    }

    /// Removes all items, keeping the configured bounds.
    pub fn clear(&mut self) {
        self.root = QuadtreeNode::new(self.root.bounds, 0);
    }
}
