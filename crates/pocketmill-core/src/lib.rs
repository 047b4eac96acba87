//! # PocketMill Core
//!
//! Core 2D geometry for the PocketMill CAM engine: points, segments, arcs
//! and circles with the intersection queries toolpath generation needs,
//! closed machining regions with islands, and a bounding-box quadtree for
//! spatial queries.
//!
//! Everything here is deterministic, synchronous and allocation-light; the
//! pocketing algorithms live in the `pocketmill-cam` crate.

pub mod region;
pub mod shapes;
pub mod spatial_index;

pub use region::{Contour, Region, RegionError};
pub use shapes::{angle_between, Arc, Circle, Line, Point, RotationDirection, Vector};
pub use spatial_index::{Bounds, SpatialIndex, SpatialIndexStats};
