//! # PocketMill CAM
//!
//! Constant-engagement pocket milling toolpaths for closed 2D regions with
//! islands.
//!
//! ## Pipeline
//!
//! ```text
//! Region (outline + islands)
//!   ├── Medial axis (Voronoi edge filtering)
//!   ├── Skeleton tree (endpoint pool, depth-first branches)
//!   ├── Slice roll (engagement discs, binary placement search, trimming)
//!   └── Path assembly (lead-in spiral, arcs, chords, travel moves)
//! ```
//!
//! The cutter removes the full interior of the region while the fresh
//! material engaged at any instant stays within the configured bounds; travel
//! between branches rides previously cleared discs and takes straight
//! shortcuts where coverage allows.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pocketmill_cam::{PocketGenerator, PocketParams, Contour, Region};
//!
//! let outline = Contour::rectangle(0.0, 0.0, 80.0, 40.0)?;
//! let region = Region::new(outline, Vec::new());
//! let generator = PocketGenerator::new(region, PocketParams::for_cutter(3.0))?;
//! let path = generator.run()?;
//! ```

pub mod clearance;
pub mod error;
pub mod pocket;
pub mod slice;

mod medial_axis;
mod skeleton;
mod spiral;

pub use clearance::BoundaryIndex;
pub use error::{ParameterError, PocketError, PocketResult};
pub use pocket::{
    EmitOptions, PathItem, PathItemKind, PocketGenerator, PocketParams, PocketPath,
    ENGAGEMENT_TOLERANCE, OVERSHOOT_RELAXATION,
};
pub use slice::Slice;

pub use pocketmill_core::{
    Arc, Circle, Contour, Line, Point, Region, RegionError, RotationDirection,
};
