pub mod bounding_box;
pub mod grid_point;
pub mod sparse_grid_data;

pub use bounding_box::BoundingBox;
pub use grid_point::{GridPoint, GridPointFlags, GridPointRef, MAX_LEVEL};
pub use sparse_grid_data::{NodeIterator, PointIterator, Remap, SparseGridData};
