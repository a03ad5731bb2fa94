//!
//! Hierarchical sparse grids with piecewise-linear hat functions.
//!
//! The crate stores grid points in a flat arena addressed by sequence
//! numbers, navigates the hierarchy through coordinate arithmetic, applies
//! separable bilinear forms (mass, stiffness, first derivative) matrix-free
//! with up/down sweeps and adapts the grid by surplus driven refinement and
//! coarsening.
//!
pub mod algorithms;
pub mod basis;
pub mod errors;
pub mod generators;
pub mod grids;
pub mod iterators;
pub mod refinement;
pub mod serialization;
pub mod storage;

pub use algorithms::direct::DirectMassOperation;
pub use algorithms::refinement::{AdaptivityOptions, RefinementFunctor, RefinementOptions};
pub use algorithms::up_down::{OperatorTerm, UpDownOperation};
pub use basis::kernel::{KernelKind, OperatorKernel};
pub use errors::{ErrorCategory, SGError};
pub use grids::sparse_grid::SparseGrid;
pub use storage::{BoundingBox, GridPoint, Remap, SparseGridData};
