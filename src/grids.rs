pub mod sparse_grid;
