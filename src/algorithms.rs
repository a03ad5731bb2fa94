pub(crate) mod coarsening;
pub(crate) mod sweep;
pub mod direct;
pub mod hierarchisation;
pub mod refinement;
pub mod up_down;
