use crate::algorithms::sweep::{require, sweep_1d, SweepFunction};
use crate::errors::SGError;
use crate::iterators::grid_iterator::GridIterator;
use crate::storage::SparseGridData;

pub trait HierarchisationOperation: Copy
{
    /// Turns nodal values into hierarchical surpluses in place.
    fn hierarchize(&self, node_values: &mut [f64], storage: &SparseGridData) -> Result<(), SGError>;
    /// Turns hierarchical surpluses back into nodal values in place.
    fn dehierarchize(&self, alpha: &mut [f64], storage: &SparseGridData) -> Result<(), SGError>;
}

struct LinearHierarchisation;

impl LinearHierarchisation
{
    fn recurse(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, left: f64, right: f64) -> Result<usize, SGError>
    {
        let seq = require(iterator, dim)?;
        let mid = source[seq];
        let mut visited = 1;
        if !iterator.hint()
        {
            if iterator.left_child(dim)
            {
                visited += Self::recurse(source, result, iterator, dim, left, mid)?;
            }
            if iterator.step_right(dim)
            {
                visited += Self::recurse(source, result, iterator, dim, mid, right)?;
            }
            iterator.up(dim);
        }
        result[seq] = mid - 0.5 * (left + right);
        Ok(visited)
    }
}

impl SweepFunction for LinearHierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> Result<usize, SGError>
    {
        if iterator.level(dim) > 0
        {
            return Self::recurse(source, result, iterator, dim, 0.0, 0.0);
        }
        let left = source[require(iterator, dim)?];
        iterator.reset_to_right_level_zero(dim);
        let right = source[require(iterator, dim)?];
        let mut visited = 2;
        if iterator.reset_to_level_one(dim)
        {
            visited += Self::recurse(source, result, iterator, dim, left, right)?;
        }
        iterator.reset_to_left_level_zero(dim);
        Ok(visited)
    }
}

struct LinearDehierarchisation;

impl LinearDehierarchisation
{
    fn recurse(source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, left: f64, right: f64) -> Result<usize, SGError>
    {
        let seq = require(iterator, dim)?;
        let mid = source[seq] + 0.5 * (left + right);
        result[seq] = mid;
        let mut visited = 1;
        if !iterator.hint()
        {
            if iterator.left_child(dim)
            {
                visited += Self::recurse(source, result, iterator, dim, left, mid)?;
            }
            if iterator.step_right(dim)
            {
                visited += Self::recurse(source, result, iterator, dim, mid, right)?;
            }
            iterator.up(dim);
        }
        Ok(visited)
    }
}

impl SweepFunction for LinearDehierarchisation
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> Result<usize, SGError>
    {
        if iterator.level(dim) > 0
        {
            return Self::recurse(source, result, iterator, dim, 0.0, 0.0);
        }
        let left = source[require(iterator, dim)?];
        iterator.reset_to_right_level_zero(dim);
        let right = source[require(iterator, dim)?];
        let mut visited = 2;
        if iterator.reset_to_level_one(dim)
        {
            visited += Self::recurse(source, result, iterator, dim, left, right)?;
        }
        iterator.reset_to_left_level_zero(dim);
        Ok(visited)
    }
}

fn check_len(storage: &SparseGridData, values: &[f64]) -> Result<(), SGError>
{
    if values.len() != storage.len()
    {
        return Err(SGError::NumberOfPointsAndValuesMismatch { points: storage.len(), values: values.len() });
    }
    Ok(())
}

///
/// Hierarchisation for piecewise-linear hats, with or without boundary
/// functions depending on the store.
///
#[derive(Clone, Copy, Default)]
pub struct LinearHierarchisationOperation;

impl HierarchisationOperation for LinearHierarchisationOperation
{
    fn hierarchize(&self, node_values: &mut [f64], storage: &SparseGridData) -> Result<(), SGError>
    {
        check_len(storage, node_values)?;
        for d in 0..storage.num_inputs()
        {
            let source = node_values.to_vec();
            sweep_1d(&LinearHierarchisation, storage, &source, node_values, d)?;
        }
        Ok(())
    }

    fn dehierarchize(&self, alpha: &mut [f64], storage: &SparseGridData) -> Result<(), SGError>
    {
        check_len(storage, alpha)?;
        for d in (0..storage.num_inputs()).rev()
        {
            let source = alpha.to_vec();
            sweep_1d(&LinearDehierarchisation, storage, &source, alpha, d)?;
        }
        Ok(())
    }
}
