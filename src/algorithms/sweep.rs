use crate::errors::SGError;
use crate::iterators::grid_iterator::GridIterator;
use crate::storage::SparseGridData;

///
/// Work done on one pole (all points that share every coordinate except the
/// swept one). The iterator is positioned at the pole root: level one along
/// `dim`, or the left boundary for grids with boundaries. Implementations must
/// leave it where they found it and return the number of points they visited.
///
pub(crate) trait SweepFunction
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> Result<usize, SGError>;
}

///
/// Shorthand for the structural error raised when a sweep step lands on a
/// coordinate that is not stored.
///
pub(crate) fn require(iterator: &GridIterator, dim: usize) -> Result<usize, SGError>
{
    iterator.seq().ok_or_else(|| SGError::MissingPoint { dim, point: iterator.point().to_string() })
}

fn sweep_recursive<F: SweepFunction>(function: &F, source: &[f64], result: &mut [f64], iterator: &mut GridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize) -> Result<usize, SGError>
{
    let mut visited = function.execute(source, result, iterator, dim_sweep)?;
    for d in 0..dim_rem
    {
        let cur_dim = dim_list[d];
        if iterator.hint()
        {
            continue;
        }
        if iterator.left_child(cur_dim)
        {
            visited += sweep_recursive(function, source, result, iterator, dim_list, d + 1, dim_sweep)?;
        }
        if iterator.step_right(cur_dim)
        {
            visited += sweep_recursive(function, source, result, iterator, dim_list, d + 1, dim_sweep)?;
        }
        iterator.up(cur_dim);
    }
    Ok(visited)
}

fn sweep_boundary_recursive<F: SweepFunction>(function: &F, source: &[f64], result: &mut [f64], iterator: &mut GridIterator,
    dim_list: &[usize], dim_rem: usize, dim_sweep: usize) -> Result<usize, SGError>
{
    if dim_rem == 0
    {
        return function.execute(source, result, iterator, dim_sweep);
    }
    let d = dim_list[dim_rem - 1];
    let mut visited = 0;
    if iterator.level(d) > 0
    {
        visited += sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep)?;
        if !iterator.hint()
        {
            if iterator.left_child(d)
            {
                visited += sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep)?;
            }
            if iterator.step_right(d)
            {
                visited += sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep)?;
            }
            iterator.up(d);
        }
    }
    else
    {
        visited += sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep)?;
        if iterator.reset_to_right_level_zero(d)
        {
            visited += sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem - 1, dim_sweep)?;
        }
        if iterator.reset_to_level_one(d)
        {
            visited += sweep_boundary_recursive(function, source, result, iterator, dim_list, dim_rem, dim_sweep)?;
        }
        iterator.reset_to_left_level_zero(d);
    }
    Ok(visited)
}

///
/// Applies `function` to every pole along `dim_sweep` exactly once.
///
/// Poles are only reachable through stored ancestors. If the sweep visits
/// fewer points than the store holds, some point lacks an ancestor or its
/// boundary sibling and the missing coordinate is reported.
///
pub(crate) fn sweep_1d<F: SweepFunction>(function: &F, storage: &SparseGridData, source: &[f64], result: &mut [f64],
    dim_sweep: usize) -> Result<(), SGError>
{
    let dim_list: Vec<usize> = (0..storage.num_inputs()).filter(|&d| d != dim_sweep).collect();
    let mut iterator = GridIterator::new(storage);
    let visited = if storage.has_boundary()
    {
        sweep_boundary_recursive(function, source, result, &mut iterator, &dim_list, dim_list.len(), dim_sweep)?
    }
    else
    {
        sweep_recursive(function, source, result, &mut iterator, &dim_list, dim_list.len(), dim_sweep)?
    };
    if visited != storage.len()
    {
        log::debug!("sweep along dimension {dim_sweep} reached {visited} of {} points", storage.len());
        let point = match storage.first_missing_ancestor()
        {
            Some(point) => point.to_string(),
            None => format!("{} unreachable points", storage.len().saturating_sub(visited)),
        };
        return Err(SGError::MissingPoint { dim: dim_sweep, point });
    }
    Ok(())
}
