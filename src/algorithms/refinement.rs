use serde::{Deserialize, Serialize};

use crate::errors::SGError;
use crate::storage::{GridPoint, SparseGridData};

#[derive(Default, Debug, Clone, PartialEq)]
pub struct RefinementOptions
{
    pub threshold: f64,
    pub level_limits: Option<Vec<u8>>,
}

impl RefinementOptions
{
    pub fn new(threshold: f64) -> Self
    {
        Self { threshold, ..Default::default() }
    }
}

///
/// Settings for one adaptivity pass of a [`crate::grids::sparse_grid::SparseGrid`].
///
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdaptivityOptions
{
    /// Minimum score for a point to be refined; points below it may be removed.
    pub threshold: f64,
    /// Deepest level refinement may create in any dimension.
    pub max_level: Option<u8>,
    /// Maximum number of points refined (or removed) per pass.
    pub num_points: usize,
}

impl Default for AdaptivityOptions
{
    fn default() -> Self
    {
        Self { threshold: 0.0, max_level: None, num_points: 1 }
    }
}

impl AdaptivityOptions
{
    pub fn refinement_options(&self, num_inputs: usize) -> RefinementOptions
    {
        RefinementOptions { threshold: self.threshold, level_limits: self.max_level.map(|l| vec![l; num_inputs]) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate
{
    pub seq: usize,
    pub score: f64,
}

///
/// Refinement and coarsening candidates of one store. The two lists are
/// disjoint: `refinable` holds scores at or above the threshold, best first,
/// `removable` holds scores below it, worst first.
///
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking
{
    pub refinable: Vec<Candidate>,
    pub removable: Vec<Candidate>,
}

///
/// Scores grid points for refinement and coarsening. Refinement and
/// coarsening share the functor so that user defined criteria can steer
/// either operation.
///
pub trait RefinementFunctor: Send + Sync
{
    ///
    /// Returns one score per point, aligned with sequence numbers. A common
    /// choice is the absolute value of the surplus.
    ///
    fn eval(&self, storage: &SparseGridData, alpha: &[f64]) -> Vec<f64>;

    fn threshold(&self) -> f64
    {
        0.0
    }

    ///
    /// Deepest level refinement may create, per dimension.
    ///
    fn level_limits(&self) -> Option<&[u8]>
    {
        None
    }

    ///
    /// Returns the maximum number of points to be refined. If
    /// set to none there is no limit to the maximum number of points.
    ///
    fn max_num_refined(&self) -> Option<usize>
    {
        None
    }

    ///
    /// Returns the maximum number of points that may be removed.
    ///
    fn max_num_removed(&self) -> Option<usize>
    {
        None
    }

    fn rank(&self, storage: &SparseGridData, alpha: &[f64]) -> Result<Ranking, SGError>
    {
        let limits = level_limits(storage, self.level_limits())?;
        if alpha.len() != storage.len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: storage.len(), values: alpha.len() });
        }
        let scores = self.eval(storage, alpha);
        if scores.len() != storage.len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: storage.len(), values: scores.len() });
        }
        let threshold = self.threshold();
        let mut ranking = Ranking::default();
        iterate_refinable_points(storage, &limits, &mut |seq|
        {
            if scores[seq] >= threshold
            {
                ranking.refinable.push(Candidate { seq, score: scores[seq] });
            }
        });
        if storage.len() > 1
        {
            for (seq, node) in storage.nodes().enumerate()
            {
                // the root and boundary points anchor every pole
                if node.is_leaf() && node.is_inner_point() && storage.level_max(seq) > 1 && scores[seq] < threshold
                {
                    ranking.removable.push(Candidate { seq, score: scores[seq] });
                }
            }
        }
        ranking.refinable.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.seq.cmp(&b.seq)));
        ranking.removable.sort_by(|a, b| a.score.total_cmp(&b.score).then(a.seq.cmp(&b.seq)));
        log::debug!("ranked {} refinable and {} removable points", ranking.refinable.len(), ranking.removable.len());
        Ok(ranking)
    }
}

pub(crate) fn level_limits(storage: &SparseGridData, limits: Option<&[u8]>) -> Result<Vec<u8>, SGError>
{
    match limits
    {
        Some(limits) if limits.len() != storage.num_inputs() =>
        {
            Err(SGError::InvalidLevelLimits { expected: storage.num_inputs(), found: limits.len() })
        }
        Some(limits) => Ok(limits.to_vec()),
        None => Ok(vec![u8::MAX; storage.num_inputs()]),
    }
}

///
/// Calls `operation` for every leaf that still has an un-materialized child
/// below the level ceiling in some dimension.
///
fn iterate_refinable_points<Op: FnMut(usize)>(storage: &SparseGridData, level_limits: &[u8], operation: &mut Op)
{
    for seq in 0..storage.len()
    {
        if !storage.is_leaf(seq)
        {
            continue;
        }
        let point = storage.point(seq);
        let refinable = (0..storage.num_inputs()).any(|d|
        {
            point.level[d] < level_limits[d] && point.children(d).iter().any(|child| !storage.contains(child))
        });
        if refinable
        {
            operation(seq);
        }
    }
}

///
/// Inserts `point` together with every missing hierarchical ancestor so that
/// the store stays downward closed. With boundaries, every level-zero
/// coordinate also gets its other boundary point, so each pole is entered
/// from a complete boundary pair.
///
pub(crate) fn create_point(storage: &mut SparseGridData, point: GridPoint) -> Result<(), SGError>
{
    if storage.contains(&point)
    {
        return Ok(());
    }
    for d in 0..storage.num_inputs()
    {
        for parent in point.parents(d)
        {
            if parent.level[d] == 0 && !storage.has_boundary()
            {
                continue;
            }
            create_point(storage, parent)?;
        }
    }
    let siblings: Vec<GridPoint> = if storage.has_boundary()
    {
        (0..storage.num_inputs()).filter_map(|d| point.boundary_sibling(d)).collect()
    }
    else
    {
        Vec::new()
    };
    log::trace!("inserting {point}");
    storage.insert(point)?;
    for sibling in siblings
    {
        create_point(storage, sibling)?;
    }
    Ok(())
}

///
/// Adds the children of point `seq` in every dimension below the level
/// ceiling. Returns the number of points added, ancestors included.
///
pub(crate) fn refine_point(storage: &mut SparseGridData, seq: usize, level_limits: &[u8]) -> Result<usize, SGError>
{
    let before = storage.len();
    if seq >= before
    {
        return Err(SGError::InvalidIndex { seq, len: before });
    }
    let point = storage.point(seq);
    for d in 0..storage.num_inputs()
    {
        if point.level[d] >= level_limits[d]
        {
            continue;
        }
        for child in point.children(d)
        {
            create_point(storage, child)?;
        }
    }
    Ok(storage.len() - before)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::generators::{regular, regular_with_boundaries};
    use crate::refinement::surplus::SurplusRefinement;
    use indexmap::IndexSet;

    #[test]
    fn check_rank_is_disjoint_and_ordered()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 3).unwrap();
        let alpha: Vec<f64> = (0..storage.len()).map(|i| i as f64 * 0.1 - 0.8).collect();
        let functor = SurplusRefinement(RefinementOptions::new(0.5));
        let ranking = functor.rank(&storage, &alpha).unwrap();
        assert!(!ranking.refinable.is_empty());
        assert!(!ranking.removable.is_empty());
        for c in &ranking.refinable
        {
            assert!(c.score >= 0.5);
            assert!(storage.is_leaf(c.seq));
            assert!(ranking.removable.iter().all(|r| r.seq != c.seq));
        }
        assert!(ranking.refinable.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(ranking.removable.windows(2).all(|w| w[0].score <= w[1].score));
    }

    #[test]
    fn check_level_limits()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 2).unwrap();
        let alpha = vec![1.0; storage.len()];
        let options = RefinementOptions { threshold: 0.0, level_limits: Some(vec![2, 2]) };
        let ranking = SurplusRefinement(options).rank(&storage, &alpha).unwrap();
        // (2,1) can still grow along the second dimension
        assert_eq!(ranking.refinable.len(), 4);
        let options = RefinementOptions { threshold: 0.0, level_limits: Some(vec![2]) };
        assert_eq!(SurplusRefinement(options).rank(&storage, &alpha).unwrap_err(), SGError::InvalidLevelLimits { expected: 2, found: 1 });
    }

    #[test]
    fn check_create_point_closes_ancestors()
    {
        let mut storage = SparseGridData::new(2);
        storage.insert(GridPoint::root(2)).unwrap();
        create_point(&mut storage, GridPoint::new(&[3, 2], &[5, 3], true)).unwrap();
        for (level, index) in [([2u8, 1u8], [3u32, 1u32]), ([1, 2], [1, 3]), ([2, 2], [3, 3]), ([3, 1], [5, 1])]
        {
            assert!(storage.contains(&GridPoint::new(&level, &index, true)));
        }
        assert_eq!(storage.len(), 6);
        let root = storage.find(&GridPoint::root(2)).unwrap();
        assert!(!storage.is_leaf(root));
    }

    #[test]
    fn check_refine_point_with_boundary()
    {
        let mut storage = SparseGridData::with_boundary(1);
        regular_with_boundaries(&mut storage, 1).unwrap();
        assert_eq!(storage.len(), 3);
        let root = storage.find(&GridPoint::root(1)).unwrap();
        let added = refine_point(&mut storage, root, &[u8::MAX]).unwrap();
        assert_eq!(added, 2);
        let ceiling = refine_point(&mut storage, root, &[1]).unwrap();
        assert_eq!(ceiling, 0);
    }

    #[test]
    fn check_boundary_children_get_both_boundary_points()
    {
        let mut storage = SparseGridData::with_boundary(2);
        regular_with_boundaries(&mut storage, 2).unwrap();
        let inner = storage.find(&GridPoint::new(&[1, 2], &[1, 1], true)).unwrap();
        let removed: IndexSet<usize> = [inner].into_iter().collect();
        storage.remove(&removed).unwrap();
        let right = storage.find(&GridPoint::new(&[0, 2], &[1, 1], true)).unwrap();
        refine_point(&mut storage, right, &[u8::MAX, u8::MAX]).unwrap();
        for index in [1, 3]
        {
            assert!(storage.contains(&GridPoint::new(&[0, 3], &[1, index], true)));
            assert!(storage.contains(&GridPoint::new(&[0, 3], &[0, index], true)));
        }
        assert_eq!(storage.first_missing_ancestor(), None);
    }

    #[test]
    fn check_refine_point_out_of_range()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 2).unwrap();
        assert_eq!(refine_point(&mut storage, 3, &[u8::MAX]).unwrap_err(), SGError::InvalidIndex { seq: 3, len: 3 });
        assert_eq!(storage.len(), 3);
    }
}
