use crate::algorithms::coarsening::coarsen;
use crate::algorithms::hierarchisation::{HierarchisationOperation, LinearHierarchisationOperation};
use crate::algorithms::refinement::{level_limits, refine_point, AdaptivityOptions, Candidate, RefinementFunctor};
use crate::algorithms::up_down::UpDownOperation;
use crate::errors::SGError;
use crate::generators;
use crate::refinement::surplus::SurplusRefinement;
use crate::storage::{BoundingBox, PointIterator, Remap, SparseGridData};

///
/// A point store together with one hierarchical surplus per point. All
/// structural changes keep `alpha` aligned with the store's sequence numbers:
/// refinement appends zeros, coarsening permutes through the returned remap.
///
#[derive(Clone, Debug)]
pub struct SparseGrid
{
    pub(crate) storage: SparseGridData,
    pub(crate) alpha: Vec<f64>,
}

impl SparseGrid
{
    pub fn new(num_inputs: usize) -> Self
    {
        Self { storage: SparseGridData::new(num_inputs), alpha: Vec::new() }
    }

    pub fn with_boundary(num_inputs: usize) -> Self
    {
        Self { storage: SparseGridData::with_boundary(num_inputs), alpha: Vec::new() }
    }

    ///
    /// Wraps an existing store with zero surpluses.
    ///
    pub fn from_storage(storage: SparseGridData) -> Self
    {
        let alpha = vec![0.0; storage.len()];
        Self { storage, alpha }
    }

    pub fn regular(num_inputs: usize, level: usize) -> Result<Self, SGError>
    {
        let mut storage = SparseGridData::new(num_inputs);
        generators::regular(&mut storage, level)?;
        Ok(Self::from_storage(storage))
    }

    pub fn regular_with_boundaries(num_inputs: usize, level: usize) -> Result<Self, SGError>
    {
        let mut storage = SparseGridData::with_boundary(num_inputs);
        generators::regular_with_boundaries(&mut storage, level)?;
        Ok(Self::from_storage(storage))
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.storage.is_empty()
    }

    pub fn num_inputs(&self) -> usize
    {
        self.storage.num_inputs()
    }

    pub fn storage(&self) -> &SparseGridData
    {
        &self.storage
    }

    pub fn into_storage(self) -> SparseGridData
    {
        self.storage
    }

    pub fn bounding_box(&self) -> &BoundingBox
    {
        self.storage.bounding_box()
    }

    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) -> Result<(), SGError>
    {
        self.storage.set_bounding_box(bounding_box)
    }

    pub fn points(&self) -> PointIterator<'_>
    {
        self.storage.points()
    }

    pub fn alpha(&self) -> &[f64]
    {
        &self.alpha
    }

    pub fn alpha_mut(&mut self) -> &mut [f64]
    {
        &mut self.alpha
    }

    pub fn set_alpha(&mut self, alpha: Vec<f64>) -> Result<(), SGError>
    {
        if alpha.len() != self.len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: self.len(), values: alpha.len() });
        }
        self.alpha = alpha;
        Ok(())
    }

    ///
    /// Sets nodal values, one per point, and hierarchizes them into `alpha`.
    ///
    pub fn set_values(&mut self, values: &[f64]) -> Result<(), SGError>
    {
        if values.len() != self.len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: self.len(), values: values.len() });
        }
        let mut alpha = values.to_vec();
        LinearHierarchisationOperation.hierarchize(&mut alpha, &self.storage)?;
        self.alpha = alpha;
        Ok(())
    }

    ///
    /// Nodal values of the interpolant described by `alpha`.
    ///
    pub fn values(&self) -> Result<Vec<f64>, SGError>
    {
        let mut values = self.alpha.clone();
        LinearHierarchisationOperation.dehierarchize(&mut values, &self.storage)?;
        Ok(values)
    }

    pub fn mass(&self) -> UpDownOperation<'_>
    {
        UpDownOperation::mass(&self.storage)
    }

    pub fn laplace(&self) -> UpDownOperation<'_>
    {
        UpDownOperation::laplace(&self.storage)
    }

    ///
    /// Applies `operator`, which must have been built on this grid's store.
    ///
    pub fn mult(&self, operator: &UpDownOperation, source: &[f64], result: &mut [f64]) -> Result<(), SGError>
    {
        if !std::ptr::eq(operator.storage(), &self.storage)
        {
            return Err(SGError::UnsupportedGrid("operator was built on a different grid"));
        }
        operator.mult(source, result)
    }

    ///
    /// Refines the `num_points` best candidates of `functor`. Returns the
    /// number of points added; existing points and surpluses are untouched
    /// and new points start with a zero surplus.
    ///
    pub fn refine<F: RefinementFunctor>(&mut self, functor: &F, num_points: usize) -> Result<usize, SGError>
    {
        let ranking = functor.rank(&self.storage, &self.alpha)?;
        self.refine_candidates(functor, &ranking.refinable, num_points)
    }

    ///
    /// Removes up to `num_points` of the worst scoring removable leaves.
    /// Returns the number of points removed.
    ///
    pub fn coarsen<F: RefinementFunctor>(&mut self, functor: &F, num_points: usize) -> Result<usize, SGError>
    {
        Ok(self.coarsen_with_remap(functor, num_points)?.num_removed())
    }

    ///
    /// Same as [`SparseGrid::coarsen`], returning the old to new sequence
    /// number map so that other vectors aligned with the grid can follow.
    ///
    pub fn coarsen_with_remap<F: RefinementFunctor>(&mut self, functor: &F, num_points: usize) -> Result<Remap, SGError>
    {
        let ranking = functor.rank(&self.storage, &self.alpha)?;
        self.coarsen_candidates(functor, &ranking.removable, num_points)
    }

    ///
    /// One adaptivity step: refine then coarsen, both driven by a single
    /// ranking of the current surpluses. Returns (added, removed).
    ///
    pub fn adapt<F: RefinementFunctor>(&mut self, functor: &F, num_refine: usize, num_coarsen: usize) -> Result<(usize, usize), SGError>
    {
        let ranking = functor.rank(&self.storage, &self.alpha)?;
        let added = self.refine_candidates(functor, &ranking.refinable, num_refine)?;
        // refinement only appends, so the removable sequence numbers still hold
        let remap = self.coarsen_candidates(functor, &ranking.removable, num_coarsen)?;
        Ok((added, remap.num_removed()))
    }

    ///
    /// Surplus driven adaptivity step configured by `options`.
    ///
    pub fn adapt_with_options(&mut self, options: &AdaptivityOptions) -> Result<(usize, usize), SGError>
    {
        let functor = SurplusRefinement(options.refinement_options(self.num_inputs()));
        self.adapt(&functor, options.num_points, options.num_points)
    }

    fn refine_candidates<F: RefinementFunctor>(&mut self, functor: &F, candidates: &[Candidate], num_points: usize) -> Result<usize, SGError>
    {
        let limits = level_limits(&self.storage, functor.level_limits())?;
        let max_num = num_points.min(functor.max_num_refined().unwrap_or(usize::MAX));
        if candidates.is_empty() && max_num > 0
        {
            log::warn!("refinement requested but no point is eligible");
            return Ok(0);
        }
        let before = self.len();
        let mut outcome = Ok(());
        for candidate in candidates.iter().take(max_num)
        {
            log::trace!("refining point {} (score {})", candidate.seq, candidate.score);
            if let Err(err) = refine_point(&mut self.storage, candidate.seq, &limits)
            {
                outcome = Err(err);
                break;
            }
        }
        // keep alpha aligned with points inserted before a failure
        self.alpha.resize(self.len(), 0.0);
        outcome?;
        let added = self.len() - before;
        log::debug!("refinement added {} points, grid now has {}", added, self.len());
        Ok(added)
    }

    fn coarsen_candidates<F: RefinementFunctor>(&mut self, functor: &F, candidates: &[Candidate], num_points: usize) -> Result<Remap, SGError>
    {
        let max_num = num_points.min(functor.max_num_removed().unwrap_or(usize::MAX));
        let remap = coarsen(&mut self.storage, candidates, max_num)?;
        if !remap.is_identity()
        {
            self.alpha = remap.apply(&self.alpha)?;
        }
        Ok(remap)
    }
}
