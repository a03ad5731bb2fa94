use crate::algorithms::refinement::{RefinementFunctor, RefinementOptions};
use crate::storage::SparseGridData;

///
/// Scores every point by the magnitude of its hierarchical surplus.
///
pub struct SurplusRefinement(pub RefinementOptions);

impl RefinementFunctor for SurplusRefinement
{
    fn eval(&self, _storage: &SparseGridData, alpha: &[f64]) -> Vec<f64>
    {
        alpha.iter().map(|a| a.abs()).collect()
    }

    #[inline]
    fn threshold(&self) -> f64
    {
        self.0.threshold
    }

    fn level_limits(&self) -> Option<&[u8]>
    {
        self.0.level_limits.as_deref()
    }
}

#[test]
fn check_surplus_scores()
{
    let storage = SparseGridData::new(1);
    let functor = SurplusRefinement(RefinementOptions::new(0.25));
    assert_eq!(functor.eval(&storage, &[-1.0, 0.5, 0.0]), vec![1.0, 0.5, 0.0]);
    assert_eq!(functor.threshold(), 0.25);
    assert!(functor.level_limits().is_none());
}
