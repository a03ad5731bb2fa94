use crate::algorithms::refinement::{RefinementFunctor, RefinementOptions};
use crate::storage::SparseGridData;

///
/// A function that defines how refinement is performed.
///
/// # Arguments
/// - `point`: Real coordinates of the grid point.
/// - `alpha`: Surplus coefficient of the grid point.
///
pub type UserRefinementFunction = dyn Fn(&[f64], f64) -> f64 + Send + Sync;

pub struct UserDefinedRefinement<'a>
{
    pub fun_eval: &'a UserRefinementFunction,
    pub options: RefinementOptions,
}

impl RefinementFunctor for UserDefinedRefinement<'_>
{
    fn eval(&self, storage: &SparseGridData, alpha: &[f64]) -> Vec<f64>
    {
        storage.points().zip(alpha.iter()).map(|(point, &a)| (self.fun_eval)(&point, a)).collect()
    }

    fn threshold(&self) -> f64
    {
        self.options.threshold
    }

    fn level_limits(&self) -> Option<&[u8]>
    {
        self.options.level_limits.as_deref()
    }
}

#[test]
fn check_user_defined_scores()
{
    let mut storage = SparseGridData::new(1);
    crate::generators::regular(&mut storage, 2).unwrap();
    // weight surpluses by distance from the left end of the domain
    let fun = |x: &[f64], alpha: f64| alpha.abs() * x[0];
    let functor = UserDefinedRefinement { fun_eval: &fun, options: RefinementOptions::new(0.1) };
    let scores = functor.eval(&storage, &[1.0, 1.0, -1.0]);
    assert_eq!(scores, vec![0.5, 0.25, 0.75]);
}
