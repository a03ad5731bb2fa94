use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SGError;

///
/// Coarse interpolant seen by one basis function during a down pass: its
/// values at the left and right ends of the function's support. For a
/// boundary (level-0) function these are the two boundary coefficients.
///
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SweepState
{
    pub fl: f64,
    pub fr: f64,
}

impl SweepState
{
    pub const ZERO: SweepState = SweepState { fl: 0.0, fr: 0.0 };

    #[inline]
    pub fn new(fl: f64, fr: f64) -> Self
    {
        Self { fl, fr }
    }

    #[inline]
    pub fn sum(&self) -> f64
    {
        self.fl + self.fr
    }
}

///
/// What a kernel is asked to combine for one function.
///
/// `Coarse` is used on the way down and describes the interpolant of all
/// coarser ancestors. `Fine` is used on the way up and carries the
/// hat-weighted moments of the left and right child subtrees: `fl` is the
/// integral of the subtree against the rising half, `fr` against the falling
/// half. Level-0 functions receive the moments of the whole interior tree in
/// both fields.
///
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Coupling
{
    Coarse(SweepState),
    Fine { left: SweepState, right: SweepState },
}

///
/// One-dimensional bilinear forms. In every form `j` is the result row and
/// `k` the source column, so an operator maps `alpha` to
/// `r_j = sum_k a(phi_j, phi_k) alpha_k`.
///
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelKind
{
    /// (phi_j, phi_k)
    Mass,
    /// (phi_j', phi_k')
    Laplace,
    /// (phi_j, phi_k'): the source function is differentiated.
    PhiDPhi,
    /// (phi_j', phi_k): the result function is differentiated; transpose of `PhiDPhi`.
    DPhiPhi,
}

impl KernelKind
{
    pub fn name(&self) -> &'static str
    {
        match self
        {
            KernelKind::Mass => "mass",
            KernelKind::Laplace => "laplace",
            KernelKind::PhiDPhi => "phidphi",
            KernelKind::DPhiPhi => "dphiphi",
        }
    }
}

impl fmt::Display for KernelKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

impl FromStr for KernelKind
{
    type Err = SGError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_ascii_lowercase().replace(['_', '-'], "").as_str()
        {
            "mass" | "l2" | "identity" => Ok(KernelKind::Mass),
            "laplace" | "gradient" | "stiffness" => Ok(KernelKind::Laplace),
            "phidphi" => Ok(KernelKind::PhiDPhi),
            "dphiphi" => Ok(KernelKind::DPhiPhi),
            _ => Err(SGError::UnknownKernel(s.to_string())),
        }
    }
}

///
/// One-dimensional bilinear form applied along a single dimension by the
/// up/down sweeps.
///
/// Implementors only supply the self coupling of a function and the coupling
/// to coarser (down pass) or finer (up pass) functions, both on the unit
/// interval. The state propagation in `descend`/`ascend` assumes
/// piecewise-linear hats and may be overridden for other families.
///
pub trait OperatorKernel: Send + Sync
{
    /// Self coupling a(phi, phi) on the unit interval.
    fn diagonal(&self, level: u8, index: u32) -> f64;

    fn combine(&self, coupling: Coupling, level: u8, index: u32) -> f64;

    /// Factor applied to every result for a dimension of the given width.
    fn scale(&self, _width: f64) -> f64
    {
        1.0
    }

    fn is_symmetric(&self) -> bool
    {
        false
    }

    fn kind(&self) -> Option<KernelKind>
    {
        None
    }

    ///
    /// States handed to the left and right child of a function with
    /// coefficient `alpha`: the interpolant gains the function's peak.
    ///
    #[inline]
    fn descend(&self, state: SweepState, alpha: f64) -> (SweepState, SweepState)
    {
        let fm = 0.5 * (state.fl + state.fr) + alpha;
        (SweepState::new(state.fl, fm), SweepState::new(fm, state.fr))
    }

    ///
    /// Moments of the subtree rooted at a function with coefficient `alpha`
    /// given the moments of its two child subtrees.
    ///
    #[inline]
    fn ascend(&self, left: SweepState, right: SweepState, level: u8, alpha: f64) -> SweepState
    {
        let h = 1.0 / (1u64 << level) as f64;
        let mid = 0.5 * (left.fr + right.fl) + 0.5 * alpha * h;
        SweepState::new(left.fl + mid, right.fr + mid)
    }
}

#[test]
fn check_kernel_names()
{
    assert_eq!("Mass".parse::<KernelKind>().unwrap(), KernelKind::Mass);
    assert_eq!("phi_dphi".parse::<KernelKind>().unwrap(), KernelKind::PhiDPhi);
    assert_eq!("DPhiPhi".parse::<KernelKind>().unwrap(), KernelKind::DPhiPhi);
    assert_eq!("gradient".parse::<KernelKind>().unwrap(), KernelKind::Laplace);
    assert_eq!("bogus".parse::<KernelKind>().unwrap_err(), SGError::UnknownKernel("bogus".into()));
    for kind in [KernelKind::Mass, KernelKind::Laplace, KernelKind::PhiDPhi, KernelKind::DPhiPhi]
    {
        assert_eq!(kind.to_string().parse::<KernelKind>().unwrap(), kind);
    }
}
