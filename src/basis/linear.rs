use super::kernel::{Coupling, KernelKind, OperatorKernel, SweepState};

///
/// Piecewise-linear hat functions on the unit interval. Level 0 holds the two
/// boundary functions 1 - x and x.
///
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LinearBasis;

impl LinearBasis
{
    #[inline]
    pub fn eval(&self, level: u8, index: u32, x: f64) -> f64
    {
        if level == 0
        {
            if index == 0 { 1.0 - x } else { x }
        }
        else
        {
            0.0_f64.max(1.0 - f64::abs((1u64 << level) as f64 * x - index as f64))
        }
    }

    ///
    /// Derivative of the hat; at the kinks the one-sided value from the right
    /// is returned.
    ///
    pub fn eval_deriv(&self, level: u8, index: u32, x: f64) -> f64
    {
        if level == 0
        {
            return if index == 0 { -1.0 } else { 1.0 };
        }
        let scale = (1u64 << level) as f64;
        let t = scale * x - index as f64;
        if (-1.0..0.0).contains(&t)
        {
            scale
        }
        else if (0.0..1.0).contains(&t)
        {
            -scale
        }
        else
        {
            0.0
        }
    }

    #[inline]
    pub fn integral(&self, level: u8, _index: u32) -> f64
    {
        if level == 0 { 0.5 } else { 1.0 / (1u64 << level) as f64 }
    }
}

///
/// Closed-form couplings of linear hats for each [`KernelKind`].
///
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LinearKernel(pub KernelKind);

impl LinearKernel
{
    pub fn mass() -> Self
    {
        Self(KernelKind::Mass)
    }

    pub fn laplace() -> Self
    {
        Self(KernelKind::Laplace)
    }

    fn diagonal_boundary(&self, index: u32) -> f64
    {
        match self.0
        {
            KernelKind::Mass => 1.0 / 3.0,
            KernelKind::Laplace => 1.0,
            KernelKind::PhiDPhi | KernelKind::DPhiPhi => if index == 0 { -0.5 } else { 0.5 },
        }
    }

    // coupling of one boundary function to the other one
    fn coarse_boundary(&self, state: SweepState, index: u32) -> f64
    {
        let other = if index == 0 { state.fr } else { state.fl };
        match (self.0, index)
        {
            (KernelKind::Mass, _) => other / 6.0,
            (KernelKind::Laplace, _) => -other,
            (KernelKind::PhiDPhi, 0) | (KernelKind::DPhiPhi, 1) => 0.5 * other,
            (KernelKind::PhiDPhi, _) | (KernelKind::DPhiPhi, _) => -0.5 * other,
        }
    }

    fn fine_boundary(&self, tree: SweepState, index: u32) -> f64
    {
        match (self.0, index)
        {
            (KernelKind::Mass, 0) => tree.fl,
            (KernelKind::Mass, _) => tree.fr,
            (KernelKind::Laplace, _) => 0.0,
            (KernelKind::PhiDPhi, 0) | (KernelKind::DPhiPhi, 1) => tree.sum(),
            (KernelKind::PhiDPhi, _) | (KernelKind::DPhiPhi, _) => -tree.sum(),
        }
    }
}

impl OperatorKernel for LinearKernel
{
    fn diagonal(&self, level: u8, index: u32) -> f64
    {
        if level == 0
        {
            return self.diagonal_boundary(index);
        }
        let h = 1.0 / (1u64 << level) as f64;
        match self.0
        {
            KernelKind::Mass => 2.0 / 3.0 * h,
            KernelKind::Laplace => 2.0 / h,
            KernelKind::PhiDPhi | KernelKind::DPhiPhi => 0.0,
        }
    }

    fn combine(&self, coupling: Coupling, level: u8, index: u32) -> f64
    {
        match coupling
        {
            Coupling::Coarse(state) =>
            {
                if level == 0
                {
                    return self.coarse_boundary(state, index);
                }
                let h = 1.0 / (1u64 << level) as f64;
                match self.0
                {
                    KernelKind::Mass => 0.5 * h * state.sum(),
                    // the coarse interpolant is linear on the support
                    KernelKind::Laplace => 0.0,
                    KernelKind::PhiDPhi => 0.5 * (state.fr - state.fl),
                    KernelKind::DPhiPhi => -0.5 * (state.fr - state.fl),
                }
            }
            Coupling::Fine { left, right } =>
            {
                if level == 0
                {
                    return self.fine_boundary(left, index);
                }
                let inv_h = (1u64 << level) as f64;
                match self.0
                {
                    KernelKind::Mass => left.fr + right.fl,
                    KernelKind::Laplace => 0.0,
                    KernelKind::PhiDPhi => inv_h * (right.sum() - left.sum()),
                    KernelKind::DPhiPhi => inv_h * (left.sum() - right.sum()),
                }
            }
        }
    }

    fn scale(&self, width: f64) -> f64
    {
        match self.0
        {
            KernelKind::Mass => width,
            KernelKind::Laplace => 1.0 / width,
            KernelKind::PhiDPhi | KernelKind::DPhiPhi => 1.0,
        }
    }

    fn is_symmetric(&self) -> bool
    {
        matches!(self.0, KernelKind::Mass | KernelKind::Laplace)
    }

    fn kind(&self) -> Option<KernelKind>
    {
        Some(self.0)
    }
}
