use std::sync::Arc;

use crate::algorithms::sweep::{require, sweep_1d, SweepFunction};
use crate::basis::kernel::{Coupling, KernelKind, OperatorKernel, SweepState};
use crate::basis::linear::LinearKernel;
use crate::errors::SGError;
use crate::iterators::grid_iterator::GridIterator;
use crate::storage::SparseGridData;

/// Grids with fewer points run both branches of every dimension on the calling thread.
const PARALLEL_THRESHOLD: usize = 4096;

///
/// Down pass along one dimension: every function receives its self coupling
/// plus its coupling to the interpolant of all coarser functions on the pole.
///
struct DownSweep<'k>
{
    kernel: &'k dyn OperatorKernel,
    scale: f64,
}

impl DownSweep<'_>
{
    fn recurse(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize, state: SweepState) -> Result<usize, SGError>
    {
        let seq = require(iterator, dim)?;
        let (level, index) = (iterator.level(dim), iterator.index(dim));
        let alpha = source[seq];
        result[seq] = self.scale * (self.kernel.diagonal(level, index) * alpha + self.kernel.combine(Coupling::Coarse(state), level, index));
        let mut visited = 1;
        if !iterator.hint()
        {
            let (left, right) = self.kernel.descend(state, alpha);
            if iterator.left_child(dim)
            {
                visited += self.recurse(source, result, iterator, dim, left)?;
            }
            if iterator.step_right(dim)
            {
                visited += self.recurse(source, result, iterator, dim, right)?;
            }
            iterator.up(dim);
        }
        Ok(visited)
    }
}

impl SweepFunction for DownSweep<'_>
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> Result<usize, SGError>
    {
        if iterator.level(dim) > 0
        {
            return self.recurse(source, result, iterator, dim, SweepState::ZERO);
        }
        let seq_left = require(iterator, dim)?;
        iterator.reset_to_right_level_zero(dim);
        let seq_right = require(iterator, dim)?;
        let state = SweepState::new(source[seq_left], source[seq_right]);
        result[seq_left] = self.scale * (self.kernel.diagonal(0, 0) * state.fl + self.kernel.combine(Coupling::Coarse(state), 0, 0));
        result[seq_right] = self.scale * (self.kernel.diagonal(0, 1) * state.fr + self.kernel.combine(Coupling::Coarse(state), 0, 1));
        let mut visited = 2;
        if iterator.reset_to_level_one(dim)
        {
            visited += self.recurse(source, result, iterator, dim, state)?;
        }
        iterator.reset_to_left_level_zero(dim);
        Ok(visited)
    }
}

///
/// Up pass along one dimension: every function collects the moments of the
/// finer functions below it on the pole.
///
struct UpSweep<'k>
{
    kernel: &'k dyn OperatorKernel,
    scale: f64,
}

impl UpSweep<'_>
{
    fn recurse(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> Result<(SweepState, usize), SGError>
    {
        let seq = require(iterator, dim)?;
        let (level, index) = (iterator.level(dim), iterator.index(dim));
        let mut left = SweepState::ZERO;
        let mut right = SweepState::ZERO;
        let mut visited = 1;
        if !iterator.hint()
        {
            if iterator.left_child(dim)
            {
                let (state, count) = self.recurse(source, result, iterator, dim)?;
                left = state;
                visited += count;
            }
            if iterator.step_right(dim)
            {
                let (state, count) = self.recurse(source, result, iterator, dim)?;
                right = state;
                visited += count;
            }
            iterator.up(dim);
        }
        result[seq] = self.scale * self.kernel.combine(Coupling::Fine { left, right }, level, index);
        Ok((self.kernel.ascend(left, right, level, source[seq]), visited))
    }
}

impl SweepFunction for UpSweep<'_>
{
    fn execute(&self, source: &[f64], result: &mut [f64], iterator: &mut GridIterator, dim: usize) -> Result<usize, SGError>
    {
        if iterator.level(dim) > 0
        {
            return self.recurse(source, result, iterator, dim).map(|(_, visited)| visited);
        }
        let seq_left = require(iterator, dim)?;
        iterator.reset_to_right_level_zero(dim);
        let seq_right = require(iterator, dim)?;
        let (tree, visited) = if iterator.reset_to_level_one(dim)
        {
            self.recurse(source, result, iterator, dim)?
        }
        else
        {
            (SweepState::ZERO, 0)
        };
        let coupling = Coupling::Fine { left: tree, right: tree };
        result[seq_left] = self.scale * self.kernel.combine(coupling, 0, 0);
        result[seq_right] = self.scale * self.kernel.combine(coupling, 0, 1);
        iterator.reset_to_left_level_zero(dim);
        Ok(visited + 2)
    }
}

///
/// One separable summand: `coefficient * (a_0 x a_1 x ... x a_{d-1})`.
///
#[derive(Clone)]
pub struct OperatorTerm
{
    coefficient: f64,
    kernels: Vec<Arc<dyn OperatorKernel>>,
}

impl OperatorTerm
{
    pub fn new(coefficient: f64, kernels: Vec<Arc<dyn OperatorKernel>>) -> Self
    {
        Self { coefficient, kernels }
    }

    ///
    /// Linear hat kernels of the given kinds, one per dimension.
    ///
    pub fn linear(coefficient: f64, kinds: &[KernelKind]) -> Self
    {
        let kernels = kinds.iter().map(|&kind| Arc::new(LinearKernel(kind)) as Arc<dyn OperatorKernel>).collect();
        Self { coefficient, kernels }
    }

    pub fn coefficient(&self) -> f64
    {
        self.coefficient
    }

    pub fn kernel(&self, dim: usize) -> &dyn OperatorKernel
    {
        self.kernels[dim].as_ref()
    }

    pub fn num_inputs(&self) -> usize
    {
        self.kernels.len()
    }
}

///
/// Matrix-free application of a sum of separable bilinear forms to a
/// coefficient vector, using unidirectional up/down sweeps.
///
/// Along every dimension the operator is split into an up part (coupling to
/// finer functions) and a down part (self coupling plus coupling to coarser
/// functions). The up part is applied before recursing into the remaining
/// dimensions and the down part after, which makes the result exact on
/// downward closed grids. One term costs O(2^d * N).
///
pub struct UpDownOperation<'a>
{
    storage: &'a SparseGridData,
    terms: Vec<OperatorTerm>,
}

impl<'a> UpDownOperation<'a>
{
    pub fn with_terms(storage: &'a SparseGridData, terms: Vec<OperatorTerm>) -> Result<Self, SGError>
    {
        for term in &terms
        {
            if term.num_inputs() != storage.num_inputs()
            {
                return Err(SGError::DimensionMismatch { expected: storage.num_inputs(), found: term.num_inputs() });
            }
        }
        Ok(Self { storage, terms })
    }

    /// L2 inner product (phi_j, phi_k).
    pub fn mass(storage: &'a SparseGridData) -> Self
    {
        let kinds = vec![KernelKind::Mass; storage.num_inputs()];
        Self { storage, terms: vec![OperatorTerm::linear(1.0, &kinds)] }
    }

    ///
    /// Stiffness form (grad phi_j, grad phi_k): one term per dimension with the
    /// gradient kernel in that dimension and mass kernels elsewhere.
    ///
    pub fn laplace(storage: &'a SparseGridData) -> Self
    {
        let terms = (0..storage.num_inputs()).map(|d|
        {
            let mut kinds = vec![KernelKind::Mass; storage.num_inputs()];
            kinds[d] = KernelKind::Laplace;
            OperatorTerm::linear(1.0, &kinds)
        }).collect();
        Self { storage, terms }
    }

    /// (phi_j, d/dx_dim phi_k).
    pub fn phi_dphi(storage: &'a SparseGridData, dim: usize) -> Result<Self, SGError>
    {
        Self::mixed(storage, dim, KernelKind::PhiDPhi)
    }

    /// (d/dx_dim phi_j, phi_k).
    pub fn dphi_phi(storage: &'a SparseGridData, dim: usize) -> Result<Self, SGError>
    {
        Self::mixed(storage, dim, KernelKind::DPhiPhi)
    }

    fn mixed(storage: &'a SparseGridData, dim: usize, kind: KernelKind) -> Result<Self, SGError>
    {
        if dim >= storage.num_inputs()
        {
            return Err(SGError::DimensionMismatch { expected: storage.num_inputs(), found: dim + 1 });
        }
        let mut kinds = vec![KernelKind::Mass; storage.num_inputs()];
        kinds[dim] = kind;
        Ok(Self { storage, terms: vec![OperatorTerm::linear(1.0, &kinds)] })
    }

    ///
    /// Single separable term built from kernel names, one per dimension.
    ///
    pub fn from_names(storage: &'a SparseGridData, names: &[&str]) -> Result<Self, SGError>
    {
        if names.len() != storage.num_inputs()
        {
            return Err(SGError::DimensionMismatch { expected: storage.num_inputs(), found: names.len() });
        }
        let kinds = names.iter().map(|name| name.parse::<KernelKind>()).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { storage, terms: vec![OperatorTerm::linear(1.0, &kinds)] })
    }

    pub fn storage(&self) -> &'a SparseGridData
    {
        self.storage
    }

    pub fn terms(&self) -> &[OperatorTerm]
    {
        &self.terms
    }

    pub fn is_symmetric(&self) -> bool
    {
        self.terms.iter().all(|term| term.kernels.iter().all(|kernel| kernel.is_symmetric()))
    }

    ///
    /// Computes `result = A * source`. `result` is only written once the
    /// whole computation succeeded.
    ///
    pub fn mult(&self, source: &[f64], result: &mut [f64]) -> Result<(), SGError>
    {
        let n = self.storage.len();
        if source.len() != n
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: n, values: source.len() });
        }
        if result.len() != n
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: n, values: result.len() });
        }
        if n == 0
        {
            return Ok(());
        }
        if self.storage.num_inputs() == 0
        {
            return Err(SGError::UnsupportedGrid("zero-dimensional grid"));
        }
        log::trace!("up/down on {} points, {} dimensions, {} terms", n, self.storage.num_inputs(), self.terms.len());
        let mut accumulated = vec![0.0; n];
        let mut temp = vec![0.0; n];
        for term in &self.terms
        {
            self.updown(term, source, &mut temp, self.storage.num_inputs() - 1)?;
            for (a, t) in accumulated.iter_mut().zip(temp.iter())
            {
                *a += term.coefficient * t;
            }
        }
        result.copy_from_slice(&accumulated);
        Ok(())
    }

    pub fn apply(&self, source: &[f64]) -> Result<Vec<f64>, SGError>
    {
        let mut result = vec![0.0; self.storage.len()];
        self.mult(source, &mut result)?;
        Ok(result)
    }

    fn updown(&self, term: &OperatorTerm, alpha: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
    {
        let n = alpha.len();
        let kernel = term.kernel(dim);
        if dim == 0
        {
            self.up(kernel, alpha, result, dim)?;
            let mut temp = vec![0.0; n];
            self.down(kernel, alpha, &mut temp, dim)?;
            for (r, t) in result.iter_mut().zip(temp)
            {
                *r += t;
            }
            return Ok(());
        }
        let up_branch = || -> Result<Vec<f64>, SGError>
        {
            let mut temp = vec![0.0; n];
            self.up(kernel, alpha, &mut temp, dim)?;
            let mut r = vec![0.0; n];
            self.updown(term, &temp, &mut r, dim - 1)?;
            Ok(r)
        };
        let down_branch = || -> Result<Vec<f64>, SGError>
        {
            let mut temp = vec![0.0; n];
            self.updown(term, alpha, &mut temp, dim - 1)?;
            let mut r = vec![0.0; n];
            self.down(kernel, &temp, &mut r, dim)?;
            Ok(r)
        };
        let (from_up, from_down) = if n >= PARALLEL_THRESHOLD
        {
            rayon::join(up_branch, down_branch)
        }
        else
        {
            (up_branch(), down_branch())
        };
        for ((r, u), d) in result.iter_mut().zip(from_up?).zip(from_down?)
        {
            *r = u + d;
        }
        Ok(())
    }

    fn up(&self, kernel: &dyn OperatorKernel, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
    {
        let scale = kernel.scale(self.storage.bounding_box().width(dim));
        sweep_1d(&UpSweep { kernel, scale }, self.storage, source, result, dim)
    }

    fn down(&self, kernel: &dyn OperatorKernel, source: &[f64], result: &mut [f64], dim: usize) -> Result<(), SGError>
    {
        let scale = kernel.scale(self.storage.bounding_box().width(dim));
        sweep_1d(&DownSweep { kernel, scale }, self.storage, source, result, dim)
    }
}
