#![allow(dead_code)]

use sgupdown::basis::linear::LinearBasis;
use sgupdown::{KernelKind, SparseGridData};

// Simpson on cells that never contain a kink; derivative factors are
// constant per cell and taken at the midpoint.
fn integrate_1d(kind: KernelKind, row: (u8, u32), col: (u8, u32)) -> f64
{
    let basis = LinearBasis;
    let (row_deriv, col_deriv) = match kind
    {
        KernelKind::Mass => (false, false),
        KernelKind::Laplace => (true, true),
        KernelKind::PhiDPhi => (false, true),
        KernelKind::DPhiPhi => (true, false),
    };
    let finest = row.0.max(col.0).max(1) + 1;
    let cells = 1usize << finest;
    let h = 1.0 / cells as f64;
    let factor = |(l, i): (u8, u32), deriv: bool, x: f64, mid: f64|
    {
        if deriv { basis.eval_deriv(l, i, mid) } else { basis.eval(l, i, x) }
    };
    let mut sum = 0.0;
    for c in 0..cells
    {
        let a = c as f64 * h;
        let m = a + 0.5 * h;
        let b = a + h;
        let f = |x: f64| factor(row, row_deriv, x, m) * factor(col, col_deriv, x, m);
        sum += h / 6.0 * (f(a) + 4.0 * f(m) + f(b));
    }
    sum
}

pub fn entry_1d(kind: KernelKind, row: (u8, u32), col: (u8, u32), width: f64) -> f64
{
    let scale = match kind
    {
        KernelKind::Mass => width,
        KernelKind::Laplace => 1.0 / width,
        KernelKind::PhiDPhi | KernelKind::DPhiPhi => 1.0,
    };
    integrate_1d(kind, row, col) * scale
}

///
/// Dense matrix of sum_t coefficient_t * prod_d a_{t,d}(phi_row, phi_col),
/// assembled by quadrature.
///
pub fn dense_matrix(storage: &SparseGridData, terms: &[(f64, Vec<KernelKind>)]) -> Vec<Vec<f64>>
{
    let n = storage.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for (j, row) in matrix.iter_mut().enumerate()
    {
        for (k, value) in row.iter_mut().enumerate()
        {
            *value = terms.iter().map(|(coefficient, kinds)|
            {
                coefficient * kinds.iter().enumerate().map(|(d, &kind)|
                {
                    let width = storage.bounding_box().width(d);
                    entry_1d(kind, (storage.level(j, d), storage.index(j, d)), (storage.level(k, d), storage.index(k, d)), width)
                }).product::<f64>()
            }).sum();
        }
    }
    matrix
}

pub fn dense_mult(matrix: &[Vec<f64>], source: &[f64]) -> Vec<f64>
{
    matrix.iter().map(|row| row.iter().zip(source).map(|(a, s)| a * s).sum()).collect()
}

pub fn test_vector(n: usize) -> Vec<f64>
{
    (0..n).map(|i| ((i as f64 + 1.0) * 0.731).sin()).collect()
}

pub fn laplace_terms(num_inputs: usize) -> Vec<(f64, Vec<KernelKind>)>
{
    (0..num_inputs).map(|d|
    {
        let mut kinds = vec![KernelKind::Mass; num_inputs];
        kinds[d] = KernelKind::Laplace;
        (1.0, kinds)
    }).collect()
}
