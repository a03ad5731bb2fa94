use criterion::{criterion_group, criterion_main, Criterion};
use sgupdown::{errors::SGError, grids::sparse_grid::SparseGrid, DirectMassOperation};

fn build_grid(num_inputs: usize, level: usize) -> Result<SparseGrid, SGError>
{
    let mut grid = SparseGrid::regular(num_inputs, level)?;
    let f = |x: &[f64]| x.iter().map(|xi| xi * (1.0 - xi)).product::<f64>();
    let values: Vec<f64> = grid.points().map(|x| f(&x)).collect();
    grid.set_values(&values)?;
    Ok(grid)
}

fn run_mass(c: &mut Criterion)
{
    let grid = build_grid(4, 6).unwrap();
    let mut result = vec![0.0; grid.len()];
    c.bench_function("mass 4d level 6", |b| b.iter(|| grid.mult(&grid.mass(), grid.alpha(), &mut result).unwrap()));
}

fn run_laplace(c: &mut Criterion)
{
    let grid = build_grid(4, 6).unwrap();
    let mut result = vec![0.0; grid.len()];
    c.bench_function("laplace 4d level 6", |b| b.iter(|| grid.mult(&grid.laplace(), grid.alpha(), &mut result).unwrap()));
}

fn run_direct_mass(c: &mut Criterion)
{
    let grid = build_grid(3, 5).unwrap();
    let mut op = DirectMassOperation::new(grid.storage()).unwrap();
    op.prepare();
    let mut result = vec![0.0; grid.len()];
    c.bench_function("direct mass 3d level 5", |b| b.iter(|| op.mult(grid.alpha(), &mut result).unwrap()));
}

criterion_group!(benches, run_mass, run_laplace, run_direct_mass);
criterion_main!(benches);
