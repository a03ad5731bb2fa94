mod common;

use approx::assert_relative_eq;
use proptest::prelude::*;
use sgupdown::generators::{regular, regular_with_boundaries};
use sgupdown::refinement::surplus::SurplusRefinement;
use sgupdown::serialization::{deserialize, serialize};
use sgupdown::{BoundingBox, DirectMassOperation, ErrorCategory, GridPoint, KernelKind, RefinementOptions, SGError, SparseGrid,
    SparseGridData, UpDownOperation};

use common::{dense_matrix, dense_mult, laplace_terms, test_vector};

fn grid(num_inputs: usize, level: usize, boundary: bool) -> SparseGridData
{
    if boundary
    {
        let mut storage = SparseGridData::with_boundary(num_inputs);
        regular_with_boundaries(&mut storage, level).unwrap();
        storage
    }
    else
    {
        let mut storage = SparseGridData::new(num_inputs);
        regular(&mut storage, level).unwrap();
        storage
    }
}

fn operators(storage: &SparseGridData) -> Vec<(UpDownOperation<'_>, Vec<(f64, Vec<KernelKind>)>)>
{
    let d = storage.num_inputs();
    let mut r = vec![
        (UpDownOperation::mass(storage), vec![(1.0, vec![KernelKind::Mass; d])]),
        (UpDownOperation::laplace(storage), laplace_terms(d)),
    ];
    for dim in 0..d
    {
        let mut kinds = vec![KernelKind::Mass; d];
        kinds[dim] = KernelKind::PhiDPhi;
        r.push((UpDownOperation::phi_dphi(storage, dim).unwrap(), vec![(1.0, kinds.clone())]));
        kinds[dim] = KernelKind::DPhiPhi;
        r.push((UpDownOperation::dphi_phi(storage, dim).unwrap(), vec![(1.0, kinds)]));
    }
    r
}

fn compare_with_dense(storage: &SparseGridData)
{
    let n = storage.len();
    for (op, terms) in operators(storage)
    {
        let matrix = dense_matrix(storage, &terms);
        for k in 0..n
        {
            let mut unit = vec![0.0; n];
            unit[k] = 1.0;
            let column = op.apply(&unit).unwrap();
            for j in 0..n
            {
                assert_relative_eq!(column[j], matrix[j][k], epsilon = 1e-12, max_relative = 1e-10);
            }
        }
        let source = test_vector(n);
        let expected = dense_mult(&matrix, &source);
        for (a, b) in op.apply(&source).unwrap().iter().zip(expected.iter())
        {
            assert_relative_eq!(a, b, epsilon = 1e-12, max_relative = 1e-10);
        }
    }
}

fn set_alpha_by_point(grid: &mut SparseGrid, value: impl Fn(&GridPoint) -> f64)
{
    let alpha = (0..grid.len()).map(|seq| value(&grid.storage().point(seq))).collect();
    grid.set_alpha(alpha).unwrap();
}

#[test]
fn adapted_grids_match_dense()
{
    for num_inputs in 1..=3
    {
        for boundary in [false, true]
        {
            let mut grid = if boundary { SparseGrid::regular_with_boundaries(num_inputs, 2).unwrap() } else { SparseGrid::regular(num_inputs, 2).unwrap() };
            let functor = SurplusRefinement(RefinementOptions::new(0.5));
            for round in 0..3
            {
                let alpha = (0..grid.len()).map(|seq| ((seq * 7 + round * 3) as f64 * 1.3).sin()).collect();
                grid.set_alpha(alpha).unwrap();
                grid.refine(&functor, 3).unwrap();
                let alpha = (0..grid.len()).map(|seq| ((seq * 5 + round) as f64 * 0.7).cos()).collect();
                grid.set_alpha(alpha).unwrap();
                grid.coarsen(&functor, 2).unwrap();
            }
            assert_eq!(grid.storage().first_missing_ancestor(), None);
            compare_with_dense(grid.storage());
        }
    }
}

#[test]
fn refining_a_boundary_leaf_after_coarsening_matches_dense()
{
    let mut grid = SparseGrid::regular_with_boundaries(2, 2).unwrap();
    let coarse = GridPoint::new(&[1, 2], &[1, 1], true);
    let boundary = GridPoint::new(&[0, 2], &[1, 1], true);
    set_alpha_by_point(&mut grid, |point| if *point == coarse { 0.0 } else { 1.0 });
    let functor = SurplusRefinement(RefinementOptions::new(0.5));
    assert_eq!(grid.coarsen(&functor, 1).unwrap(), 1);
    assert!(!grid.storage().contains(&coarse));

    set_alpha_by_point(&mut grid, |point| if *point == boundary { 2.0 } else { 1.0 });
    // (1,1)x(2,1) comes back, plus two level-3 children on each boundary
    assert_eq!(grid.refine(&functor, 1).unwrap(), 5);
    for index in [1, 3]
    {
        assert!(grid.storage().contains(&GridPoint::new(&[0, 3], &[0, index], true)));
    }
    compare_with_dense(grid.storage());
}

#[test]
fn two_dimensional_level_two_matches_dense()
{
    let storage = grid(2, 2, false);
    assert_eq!(storage.len(), 5);
    compare_with_dense(&storage);
}

#[test]
fn two_dimensional_level_two_with_boundary_matches_dense()
{
    let storage = grid(2, 2, true);
    compare_with_dense(&storage);
}

#[test]
fn deeper_grids_match_dense()
{
    compare_with_dense(&grid(1, 5, false));
    compare_with_dense(&grid(2, 4, false));
    compare_with_dense(&grid(3, 3, false));
    compare_with_dense(&grid(1, 4, true));
    compare_with_dense(&grid(2, 3, true));
}

#[test]
fn bounding_box_scaling_matches_dense()
{
    let mut storage = grid(2, 3, false);
    storage.set_bounding_box(BoundingBox::new(&[0.0, -1.0], &[2.0, 0.5]).unwrap()).unwrap();
    compare_with_dense(&storage);
    let mut storage = grid(2, 2, true);
    storage.set_bounding_box(BoundingBox::new(&[-3.0, 1.0], &[1.0, 1.25]).unwrap()).unwrap();
    compare_with_dense(&storage);
}

#[test]
fn mass_of_level_one_function()
{
    // phi_{1,1} is the hat on [0, 1] with height 1
    let storage = grid(1, 1, false);
    let result = UpDownOperation::mass(&storage).apply(&[1.0]).unwrap();
    assert_relative_eq!(result[0], 1.0 / 3.0, epsilon = 1e-14);
    let mut storage = grid(1, 1, false);
    storage.set_bounding_box(BoundingBox::new(&[0.0], &[2.0]).unwrap()).unwrap();
    let result = UpDownOperation::mass(&storage).apply(&[1.0]).unwrap();
    assert_relative_eq!(result[0], 2.0 / 3.0, epsilon = 1e-14);
}

#[test]
fn direct_operator_matches_up_down()
{
    for (num_inputs, level) in [(1, 6), (2, 4), (3, 3)]
    {
        let mut storage = grid(num_inputs, level, false);
        let lower = vec![-0.5; num_inputs];
        let upper: Vec<f64> = (0..num_inputs).map(|d| 1.0 + d as f64).collect();
        storage.set_bounding_box(BoundingBox::new(&lower, &upper).unwrap()).unwrap();
        let source = test_vector(storage.len());
        let expected = UpDownOperation::mass(&storage).apply(&source).unwrap();
        let mut direct = DirectMassOperation::new(&storage).unwrap();
        direct.prepare();
        let mut result = vec![0.0; storage.len()];
        direct.mult(&source, &mut result).unwrap();
        for (a, b) in result.iter().zip(expected.iter())
        {
            assert_relative_eq!(a, b, epsilon = 1e-12, max_relative = 1e-10);
        }
    }
}

#[test]
fn corrupted_store_is_a_structural_error()
{
    let mut storage = grid(2, 3, false);
    // dropping the root breaks every pole
    let root = storage.find(&sgupdown::GridPoint::root(2)).unwrap();
    let removed: indexmap::IndexSet<usize> = [root].into_iter().collect();
    storage.remove(&removed).unwrap();
    let source = vec![1.0; storage.len()];
    let mut result = vec![7.0; storage.len()];
    let err = UpDownOperation::laplace(&storage).mult(&source, &mut result).unwrap_err();
    assert!(matches!(err, SGError::MissingPoint { .. }));
    assert_eq!(err.category(), ErrorCategory::Structural);
    assert!(result.iter().all(|&r| r == 7.0));
}

#[test]
fn unknown_kernel_is_a_configuration_error()
{
    let storage = grid(2, 2, false);
    let err = UpDownOperation::from_names(&storage, &["mass", "biharmonic"]).err().unwrap();
    assert_eq!(err, SGError::UnknownKernel("biharmonic".into()));
    assert_eq!(err.category(), ErrorCategory::Configuration);
    let op = UpDownOperation::from_names(&storage, &["mass", "laplace"]).unwrap();
    assert!(op.is_symmetric());
    assert!(!UpDownOperation::from_names(&storage, &["phidphi", "mass"]).unwrap().is_symmetric());
}

fn dot(a: &[f64], b: &[f64]) -> f64
{
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

proptest!
{
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn symmetric_operators_are_symmetric(num_inputs in 1usize..=3, level in 1usize..=4, boundary in any::<bool>(),
        u in prop::collection::vec(-1.0f64..1.0, 256), v in prop::collection::vec(-1.0f64..1.0, 256))
    {
        let storage = grid(num_inputs, level, boundary);
        let n = storage.len();
        prop_assume!(n <= 256);
        let (u, v) = (&u[..n], &v[..n]);
        for op in [UpDownOperation::mass(&storage), UpDownOperation::laplace(&storage)]
        {
            let au = op.apply(u).unwrap();
            let av = op.apply(v).unwrap();
            let (left, right) = (dot(v, &au), dot(u, &av));
            prop_assert!((left - right).abs() <= 1e-10 * (1.0 + left.abs()));
        }
    }

    #[test]
    fn text_form_round_trips(num_inputs in 1usize..=3, level in 1usize..=4, boundary in any::<bool>(),
        lower in prop::collection::vec(-10.0f64..10.0, 3), width in prop::collection::vec(0.1f64..5.0, 3),
        removed in prop::collection::vec(any::<prop::sample::Index>(), 0..4))
    {
        let mut storage = grid(num_inputs, level, boundary);
        let upper: Vec<f64> = (0..num_inputs).map(|d| lower[d] + width[d]).collect();
        storage.set_bounding_box(BoundingBox::new(&lower[..num_inputs], &upper).unwrap()).unwrap();
        // drop a few leaves to get an irregular store
        let leaves: Vec<usize> = (0..storage.len()).filter(|&seq| storage.is_leaf(seq)).collect();
        let removed: indexmap::IndexSet<usize> = removed.iter().map(|i| leaves[i.index(leaves.len())]).collect();
        if removed.len() < storage.len()
        {
            storage.remove(&removed).unwrap();
        }
        let text = serialize(&storage);
        let restored = deserialize(&text).unwrap();
        prop_assert_eq!(restored.len(), storage.len());
        prop_assert_eq!(restored.bounding_box(), storage.bounding_box());
        prop_assert_eq!(restored.has_boundary(), storage.has_boundary());
        for seq in 0..storage.len()
        {
            prop_assert_eq!(restored.point(seq), storage.point(seq));
            prop_assert_eq!(restored.is_leaf(seq), storage.is_leaf(seq));
        }
        prop_assert_eq!(serialize(&restored), text);
    }
}
