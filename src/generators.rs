use crate::errors::SGError;
use crate::storage::{GridPoint, SparseGridData, MAX_LEVEL};

///
/// Generates a regular sparse grid of the given level without boundary
/// points: every (l_0, ..., l_{d-1}) with l_k >= 1 and sum(l_k) <= level + d - 1.
///
pub fn regular(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    let budget = level + storage.num_inputs().saturating_sub(1);
    generate_iterative(storage, level, budget, false)
}

///
/// Generates a regular sparse grid of the given level including level-0
/// boundary points. Boundary coordinates count as level one towards the
/// level sum, so a point enters whenever its interior projection would.
///
pub fn regular_with_boundaries(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    storage.set_has_boundary(true);
    let budget = level + storage.num_inputs().saturating_sub(1);
    generate_iterative(storage, level, budget, true)
}

///
/// Generates the full tensor grid with levels 1..=level in every dimension.
///
pub fn full(storage: &mut SparseGridData, level: usize) -> Result<(), SGError>
{
    let budget = level * storage.num_inputs();
    generate_iterative(storage, level, budget, false)
}

fn one_dimensional_coordinates(level: usize, boundary: bool) -> Vec<(u8, u32)>
{
    let mut r = Vec::new();
    if boundary
    {
        r.push((0, 0));
        r.push((0, 1));
    }
    for l in 1..=level as u8
    {
        for i in (1..(1u32 << l)).step_by(2)
        {
            r.push((l, i));
        }
    }
    r
}

///
/// Builds the grid one dimension at a time: the first dimension is filled
/// directly, then every existing point is expanded along the next dimension
/// while its (boundary-adjusted) level sum stays within `budget`.
///
fn generate_iterative(storage: &mut SparseGridData, level: usize, budget: usize, boundary: bool) -> Result<(), SGError>
{
    let num_inputs = storage.num_inputs();
    if level > MAX_LEVEL as usize
    {
        return Err(SGError::InvalidPoint { point: format!("level {level}"), reason: "level exceeds the maximum supported level" });
    }
    if num_inputs == 0 || level == 0
    {
        return Ok(());
    }
    let coordinates = one_dimensional_coordinates(level, boundary);
    let mut point = GridPoint::root(num_inputs);
    for &(l, i) in &coordinates
    {
        point.level[0] = l;
        point.index[0] = i;
        storage.insert(point.clone())?;
    }
    for d in 1..num_inputs
    {
        let ngrids = storage.len();
        for g in 0..ngrids
        {
            let mut point = storage.point(g);
            // dimension d still sits at (1, 1)
            let used: usize = point.level.iter().map(|&l| l.max(1) as usize).sum::<usize>() - 1;
            for &(l, i) in &coordinates
            {
                if used + l.max(1) as usize > budget
                {
                    break;
                }
                point.level[d] = l;
                point.index[d] = i;
                storage.insert(point.clone())?;
            }
        }
    }
    log::debug!("generated grid with {} points in {} dimensions", storage.len(), num_inputs);
    Ok(())
}

#[test]
fn test_regular()
{
    let mut storage = SparseGridData::new(2);
    regular(&mut storage, 3).expect("Could not generate grid");
    assert_eq!(storage.len(), 17);
    assert_eq!(storage.nodes().filter(|node| node.is_leaf()).count(), 12);
    let mut storage = SparseGridData::new(3);
    regular(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 7);
}

#[test]
fn test_full()
{
    let mut storage = SparseGridData::new(2);
    full(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 9);
    assert!(storage.contains(&GridPoint::new(&[2, 2], &[3, 1], true)));
}

#[test]
fn test_truncated_boundaries_1d()
{
    let mut storage = SparseGridData::new(1);
    regular_with_boundaries(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 5);
    assert!(storage.has_boundary());
}

#[test]
fn test_truncated_boundaries_2d()
{
    let mut storage = SparseGridData::with_boundary(2);
    regular_with_boundaries(&mut storage, 2).expect("Could not generate grid");
    assert_eq!(storage.len(), 21);
    let mut storage2 = SparseGridData::with_boundary(2);
    regular_with_boundaries(&mut storage2, 3).expect("Could not generate grid");
    assert_eq!(storage2.len(), 49);
    assert!(storage2.contains(&GridPoint::new(&[1, 1], &[1, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[1, 2], &[1, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[2, 2], &[3, 1], false)));
    assert!(!storage2.contains(&GridPoint::new(&[3, 2], &[5, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[3, 1], &[5, 1], false)));
    assert!(storage2.contains(&GridPoint::new(&[3, 0], &[5, 0], false)));
    assert!(storage2.contains(&GridPoint::new(&[0, 0], &[0, 0], false)));
    let corner = storage2.find(&GridPoint::new(&[0, 0], &[0, 0], false)).unwrap();
    assert!(!storage2.is_leaf(corner));
}
