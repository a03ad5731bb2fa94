use indexmap::IndexSet;
use rustc_hash::FxHashMap;

use crate::errors::SGError;

use super::bounding_box::BoundingBox;
use super::grid_point::{GridPoint, GridPointFlags, GridPointRef};

///
/// Hierarchical point store. Points are kept as a struct of arrays and
/// addressed by a contiguous sequence number in [0, len()). Coefficient
/// vectors used with the store are aligned with these sequence numbers.
///
#[derive(Clone, Debug)]
pub struct SparseGridData
{
    pub(crate) bounding_box: BoundingBox,
    pub(crate) index: Vec<u32>,
    pub(crate) level: Vec<u8>,
    pub(crate) flags: Vec<GridPointFlags>,
    pub(crate) num_inputs: usize,
    pub(crate) map: FxHashMap<GridPoint, u32>,
    pub(crate) has_boundary: bool,
}

impl SparseGridData
{
    pub fn new(num_inputs: usize) -> Self
    {
        Self
        {
            bounding_box: BoundingBox::with_dim(num_inputs),
            index: Vec::new(),
            level: Vec::new(),
            flags: Vec::new(),
            num_inputs,
            map: FxHashMap::default(),
            has_boundary: false,
        }
    }

    ///
    /// Empty store whose points may carry level-0 boundary coordinates.
    ///
    pub fn with_boundary(num_inputs: usize) -> Self
    {
        let mut r = Self::new(num_inputs);
        r.has_boundary = true;
        r
    }

    #[inline]
    pub fn num_inputs(&self) -> usize
    {
        self.num_inputs
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.flags.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.flags.is_empty()
    }

    #[inline(always)]
    pub fn has_boundary(&self) -> bool
    {
        self.has_boundary
    }

    pub(crate) fn set_has_boundary(&mut self, has_boundary: bool)
    {
        self.has_boundary = has_boundary;
    }

    pub fn bounding_box(&self) -> &BoundingBox
    {
        &self.bounding_box
    }

    pub fn set_bounding_box(&mut self, bounding_box: BoundingBox) -> Result<(), SGError>
    {
        if bounding_box.dim() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch { expected: self.num_inputs, found: bounding_box.dim() });
        }
        bounding_box.validate()?;
        self.bounding_box = bounding_box;
        Ok(())
    }

    #[inline]
    fn range(&self, seq: usize) -> std::ops::Range<usize>
    {
        seq * self.num_inputs..(seq + 1) * self.num_inputs
    }

    #[inline]
    pub fn point(&self, seq: usize) -> GridPoint
    {
        let range = self.range(seq);
        GridPoint { level: self.level[range.clone()].to_vec(), index: self.index[range].to_vec(), flags: self.flags[seq] }
    }

    #[inline]
    pub fn point_ref(&self, seq: usize) -> GridPointRef<'_>
    {
        let range = self.range(seq);
        GridPointRef { level: &self.level[range.clone()], index: &self.index[range], flags: self.flags[seq] }
    }

    #[inline(always)]
    pub fn level(&self, seq: usize, dim: usize) -> u8
    {
        self.level[self.num_inputs * seq + dim]
    }

    #[inline]
    pub fn index(&self, seq: usize, dim: usize) -> u32
    {
        self.index[self.num_inputs * seq + dim]
    }

    #[inline]
    pub fn is_leaf(&self, seq: usize) -> bool
    {
        self.flags[seq].is_leaf()
    }

    #[inline]
    pub fn is_inner_point(&self, seq: usize) -> bool
    {
        self.flags[seq].is_inner()
    }

    #[inline]
    pub fn level_sum(&self, seq: usize) -> u32
    {
        self.level[self.range(seq)].iter().map(|&l| l as u32).sum()
    }

    #[inline]
    pub fn level_max(&self, seq: usize) -> u8
    {
        *self.level[self.range(seq)].iter().max().unwrap_or(&0)
    }

    ///
    /// Highest level present along `dim`.
    ///
    pub fn max_level(&self, dim: usize) -> u8
    {
        (0..self.len()).map(|seq| self.level(seq, dim)).max().unwrap_or(0)
    }

    #[inline]
    pub fn find(&self, point: &GridPoint) -> Option<usize>
    {
        self.map.get(point).map(|&seq| seq as usize)
    }

    #[inline]
    pub fn index_of(&self, point: &GridPoint) -> Option<usize>
    {
        self.find(point)
    }

    #[inline]
    pub fn contains(&self, point: &GridPoint) -> bool
    {
        self.map.contains_key(point)
    }

    pub fn unit_coordinate(&self, seq: usize) -> Vec<f64>
    {
        let range = self.range(seq);
        self.level[range.clone()].iter().zip(self.index[range].iter()).map(|(&l, &i)| i as f64 / (1u64 << l) as f64).collect()
    }

    ///
    /// True if any hierarchical child of `point` is stored.
    ///
    pub fn has_children(&self, point: &GridPoint) -> bool
    {
        (0..self.num_inputs).any(|dim| point.children(dim).iter().any(|child| self.contains(child)))
    }

    ///
    /// First coordinate, in storage order, that a stored point depends on but
    /// that is missing: a hierarchical parent or, with boundaries, the other
    /// boundary point of a level-zero coordinate. `None` for closed stores.
    ///
    pub fn first_missing_ancestor(&self) -> Option<GridPoint>
    {
        for point in (0..self.len()).map(|seq| self.point(seq))
        {
            for dim in 0..self.num_inputs
            {
                let sibling = point.boundary_sibling(dim).filter(|_| self.has_boundary);
                let missing = point.parents(dim).into_iter()
                    .filter(|parent| self.has_boundary || parent.level[dim] > 0)
                    .chain(sibling)
                    .find(|required| !self.contains(required));
                if missing.is_some()
                {
                    return missing;
                }
            }
        }
        None
    }

    ///
    /// Inserts `point` and returns its sequence number. Inserting a point that
    /// is already stored returns the existing sequence number. Parents of the
    /// new point lose their leaf flag.
    ///
    pub fn insert(&mut self, point: GridPoint) -> Result<usize, SGError>
    {
        if point.dim() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch { expected: self.num_inputs, found: point.dim() });
        }
        point.validate()?;
        if let Some(seq) = self.find(&point)
        {
            return Ok(seq);
        }
        if !self.has_boundary && point.level.contains(&0)
        {
            return Err(SGError::InvalidPoint { point: point.to_string(), reason: "boundary coordinate in a grid without boundaries" });
        }
        let is_leaf = !self.has_children(&point);
        for dim in 0..self.num_inputs
        {
            for parent in point.parents(dim)
            {
                if let Some(seq) = self.find(&parent)
                {
                    self.flags[seq].set_is_leaf(false);
                }
            }
        }
        Ok(self.push(point, is_leaf))
    }

    ///
    /// Appends a point with the given leaf flag without touching any other
    /// flags. Used when reading a stored grid back.
    ///
    pub(crate) fn insert_raw(&mut self, point: GridPoint, is_leaf: bool) -> Result<usize, SGError>
    {
        if point.dim() != self.num_inputs
        {
            return Err(SGError::DimensionMismatch { expected: self.num_inputs, found: point.dim() });
        }
        point.validate()?;
        if self.contains(&point)
        {
            return Err(SGError::InvalidPoint { point: point.to_string(), reason: "duplicate point" });
        }
        if !self.has_boundary && point.level.contains(&0)
        {
            return Err(SGError::InvalidPoint { point: point.to_string(), reason: "boundary coordinate in a grid without boundaries" });
        }
        Ok(self.push(point, is_leaf))
    }

    fn push(&mut self, mut point: GridPoint, is_leaf: bool) -> usize
    {
        let seq = self.len();
        point.set_is_leaf(is_leaf);
        point.update_is_inner();
        self.level.extend_from_slice(&point.level);
        self.index.extend_from_slice(&point.index);
        self.flags.push(point.flags);
        self.map.insert(point, seq as u32);
        seq
    }

    ///
    /// Removes every sequence number in `points` in a single pass. Survivors
    /// keep their relative order and are renumbered contiguously; leaf flags
    /// are recomputed afterwards.
    ///
    pub fn remove(&mut self, points: &IndexSet<usize>) -> Result<Remap, SGError>
    {
        let len = self.len();
        if let Some(&seq) = points.iter().find(|&&seq| seq >= len)
        {
            return Err(SGError::InvalidIndex { seq, len });
        }
        let mut old_to_new = vec![None; len];
        let mut kept = Vec::with_capacity(len - points.len());
        let mut index = Vec::with_capacity(kept.capacity() * self.num_inputs);
        let mut level = Vec::with_capacity(kept.capacity() * self.num_inputs);
        let mut flags = Vec::with_capacity(kept.capacity());
        for seq in (0..len).filter(|seq| !points.contains(seq))
        {
            old_to_new[seq] = Some(kept.len());
            kept.push(seq);
            let range = self.range(seq);
            index.extend_from_slice(&self.index[range.clone()]);
            level.extend_from_slice(&self.level[range]);
            flags.push(self.flags[seq]);
        }
        self.index = index;
        self.level = level;
        self.flags = flags;
        self.generate_map();
        self.update_leaves();
        Ok(Remap { old_to_new, kept })
    }

    fn generate_map(&mut self)
    {
        let mut map = FxHashMap::default();
        map.reserve(self.len());
        for seq in 0..self.len()
        {
            map.insert(self.point(seq), seq as u32);
        }
        self.map = map;
    }

    ///
    /// Recomputes every leaf flag from store membership.
    ///
    pub fn update_leaves(&mut self)
    {
        for seq in 0..self.len()
        {
            let point = self.point(seq);
            let is_leaf = !self.has_children(&point);
            self.flags[seq].set_is_leaf(is_leaf);
        }
    }

    pub fn nodes(&self) -> NodeIterator<'_>
    {
        NodeIterator { storage: self, seq: 0 }
    }

    ///
    /// Real coordinates of every point in sequence order.
    ///
    pub fn points(&self) -> PointIterator<'_>
    {
        PointIterator { storage: self, seq: 0 }
    }
}

pub struct NodeIterator<'a>
{
    storage: &'a SparseGridData,
    seq: usize,
}

impl<'a> Iterator for NodeIterator<'a>
{
    type Item = GridPointRef<'a>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.seq >= self.storage.len()
        {
            return None;
        }
        self.seq += 1;
        Some(self.storage.point_ref(self.seq - 1))
    }
}

pub struct PointIterator<'a>
{
    storage: &'a SparseGridData,
    seq: usize,
}

impl Iterator for PointIterator<'_>
{
    type Item = Vec<f64>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.seq >= self.storage.len()
        {
            return None;
        }
        let unit = self.storage.unit_coordinate(self.seq);
        self.seq += 1;
        Some(self.storage.bounding_box.to_real_coordinate(&unit))
    }
}

///
/// Mapping from pre-removal to post-removal sequence numbers.
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Remap
{
    old_to_new: Vec<Option<usize>>,
    kept: Vec<usize>,
}

impl Remap
{
    pub fn identity(len: usize) -> Self
    {
        Self { old_to_new: (0..len).map(Some).collect(), kept: (0..len).collect() }
    }

    ///
    /// New sequence number of `old`, or `None` if it was removed.
    ///
    pub fn new_index(&self, old: usize) -> Option<usize>
    {
        self.old_to_new.get(old).copied().flatten()
    }

    /// Number of surviving points.
    pub fn len(&self) -> usize
    {
        self.kept.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.kept.is_empty()
    }

    pub fn old_len(&self) -> usize
    {
        self.old_to_new.len()
    }

    pub fn num_removed(&self) -> usize
    {
        self.old_len() - self.len()
    }

    pub fn is_identity(&self) -> bool
    {
        self.num_removed() == 0
    }

    /// Old sequence numbers of the survivors, in their new order.
    pub fn kept(&self) -> &[usize]
    {
        &self.kept
    }

    ///
    /// Carries a vector aligned with the old numbering over to the new one.
    ///
    pub fn apply(&self, values: &[f64]) -> Result<Vec<f64>, SGError>
    {
        if values.len() != self.old_len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: self.old_len(), values: values.len() });
        }
        Ok(self.kept.iter().map(|&old| values[old]).collect())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn one_dimensional_level_three() -> SparseGridData
    {
        let mut storage = SparseGridData::new(1);
        for (l, i) in [(1u8, 1u32), (2, 1), (2, 3), (3, 1), (3, 3), (3, 5), (3, 7)]
        {
            storage.insert(GridPoint::new(&[l], &[i], true)).unwrap();
        }
        storage
    }

    #[test]
    fn check_insert_updates_leaf_flags()
    {
        let mut storage = SparseGridData::new(2);
        let root = storage.insert(GridPoint::root(2)).unwrap();
        assert!(storage.is_leaf(root));
        let child = storage.insert(GridPoint::new(&[2, 1], &[3, 1], true)).unwrap();
        assert!(!storage.is_leaf(root));
        assert!(storage.is_leaf(child));
        assert_eq!(storage.insert(GridPoint::new(&[2, 1], &[3, 1], false)).unwrap(), child);
        assert_eq!(storage.len(), 2);
    }

    #[test]
    fn check_insert_children_first()
    {
        let mut storage = SparseGridData::new(1);
        storage.insert(GridPoint::new(&[2], &[1], true)).unwrap();
        let root = storage.insert(GridPoint::root(1)).unwrap();
        assert!(!storage.is_leaf(root));
    }

    #[test]
    fn check_insert_rejects_invalid_points()
    {
        let mut storage = SparseGridData::new(2);
        assert_eq!(storage.insert(GridPoint::root(3)).unwrap_err(), SGError::DimensionMismatch { expected: 2, found: 3 });
        assert!(storage.insert(GridPoint::new(&[1, 2], &[1, 2], true)).is_err());
        assert!(storage.insert(GridPoint::new(&[0, 1], &[0, 1], true)).is_err());
        let mut storage = SparseGridData::with_boundary(2);
        assert!(storage.insert(GridPoint::new(&[0, 1], &[0, 1], true)).is_ok());
    }

    #[test]
    fn check_raw_insert_rejects_boundary_without_boundaries()
    {
        let mut storage = SparseGridData::new(1);
        let err = storage.insert_raw(GridPoint::new(&[0], &[0], true), true).unwrap_err();
        assert!(matches!(err, SGError::InvalidPoint { .. }));
        assert!(storage.is_empty());
    }

    #[test]
    fn check_first_missing_ancestor()
    {
        let mut storage = one_dimensional_level_three();
        assert_eq!(storage.first_missing_ancestor(), None);
        storage.insert(GridPoint::new(&[5], &[1], true)).unwrap();
        assert_eq!(storage.first_missing_ancestor(), Some(GridPoint::new(&[4], &[1], true)));

        let mut storage = SparseGridData::with_boundary(2);
        for (level, index) in [([0, 1], [0, 1]), ([0, 1], [1, 1]), ([1, 1], [1, 1])]
        {
            storage.insert(GridPoint::new(&level, &index, true)).unwrap();
        }
        // (1,1) in the second dimension hangs below both boundary points
        assert_eq!(storage.first_missing_ancestor(), Some(GridPoint::new(&[0, 0], &[0, 0], true)));
    }

    #[test]
    fn check_remove_renumbers_in_order()
    {
        let mut storage = one_dimensional_level_three();
        let alpha: Vec<f64> = (0..storage.len()).map(|i| i as f64).collect();
        let removed: IndexSet<usize> = [3, 5].into_iter().collect();
        let remap = storage.remove(&removed).unwrap();
        assert_eq!(storage.len(), 5);
        assert_eq!(remap.num_removed(), 2);
        assert_eq!(remap.new_index(3), None);
        assert_eq!(remap.new_index(4), Some(3));
        assert_eq!(remap.new_index(6), Some(4));
        assert_eq!(remap.apply(&alpha).unwrap(), vec![0.0, 1.0, 2.0, 4.0, 6.0]);
        for old in remap.kept()
        {
            let new = remap.new_index(*old).unwrap();
            assert_eq!(storage.find(&storage.point(new)), Some(new));
        }
        // (3,3) survives below (2,1)
        assert!(!storage.is_leaf(1));
    }

    #[test]
    fn check_remove_recomputes_leaves()
    {
        let mut storage = one_dimensional_level_three();
        let removed: IndexSet<usize> = [3, 4].into_iter().collect();
        storage.remove(&removed).unwrap();
        let left = storage.find(&GridPoint::new(&[2], &[1], true)).unwrap();
        assert!(storage.is_leaf(left));
        let right = storage.find(&GridPoint::new(&[2], &[3], true)).unwrap();
        assert!(!storage.is_leaf(right));
    }

    #[test]
    fn check_remove_out_of_range()
    {
        let mut storage = one_dimensional_level_three();
        let removed: IndexSet<usize> = [7].into_iter().collect();
        assert_eq!(storage.remove(&removed).unwrap_err(), SGError::InvalidIndex { seq: 7, len: 7 });
        assert_eq!(storage.len(), 7);
    }

    #[test]
    fn check_points_use_bounding_box()
    {
        let mut storage = one_dimensional_level_three();
        storage.set_bounding_box(BoundingBox::new(&[2.0], &[4.0]).unwrap()).unwrap();
        let points: Vec<Vec<f64>> = storage.points().collect();
        assert_eq!(points[0], vec![3.0]);
        assert_eq!(points[1], vec![2.5]);
        assert_eq!(storage.nodes().filter(|node| node.is_leaf()).count(), 4);
        assert!(storage.set_bounding_box(BoundingBox::with_dim(2)).is_err());
    }
}
