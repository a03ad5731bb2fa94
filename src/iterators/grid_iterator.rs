use crate::storage::{GridPoint, SparseGridData};

///
/// Cursor over the implicit hierarchy of a [`SparseGridData`]. Moves are pure
/// index arithmetic followed by one hash lookup; the cursor may sit on a
/// position that is not stored, in which case `seq()` is `None`.
///
#[derive(Clone)]
pub struct GridIterator<'a>
{
    storage: &'a SparseGridData,
    point: GridPoint,
    seq: Option<usize>,
}

impl<'a> GridIterator<'a>
{
    ///
    /// Starts at the root (1, ..., 1), or at the left boundary corner
    /// (0, ..., 0) for grids with boundaries.
    ///
    pub fn new(storage: &'a SparseGridData) -> Self
    {
        let num_inputs = storage.num_inputs();
        let point = if storage.has_boundary()
        {
            GridPoint::new(&vec![0; num_inputs], &vec![0; num_inputs], true)
        }
        else
        {
            GridPoint::root(num_inputs)
        };
        let seq = storage.find(&point);
        Self { storage, point, seq }
    }

    pub fn storage(&self) -> &'a SparseGridData
    {
        self.storage
    }

    #[inline(always)]
    pub fn point(&self) -> &GridPoint
    {
        &self.point
    }

    #[inline(always)]
    pub fn seq(&self) -> Option<usize>
    {
        self.seq
    }

    #[inline]
    pub fn level(&self, dim: usize) -> u8
    {
        self.point.level[dim]
    }

    #[inline]
    pub fn index(&self, dim: usize) -> u32
    {
        self.point.index[dim]
    }

    pub fn set_point(&mut self, point: GridPoint) -> bool
    {
        self.point = point;
        self.lookup()
    }

    #[inline]
    fn lookup(&mut self) -> bool
    {
        self.seq = self.storage.find(&self.point);
        self.seq.is_some()
    }

    pub fn left_child(&mut self, dim: usize) -> bool
    {
        let i = self.point.index[dim];
        if i == 0
        {
            return false;
        }
        self.point.level[dim] += 1;
        self.point.index[dim] = 2 * i - 1;
        self.lookup()
    }

    pub fn right_child(&mut self, dim: usize) -> bool
    {
        let i = self.point.index[dim];
        self.point.level[dim] += 1;
        self.point.index[dim] = 2 * i + 1;
        self.lookup()
    }

    ///
    /// Moves to the hierarchical parent along `dim`. Level-one and boundary
    /// coordinates have no single parent; the cursor stays put and reports
    /// `false`.
    ///
    pub fn up(&mut self, dim: usize) -> bool
    {
        let l = self.point.level[dim];
        if l <= 1
        {
            return false;
        }
        self.point.level[dim] = l - 1;
        self.point.index[dim] = (self.point.index[dim] >> 1) | 1;
        self.lookup()
    }

    pub fn step_left(&mut self, dim: usize) -> bool
    {
        let i = self.point.index[dim];
        if i < 2
        {
            return false;
        }
        self.point.index[dim] = i - 2;
        self.lookup()
    }

    pub fn step_right(&mut self, dim: usize) -> bool
    {
        self.point.index[dim] += 2;
        self.lookup()
    }

    pub fn reset_to_level_one(&mut self, dim: usize) -> bool
    {
        self.point.level[dim] = 1;
        self.point.index[dim] = 1;
        self.lookup()
    }

    pub fn reset_to_left_level_zero(&mut self, dim: usize) -> bool
    {
        self.point.level[dim] = 0;
        self.point.index[dim] = 0;
        self.lookup()
    }

    pub fn reset_to_right_level_zero(&mut self, dim: usize) -> bool
    {
        self.point.level[dim] = 0;
        self.point.index[dim] = 1;
        self.lookup()
    }

    ///
    /// True when the current position is a leaf or is not stored at all, i.e.
    /// when descending further cannot reach a stored point.
    ///
    #[inline]
    pub fn hint(&self) -> bool
    {
        match self.seq
        {
            Some(seq) => self.storage.is_leaf(seq),
            None => true,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool
    {
        self.hint()
    }

    pub fn is_inner_point(&self) -> bool
    {
        !self.point.level.contains(&0)
    }
}
