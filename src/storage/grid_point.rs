use std::fmt;
use std::hash::{Hash, Hasher};

use bitfield_struct::bitfield;

use crate::errors::SGError;

/// Deepest level a coordinate may carry. Indices at this level still fit in a `u32`.
pub const MAX_LEVEL: u8 = 30;

#[bitfield(u8, new = false)]
#[derive(PartialEq, Eq)]
pub struct GridPointFlags
{
    pub is_leaf: bool,
    pub is_inner: bool,
    #[bits(6)]
    _reserved: u8,
}

impl GridPointFlags
{
    pub fn new(level: &[u8], is_leaf: bool) -> Self
    {
        let mut r = Self::default();
        r.set_is_leaf(is_leaf);
        r.set_is_inner(!level.contains(&0));
        r
    }
}

///
/// A point of the hierarchical grid: one (level, index) pair per dimension.
///
/// Level 0 denotes a boundary coordinate with index 0 (x = 0) or 1 (x = 1).
/// Levels >= 1 carry an odd index in (0, 2^level). Equality and hashing only
/// look at the coordinates, never at the flags.
///
#[derive(Clone, Debug, Default)]
pub struct GridPoint
{
    pub level: Vec<u8>,
    pub index: Vec<u32>,
    pub(crate) flags: GridPointFlags,
}

impl Hash for GridPoint
{
    fn hash<H: Hasher>(&self, state: &mut H)
    {
        self.level.hash(state);
        self.index.hash(state);
    }
}

impl PartialEq for GridPoint
{
    fn eq(&self, other: &Self) -> bool
    {
        self.level == other.level && self.index == other.index
    }
}
impl Eq for GridPoint {}

impl fmt::Display for GridPoint
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "[")?;
        for d in 0..self.level.len()
        {
            if d > 0
            {
                write!(f, ", ")?;
            }
            write!(f, "({},{})", self.level[d], self.index[d])?;
        }
        write!(f, "]")
    }
}

impl GridPoint
{
    pub fn new(level: &[u8], index: &[u32], is_leaf: bool) -> Self
    {
        let flags = GridPointFlags::new(level, is_leaf);
        Self { level: level.to_vec(), index: index.to_vec(), flags }
    }

    ///
    /// The level-one point (0.5, ..., 0.5) of a `num_inputs` dimensional grid.
    ///
    pub fn root(num_inputs: usize) -> Self
    {
        Self::new(&vec![1; num_inputs], &vec![1; num_inputs], true)
    }

    #[inline]
    pub fn dim(&self) -> usize
    {
        self.level.len()
    }

    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }

    pub fn set_is_leaf(&mut self, is_leaf: bool)
    {
        self.flags.set_is_leaf(is_leaf);
    }

    ///
    /// True if no coordinate sits on the boundary (level 0).
    ///
    pub fn is_inner_point(&self) -> bool
    {
        self.flags.is_inner()
    }

    pub(crate) fn update_is_inner(&mut self)
    {
        self.flags.set_is_inner(!self.level.contains(&0));
    }

    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }

    #[inline]
    pub fn level_max(&self) -> u8
    {
        *self.level.iter().max().unwrap_or(&0)
    }

    ///
    /// Checks every (level, index) pair. Returns `InvalidPoint` for out of range
    /// levels, even indices above level 0 or indices outside (0, 2^level).
    ///
    pub fn validate(&self) -> Result<(), SGError>
    {
        if self.level.len() != self.index.len()
        {
            return Err(SGError::InvalidPoint { point: self.to_string(), reason: "level and index have different lengths" });
        }
        for (&l, &i) in self.level.iter().zip(self.index.iter())
        {
            if l > MAX_LEVEL
            {
                return Err(SGError::InvalidPoint { point: self.to_string(), reason: "level exceeds the maximum supported level" });
            }
            if l == 0
            {
                if i > 1
                {
                    return Err(SGError::InvalidPoint { point: self.to_string(), reason: "level 0 only admits index 0 or 1" });
                }
            }
            else if i % 2 == 0 || i >= (1u32 << l)
            {
                return Err(SGError::InvalidPoint { point: self.to_string(), reason: "index must be odd and below 2^level" });
            }
        }
        Ok(())
    }

    ///
    /// Children along `dim`: (level + 1, 2i - 1) and (level + 1, 2i + 1).
    /// A boundary coordinate has the single child (1, 1).
    ///
    pub fn children(&self, dim: usize) -> Vec<GridPoint>
    {
        let (l, i) = (self.level[dim], self.index[dim]);
        if l == 0
        {
            return vec![self.with_coordinate(dim, 1, 1)];
        }
        if l >= MAX_LEVEL
        {
            return Vec::new();
        }
        vec![self.with_coordinate(dim, l + 1, 2 * i - 1), self.with_coordinate(dim, l + 1, 2 * i + 1)]
    }

    /// The other boundary point of a level-zero coordinate.
    pub fn boundary_sibling(&self, dim: usize) -> Option<GridPoint>
    {
        (self.level[dim] == 0).then(|| self.with_coordinate(dim, 0, self.index[dim] ^ 1))
    }

    ///
    /// Hierarchical parents along `dim`. Level-one coordinates hang below both
    /// boundary points; those only exist in grids with boundaries.
    ///
    pub fn parents(&self, dim: usize) -> Vec<GridPoint>
    {
        match self.level[dim]
        {
            0 => Vec::new(),
            1 => vec![self.with_coordinate(dim, 0, 0), self.with_coordinate(dim, 0, 1)],
            l => vec![self.with_coordinate(dim, l - 1, (self.index[dim] >> 1) | 1)],
        }
    }

    pub fn with_coordinate(&self, dim: usize, level: u8, index: u32) -> GridPoint
    {
        let mut r = self.clone();
        r.level[dim] = level;
        r.index[dim] = index;
        r.update_is_inner();
        r
    }

    pub fn unit_coordinate(&self) -> Vec<f64>
    {
        self.level.iter().zip(self.index.iter()).map(|(&l, &i)| i as f64 / (1u64 << l) as f64).collect()
    }
}

///
/// Borrowed view of a stored point.
///
pub struct GridPointRef<'a>
{
    pub(crate) level: &'a [u8],
    pub(crate) index: &'a [u32],
    pub(crate) flags: GridPointFlags,
}

impl GridPointRef<'_>
{
    pub fn level(&self) -> &[u8]
    {
        self.level
    }
    pub fn index(&self) -> &[u32]
    {
        self.index
    }
    pub fn is_leaf(&self) -> bool
    {
        self.flags.is_leaf()
    }
    pub fn is_inner_point(&self) -> bool
    {
        self.flags.is_inner()
    }
    pub fn level_sum(&self) -> u32
    {
        self.level.iter().map(|&l| l as u32).sum()
    }
    pub fn to_owned(&self) -> GridPoint
    {
        GridPoint { level: self.level.to_vec(), index: self.index.to_vec(), flags: self.flags }
    }
}

#[test]
fn check_point_validation()
{
    assert!(GridPoint::new(&[1, 2], &[1, 3], true).validate().is_ok());
    assert!(GridPoint::new(&[0, 3], &[1, 7], true).validate().is_ok());
    assert!(GridPoint::new(&[2], &[2], true).validate().is_err());
    assert!(GridPoint::new(&[2], &[5], true).validate().is_err());
    assert!(GridPoint::new(&[0], &[2], true).validate().is_err());
    assert!(GridPoint::new(&[MAX_LEVEL + 1], &[1], true).validate().is_err());
}

#[test]
fn check_hierarchy_relations()
{
    let point = GridPoint::new(&[2, 1], &[3, 1], true);
    let children = point.children(0);
    assert_eq!(children[0], GridPoint::new(&[3, 1], &[5, 1], true));
    assert_eq!(children[1], GridPoint::new(&[3, 1], &[7, 1], true));
    assert_eq!(point.parents(0), vec![GridPoint::new(&[1, 1], &[1, 1], true)]);
    let parents = point.parents(1);
    assert_eq!(parents.len(), 2);
    assert!(!parents[0].is_inner_point());
    let boundary = GridPoint::new(&[0], &[1], true);
    assert_eq!(boundary.children(0), vec![GridPoint::new(&[1], &[1], true)]);
    assert!(boundary.parents(0).is_empty());
    assert_eq!(point.to_string(), "[(2,3), (1,1)]");
}

#[test]
fn check_unit_coordinate()
{
    let point = GridPoint::new(&[0, 3, 1], &[1, 5, 1], true);
    assert_eq!(point.unit_coordinate(), vec![1.0, 0.625, 0.5]);
}

#[test]
fn check_boundary_coordinate_relations()
{
    // index 0 at level 0 has a single child and no index arithmetic below it
    let left = GridPoint::new(&[0, 2], &[0, 3], true);
    assert_eq!(left.children(0), vec![GridPoint::new(&[1, 2], &[1, 3], true)]);
    assert_eq!(left.boundary_sibling(0), Some(GridPoint::new(&[0, 2], &[1, 3], true)));
    assert_eq!(left.boundary_sibling(1), None);
    let top = GridPoint::new(&[MAX_LEVEL], &[1], true);
    assert!(top.children(0).is_empty());
}
