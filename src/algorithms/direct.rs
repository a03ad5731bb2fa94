use std::ops::Range;

use rayon::prelude::*;

use crate::errors::SGError;
use crate::storage::SparseGridData;

/// Default ceiling for the dense matrix cache (4 GiB).
pub const DEFAULT_MATRIX_LIMIT: u64 = 4 << 30;

struct LevelIndexCache
{
    num_inputs: usize,
    // 2^l, 2^-l and i per (point, dimension)
    level: Vec<f64>,
    level_int: Vec<f64>,
    index: Vec<f64>,
    width: Vec<f64>,
}

impl LevelIndexCache
{
    fn new(storage: &SparseGridData) -> Self
    {
        let num_inputs = storage.num_inputs();
        let total = storage.len() * num_inputs;
        let mut level = Vec::with_capacity(total);
        let mut level_int = Vec::with_capacity(total);
        let mut index = Vec::with_capacity(total);
        for node in storage.nodes()
        {
            for (&l, &i) in node.level().iter().zip(node.index().iter())
            {
                let scale = (1u64 << l) as f64;
                level.push(scale);
                level_int.push(1.0 / scale);
                index.push(i as f64);
            }
        }
        let width = (0..num_inputs).map(|d| storage.bounding_box().width(d)).collect();
        Self { num_inputs, level, level_int, index, width }
    }

    ///
    /// L2 product of the 1-d hats of points `i` and `j` along `dim`. For
    /// different levels the wider hat is linear on the narrower support, so
    /// the product is half the narrow width times the sum of the wide hat at
    /// the narrow support's ends.
    ///
    #[inline]
    fn l2_dot(&self, i: usize, j: usize, dim: usize) -> f64
    {
        let (a, b) = (i * self.num_inputs + dim, j * self.num_inputs + dim);
        let (lid, ljd) = (self.level[a], self.level[b]);
        let (iid, ijd) = (self.index[a], self.index[b]);
        let (in_lid, in_ljd) = (self.level_int[a], self.level_int[b]);
        let res = if lid == ljd
        {
            if iid == ijd { 2.0 / 3.0 * in_lid } else { 0.0 }
        }
        else
        {
            let (i1d, in_l1d, i2d, l2d, in_l2d) = if lid > ljd
            {
                (iid, in_lid, ijd, ljd, in_ljd)
            }
            else
            {
                (ijd, in_ljd, iid, lid, in_lid)
            };
            let q = (i1d - 1.0) * in_l1d;
            let p = (i1d + 1.0) * in_l1d;
            let overlap = q.max((i2d - 1.0) * in_l2d) < p.min((i2d + 1.0) * in_l2d);
            if overlap
            {
                (2.0 - (l2d * q - i2d).abs() - (l2d * p - i2d).abs()) * 0.5 * in_l1d
            }
            else
            {
                0.0
            }
        };
        res * self.width[dim]
    }

    #[inline]
    fn entry(&self, i: usize, j: usize) -> f64
    {
        (0..self.num_inputs).map(|d| self.l2_dot(i, j, d)).product()
    }

    fn row(&self, i: usize, source: &[f64]) -> f64
    {
        source.iter().enumerate().map(|(j, &s)| self.entry(i, j) * s).sum()
    }
}

///
/// Splits `n` rows into `parts` contiguous ranges of `n / parts + 1` rows;
/// trailing ranges may be shorter or empty.
///
pub fn partition_rows(n: usize, parts: usize) -> Vec<Range<usize>>
{
    let parts = parts.max(1);
    let portion = n / parts + 1;
    (0..parts).map(|k| (k * portion).min(n)..((k + 1) * portion).min(n)).collect()
}

///
/// Mass matrix applied by evaluating every pairwise L2 product directly.
/// Costs O(N^2 d) per application and serves as a reference for the up/down
/// operator on grids without boundary points.
///
pub struct DirectMassOperation<'a>
{
    storage: &'a SparseGridData,
    cache: Option<LevelIndexCache>,
    matrix: Option<Vec<f64>>,
}

impl<'a> DirectMassOperation<'a>
{
    pub fn new(storage: &'a SparseGridData) -> Result<Self, SGError>
    {
        if (0..storage.len()).any(|seq| !storage.is_inner_point(seq))
        {
            return Err(SGError::UnsupportedGrid("direct mass operator needs a grid without boundary points"));
        }
        Ok(Self { storage, cache: None, matrix: None })
    }

    ///
    /// Builds the level/index cache. Must be called before any product.
    ///
    pub fn prepare(&mut self)
    {
        self.cache = Some(LevelIndexCache::new(self.storage));
        self.matrix = None;
    }

    pub fn is_prepared(&self) -> bool
    {
        self.cache.is_some()
    }

    fn cache(&self) -> Result<&LevelIndexCache, SGError>
    {
        self.cache.as_ref().ok_or(SGError::CacheNotBuilt("prepare"))
    }

    pub fn l2_dot(&self, i: usize, j: usize, dim: usize) -> Result<f64, SGError>
    {
        let cache = self.cache()?;
        let len = self.storage.len();
        for seq in [i, j]
        {
            if seq >= len
            {
                return Err(SGError::InvalidIndex { seq, len });
            }
        }
        if dim >= self.storage.num_inputs()
        {
            return Err(SGError::DimensionMismatch { expected: self.storage.num_inputs(), found: dim + 1 });
        }
        Ok(cache.l2_dot(i, j, dim))
    }

    ///
    /// Assembles and keeps the dense matrix if it fits into `max_bytes`.
    ///
    pub fn store_matrix(&mut self, max_bytes: u64) -> Result<(), SGError>
    {
        let cache = self.cache()?;
        let n = self.storage.len() as u64;
        let required = n.checked_mul(n).and_then(|v| v.checked_mul(std::mem::size_of::<f64>() as u64)).unwrap_or(u64::MAX);
        if required > max_bytes
        {
            return Err(SGError::CapacityExceeded { required, limit: max_bytes });
        }
        let n = self.storage.len();
        let mut matrix = vec![0.0; n * n];
        matrix.par_chunks_mut(n.max(1)).enumerate().for_each(|(i, row)|
        {
            for (j, value) in row.iter_mut().enumerate()
            {
                *value = cache.entry(i, j);
            }
        });
        log::debug!("stored dense mass matrix with {} entries", n * n);
        self.matrix = Some(matrix);
        Ok(())
    }

    ///
    /// Computes the rows in `rows` of `A * source` into `out`.
    ///
    pub fn mult_rows(&self, rows: Range<usize>, source: &[f64], out: &mut [f64]) -> Result<(), SGError>
    {
        let cache = self.cache()?;
        let n = self.storage.len();
        if source.len() != n
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: n, values: source.len() });
        }
        if rows.end > n
        {
            return Err(SGError::InvalidIndex { seq: rows.end - 1, len: n });
        }
        if out.len() != rows.len()
        {
            return Err(SGError::NumberOfPointsAndValuesMismatch { points: rows.len(), values: out.len() });
        }
        match &self.matrix
        {
            Some(matrix) =>
            {
                for (o, i) in out.iter_mut().zip(rows)
                {
                    *o = matrix[i * n..(i + 1) * n].iter().zip(source).map(|(a, s)| a * s).sum();
                }
            }
            None =>
            {
                for (o, i) in out.iter_mut().zip(rows)
                {
                    *o = cache.row(i, source);
                }
            }
        }
        Ok(())
    }

    ///
    /// Computes `result = A * source`, one row partition per rayon worker.
    ///
    pub fn mult(&self, source: &[f64], result: &mut [f64]) -> Result<(), SGError>
    {
        self.cache()?;
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
        let partitions = partition_rows(n, rayon::current_num_threads());
        let portion = partitions[0].len().max(1);
        result.par_chunks_mut(portion).zip(partitions.into_par_iter()).try_for_each(|(out, rows)|
        {
            self.mult_rows(rows, source, out)
        })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::generators::{regular, regular_with_boundaries};
    use approx::assert_relative_eq;

    #[test]
    fn check_partition_rows()
    {
        assert_eq!(partition_rows(10, 3), vec![0..4, 4..8, 8..10]);
        assert_eq!(partition_rows(2, 4), vec![0..1, 1..2, 2..2, 2..2]);
        let covered: usize = partition_rows(17, 5).iter().map(|r| r.len()).sum();
        assert_eq!(covered, 17);
    }

    #[test]
    fn check_state_errors()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 3).unwrap();
        let mut op = DirectMassOperation::new(&storage).unwrap();
        let source = vec![1.0; storage.len()];
        let mut result = vec![0.0; storage.len()];
        let err = op.mult(&source, &mut result).unwrap_err();
        assert_eq!(err, SGError::CacheNotBuilt("prepare"));
        assert_eq!(err.category(), crate::errors::ErrorCategory::State);
        assert!(op.store_matrix(DEFAULT_MATRIX_LIMIT).is_err());
        op.prepare();
        assert!(op.mult(&source, &mut result).is_ok());
    }

    #[test]
    fn check_capacity_limit()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 3).unwrap();
        let mut op = DirectMassOperation::new(&storage).unwrap();
        op.prepare();
        let err = op.store_matrix(1024).unwrap_err();
        assert_eq!(err, SGError::CapacityExceeded { required: 17 * 17 * 8, limit: 1024 });
        assert_eq!(err.category(), crate::errors::ErrorCategory::Capacity);
        op.store_matrix(DEFAULT_MATRIX_LIMIT).unwrap();
    }

    #[test]
    fn check_dense_and_matrix_free_agree()
    {
        let mut storage = SparseGridData::new(2);
        regular(&mut storage, 4).unwrap();
        let source: Vec<f64> = (0..storage.len()).map(|i| ((i * 7 % 11) as f64) - 5.0).collect();
        let mut op = DirectMassOperation::new(&storage).unwrap();
        op.prepare();
        let mut matrix_free = vec![0.0; storage.len()];
        op.mult(&source, &mut matrix_free).unwrap();
        op.store_matrix(DEFAULT_MATRIX_LIMIT).unwrap();
        let mut dense = vec![0.0; storage.len()];
        op.mult(&source, &mut dense).unwrap();
        for (a, b) in matrix_free.iter().zip(dense.iter())
        {
            assert_relative_eq!(a, b, epsilon = 1e-14);
        }
        let rows = 3..9;
        let mut out = vec![0.0; rows.len()];
        op.mult_rows(rows.clone(), &source, &mut out).unwrap();
        assert_eq!(&out[..], &dense[rows]);
    }

    #[test]
    fn check_l2_dot_values()
    {
        let mut storage = SparseGridData::new(1);
        regular(&mut storage, 3).unwrap();
        let mut op = DirectMassOperation::new(&storage).unwrap();
        op.prepare();
        // (1,1) against itself, (2,1) and (3,7)
        assert_relative_eq!(op.l2_dot(0, 0, 0).unwrap(), 1.0 / 3.0);
        assert_relative_eq!(op.l2_dot(0, 1, 0).unwrap(), 0.125);
        assert_relative_eq!(op.l2_dot(6, 0, 0).unwrap(), 0.125 * 0.25);
        assert_eq!(op.l2_dot(1, 2, 0).unwrap(), 0.0);
        assert_eq!(op.l2_dot(3, 2, 0).unwrap(), 0.0);
        assert!(op.l2_dot(0, 7, 0).is_err());
    }

    #[test]
    fn check_rejects_boundary_grids()
    {
        let mut storage = SparseGridData::with_boundary(1);
        regular_with_boundaries(&mut storage, 2).unwrap();
        assert!(matches!(DirectMassOperation::new(&storage), Err(SGError::UnsupportedGrid(_))));
    }
}
