use indexmap::IndexSet;

use crate::errors::SGError;
use crate::storage::{Remap, SparseGridData};

use super::refinement::Candidate;

///
/// Removes up to `max_num` candidates, in the given order, with a single
/// batched removal. A candidate that still has children is skipped since its
/// removal would orphan them.
///
pub(crate) fn coarsen(storage: &mut SparseGridData, candidates: &[Candidate], max_num: usize) -> Result<Remap, SGError>
{
    let mut removed = IndexSet::new();
    for candidate in candidates
    {
        if removed.len() >= max_num
        {
            break;
        }
        if candidate.seq >= storage.len()
        {
            return Err(SGError::InvalidIndex { seq: candidate.seq, len: storage.len() });
        }
        let point = storage.point(candidate.seq);
        if storage.has_children(&point)
        {
            log::warn!("not removing {point}: it still has children");
            continue;
        }
        log::trace!("removing {point} (score {})", candidate.score);
        removed.insert(candidate.seq);
    }
    if removed.is_empty()
    {
        return Ok(Remap::identity(storage.len()));
    }
    let remap = storage.remove(&removed)?;
    log::debug!("coarsening removed {} points, {} remain", remap.num_removed(), remap.len());
    Ok(remap)
}
