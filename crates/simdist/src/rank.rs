//! Rank identity within a partitioned simulation.

use crate::error::SimError;

/// Which partition a rank-local structure belongs to.
///
/// Resolvers and stores keep a copy of this instead of a pointer back to the
/// system that owns them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RankInfo {
    pub rank: usize,
    pub num_ranks: usize,
}

impl RankInfo {
    pub fn new(rank: usize, num_ranks: usize) -> Result<Self, SimError> {
        if num_ranks == 0 || rank >= num_ranks {
            return Err(SimError::UnknownRank { rank, num_ranks });
        }
        Ok(Self { rank, num_ranks })
    }

    /// A single-rank (non-distributed) context.
    pub fn single() -> Self {
        Self {
            rank: 0,
            num_ranks: 1,
        }
    }

    pub fn is_first(&self) -> bool {
        self.rank == 0
    }

    pub fn is_last(&self) -> bool {
        self.rank + 1 == self.num_ranks
    }

    /// Rank owning the slab below this one along the split axis.
    pub fn lower_neighbor(&self) -> Option<usize> {
        if self.is_first() {
            None
        } else {
            Some(self.rank - 1)
        }
    }

    /// Rank owning the slab above this one along the split axis.
    pub fn upper_neighbor(&self) -> Option<usize> {
        if self.is_last() {
            None
        } else {
            Some(self.rank + 1)
        }
    }
}
