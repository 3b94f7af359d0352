//! Error types for index resolution and rank-level bookkeeping.

use crate::{Gid, Lid};

/// Failure of a resolver operation.
///
/// `DuplicateKey` and `SlotConflict` mean the caller's migration or
/// compaction bookkeeping is broken; they are never retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexError {
    /// The gid has no local slot on this rank.
    NotFound { gid: Gid },
    /// The gid is already mapped to `existing`.
    DuplicateKey { gid: Gid, existing: Lid },
    /// The slot is held by another live gid.
    SlotConflict { lid: Lid, holder: Gid },
    /// The slot was handed out by `allocate_slot` and is waiting for its
    /// claimant.
    SlotReserved { lid: Lid },
    /// The slot lies past the table's growth limit.
    SlotOutOfRange { lid: Lid, limit: usize },
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexError::NotFound { gid } => write!(f, "gid {} has no local slot", gid),
            IndexError::DuplicateKey { gid, existing } => {
                write!(f, "gid {} already mapped to slot {}", gid, existing)
            }
            IndexError::SlotConflict { lid, holder } => {
                write!(f, "slot {} already held by gid {}", lid, holder)
            }
            IndexError::SlotReserved { lid } => write!(f, "slot {} is reserved", lid),
            IndexError::SlotOutOfRange { lid, limit } => {
                write!(f, "slot {} out of range (limit {})", lid, limit)
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Failure of a rank or cluster operation.
#[derive(Clone, Debug, PartialEq)]
pub enum SimError {
    Index(IndexError),
    /// A rank id outside `0..num_ranks`.
    UnknownRank { rank: usize, num_ranks: usize },
    /// A body was handed to a rank whose slab does not contain it.
    OutsideSubdomain { gid: Gid, rank: usize, x: f32 },
    /// A ghost copy arrived for a gid this rank owns.
    GhostOverlapsOwned { gid: Gid },
    InvalidConfig(String),
    /// Index table and storage disagree.
    Inconsistent(String),
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::Index(e) => write!(f, "index error: {}", e),
            SimError::UnknownRank { rank, num_ranks } => {
                write!(f, "rank {} out of range (num_ranks={})", rank, num_ranks)
            }
            SimError::OutsideSubdomain { gid, rank, x } => {
                write!(f, "body {} at x={} is outside the slab of rank {}", gid, x, rank)
            }
            SimError::GhostOverlapsOwned { gid } => {
                write!(f, "ghost copy of body {} collides with an owned body", gid)
            }
            SimError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            SimError::Inconsistent(reason) => write!(f, "inconsistent state: {}", reason),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimError::Index(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IndexError> for SimError {
    fn from(e: IndexError) -> Self {
        SimError::Index(e)
    }
}
