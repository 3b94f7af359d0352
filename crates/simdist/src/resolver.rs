//! Global-id to local-slot resolution for one rank.
//!
//! Every body in a distributed simulation carries a [`Gid`] that is unique
//! across all ranks. Inside a rank, per-body state lives in contiguous arrays
//! and is addressed by a [`Lid`]. The [`LocalIndexTable`] is the authoritative
//! mapping between the two, and also hands out free slots for incoming bodies.
//!
//! Slot reuse is driven by a `first_empty` cursor: every slot below it is
//! known to be occupied, so allocation starts probing there. Freeing a slot
//! below the cursor pulls the cursor back down.

use rustc_hash::FxHashMap;

use crate::error::IndexError;
use crate::rank::RankInfo;
use crate::{Gid, Lid};

/// Returned by [`LocalIndexTable::lookup_local_index`] for unknown gids.
pub const NOT_FOUND: i64 = -1;

/// Largest capacity a caller-supplied lid may grow the table to.
///
/// Slots handed out by `allocate_slot` are not subject to this limit.
pub const MAX_LOCAL_SLOTS: usize = 1 << 24;

/// Occupancy of one local slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    /// Handed out by `allocate_slot` and not yet bound to a gid.
    Reserved,
    Live(Gid),
}

/// Rank-local gid -> lid table with free-slot tracking.
#[derive(Clone, Debug)]
pub struct LocalIndexTable {
    rank: RankInfo,
    gid_to_lid: FxHashMap<Gid, Lid>,
    slots: Vec<SlotState>,
    first_empty: usize,
}

impl LocalIndexTable {
    /// Create an empty table for the given rank.
    pub fn new(rank: RankInfo) -> Self {
        Self {
            rank,
            gid_to_lid: FxHashMap::default(),
            slots: Vec::new(),
            first_empty: 0,
        }
    }

    /// Rank this table belongs to.
    pub fn rank(&self) -> RankInfo {
        self.rank
    }

    /// Local slot of `gid`, if the body is present on this rank.
    #[inline]
    pub fn local_index(&self, gid: Gid) -> Option<Lid> {
        self.gid_to_lid.get(&gid).copied()
    }

    /// Local slot of `gid` as a signed index, or [`NOT_FOUND`].
    ///
    /// This is the form packed into exchange buffers, where absence has to be
    /// encoded in-band.
    #[inline]
    pub fn lookup_local_index(&self, gid: Gid) -> i64 {
        match self.local_index(gid) {
            Some(lid) => lid as i64,
            None => NOT_FOUND,
        }
    }

    /// Bind `gid` to `lid`.
    ///
    /// The slot may be empty or previously reserved by [`allocate_slot`].
    /// Existing mappings are never overwritten, and a `lid` past the
    /// capacity may not grow the table beyond [`MAX_LOCAL_SLOTS`].
    ///
    /// [`allocate_slot`]: LocalIndexTable::allocate_slot
    pub fn insert(&mut self, gid: Gid, lid: Lid) -> Result<(), IndexError> {
        if let Some(&existing) = self.gid_to_lid.get(&gid) {
            return Err(IndexError::DuplicateKey { gid, existing });
        }
        if let Some(SlotState::Live(holder)) = self.slots.get(lid) {
            return Err(IndexError::SlotConflict {
                lid,
                holder: *holder,
            });
        }

        self.ensure_capacity(lid)?;
        self.slots[lid] = SlotState::Live(gid);
        self.gid_to_lid.insert(gid, lid);

        if lid == self.first_empty {
            self.first_empty += 1;
        }
        Ok(())
    }

    /// Unbind `gid`, returning the slot it occupied.
    ///
    /// Removing an absent gid is reported as [`IndexError::NotFound`] so that
    /// callers can tell a stale reference from a successful departure.
    pub fn remove(&mut self, gid: Gid) -> Result<Lid, IndexError> {
        let lid = self
            .gid_to_lid
            .remove(&gid)
            .ok_or(IndexError::NotFound { gid })?;
        self.free(lid);
        Ok(lid)
    }

    /// Reserve a slot not held by any live gid.
    ///
    /// Probes forward from `first_empty` and grows the table by one slot when
    /// everything below the capacity is taken.
    pub fn allocate_slot(&mut self) -> Lid {
        let mut lid = self.first_empty;
        while lid < self.slots.len() && self.slots[lid] != SlotState::Empty {
            lid += 1;
        }
        if lid == self.slots.len() {
            self.slots.push(SlotState::Empty);
        }

        self.slots[lid] = SlotState::Reserved;
        self.first_empty = lid + 1;
        lid
    }

    /// Give back a slot obtained from `allocate_slot` that was never filled.
    pub fn release_slot(&mut self, lid: Lid) -> Result<(), IndexError> {
        match self.slots.get(lid) {
            Some(SlotState::Live(holder)) => Err(IndexError::SlotConflict {
                lid,
                holder: *holder,
            }),
            Some(SlotState::Reserved) => {
                self.free(lid);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Move `gid` to `new_lid`, returning its previous slot.
    ///
    /// Used by compaction. The target must be empty: neither held by another
    /// gid nor reserved for one.
    pub fn relocate(&mut self, gid: Gid, new_lid: Lid) -> Result<Lid, IndexError> {
        let old_lid = self.local_index(gid).ok_or(IndexError::NotFound { gid })?;
        if old_lid == new_lid {
            return Ok(old_lid);
        }
        match self.slots.get(new_lid) {
            Some(SlotState::Live(holder)) => {
                return Err(IndexError::SlotConflict {
                    lid: new_lid,
                    holder: *holder,
                })
            }
            Some(SlotState::Reserved) => return Err(IndexError::SlotReserved { lid: new_lid }),
            _ => {}
        }

        self.ensure_capacity(new_lid)?;
        self.slots[new_lid] = SlotState::Live(gid);
        self.gid_to_lid.insert(gid, new_lid);
        self.free(old_lid);
        if new_lid == self.first_empty {
            self.first_empty = self.first_occupied_run_end(new_lid);
        }
        Ok(old_lid)
    }

    /// Gid currently bound to `lid`.
    pub fn holder(&self, lid: Lid) -> Option<Gid> {
        match self.slots.get(lid) {
            Some(SlotState::Live(gid)) => Some(*gid),
            _ => None,
        }
    }

    /// State of `lid`; slots past the capacity read as empty.
    pub fn slot_state(&self, lid: Lid) -> SlotState {
        self.slots.get(lid).copied().unwrap_or(SlotState::Empty)
    }

    pub fn is_slot_free(&self, lid: Lid) -> bool {
        self.slot_state(lid) == SlotState::Empty
    }

    /// Number of live mappings.
    pub fn len(&self) -> usize {
        self.gid_to_lid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gid_to_lid.is_empty()
    }

    /// Number of slots tracked, live or not.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Lowest slot that may be free.
    pub fn first_empty(&self) -> usize {
        self.first_empty
    }

    /// Iterate live `(gid, lid)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Gid, Lid)> + '_ {
        self.gid_to_lid.iter().map(|(&gid, &lid)| (gid, lid))
    }

    /// Drop all mappings and slots.
    pub fn clear(&mut self) {
        self.gid_to_lid.clear();
        self.slots.clear();
        self.first_empty = 0;
    }

    /// Drop trailing empty slots, returning the new capacity.
    pub fn truncate_free_tail(&mut self) -> usize {
        while self.slots.last() == Some(&SlotState::Empty) {
            self.slots.pop();
        }
        self.first_empty = self.first_empty.min(self.slots.len());
        self.slots.len()
    }

    /// Make `lid` addressable, refusing to grow past [`MAX_LOCAL_SLOTS`].
    fn ensure_capacity(&mut self, lid: Lid) -> Result<(), IndexError> {
        if lid < self.slots.len() {
            return Ok(());
        }
        let len = lid
            .checked_add(1)
            .filter(|&len| len <= MAX_LOCAL_SLOTS)
            .ok_or(IndexError::SlotOutOfRange {
                lid,
                limit: MAX_LOCAL_SLOTS,
            })?;
        self.slots.resize(len, SlotState::Empty);
        Ok(())
    }

    fn free(&mut self, lid: Lid) {
        self.slots[lid] = SlotState::Empty;
        if lid < self.first_empty {
            self.first_empty = lid;
        }
    }

    fn first_occupied_run_end(&self, from: Lid) -> usize {
        let mut lid = from;
        while lid < self.slots.len() && self.slots[lid] != SlotState::Empty {
            lid += 1;
        }
        lid
    }
}
