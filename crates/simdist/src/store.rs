//! Rank-local body storage.
//!
//! State is kept as parallel arrays indexed by local slot, so integration can
//! stream over positions and velocities without touching bookkeeping fields.

use glam::Vec3;

use crate::error::IndexError;
use crate::rank::RankInfo;
use crate::resolver::MAX_LOCAL_SLOTS;
use crate::{Gid, Lid};

/// Role of a slot in local storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BodyStatus {
    #[default]
    Empty,
    /// Integrated by this rank.
    Owned,
    /// Read-only copy of a body owned by a neighboring rank.
    Ghost,
}

/// Self-contained copy of one body, used for migration and ghost exchange.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyRecord {
    pub gid: Gid,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Fixed bodies are never integrated (roughness points, walls).
    pub fixed: bool,
}

impl BodyRecord {
    pub fn new(gid: Gid, position: Vec3, velocity: Vec3) -> Self {
        Self {
            gid,
            position,
            velocity,
            fixed: false,
        }
    }

    /// A stationary, never-integrated body.
    pub fn fixed_at(gid: Gid, position: Vec3) -> Self {
        Self {
            gid,
            position,
            velocity: Vec3::ZERO,
            fixed: true,
        }
    }
}

/// Structure-of-arrays body state for one rank.
#[derive(Clone, Debug)]
pub struct LocalBodyStore {
    rank: RankInfo,
    pub(crate) gid: Vec<Gid>,
    pub(crate) position: Vec<Vec3>,
    pub(crate) velocity: Vec<Vec3>,
    pub(crate) fixed: Vec<bool>,
    pub(crate) status: Vec<BodyStatus>,
}

impl LocalBodyStore {
    pub fn new(rank: RankInfo) -> Self {
        Self {
            rank,
            gid: Vec::new(),
            position: Vec::new(),
            velocity: Vec::new(),
            fixed: Vec::new(),
            status: Vec::new(),
        }
    }

    pub fn rank(&self) -> RankInfo {
        self.rank
    }

    /// Number of slots, including empty ones.
    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }

    /// Grow the arrays so that `lid` is addressable.
    ///
    /// Appending the next slot always succeeds; jumping further ahead is
    /// limited to [`MAX_LOCAL_SLOTS`], as in the index table.
    pub fn ensure_slot(&mut self, lid: Lid) -> Result<(), IndexError> {
        let current = self.len();
        if lid < current {
            return Ok(());
        }
        let len = lid
            .checked_add(1)
            .filter(|&len| len <= MAX_LOCAL_SLOTS || lid == current)
            .ok_or(IndexError::SlotOutOfRange {
                lid,
                limit: MAX_LOCAL_SLOTS,
            })?;
        self.gid.resize(len, 0);
        self.position.resize(len, Vec3::ZERO);
        self.velocity.resize(len, Vec3::ZERO);
        self.fixed.resize(len, false);
        self.status.resize(len, BodyStatus::Empty);
        Ok(())
    }

    /// Store `record` at `lid` with the given role.
    pub fn write(&mut self, lid: Lid, record: &BodyRecord, status: BodyStatus) -> Result<(), IndexError> {
        self.ensure_slot(lid)?;
        self.gid[lid] = record.gid;
        self.position[lid] = record.position;
        self.velocity[lid] = record.velocity;
        self.fixed[lid] = record.fixed;
        self.status[lid] = status;
        Ok(())
    }

    /// Mark `lid` empty and zero its state.
    pub fn clear_slot(&mut self, lid: Lid) {
        if lid >= self.len() {
            return;
        }
        self.gid[lid] = 0;
        self.position[lid] = Vec3::ZERO;
        self.velocity[lid] = Vec3::ZERO;
        self.fixed[lid] = false;
        self.status[lid] = BodyStatus::Empty;
    }

    pub fn status(&self, lid: Lid) -> BodyStatus {
        self.status.get(lid).copied().unwrap_or_default()
    }

    /// Role of every slot, indexed by lid.
    pub fn statuses(&self) -> &[BodyStatus] {
        &self.status
    }

    /// Gid stored at `lid`, if the slot is in use.
    pub fn gid_of(&self, lid: Lid) -> Option<Gid> {
        match self.status(lid) {
            BodyStatus::Empty => None,
            _ => Some(self.gid[lid]),
        }
    }

    /// Copy out the body at `lid`, if the slot is in use.
    pub fn record(&self, lid: Lid) -> Option<BodyRecord> {
        if self.status(lid) == BodyStatus::Empty {
            return None;
        }
        Some(BodyRecord {
            gid: self.gid[lid],
            position: self.position[lid],
            velocity: self.velocity[lid],
            fixed: self.fixed[lid],
        })
    }

    /// Move the contents of `from` into `to`, leaving `from` empty.
    pub fn move_slot(&mut self, from: Lid, to: Lid) -> Result<(), IndexError> {
        if from == to {
            return Ok(());
        }
        if let Some(record) = self.record(from) {
            let status = self.status[from];
            self.write(to, &record, status)?;
            self.clear_slot(from);
        }
        Ok(())
    }

    /// Drop slots at and above `len`.
    pub fn truncate(&mut self, len: usize) {
        self.gid.truncate(len);
        self.position.truncate(len);
        self.velocity.truncate(len);
        self.fixed.truncate(len);
        self.status.truncate(len);
    }

    pub fn owned_count(&self) -> usize {
        self.count(BodyStatus::Owned)
    }

    pub fn ghost_count(&self) -> usize {
        self.count(BodyStatus::Ghost)
    }

    /// Slots holding bodies with the given role.
    pub fn slots_with(&self, status: BodyStatus) -> impl Iterator<Item = Lid> + '_ {
        self.status
            .iter()
            .enumerate()
            .filter(move |(_, s)| **s == status)
            .map(|(lid, _)| lid)
    }

    fn count(&self, status: BodyStatus) -> usize {
        self.status.iter().filter(|s| **s == status).count()
    }
}
