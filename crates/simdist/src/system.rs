//! One rank of a partitioned simulation.
//!
//! A [`DistributedSystem`] owns the rank's body storage and the index table
//! that maps global ids into it. Bodies enter through [`add_body`] (initial
//! distribution or migration), leave through [`remove_body`] or
//! [`take_emigrants`], and are shadowed on neighbors as ghosts.
//!
//! [`add_body`]: DistributedSystem::add_body
//! [`remove_body`]: DistributedSystem::remove_body
//! [`take_emigrants`]: DistributedSystem::take_emigrants

use glam::Vec3;

use crate::advect;
use crate::decomposition::SlabDecomposition;
use crate::error::{IndexError, SimError};
use crate::params::{GranularParams, TimeIntegrator};
use crate::rank::RankInfo;
use crate::resolver::LocalIndexTable;
use crate::store::{BodyRecord, BodyStatus, LocalBodyStore};
use crate::{Gid, Lid};

/// Body storage and index bookkeeping for a single rank.
#[derive(Clone, Debug)]
pub struct DistributedSystem {
    rank: RankInfo,
    decomposition: SlabDecomposition,
    store: LocalBodyStore,
    table: LocalIndexTable,

    integrator: TimeIntegrator,
    gravity: Vec3,
    half_dims: Vec3,
    radius: f32,
    ghost_width: f32,
    fixed_boundaries: bool,
}

impl DistributedSystem {
    pub fn new(rank: RankInfo, params: &GranularParams) -> Self {
        Self {
            rank,
            decomposition: SlabDecomposition::new(params.box_dims, rank.num_ranks),
            store: LocalBodyStore::new(rank),
            table: LocalIndexTable::new(rank),
            integrator: params.time_integrator,
            gravity: params.gravity,
            half_dims: 0.5 * params.box_dims,
            radius: params.sphere_radius,
            ghost_width: params.ghost_width,
            fixed_boundaries: params.fixed_boundaries,
        }
    }

    pub fn rank(&self) -> RankInfo {
        self.rank
    }

    pub fn store(&self) -> &LocalBodyStore {
        &self.store
    }

    pub fn table(&self) -> &LocalIndexTable {
        &self.table
    }

    /// Local slot of `gid`, owned or ghost.
    pub fn local_index(&self, gid: Gid) -> Option<Lid> {
        self.table.local_index(gid)
    }

    /// Signed local slot of `gid`, `-1` when absent.
    pub fn lookup_local_index(&self, gid: Gid) -> i64 {
        self.table.lookup_local_index(gid)
    }

    pub fn body(&self, gid: Gid) -> Option<BodyRecord> {
        self.local_index(gid).and_then(|lid| self.store.record(lid))
    }

    pub fn status_of(&self, gid: Gid) -> Option<BodyStatus> {
        self.local_index(gid).map(|lid| self.store.status(lid))
    }

    pub fn owned_count(&self) -> usize {
        self.store.owned_count()
    }

    pub fn ghost_count(&self) -> usize {
        self.store.ghost_count()
    }

    /// Copies of every owned body.
    pub fn owned_bodies(&self) -> impl Iterator<Item = BodyRecord> + '_ {
        self.store
            .slots_with(BodyStatus::Owned)
            .filter_map(|lid| self.store.record(lid))
    }

    /// Take ownership of a body located in this rank's slab.
    pub fn add_body(&mut self, record: BodyRecord) -> Result<Lid, SimError> {
        if !self.decomposition.owns(self.rank.rank, record.position) {
            return Err(SimError::OutsideSubdomain {
                gid: record.gid,
                rank: self.rank.rank,
                x: record.position.x,
            });
        }
        self.place(record, BodyStatus::Owned)
    }

    /// Remove a body from this rank, returning its last state.
    pub fn remove_body(&mut self, gid: Gid) -> Result<BodyRecord, SimError> {
        let lid = self.table.remove(gid)?;
        let record = self.store.record(lid);
        self.store.clear_slot(lid);
        record.ok_or(SimError::Index(IndexError::NotFound { gid }))
    }

    /// Integrate owned bodies by `dt` and apply the box walls.
    ///
    /// With open boundaries, bodies that leave the box are dropped; the
    /// number dropped is returned.
    pub fn step(&mut self, dt: f32) -> Result<usize, SimError> {
        advect::integrate_owned(&mut self.store, self.integrator, self.gravity, dt);

        if self.fixed_boundaries {
            advect::enforce_box(&mut self.store, self.half_dims, self.radius);
            return Ok(0);
        }

        let escaped: Vec<Gid> = self
            .owned_bodies()
            .filter(|b| b.position.abs().cmpgt(self.half_dims).any())
            .map(|b| b.gid)
            .collect();
        for &gid in &escaped {
            self.remove_body(gid)?;
        }
        if !escaped.is_empty() {
            log::debug!("rank {}: {} bodies left the box", self.rank.rank, escaped.len());
        }
        Ok(escaped.len())
    }

    /// Remove and return every owned body whose position now lies in another
    /// rank's slab, tagged with the destination rank.
    pub fn take_emigrants(&mut self) -> Result<Vec<(usize, BodyRecord)>, SimError> {
        let leaving: Vec<(usize, Gid)> = self
            .owned_bodies()
            .filter_map(|b| {
                let dest = self.decomposition.rank_of(b.position);
                (dest != self.rank.rank).then_some((dest, b.gid))
            })
            .collect();

        let mut out = Vec::with_capacity(leaving.len());
        for (dest, gid) in leaving {
            out.push((dest, self.remove_body(gid)?));
        }
        if !out.is_empty() {
            log::debug!("rank {}: {} bodies emigrating", self.rank.rank, out.len());
        }
        Ok(out)
    }

    /// Adopt a body handed over by a neighboring rank.
    pub fn accept_immigrant(&mut self, record: BodyRecord) -> Result<Lid, SimError> {
        self.add_body(record)
    }

    /// Owned bodies close enough to a slab face to be shadowed on the
    /// neighbor, tagged with the neighbor's rank.
    pub fn ghost_exports(&self) -> Vec<(usize, BodyRecord)> {
        let mut out = Vec::new();
        for body in self.owned_bodies() {
            let targets =
                self.decomposition
                    .ghost_targets(self.rank.rank, body.position, self.ghost_width);
            for dest in targets.iter() {
                out.push((dest, body));
            }
        }
        out
    }

    /// Insert or refresh a ghost copy of a neighbor's body.
    pub fn insert_ghost(&mut self, record: BodyRecord) -> Result<Lid, SimError> {
        match self.local_index(record.gid) {
            Some(lid) if self.store.status(lid) == BodyStatus::Ghost => {
                self.store.write(lid, &record, BodyStatus::Ghost)?;
                Ok(lid)
            }
            Some(_) => Err(SimError::GhostOverlapsOwned { gid: record.gid }),
            None => self.place(record, BodyStatus::Ghost),
        }
    }

    /// Drop every ghost, returning how many were removed.
    pub fn clear_ghosts(&mut self) -> Result<usize, SimError> {
        let ghosts: Vec<Lid> = self.store.slots_with(BodyStatus::Ghost).collect();
        for &lid in &ghosts {
            if let Some(gid) = self.store.gid_of(lid) {
                self.table.remove(gid)?;
            }
            self.store.clear_slot(lid);
        }
        Ok(ghosts.len())
    }

    /// Replace all ghosts with `records`.
    pub fn replace_ghosts(
        &mut self,
        records: impl IntoIterator<Item = BodyRecord>,
    ) -> Result<usize, SimError> {
        self.clear_ghosts()?;
        let mut count = 0;
        for record in records {
            self.insert_ghost(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Fill holes in local storage by moving bodies down from the top,
    /// then drop the empty tail. Returns the number of bodies moved.
    ///
    /// Only the moved bodies change slot; everyone else keeps their lid.
    pub fn compact(&mut self) -> Result<usize, SimError> {
        let mut moves = 0;
        let mut low = self.table.first_empty();
        let mut high = self.store.len();

        loop {
            while low < high && !self.table.is_slot_free(low) {
                low += 1;
            }
            while high > low && self.store.status(high - 1) == BodyStatus::Empty {
                high -= 1;
            }
            if low + 1 >= high {
                break;
            }

            let from = high - 1;
            let gid = self.store.gid_of(from).ok_or_else(|| {
                SimError::Inconsistent(format!("rank {}: slot {} is empty", self.rank.rank, from))
            })?;
            self.table.relocate(gid, low)?;
            self.store.move_slot(from, low)?;
            moves += 1;
            high -= 1;
            low += 1;
        }

        let capacity = self.table.truncate_free_tail();
        self.store.truncate(capacity);
        if moves > 0 {
            log::debug!(
                "rank {}: compacted {} bodies, capacity now {}",
                self.rank.rank,
                moves,
                capacity
            );
        }
        Ok(moves)
    }

    /// Cross-check the index table against storage.
    pub fn check_consistency(&self) -> Result<(), SimError> {
        let rank = self.rank.rank;
        let fail = |reason: String| Err(SimError::Inconsistent(format!("rank {}: {}", rank, reason)));

        for (gid, lid) in self.table.iter() {
            match self.store.gid_of(lid) {
                None => return fail(format!("gid {} maps to empty slot {}", gid, lid)),
                Some(held) if held != gid => {
                    return fail(format!("slot {} holds gid {} but table says {}", lid, held, gid))
                }
                Some(_) => {}
            }
        }
        for lid in 0..self.store.len() {
            let Some(gid) = self.store.gid_of(lid) else {
                continue;
            };
            if self.table.local_index(gid) != Some(lid) {
                return fail(format!("slot {} (gid {}) is not indexed", lid, gid));
            }
        }
        let first_empty = self.table.first_empty();
        if first_empty > self.table.capacity() {
            return fail(format!(
                "first_empty {} exceeds capacity {}",
                first_empty,
                self.table.capacity()
            ));
        }
        Ok(())
    }

    /// Store a body in a fresh slot with the given role.
    fn place(&mut self, record: BodyRecord, status: BodyStatus) -> Result<Lid, SimError> {
        if let Some(existing) = self.table.local_index(record.gid) {
            return Err(IndexError::DuplicateKey {
                gid: record.gid,
                existing,
            }
            .into());
        }
        let lid = self.table.allocate_slot();
        self.table.insert(record.gid, lid)?;
        if let Err(e) = self.store.write(lid, &record, status) {
            self.table.remove(record.gid)?;
            return Err(e.into());
        }
        Ok(lid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_rank_params() -> GranularParams {
        GranularParams {
            box_dims: Vec3::new(20.0, 10.0, 10.0),
            num_ranks: 2,
            ghost_width: 1.0,
            gravity: Vec3::ZERO,
            ..Default::default()
        }
    }

    fn rank(r: usize) -> DistributedSystem {
        DistributedSystem::new(RankInfo::new(r, 2).unwrap(), &two_rank_params())
    }

    #[test]
    fn test_add_body_outside_slab_rejected() {
        let mut sys = rank(0);
        let err = sys
            .add_body(BodyRecord::new(1, Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap_err();
        assert!(matches!(err, SimError::OutsideSubdomain { gid: 1, rank: 0, .. }));
        assert_eq!(sys.lookup_local_index(1), -1);
    }

    #[test]
    fn test_add_duplicate_leaves_state_untouched() {
        let mut sys = rank(0);
        sys.add_body(BodyRecord::new(1, Vec3::new(-5.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap();
        let err = sys
            .add_body(BodyRecord::new(1, Vec3::new(-6.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap_err();

        assert_eq!(
            err,
            SimError::Index(IndexError::DuplicateKey { gid: 1, existing: 0 })
        );
        assert_eq!(sys.body(1).unwrap().position.x, -5.0);
        assert_eq!(sys.table().capacity(), 1);
    }

    #[test]
    fn test_emigrants_leave_and_free_slots() {
        let mut sys = rank(0);
        sys.add_body(BodyRecord::new(1, Vec3::new(-0.5, 0.0, 0.0), Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        sys.add_body(BodyRecord::new(2, Vec3::new(-5.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap();

        sys.step(0.1).unwrap();
        let out = sys.take_emigrants().unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, 1);
        assert_eq!(out[0].1.gid, 1);
        assert_eq!(sys.local_index(1), None);
        assert_eq!(sys.table().first_empty(), 0);
        sys.check_consistency().unwrap();
    }

    #[test]
    fn test_ghost_cannot_shadow_owned() {
        let mut sys = rank(0);
        sys.add_body(BodyRecord::new(3, Vec3::new(-1.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap();
        let err = sys
            .insert_ghost(BodyRecord::new(3, Vec3::new(0.5, 0.0, 0.0), Vec3::ZERO))
            .unwrap_err();
        assert_eq!(err, SimError::GhostOverlapsOwned { gid: 3 });
    }

    #[test]
    fn test_ghost_refresh_in_place() {
        let mut sys = rank(1);
        let lid = sys
            .insert_ghost(BodyRecord::new(9, Vec3::new(-0.5, 0.0, 0.0), Vec3::ZERO))
            .unwrap();
        let again = sys
            .insert_ghost(BodyRecord::new(9, Vec3::new(-0.2, 0.0, 0.0), Vec3::ZERO))
            .unwrap();
        assert_eq!(lid, again);
        assert_eq!(sys.body(9).unwrap().position.x, -0.2);

        assert_eq!(sys.clear_ghosts().unwrap(), 1);
        assert_eq!(sys.ghost_count(), 0);
        assert_eq!(sys.local_index(9), None);
    }

    #[test]
    fn test_ghost_exports_near_face() {
        let mut sys = rank(0);
        sys.add_body(BodyRecord::new(1, Vec3::new(-0.5, 0.0, 0.0), Vec3::ZERO))
            .unwrap();
        sys.add_body(BodyRecord::new(2, Vec3::new(-5.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap();

        let exports = sys.ghost_exports();
        assert_eq!(exports.len(), 1);
        assert_eq!(exports[0].0, 1);
        assert_eq!(exports[0].1.gid, 1);
    }

    #[test]
    fn test_compact_fills_holes() {
        let mut sys = rank(0);
        for gid in 0..6 {
            sys.add_body(BodyRecord::new(gid, Vec3::new(-5.0, 0.0, gid as f32), Vec3::ZERO))
                .unwrap();
        }
        sys.remove_body(1).unwrap();
        sys.remove_body(3).unwrap();

        let moves = sys.compact().unwrap();

        assert_eq!(moves, 2);
        assert_eq!(sys.store().len(), 4);
        assert_eq!(sys.table().capacity(), 4);
        for gid in [0, 2, 4, 5] {
            let body = sys.body(gid).unwrap();
            assert_eq!(body.position.z, gid as f32);
        }
        assert_eq!(sys.local_index(0), Some(0));
        assert_eq!(sys.local_index(2), Some(2));
        sys.check_consistency().unwrap();
    }

    #[test]
    fn test_consistency_reports_mismatch() {
        let mut sys = rank(0);
        sys.add_body(BodyRecord::new(1, Vec3::new(-5.0, 0.0, 0.0), Vec3::ZERO))
            .unwrap();
        sys.check_consistency().unwrap();

        sys.store.gid[0] = 2;
        assert!(matches!(sys.check_consistency(), Err(SimError::Inconsistent(_))));
    }

    #[test]
    fn test_compact_skips_reserved_slots() {
        let mut sys = rank(0);
        for gid in 0..3 {
            sys.add_body(BodyRecord::new(gid, Vec3::new(-5.0, 0.0, gid as f32), Vec3::ZERO))
                .unwrap();
        }
        let reserved = sys.table.allocate_slot();
        sys.remove_body(0).unwrap();

        assert_eq!(sys.compact().unwrap(), 1);
        assert_eq!(sys.table().slot_state(reserved), crate::resolver::SlotState::Reserved);
        assert_eq!(sys.local_index(2), Some(0));
        sys.table.insert(9, reserved).unwrap();
    }

    #[test]
    fn test_open_boundaries_drop_escaped() {
        let params = GranularParams {
            fixed_boundaries: false,
            ..two_rank_params()
        };
        let mut sys = DistributedSystem::new(RankInfo::new(0, 2).unwrap(), &params);
        sys.add_body(BodyRecord::new(1, Vec3::new(-5.0, 0.0, 4.9), Vec3::new(0.0, 0.0, 10.0)))
            .unwrap();

        assert_eq!(sys.step(0.1).unwrap(), 1);
        assert_eq!(sys.owned_count(), 0);
    }
}
