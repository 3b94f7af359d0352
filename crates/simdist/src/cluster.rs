//! All ranks of a partitioned simulation, run in-process.
//!
//! Each step integrates every rank in parallel, then hands bodies that
//! crossed a slab face to their new owner, then rebuilds the ghost layer.
//! Ghosts are cleared before migration so a body arriving on a rank never
//! collides with its own stale ghost there.

use glam::Vec3;
use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::decomposition::SlabDecomposition;
use crate::error::{IndexError, SimError};
use crate::params::{GranularParams, Verbosity};
use crate::rank::RankInfo;
use crate::store::{BodyRecord, BodyStatus};
use crate::system::DistributedSystem;
use crate::{Gid, Lid};

/// Per-step bookkeeping totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    pub migrated: usize,
    pub escaped: usize,
    /// Ghost count after the most recent step.
    pub ghosts: usize,
}

impl std::ops::AddAssign for StepReport {
    fn add_assign(&mut self, rhs: Self) {
        self.migrated += rhs.migrated;
        self.escaped += rhs.escaped;
        self.ghosts = rhs.ghosts;
    }
}

/// Every rank of the decomposition plus global id assignment.
pub struct RankCluster {
    params: GranularParams,
    decomposition: SlabDecomposition,
    ranks: Vec<DistributedSystem>,
    next_gid: Gid,
    time: f64,
    steps: u64,
}

impl RankCluster {
    pub fn new(params: GranularParams) -> Result<Self, SimError> {
        params.validate()?;
        let ranks = (0..params.num_ranks)
            .map(|r| {
                RankInfo::new(r, params.num_ranks).map(|info| DistributedSystem::new(info, &params))
            })
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "cluster: {} ranks, slab width {:.3}, ghost width {:.3}",
            params.num_ranks,
            params.slab_width(),
            params.ghost_width
        );

        Ok(Self {
            decomposition: SlabDecomposition::new(params.box_dims, params.num_ranks),
            params,
            ranks,
            next_gid: 0,
            time: 0.0,
            steps: 0,
        })
    }

    pub fn params(&self) -> &GranularParams {
        &self.params
    }

    pub fn decomposition(&self) -> &SlabDecomposition {
        &self.decomposition
    }

    pub fn num_ranks(&self) -> usize {
        self.ranks.len()
    }

    pub fn ranks(&self) -> &[DistributedSystem] {
        &self.ranks
    }

    pub fn rank(&self, rank: usize) -> Result<&DistributedSystem, SimError> {
        self.ranks.get(rank).ok_or(SimError::UnknownRank {
            rank,
            num_ranks: self.ranks.len(),
        })
    }

    /// Simulated time so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Add a body, assigning it a fresh gid and routing it to its owner.
    ///
    /// Ghost copies are not created until the next [`refresh_ghosts`] or
    /// [`advance`].
    ///
    /// [`refresh_ghosts`]: RankCluster::refresh_ghosts
    /// [`advance`]: RankCluster::advance
    pub fn add_body(&mut self, position: Vec3, velocity: Vec3, fixed: bool) -> Result<Gid, SimError> {
        let gid = self.next_gid;
        let rank = self.decomposition.rank_of(position);
        let record = BodyRecord {
            gid,
            position,
            velocity,
            fixed,
        };
        self.ranks[rank].add_body(record)?;
        self.next_gid += 1;
        Ok(gid)
    }

    /// Add stationary bodies at `points`, returning their gids.
    pub fn add_bodies(&mut self, points: &[Vec3], fixed: bool) -> Result<Vec<Gid>, SimError> {
        points
            .iter()
            .map(|&p| self.add_body(p, Vec3::ZERO, fixed))
            .collect()
    }

    /// Remove a body from whichever rank owns it.
    pub fn remove_body(&mut self, gid: Gid) -> Result<BodyRecord, SimError> {
        let (rank, _) = self
            .locate(gid)
            .ok_or(SimError::Index(IndexError::NotFound { gid }))?;
        self.ranks[rank].remove_body(gid)
    }

    /// Owning rank and local slot of `gid`.
    pub fn locate(&self, gid: Gid) -> Option<(usize, Lid)> {
        self.ranks.iter().enumerate().find_map(|(r, sys)| {
            let lid = sys.local_index(gid)?;
            (sys.store().status(lid) == BodyStatus::Owned).then_some((r, lid))
        })
    }

    /// Current state of `gid` as seen by its owner.
    pub fn body(&self, gid: Gid) -> Option<BodyRecord> {
        let (rank, _) = self.locate(gid)?;
        self.ranks[rank].body(gid)
    }

    pub fn total_owned(&self) -> usize {
        self.ranks.iter().map(|r| r.owned_count()).sum()
    }

    pub fn total_ghosts(&self) -> usize {
        self.ranks.iter().map(|r| r.ghost_count()).sum()
    }

    pub fn owned_per_rank(&self) -> Vec<usize> {
        self.ranks.iter().map(|r| r.owned_count()).collect()
    }

    /// Every owned body with its owning rank.
    pub fn owned_bodies(&self) -> impl Iterator<Item = (usize, BodyRecord)> + '_ {
        self.ranks
            .iter()
            .enumerate()
            .flat_map(|(r, sys)| sys.owned_bodies().map(move |b| (r, b)))
    }

    /// Advance every rank by one step of `dt`.
    pub fn advance(&mut self, dt: f32) -> Result<StepReport, SimError> {
        let escaped: usize = self
            .ranks
            .par_iter_mut()
            .map(|sys| sys.step(dt))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .sum();

        for sys in &mut self.ranks {
            sys.clear_ghosts()?;
        }
        let migrated = self.migrate()?;
        let ghosts = self.refresh_ghosts()?;

        self.time += dt as f64;
        self.steps += 1;

        let report = StepReport {
            migrated,
            escaped,
            ghosts,
        };
        if self.params.verbosity >= Verbosity::Metrics {
            log::info!(
                "t={:.5} owned={} ghosts={} migrated={} escaped={}",
                self.time,
                self.total_owned(),
                ghosts,
                migrated,
                escaped
            );
        }
        Ok(report)
    }

    /// Advance by `duration` in steps of the configured step size, with a
    /// shorter final step when `duration` is not a whole multiple.
    pub fn advance_simulation(&mut self, duration: f32) -> Result<StepReport, SimError> {
        let step = self.params.step_size;
        let full_steps = (duration / step + 1e-4).floor().max(0.0) as u64;
        let remainder = duration - full_steps as f32 * step;

        let mut report = StepReport::default();
        for _ in 0..full_steps {
            report += self.advance(step)?;
        }
        if remainder > 1e-6 * step {
            report += self.advance(remainder)?;
        }
        Ok(report)
    }

    /// Move bodies that crossed a slab face to their new owners.
    fn migrate(&mut self) -> Result<usize, SimError> {
        let mut moving = Vec::new();
        for sys in &mut self.ranks {
            moving.extend(sys.take_emigrants()?);
        }
        for &(dest, record) in &moving {
            self.ranks[dest].accept_immigrant(record)?;
        }
        Ok(moving.len())
    }

    /// Rebuild the ghost layer of every rank from its neighbors' owned
    /// bodies. Returns the total number of ghosts.
    pub fn refresh_ghosts(&mut self) -> Result<usize, SimError> {
        let mut inbox: Vec<Vec<BodyRecord>> = vec![Vec::new(); self.ranks.len()];
        for sys in &self.ranks {
            for (dest, record) in sys.ghost_exports() {
                inbox[dest].push(record);
            }
        }

        let mut total = 0;
        for (sys, records) in self.ranks.iter_mut().zip(inbox) {
            total += sys.replace_ghosts(records)?;
        }
        Ok(total)
    }

    /// Compact every rank's storage, returning the total number of moves.
    pub fn compact(&mut self) -> Result<usize, SimError> {
        let mut moves = 0;
        for sys in &mut self.ranks {
            moves += sys.compact()?;
        }
        Ok(moves)
    }

    /// Check every rank's table against its storage, and that each gid is
    /// owned by exactly one rank.
    pub fn check_consistency(&self) -> Result<(), SimError> {
        let mut seen = FxHashSet::default();
        for sys in &self.ranks {
            sys.check_consistency()?;
            for body in sys.owned_bodies() {
                if !seen.insert(body.gid) {
                    return Err(SimError::Inconsistent(format!(
                        "gid {} owned by more than one rank",
                        body.gid
                    )));
                }
                if !self.decomposition.owns(sys.rank().rank, body.position) {
                    return Err(SimError::Inconsistent(format!(
                        "gid {} at x={} owned by rank {} outside its slab",
                        body.gid,
                        body.position.x,
                        sys.rank().rank
                    )));
                }
            }
        }
        Ok(())
    }
}
