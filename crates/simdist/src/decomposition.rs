//! Slab decomposition of the simulation box along X.
//!
//! The box is centred at the origin. Rank `r` owns
//! `[x_min + r * w, x_min + (r + 1) * w)` where `w = box_x / num_ranks`; the
//! last rank also owns the upper box face.

use glam::Vec3;

/// Equal-width partition of the box into slabs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlabDecomposition {
    x_min: f32,
    slab_width: f32,
    num_ranks: usize,
}

impl SlabDecomposition {
    pub fn new(box_dims: Vec3, num_ranks: usize) -> Self {
        let num_ranks = num_ranks.max(1);
        Self {
            x_min: -0.5 * box_dims.x,
            slab_width: box_dims.x / num_ranks as f32,
            num_ranks,
        }
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    pub fn slab_width(&self) -> f32 {
        self.slab_width
    }

    /// Rank owning `position`. Positions outside the box belong to the
    /// nearest edge slab.
    pub fn rank_of(&self, position: Vec3) -> usize {
        let t = ((position.x - self.x_min) / self.slab_width).floor();
        if t.is_nan() || t < 0.0 {
            0
        } else {
            (t as usize).min(self.num_ranks - 1)
        }
    }

    /// `[lo, hi)` extent of `rank`'s slab along X.
    pub fn slab_bounds(&self, rank: usize) -> (f32, f32) {
        let lo = self.x_min + rank as f32 * self.slab_width;
        (lo, lo + self.slab_width)
    }

    /// Whether `rank` owns `position`.
    pub fn owns(&self, rank: usize, position: Vec3) -> bool {
        self.rank_of(position) == rank
    }

    /// Neighboring ranks that must hold a ghost of a body of `rank` at
    /// `position`, i.e. those whose slab lies within `width` of it.
    pub fn ghost_targets(&self, rank: usize, position: Vec3, width: f32) -> GhostTargets {
        let (lo, hi) = self.slab_bounds(rank);
        GhostTargets {
            lower: (rank > 0 && position.x - lo <= width).then(|| rank - 1),
            upper: (rank + 1 < self.num_ranks && hi - position.x <= width).then(|| rank + 1),
        }
    }
}

/// Result of [`SlabDecomposition::ghost_targets`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GhostTargets {
    pub lower: Option<usize>,
    pub upper: Option<usize>,
}

impl GhostTargets {
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.lower.into_iter().chain(self.upper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_slabs() -> SlabDecomposition {
        // x in [-20, 20), slabs of width 10
        SlabDecomposition::new(Vec3::new(40.0, 10.0, 10.0), 4)
    }

    #[test]
    fn test_rank_of() {
        let d = four_slabs();
        assert_eq!(d.rank_of(Vec3::new(-20.0, 0.0, 0.0)), 0);
        assert_eq!(d.rank_of(Vec3::new(-10.0, 0.0, 0.0)), 1);
        assert_eq!(d.rank_of(Vec3::new(-0.001, 0.0, 0.0)), 1);
        assert_eq!(d.rank_of(Vec3::new(0.0, 0.0, 0.0)), 2);
        assert_eq!(d.rank_of(Vec3::new(19.99, 0.0, 0.0)), 3);
    }

    #[test]
    fn test_rank_of_outside_box_clamps() {
        let d = four_slabs();
        assert_eq!(d.rank_of(Vec3::new(-100.0, 0.0, 0.0)), 0);
        assert_eq!(d.rank_of(Vec3::new(20.0, 0.0, 0.0)), 3);
        assert_eq!(d.rank_of(Vec3::new(500.0, 0.0, 0.0)), 3);
        assert_eq!(d.rank_of(Vec3::new(f32::NAN, 0.0, 0.0)), 0);
    }

    #[test]
    fn test_slab_bounds() {
        let d = four_slabs();
        assert_eq!(d.slab_bounds(0), (-20.0, -10.0));
        assert_eq!(d.slab_bounds(3), (10.0, 20.0));
    }

    #[test]
    fn test_ghost_targets() {
        let d = four_slabs();
        // Near the lower face of slab 1
        let t = d.ghost_targets(1, Vec3::new(-9.5, 0.0, 0.0), 1.0);
        assert_eq!(t, GhostTargets { lower: Some(0), upper: None });

        // Near the upper face of slab 1
        let t = d.ghost_targets(1, Vec3::new(-0.5, 0.0, 0.0), 1.0);
        assert_eq!(t, GhostTargets { lower: None, upper: Some(2) });

        // Middle of a slab
        let t = d.ghost_targets(1, Vec3::new(-5.0, 0.0, 0.0), 1.0);
        assert_eq!(t.iter().count(), 0);

        // Edge slabs never target outside the decomposition
        let t = d.ghost_targets(0, Vec3::new(-19.9, 0.0, 0.0), 1.0);
        assert_eq!(t.lower, None);
    }

    #[test]
    fn test_ghost_targets_inclusive_on_both_faces() {
        let d = four_slabs();
        // Slab 1 spans [-10, 0); both bodies sit exactly one width from a face.
        let t = d.ghost_targets(1, Vec3::new(-9.0, 0.0, 0.0), 1.0);
        assert_eq!(t, GhostTargets { lower: Some(0), upper: None });

        let t = d.ghost_targets(1, Vec3::new(-1.0, 0.0, 0.0), 1.0);
        assert_eq!(t, GhostTargets { lower: None, upper: Some(2) });
    }
}
