//! Rank-partitioned body bookkeeping for granular simulation.
//!
//! A simulation box is split into slabs along X, one per rank. Each rank
//! stores its bodies in contiguous arrays and resolves the global body id
//! ([`Gid`]) to a local slot ([`Lid`]) through a [`LocalIndexTable`]. Bodies
//! migrate between ranks as they cross slab faces, and bodies near a face are
//! mirrored on the neighbor as read-only ghosts.
//!
//! # Example
//!
//! ```
//! use simdist::{GranularParams, RankCluster, Vec3};
//!
//! let params = GranularParams {
//!     box_dims: Vec3::new(40.0, 10.0, 10.0),
//!     num_ranks: 4,
//!     ghost_width: 1.0,
//!     ..Default::default()
//! };
//! let mut cluster = RankCluster::new(params).unwrap();
//!
//! let gid = cluster.add_body(Vec3::new(-15.0, 0.0, 0.0), Vec3::ZERO, false).unwrap();
//! let (rank, lid) = cluster.locate(gid).unwrap();
//! assert_eq!(cluster.ranks()[rank].lookup_local_index(gid), lid as i64);
//!
//! cluster.advance_simulation(0.01).unwrap();
//! ```

pub mod advect;
pub mod cluster;
pub mod constants;
pub mod decomposition;
pub mod error;
pub mod output;
pub mod params;
pub mod rank;
pub mod resolver;
pub mod sampler;
pub mod serde_utils;
pub mod store;
pub mod system;

/// Global body id, unique across all ranks.
pub type Gid = u32;

/// Slot in a rank's local body arrays.
pub type Lid = usize;

pub use cluster::{RankCluster, StepReport};
pub use decomposition::SlabDecomposition;
pub use error::{IndexError, SimError};
pub use glam::Vec3;
pub use params::{FrictionMode, GranularParams, OutputMode, RollingMode, TimeIntegrator, Verbosity};
pub use rank::RankInfo;
pub use resolver::{LocalIndexTable, SlotState, MAX_LOCAL_SLOTS, NOT_FOUND};
pub use store::{BodyRecord, BodyStatus, LocalBodyStore};
pub use system::DistributedSystem;
