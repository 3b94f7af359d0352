//! Multi-rank migration, ghost exchange and compaction
//!
//! Runs small clusters with bodies flying across slab faces and checks that
//! every gid stays resolvable on exactly one owning rank.

use rand::{rngs::StdRng, Rng, SeedableRng};
use simdist::sampler::hcp_sample_box;
use simdist::{BodyStatus, GranularParams, RankCluster, TimeIntegrator, Vec3};

fn params(num_ranks: usize) -> GranularParams {
    GranularParams {
        box_dims: Vec3::new(40.0, 10.0, 10.0),
        num_ranks,
        ghost_width: 1.5,
        gravity: Vec3::new(0.0, 0.0, -9.81),
        step_size: 0.01,
        time_integrator: TimeIntegrator::ExtendedTaylor,
        ..Default::default()
    }
}

fn spray(cluster: &mut RankCluster, count: usize, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let p = Vec3::new(
                rng.gen_range(-18.0..18.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
            );
            let v = Vec3::new(rng.gen_range(-15.0..15.0), rng.gen_range(-2.0..2.0), 0.0);
            cluster.add_body(p, v, false).unwrap()
        })
        .collect()
}

/// Bodies are conserved and stay consistent while migrating.
#[test]
fn test_migration_conserves_bodies() {
    let mut cluster = RankCluster::new(params(4)).unwrap();
    let gids = spray(&mut cluster, 200, 42);

    let mut migrated = 0;
    for _ in 0..100 {
        let report = cluster.advance(0.01).unwrap();
        migrated += report.migrated;
        cluster.check_consistency().unwrap();
    }

    assert_eq!(cluster.total_owned(), gids.len());
    assert!(migrated > 0, "expected some bodies to cross a slab face");
    for gid in gids {
        let (rank, lid) = cluster.locate(gid).expect("body lost");
        assert_eq!(cluster.ranks()[rank].lookup_local_index(gid), lid as i64);
    }
}

/// Ghosts exist exactly for owned bodies near a face and never overlap
/// their owner.
#[test]
fn test_ghost_layer_matches_owners() {
    let mut cluster = RankCluster::new(params(3)).unwrap();
    spray(&mut cluster, 150, 7);
    cluster.advance_simulation(0.2).unwrap();

    let decomposition = *cluster.decomposition();
    let width = cluster.params().ghost_width;
    let mut expected = 0;
    for (rank, body) in cluster.owned_bodies() {
        for dest in decomposition.ghost_targets(rank, body.position, width).iter() {
            expected += 1;
            let ghost_rank = &cluster.ranks()[dest];
            assert_eq!(ghost_rank.status_of(body.gid), Some(BodyStatus::Ghost));
            assert_eq!(ghost_rank.body(body.gid).unwrap().position, body.position);
        }
    }
    assert_eq!(cluster.total_ghosts(), expected);
}

/// Fixed bodies never move or migrate.
#[test]
fn test_fixed_floor_stays_put() {
    let mut cluster = RankCluster::new(params(4)).unwrap();
    let floor = hcp_sample_box(Vec3::new(0.0, 0.0, -4.0), Vec3::new(19.0, 4.0, 0.0), 2.0);
    let floor_gids = cluster.add_bodies(&floor, true).unwrap();
    spray(&mut cluster, 50, 3);

    let before: Vec<_> = floor_gids.iter().map(|&g| cluster.locate(g).unwrap()).collect();
    cluster.advance_simulation(0.5).unwrap();

    for ((&gid, &loc), &p) in floor_gids.iter().zip(&before).zip(&floor) {
        assert_eq!(cluster.body(gid).unwrap().position, p);
        assert_eq!(cluster.locate(gid).unwrap().0, loc.0);
    }
}

/// Compaction after heavy migration keeps every body resolvable and leaves
/// no holes.
#[test]
fn test_compact_after_migration() {
    let mut cluster = RankCluster::new(params(4)).unwrap();
    let gids = spray(&mut cluster, 120, 11);
    cluster.advance_simulation(0.5).unwrap();

    let snapshot: Vec<_> = gids.iter().map(|&g| cluster.body(g).unwrap()).collect();
    cluster.compact().unwrap();
    cluster.check_consistency().unwrap();

    for sys in cluster.ranks() {
        let store = sys.store();
        let used = sys.owned_count() + sys.ghost_count();
        assert_eq!(store.len(), used, "rank {} has holes", sys.rank().rank);
        assert!(store.statuses().iter().all(|s| *s != BodyStatus::Empty));
    }
    for (gid, before) in gids.iter().zip(snapshot) {
        assert_eq!(cluster.body(*gid).unwrap(), before);
    }
}

/// A single rank behaves like an undistributed system.
#[test]
fn test_single_rank_has_no_ghosts() {
    let mut cluster = RankCluster::new(params(1)).unwrap();
    spray(&mut cluster, 40, 5);
    let report = cluster.advance_simulation(0.1).unwrap();

    assert_eq!(report.migrated, 0);
    assert_eq!(cluster.total_ghosts(), 0);
    assert_eq!(cluster.total_owned(), 40);
}

/// Parameters survive a JSON and YAML round trip through files.
#[test]
fn test_params_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut p = params(3);
    p.cohesion_ratio = 0.25;
    p.output_dir = dir.path().join("frames");

    let json = dir.path().join("params.json");
    p.save_json(&json).unwrap();
    assert_eq!(GranularParams::load_json(&json).unwrap(), p);

    let yaml = dir.path().join("params.yaml");
    p.save_yaml(&yaml).unwrap();
    assert_eq!(GranularParams::load_yaml(&yaml).unwrap(), p);
}

/// Loading rejects files that fail validation.
#[test]
fn test_load_rejects_invalid_params() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{ "sphere_radius": -1.0 }"#).unwrap();
    assert!(GranularParams::load_json(&path).is_err());
}
