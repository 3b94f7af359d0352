//! Fill the bottom half of a box with HCP-packed material, let it settle and
//! report how the bodies are spread over the ranks.
//!
//! Run with: cargo run --example settle -p simdist --release -- [num_ranks]

use simdist::sampler::hcp_sample_box;
use simdist::{FrictionMode, GranularParams, RankCluster, TimeIntegrator, Vec3, Verbosity};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let num_ranks = std::env::args()
        .nth(1)
        .map(|s| s.parse::<usize>())
        .transpose()?
        .unwrap_or(4);

    let box_size = 70.0;
    let params = GranularParams {
        box_dims: Vec3::splat(box_size),
        friction_mode: FrictionMode::Frictionless,
        time_integrator: TimeIntegrator::CenteredDifference,
        time_end: 0.5,
        num_ranks,
        verbosity: Verbosity::Info,
        ..Default::default()
    };
    let radius = params.sphere_radius;
    let time_end = params.time_end;

    let mut cluster = RankCluster::new(params)?;

    let center = Vec3::new(0.0, 0.0, -0.25 * box_size);
    let half = Vec3::new(
        0.5 * box_size - radius,
        0.5 * box_size - radius,
        0.25 * box_size - radius,
    );
    let points = hcp_sample_box(center, half, 2.1 * radius);
    let gids = cluster.add_bodies(&points, false)?;
    cluster.refresh_ghosts()?;
    println!("Added {} bodies over {} ranks", gids.len(), num_ranks);

    let frame_step = 1.0 / 25.0;
    let start = std::time::Instant::now();
    while cluster.time() < time_end as f64 {
        cluster.advance_simulation(frame_step)?;
        println!("Time: {:.3}", cluster.time());
    }
    println!(
        "Simulated {} bodies in {:.2} s",
        cluster.total_owned(),
        start.elapsed().as_secs_f64()
    );

    for (rank, count) in cluster.owned_per_rank().iter().enumerate() {
        println!("  rank {}: {} owned, {} ghosts", rank, count, cluster.ranks()[rank].ghost_count());
    }

    let unresolved = gids.iter().filter(|&&g| cluster.locate(g).is_none()).count();
    if unresolved > 0 {
        return Err(format!("{} bodies lost track of their owner", unresolved).into());
    }
    cluster.check_consistency()?;
    println!("All {} gids resolve on exactly one rank", gids.len());
    Ok(())
}
