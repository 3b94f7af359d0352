//! A column of granular material dropped onto a rough floor, split across
//! ranks along X.
//!
//! Run with: cargo run --example repose -p simdist --release -- crates/simdist/configs/repose.json

use std::path::Path;
use std::process::ExitCode;

use simdist::output::write_frame;
use simdist::sampler::{hcp_sample_box, sample_cylinder_z};
use simdist::{GranularParams, RankCluster, Vec3};

const FPS: u32 = 60;
/// Padding factor between sampled sphere centres.
const FILL_EPSILON: f32 = 2.02;

fn usage(name: &str) {
    eprintln!("usage: {} <params.json>", name);
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        usage(&args[0]);
        return ExitCode::from(1);
    }
    let params = match GranularParams::load_json(Path::new(&args[1])) {
        Ok(p) => p,
        Err(e) => {
            log::error!("failed to load {}: {}", args[1], e);
            usage(&args[0]);
            return ExitCode::from(1);
        }
    };

    match run(params) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::from(1)
        }
    }
}

fn run(params: GranularParams) -> Result<(), Box<dyn std::error::Error>> {
    let radius = params.sphere_radius;
    let spacing = FILL_EPSILON * radius;
    let half = 0.5 * params.box_dims;
    let out_dir = params.output_dir.clone();
    let time_end = params.time_end;
    let mass = params.sphere_mass();

    let mut cluster = RankCluster::new(params)?;

    // Fixed points on the bottom for roughness
    let bottom_z = -half.z + radius;
    let roughness = hcp_sample_box(
        Vec3::new(0.0, 0.0, bottom_z),
        Vec3::new(half.x - radius, half.y - radius, 0.0),
        spacing,
    );
    cluster.add_bodies(&roughness, true)?;

    // Column of material above the floor
    let fill_bottom = bottom_z + spacing;
    let fill_width = 5.0;
    let fill_height = 2.0 * fill_width;
    let column = sample_cylinder_z(
        Vec3::new(0.0, 0.0, fill_bottom + 0.5 * fill_height),
        fill_width,
        0.5 * fill_height,
        spacing,
        0.0,
        0,
    );
    cluster.add_bodies(&column, false)?;
    cluster.refresh_ghosts()?;

    log::info!("added {} fixed points", roughness.len());
    log::info!(
        "added {} material points ({:.1} g)",
        column.len(),
        mass * column.len() as f32
    );
    log::info!("bodies per rank: {:?}", cluster.owned_per_rank());

    let frame_step = 1.0 / FPS as f32;
    let total_frames = (time_end * FPS as f32) as usize;
    let mut frame = 0;
    write_frame(&cluster, &out_dir, frame)?;
    frame += 1;

    while cluster.time() < time_end as f64 {
        let report = cluster.advance_simulation(frame_step)?;
        log::info!(
            "frame {} of {}: migrated={} ghosts={}",
            frame,
            total_frames,
            report.migrated,
            report.ghosts
        );
        write_frame(&cluster, &out_dir, frame)?;
        frame += 1;
    }

    cluster.check_consistency()?;
    log::info!("final bodies per rank: {:?}", cluster.owned_per_rank());
    Ok(())
}
