//! Per-frame output files.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::cluster::RankCluster;
use crate::params::OutputMode;

/// Header line of every CSV frame.
pub const CSV_HEADER: &str = "gid,rank,x,y,z,vx,vy,vz,fixed";

/// File name of frame `frame`, e.g. `step000012.csv`.
pub fn frame_file_name(frame: usize) -> String {
    format!("step{:06}.csv", frame)
}

/// Render all owned bodies as CSV, sorted by gid.
pub fn frame_csv(cluster: &RankCluster) -> String {
    let mut bodies: Vec<_> = cluster.owned_bodies().collect();
    bodies.sort_by_key(|(_, b)| b.gid);

    let mut out = String::with_capacity(64 * (bodies.len() + 1));
    out.push_str(CSV_HEADER);
    out.push('\n');
    for (rank, b) in bodies {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{}",
            b.gid,
            rank,
            b.position.x,
            b.position.y,
            b.position.z,
            b.velocity.x,
            b.velocity.y,
            b.velocity.z,
            u8::from(b.fixed)
        );
    }
    out
}

/// Write frame `frame` into `dir` according to the cluster's output mode.
///
/// Returns the written path, or `None` when output is disabled.
pub fn write_frame(cluster: &RankCluster, dir: &Path, frame: usize) -> std::io::Result<Option<PathBuf>> {
    match cluster.params().output_mode {
        OutputMode::None => Ok(None),
        OutputMode::Csv => {
            std::fs::create_dir_all(dir)?;
            let path = dir.join(frame_file_name(frame));
            std::fs::write(&path, frame_csv(cluster))?;
            log::debug!("wrote {}", path.display());
            Ok(Some(path))
        }
    }
}
