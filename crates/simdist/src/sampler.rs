//! Point samplers for building initial granular beds.

use glam::Vec3;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Hexagonal close packing inside the box `center ± half_dims`.
///
/// Neighboring points are exactly `spacing` apart. A zero `half_dims.z`
/// yields a single layer, which is how roughness floors are laid out.
pub fn hcp_sample_box(center: Vec3, half_dims: Vec3, spacing: f32) -> Vec<Vec3> {
    let mut points = Vec::new();
    if !(spacing > 0.0) {
        return points;
    }

    let dx = spacing;
    let dy = spacing * 3.0_f32.sqrt() / 2.0;
    let dz = spacing * (2.0_f32 / 3.0).sqrt();
    let min = center - half_dims;
    let max = center + half_dims;
    let eps = 1e-4 * spacing;

    let nx = (2.0 * half_dims.x / dx).floor() as usize + 1;
    let ny = (2.0 * half_dims.y / dy).floor() as usize + 1;
    let nz = (2.0 * half_dims.z / dz).floor() as usize + 1;

    for k in 0..nz {
        let layer_shift = if k % 2 == 1 { Vec3::new(0.5 * dx, dy / 3.0, 0.0) } else { Vec3::ZERO };
        for j in 0..ny {
            let row_shift = if j % 2 == 1 { 0.5 * dx } else { 0.0 };
            for i in 0..nx {
                let p = min
                    + layer_shift
                    + Vec3::new(i as f32 * dx + row_shift, j as f32 * dy, k as f32 * dz);
                if p.cmple(max + Vec3::splat(eps)).all() {
                    points.push(p);
                }
            }
        }
    }
    points
}

/// Jittered cubic lattice inside a Z-aligned cylinder.
///
/// Each point is displaced by at most `jitter` per axis, so points stay at
/// least `spacing - 2 * sqrt(3) * jitter` apart.
pub fn sample_cylinder_z(
    center: Vec3,
    radius: f32,
    half_height: f32,
    spacing: f32,
    jitter: f32,
    seed: u64,
) -> Vec<Vec3> {
    let mut points = Vec::new();
    if !(spacing > 0.0) {
        return points;
    }
    let mut rng = StdRng::seed_from_u64(seed);

    let n_r = (radius / spacing).floor() as i32;
    let n_z = (2.0 * half_height / spacing).floor() as usize + 1;
    let r2 = radius * radius;

    for k in 0..n_z {
        let z = center.z - half_height + k as f32 * spacing;
        for j in -n_r..=n_r {
            for i in -n_r..=n_r {
                let offset = Vec3::new(i as f32 * spacing, j as f32 * spacing, 0.0);
                if offset.x * offset.x + offset.y * offset.y > r2 {
                    continue;
                }
                let mut p = Vec3::new(center.x + offset.x, center.y + offset.y, z);
                if jitter > 0.0 {
                    p += Vec3::new(
                        rng.gen_range(-jitter..jitter),
                        rng.gen_range(-jitter..jitter),
                        rng.gen_range(-jitter..jitter),
                    );
                }
                points.push(p);
            }
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min_pair_distance(points: &[Vec3]) -> f32 {
        let mut best = f32::MAX;
        for (i, a) in points.iter().enumerate() {
            for b in &points[i + 1..] {
                best = best.min(a.distance(*b));
            }
        }
        best
    }

    #[test]
    fn test_hcp_spacing() {
        let points = hcp_sample_box(Vec3::ZERO, Vec3::splat(3.0), 1.0);
        assert!(points.len() > 50);
        let d = min_pair_distance(&points);
        assert!((d - 1.0).abs() < 1e-3, "min distance {}", d);
    }

    #[test]
    fn test_hcp_stays_in_box() {
        let half = Vec3::new(4.0, 2.0, 1.0);
        let center = Vec3::new(1.0, -1.0, 5.0);
        for p in hcp_sample_box(center, half, 0.7) {
            assert!(p.cmpge(center - half - Vec3::splat(1e-3)).all());
            assert!(p.cmple(center + half + Vec3::splat(1e-3)).all());
        }
    }

    #[test]
    fn test_hcp_flat_layer() {
        let points = hcp_sample_box(Vec3::new(0.0, 0.0, -3.0), Vec3::new(2.0, 2.0, 0.0), 1.0);
        assert!(!points.is_empty());
        assert!(points.iter().all(|p| p.z == -3.0));
    }

    #[test]
    fn test_cylinder_is_deterministic_and_bounded() {
        let a = sample_cylinder_z(Vec3::ZERO, 3.0, 2.0, 1.0, 0.05, 7);
        let b = sample_cylinder_z(Vec3::ZERO, 3.0, 2.0, 1.0, 0.05, 7);
        assert_eq!(a, b);
        for p in &a {
            assert!((p.x * p.x + p.y * p.y).sqrt() <= 3.0 + 0.1);
            assert!(p.z.abs() <= 2.0 + 0.05);
        }
        assert!(min_pair_distance(&a) >= 1.0 - 2.0 * 3.0_f32.sqrt() * 0.05);
    }

    #[test]
    fn test_zero_spacing_is_empty() {
        assert!(hcp_sample_box(Vec3::ZERO, Vec3::ONE, 0.0).is_empty());
        assert!(sample_cylinder_z(Vec3::ZERO, 1.0, 1.0, 0.0, 0.0, 0).is_empty());
    }
}
