//! Explicit integration of owned bodies and box-wall handling.
//!
//! Only external body forces (gravity) are applied here; contact forces are
//! the job of the granular solver sitting on top of this bookkeeping.

use glam::Vec3;
use rayon::prelude::*;

use crate::constants::WALL_RESTITUTION;
use crate::params::TimeIntegrator;
use crate::store::{BodyStatus, LocalBodyStore};

// Chung's position weight. Under constant acceleration the scheme reduces to
// the Taylor update.
const CHUNG_BETA: f32 = 28.0 / 27.0;

impl TimeIntegrator {
    /// Advance one body by `dt` under acceleration `accel`.
    pub fn advance(self, position: Vec3, velocity: Vec3, accel: Vec3, dt: f32) -> (Vec3, Vec3) {
        match self {
            TimeIntegrator::ForwardEuler => (position + velocity * dt, velocity + accel * dt),
            TimeIntegrator::ExtendedTaylor => (
                position + velocity * dt + 0.5 * accel * dt * dt,
                velocity + accel * dt,
            ),
            TimeIntegrator::CenteredDifference => {
                let v = velocity + accel * dt;
                (position + v * dt, v)
            }
            TimeIntegrator::Chung => {
                let accel_next = accel;
                let beta = 0.5 * CHUNG_BETA;
                let p = position
                    + velocity * dt
                    + dt * dt * (beta * accel + (0.5 - beta) * accel_next);
                let v = velocity + dt * (1.5 * accel - 0.5 * accel_next);
                (p, v)
            }
        }
    }
}

/// Integrate every owned, non-fixed body in `store`.
pub fn integrate_owned(
    store: &mut LocalBodyStore,
    integrator: TimeIntegrator,
    gravity: Vec3,
    dt: f32,
) {
    let LocalBodyStore {
        position,
        velocity,
        fixed,
        status,
        ..
    } = store;

    position
        .par_iter_mut()
        .zip(velocity.par_iter_mut())
        .zip(fixed.par_iter())
        .zip(status.par_iter())
        .for_each(|(((p, v), fixed), status)| {
            if *status != BodyStatus::Owned || *fixed {
                return;
            }
            let (np, nv) = integrator.advance(*p, *v, gravity, dt);
            *p = np;
            *v = nv;
        });
}

/// Push owned bodies back inside the box `[-half, half]`, shrunk by the
/// sphere radius, bouncing them off the walls.
///
/// Returns the number of bodies that touched a wall.
pub fn enforce_box(store: &mut LocalBodyStore, half_dims: Vec3, radius: f32) -> usize {
    let min = -half_dims + Vec3::splat(radius);
    let max = half_dims - Vec3::splat(radius);
    let mut hits = 0;

    for lid in 0..store.len() {
        if store.status[lid] != BodyStatus::Owned || store.fixed[lid] {
            continue;
        }
        let p = &mut store.position[lid];
        let v = &mut store.velocity[lid];
        let mut hit = false;
        for axis in 0..3 {
            if p[axis] < min[axis] {
                p[axis] = min[axis];
                v[axis] = v[axis].abs() * WALL_RESTITUTION;
                hit = true;
            } else if p[axis] > max[axis] {
                p[axis] = max[axis];
                v[axis] = -v[axis].abs() * WALL_RESTITUTION;
                hit = true;
            }
        }
        if hit {
            hits += 1;
        }
    }
    hits
}
