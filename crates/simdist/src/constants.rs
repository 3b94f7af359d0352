//! Reference values for granular runs.
//!
//! Granular configurations are written in CGS units (cm, g, s), so gravity is
//! in cm/s^2 and forces come out in dynes.

/// Gravitational acceleration along -Z (cm/s^2).
pub const GRAVITY_CGS: f32 = -980.0;

/// Default sphere radius (cm).
pub const SPHERE_RADIUS: f32 = 1.0;

/// Default sphere density (g/cm^3).
pub const SPHERE_DENSITY: f32 = 2.5;

/// Default normal stiffness for both sphere-sphere and sphere-wall pairs.
pub const NORMAL_STIFFNESS: f32 = 5e7;

/// Default normal damping for both sphere-sphere and sphere-wall pairs.
pub const NORMAL_DAMPING: f32 = 2e4;

/// Default fixed step (s).
pub const STEP_SIZE: f32 = 5e-5;

/// Fraction of velocity kept when a body is pushed back inside the box.
pub const WALL_RESTITUTION: f32 = 0.1;
