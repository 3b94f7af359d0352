//! Simulation parameters for a partitioned granular run.
//!
//! Everything a driver would otherwise keep as loose globals (contact
//! coefficients per pair type, friction and rolling models, integrator, step
//! size, output settings, partitioning) lives here and is handed to
//! [`RankCluster::new`](crate::cluster::RankCluster::new).

use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::constants::{
    GRAVITY_CGS, NORMAL_DAMPING, NORMAL_STIFFNESS, SPHERE_DENSITY, SPHERE_RADIUS, STEP_SIZE,
};
use crate::error::SimError;
use crate::serde_utils::{deserialize_vec3, serialize_vec3};

/// Tangential contact model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrictionMode {
    #[default]
    Frictionless,
    SingleStep,
    MultiStep,
}

/// Rolling-resistance model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollingMode {
    #[default]
    NoResistance,
    Schwartz,
}

/// Explicit time integration scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeIntegrator {
    ForwardEuler,
    #[default]
    ExtendedTaylor,
    CenteredDifference,
    Chung,
}

/// What gets written per output frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    None,
    Csv,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    Quiet,
    #[default]
    Info,
    Metrics,
}

/// Parameters of one granular simulation.
///
/// Pair coefficients come in two flavours: `_s2s` for sphere-sphere and
/// `_s2w` for sphere-wall contacts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GranularParams {
    pub sphere_radius: f32,
    pub sphere_density: f32,
    /// Full extents of the box, centred at the origin.
    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub box_dims: Vec3,

    pub normal_stiffness_s2s: f32,
    pub normal_stiffness_s2w: f32,
    pub normal_damping_s2s: f32,
    pub normal_damping_s2w: f32,
    pub tangent_stiffness_s2s: f32,
    pub tangent_stiffness_s2w: f32,
    pub tangent_damping_s2s: f32,
    pub tangent_damping_s2w: f32,
    pub static_friction_s2s: f32,
    pub static_friction_s2w: f32,
    pub rolling_friction_s2s: f32,
    pub rolling_friction_s2w: f32,
    /// Cohesion force as a multiple of sphere weight.
    pub cohesion_ratio: f32,
    /// Sphere-wall adhesion force as a multiple of sphere weight.
    pub adhesion_ratio_s2w: f32,

    #[serde(serialize_with = "serialize_vec3", deserialize_with = "deserialize_vec3")]
    pub gravity: Vec3,
    pub friction_mode: FrictionMode,
    pub rolling_mode: RollingMode,
    pub time_integrator: TimeIntegrator,
    pub step_size: f32,
    pub time_end: f32,

    pub output_mode: OutputMode,
    pub verbosity: Verbosity,
    pub output_dir: PathBuf,

    /// Number of slabs the box is split into along X.
    pub num_ranks: usize,
    /// Distance from a slab boundary within which bodies are shadowed on
    /// the neighboring rank.
    pub ghost_width: f32,
    /// Keep box walls fixed in place.
    pub fixed_boundaries: bool,
}

impl Default for GranularParams {
    fn default() -> Self {
        Self {
            sphere_radius: SPHERE_RADIUS,
            sphere_density: SPHERE_DENSITY,
            box_dims: Vec3::splat(70.0),

            normal_stiffness_s2s: NORMAL_STIFFNESS,
            normal_stiffness_s2w: NORMAL_STIFFNESS,
            normal_damping_s2s: NORMAL_DAMPING,
            normal_damping_s2w: NORMAL_DAMPING,
            tangent_stiffness_s2s: 0.0,
            tangent_stiffness_s2w: 0.0,
            tangent_damping_s2s: 0.0,
            tangent_damping_s2w: 0.0,
            static_friction_s2s: 0.0,
            static_friction_s2w: 0.0,
            rolling_friction_s2s: 0.0,
            rolling_friction_s2w: 0.0,
            cohesion_ratio: 0.0,
            adhesion_ratio_s2w: 0.0,

            gravity: Vec3::new(0.0, 0.0, GRAVITY_CGS),
            friction_mode: FrictionMode::Frictionless,
            rolling_mode: RollingMode::NoResistance,
            time_integrator: TimeIntegrator::CenteredDifference,
            step_size: STEP_SIZE,
            time_end: 0.5,

            output_mode: OutputMode::None,
            verbosity: Verbosity::Info,
            output_dir: PathBuf::from("output"),

            num_ranks: 1,
            ghost_width: 2.0 * SPHERE_RADIUS,
            fixed_boundaries: true,
        }
    }
}

impl GranularParams {
    /// Mass of one sphere.
    pub fn sphere_mass(&self) -> f32 {
        4.0 / 3.0 * std::f32::consts::PI * self.sphere_radius.powi(3) * self.sphere_density
    }

    /// Width of one rank's slab along X.
    pub fn slab_width(&self) -> f32 {
        self.box_dims.x / self.num_ranks.max(1) as f32
    }

    /// Reject parameter sets that cannot describe a physical run.
    pub fn validate(&self) -> Result<(), SimError> {
        fn invalid(reason: impl Into<String>) -> Result<(), SimError> {
            Err(SimError::InvalidConfig(reason.into()))
        }

        if !(self.sphere_radius > 0.0) {
            return invalid(format!("sphere_radius must be positive, got {}", self.sphere_radius));
        }
        if !(self.sphere_density > 0.0) {
            return invalid(format!("sphere_density must be positive, got {}", self.sphere_density));
        }
        if !(self.box_dims.min_element() > 0.0) {
            return invalid(format!("box_dims must be positive, got {:?}", self.box_dims));
        }
        if !self.gravity.is_finite() {
            return invalid("gravity must be finite");
        }

        let non_negative = [
            ("normal_stiffness_s2s", self.normal_stiffness_s2s),
            ("normal_stiffness_s2w", self.normal_stiffness_s2w),
            ("normal_damping_s2s", self.normal_damping_s2s),
            ("normal_damping_s2w", self.normal_damping_s2w),
            ("tangent_stiffness_s2s", self.tangent_stiffness_s2s),
            ("tangent_stiffness_s2w", self.tangent_stiffness_s2w),
            ("tangent_damping_s2s", self.tangent_damping_s2s),
            ("tangent_damping_s2w", self.tangent_damping_s2w),
            ("static_friction_s2s", self.static_friction_s2s),
            ("static_friction_s2w", self.static_friction_s2w),
            ("rolling_friction_s2s", self.rolling_friction_s2s),
            ("rolling_friction_s2w", self.rolling_friction_s2w),
            ("cohesion_ratio", self.cohesion_ratio),
            ("adhesion_ratio_s2w", self.adhesion_ratio_s2w),
            ("time_end", self.time_end),
            ("ghost_width", self.ghost_width),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) || !value.is_finite() {
                return invalid(format!("{} must be finite and >= 0, got {}", name, value));
            }
        }

        if !(self.step_size > 0.0) || !self.step_size.is_finite() {
            return invalid(format!("step_size must be positive, got {}", self.step_size));
        }
        if self.num_ranks == 0 {
            return invalid("num_ranks must be at least 1");
        }
        // Ghosts may only reach the adjacent slab.
        if self.num_ranks > 1 && self.ghost_width >= self.slab_width() {
            return invalid(format!(
                "ghost_width {} must be smaller than the slab width {}",
                self.ghost_width,
                self.slab_width()
            ));
        }
        Ok(())
    }

    /// Save parameters to a JSON file.
    pub fn save_json(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate parameters from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let json = std::fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }

    /// Save parameters to a YAML file.
    pub fn save_yaml(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Load and validate parameters from a YAML file.
    pub fn load_yaml(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let yaml = std::fs::read_to_string(path)?;
        let params: Self = serde_yaml::from_str(&yaml)?;
        params.validate()?;
        Ok(params)
    }
}
