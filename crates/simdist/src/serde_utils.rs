//! Serde helpers for glam types.
//!
//! Vectors are written as `[x, y, z]` arrays so configuration files stay
//! compact, e.g. `"gravity": [0.0, 0.0, -980.0]`.

use glam::Vec3;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize_vec3<S>(v: &Vec3, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    v.to_array().serialize(s)
}

pub fn deserialize_vec3<'de, D>(d: D) -> Result<Vec3, D::Error>
where
    D: Deserializer<'de>,
{
    <[f32; 3]>::deserialize(d).map(Vec3::from_array)
}
