//! Unit and space conversion between the scene and the container
//!
//! The scene works in its own length unit with rotations in radians and UV
//! origin at the bottom left. The container stores lengths scaled by
//! [`SCENE_TO_EXTERNAL`], rotations as degrees and UVs with the origin at
//! the top left. Every function here is pure.
//!
//! Rotations are composed as `Rx · Ry · Rz`, which rotates a vector about Z
//! first, then Y, then X.

use glam::{DQuat, DVec3, EulerRot};

/// Factor applied to lengths going into the container
pub const SCENE_TO_EXTERNAL: f64 = 0.01;

/// Factor applied to lengths coming out of the container
pub const EXTERNAL_TO_SCENE: f64 = 100.0;

/// Euler order matching the stored angle triple
pub const ROTATION_ORDER: EulerRot = EulerRot::XYZ;

/// Convert a scene position to container units
#[inline]
pub fn position_to_external(position: DVec3) -> DVec3 {
    position * SCENE_TO_EXTERNAL
}

/// Convert a container position to scene units
#[inline]
pub fn position_to_scene(position: DVec3) -> DVec3 {
    position * EXTERNAL_TO_SCENE
}

/// Convert a single scene length (e.g. a bounding sphere radius)
#[inline]
pub fn length_to_external(length: f64) -> f64 {
    length * SCENE_TO_EXTERNAL
}

/// Convert a single container length
#[inline]
pub fn length_to_scene(length: f64) -> f64 {
    length * EXTERNAL_TO_SCENE
}

/// Radians to stored degrees, per component
#[inline]
pub fn rotation_to_external(radians: DVec3) -> DVec3 {
    DVec3::new(radians.x.to_degrees(), radians.y.to_degrees(), radians.z.to_degrees())
}

/// Stored degrees to radians, per component
#[inline]
pub fn rotation_to_scene(degrees: DVec3) -> DVec3 {
    DVec3::new(degrees.x.to_radians(), degrees.y.to_radians(), degrees.z.to_radians())
}

/// Build a rotation from stored degrees
pub fn quat_from_degrees(degrees: DVec3) -> DQuat {
    let radians = rotation_to_scene(degrees);
    DQuat::from_euler(ROTATION_ORDER, radians.x, radians.y, radians.z)
}

/// Decompose a rotation into stored degrees
pub fn quat_to_degrees(rotation: DQuat) -> DVec3 {
    let (x, y, z) = rotation.to_euler(ROTATION_ORDER);
    rotation_to_external(DVec3::new(x, y, z))
}

/// Flip the V coordinate. Applying it twice gives back the input.
#[inline]
pub fn flip_uv(uv: [f32; 2]) -> [f32; 2] {
    [uv[0], 1.0 - uv[1]]
}

/// Scene color (0..1 per channel) to stored bytes
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn color_to_external(color: [f32; 4]) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0) as u8)
}

/// Stored bytes to scene color
pub fn color_to_scene(color: [u8; 4]) -> [f32; 4] {
    color.map(|c| f32::from(c) / 255.0)
}

/// Scale every component of a stored bounding sphere into container units
#[allow(clippy::cast_possible_truncation)]
pub fn sphere_to_external<const N: usize>(sphere: [f32; N]) -> [f32; N] {
    sphere.map(|v| length_to_external(f64::from(v)) as f32)
}

/// Scale every component of a stored bounding sphere into scene units
#[allow(clippy::cast_possible_truncation)]
pub fn sphere_to_scene<const N: usize>(sphere: [f32; N]) -> [f32; N] {
    sphere.map(|v| length_to_scene(f64::from(v)) as f32)
}

/// Widen a stored vector
#[inline]
pub fn widen(v: [f32; 3]) -> DVec3 {
    DVec3::from_array(v.map(f64::from))
}

/// Narrow a vector for storage
#[inline]
pub fn narrow(v: DVec3) -> [f32; 3] {
    v.as_vec3().to_array()
}
