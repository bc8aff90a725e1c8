//! Positions and distance helpers.
//!
//! World positions are `glam::Vec3` in game units (metres), `z` up.  Most
//! pursuit thresholds are measured on the ground plane, so the helpers below
//! distinguish planar distance from full 3-D distance.

pub use glam::Vec3;

/// Full 3-D distance between two points.
#[inline]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    a.distance(b)
}

/// Distance on the ground plane, ignoring height.
#[inline]
pub fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    let d = a - b;
    (d.x * d.x + d.y * d.y).sqrt()
}

/// Point on the ground plane at `radius` from `center` in direction `angle`
/// (radians, counter-clockwise from +x).  Height is copied from `center`.
#[inline]
pub fn point_on_circle(center: Vec3, radius: f32, angle: f32) -> Vec3 {
    Vec3::new(
        center.x + radius * angle.cos(),
        center.y + radius * angle.sin(),
        center.z,
    )
}

/// `[x, y, z]` form used by spatial indexes.
#[inline]
pub fn to_array(p: Vec3) -> [f32; 3] {
    [p.x, p.y, p.z]
}
