//! Formatting utilities

use pose_blend::glam::{Quat, Vec3};

/// Format a vector with three decimals per component
pub fn format_vec3(v: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}

/// Format a quaternion in w, x, y, z order
pub fn format_quat(q: Quat) -> String {
    format!("({:.3}, {:.3}, {:.3}, {:.3})", q.w, q.x, q.y, q.z)
}
