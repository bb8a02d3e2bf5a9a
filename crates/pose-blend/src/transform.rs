//! Bone transform value type and the blend primitives built on it
//!
//! Rotations are accumulated by summing raw quaternion coordinates, so most
//! operations here leave the rotation unnormalized. Callers renormalize once
//! per bone after all contributions have been folded in.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Weights within this distance of 1.0 are treated as a full contribution
pub const ZERO_ANIMWEIGHT_THRESH: f32 = 0.00001;

/// Rotations closer than this to identity are skipped when composing
pub const DELTA: f32 = 0.00001;

/// Default tolerance for [`Transform::equals`]
pub const TRANSFORM_TOLERANCE: f32 = 0.00001;

/// Location, rotation and scale of a single bone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform (no translation, no rotation, unit scale)
    pub const IDENTITY: Self = Self {
        location: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub const fn new(location: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            location,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    /// Compare all ten components within `tolerance`
    pub fn equals(&self, other: &Self, tolerance: f32) -> bool {
        self.location.abs_diff_eq(other.location, tolerance)
            && self.rotation.abs_diff_eq(other.rotation, tolerance)
            && self.scale.abs_diff_eq(other.scale, tolerance)
    }

    /// Every field multiplied by `weight`, rotation coordinates included
    pub fn scaled(&self, weight: f32) -> Self {
        Self {
            location: self.location * weight,
            rotation: self.rotation * weight,
            scale: self.scale * weight,
        }
    }

    /// Copy of `self` with `other` accumulated at full weight
    pub fn add(&self, other: &Self) -> Self {
        let mut sum = *self;
        sum.accumulate_with_shortest_rotation(other, 1.0);
        sum
    }

    /// Accumulate `delta * weight` into this transform.
    ///
    /// The rotation is summed coordinate-wise, flipping the sign of the
    /// incoming quaternion when needed so that its dot product with the
    /// running rotation stays non-negative. The result is not normalized.
    pub fn accumulate_with_shortest_rotation(&mut self, delta: &Self, weight: f32) -> &mut Self {
        let atom = delta.scaled(weight);

        if self.rotation.dot(atom.rotation) < 0.0 {
            self.rotation = self.rotation - atom.rotation;
        } else {
            self.rotation = self.rotation + atom.rotation;
        }

        self.location += atom.location;
        self.scale += atom.scale;
        self
    }

    /// Blend identity towards the additive `source` by `weight` and apply
    /// the result on top of `target`.
    pub fn blend_from_identity_and_accumulate(target: &mut Self, source: &Self, weight: f32) {
        let mut delta_location = source.location;
        let mut delta_rotation = source.rotation;
        let mut delta_scale = source.scale;

        if weight < 1.0 - ZERO_ANIMWEIGHT_THRESH {
            delta_location = source.location * weight;
            delta_scale = Vec3::ZERO.lerp(source.scale, weight);
            delta_rotation = Quat::from_xyzw(
                source.rotation.x * weight,
                source.rotation.y * weight,
                source.rotation.z * weight,
                lerp(1.0, source.rotation.w, weight),
            );
        }

        if delta_rotation.w * delta_rotation.w < 1.0 - DELTA * DELTA {
            target.rotation = normalize_or_identity(delta_rotation) * target.rotation;
        }

        target.location += delta_location;
        target.scale *= Vec3::ONE + delta_scale;
    }

    /// Per-axis reciprocal of the scale, with near-zero axes mapped to zero
    pub fn safe_scale_reciprocal(&self, tolerance: f32) -> Vec3 {
        let recip = |s: f32| if s.abs() <= tolerance { 0.0 } else { 1.0 / s };
        Vec3::new(recip(self.scale.x), recip(self.scale.y), recip(self.scale.z))
    }

    /// Rewrite this absolute transform as a delta relative to `base`.
    ///
    /// Location becomes a difference, rotation the relative rotation that
    /// takes `base` to `self`, and scale a fractional change so that a unit
    /// scale delta reads as zero.
    pub fn make_additive(&mut self, base: &Self) {
        self.location -= base.location;
        self.rotation = self.rotation * normalize_or_identity(base.rotation).inverse();
        self.normalize_rotation();
        self.scale = self.scale * base.safe_scale_reciprocal(TRANSFORM_TOLERANCE) - Vec3::ONE;
    }

    pub fn normalize_rotation(&mut self) {
        self.rotation = normalize_or_identity(self.rotation);
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Normalize a quaternion, collapsing a zero-length one to identity
pub fn normalize_or_identity(q: Quat) -> Quat {
    let len_sq = q.length_squared();
    if len_sq > 0.0 && len_sq.is_finite() {
        q * len_sq.sqrt().recip()
    } else {
        Quat::IDENTITY
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    t * b + (1.0 - t) * a
}

/// Axis order of an Euler rotation, named in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EulerOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

impl EulerOrder {
    /// Component indices in application order
    fn axes(self) -> [usize; 3] {
        match self {
            Self::Xyz => [0, 1, 2],
            Self::Xzy => [0, 2, 1],
            Self::Yxz => [1, 0, 2],
            Self::Yzx => [1, 2, 0],
            Self::Zxy => [2, 0, 1],
            Self::Zyx => [2, 1, 0],
        }
    }

    /// Applying axes A, B, C about fixed axes equals intrinsic C, B, A
    fn intrinsic(self) -> EulerRot {
        match self {
            Self::Xyz => EulerRot::ZYX,
            Self::Xzy => EulerRot::YZX,
            Self::Yxz => EulerRot::ZXY,
            Self::Yzx => EulerRot::XZY,
            Self::Zxy => EulerRot::YXZ,
            Self::Zyx => EulerRot::XYZ,
        }
    }
}

/// Quaternion for Euler `angles` (radians, indexed x/y/z) applied in `order`
pub fn quat_from_euler(order: EulerOrder, angles: Vec3) -> Quat {
    let [a, b, c] = order.axes();
    Quat::from_euler(order.intrinsic(), angles[c], angles[b], angles[a])
}

/// Euler angles (radians, indexed x/y/z) for `rotation` in `order`
pub fn quat_to_euler(order: EulerOrder, rotation: Quat) -> Vec3 {
    let [a, b, c] = order.axes();
    let (first, second, third) = normalize_or_identity(rotation).to_euler(order.intrinsic());
    let mut angles = Vec3::ZERO;
    angles[c] = first;
    angles[b] = second;
    angles[a] = third;
    angles
}

/// Quaternion for a rotation of `angle` radians about `axis`
pub fn quat_from_axis_angle(axis: Vec3, angle: f32) -> Quat {
    match axis.try_normalize() {
        Some(axis) => Quat::from_axis_angle(axis, angle),
        None => Quat::IDENTITY,
    }
}
