//! In-memory skeleton collaborator
//!
//! An [`Armature`] owns its pose bones, the pose weights, the weight curves
//! and the pose library. Armatures live in a [`Scene`] and are addressed by
//! generational handles, so a handle taken before a reload goes stale
//! instead of silently pointing at something else.

use generational_arena::Arena;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::library::{CurveSet, PoseLibrary};
use crate::transform::{EulerOrder, Transform, quat_from_axis_angle, quat_from_euler, quat_to_euler};
use crate::weights::WeightStore;

/// Rotation of a pose bone in the representation the bone prefers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BoneRotation {
    Quaternion { quaternion: Quat },
    AxisAngle { axis: Vec3, angle: f32 },
    Euler { order: EulerOrder, angles: Vec3 },
}

impl Default for BoneRotation {
    fn default() -> Self {
        Self::Quaternion {
            quaternion: Quat::IDENTITY,
        }
    }
}

impl BoneRotation {
    pub fn to_quat(&self) -> Quat {
        match *self {
            Self::Quaternion { quaternion } => quaternion,
            Self::AxisAngle { axis, angle } => quat_from_axis_angle(axis, angle),
            Self::Euler { order, angles } => quat_from_euler(order, angles),
        }
    }

    /// Store `rotation` while keeping the current representation
    pub fn set_quat(&mut self, rotation: Quat) {
        match self {
            Self::Quaternion { quaternion } => *quaternion = rotation,
            Self::AxisAngle { axis, angle } => {
                let (new_axis, new_angle) = rotation.to_axis_angle();
                *axis = new_axis;
                *angle = new_angle;
            }
            Self::Euler { order, angles } => *angles = quat_to_euler(*order, rotation),
        }
    }
}

/// Local transform of one bone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseBone {
    pub location: Vec3,
    pub rotation: BoneRotation,
    pub scale: Vec3,
}

impl Default for PoseBone {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: BoneRotation::default(),
            scale: Vec3::ONE,
        }
    }
}

impl PoseBone {
    pub fn transform(&self) -> Transform {
        Transform::new(self.location, self.rotation.to_quat(), self.scale)
    }

    pub fn apply(&mut self, transform: &Transform) {
        self.location = transform.location;
        self.rotation.set_quat(transform.rotation);
        self.scale = transform.scale;
    }
}

/// Skeleton with its pose weights and authoring data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Armature {
    pub name: String,
    #[serde(default)]
    pub bones: BTreeMap<String, PoseBone>,
    #[serde(default)]
    pub weights: WeightStore,
    /// Curves animating the pose weights, keyed `["<pose>"]`
    #[serde(default)]
    pub weight_curves: CurveSet,
    #[serde(default)]
    pub pose_library: Option<PoseLibrary>,
}

impl Armature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_bone(mut self, name: impl Into<String>, bone: PoseBone) -> Self {
        self.bones.insert(name.into(), bone);
        self
    }

    pub fn with_pose_library(mut self, library: PoseLibrary) -> Self {
        self.pose_library = Some(library);
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn bone_transform(&self, bone: &str) -> Option<Transform> {
        self.bones.get(bone).map(PoseBone::transform)
    }

    /// Write a transform to a bone, returning false if there is no such bone
    pub fn set_bone_transform(&mut self, bone: &str, transform: &Transform) -> bool {
        match self.bones.get_mut(bone) {
            Some(pose_bone) => {
                pose_bone.apply(transform);
                true
            }
            None => false,
        }
    }
}

/// Generational reference to an armature in a [`Scene`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArmatureHandle(pub generational_arena::Index);

/// Application that owns the armatures a blender works on
pub trait ArmatureHost {
    /// Resolve a handle, None once it has gone stale
    fn armature(&self, handle: ArmatureHandle) -> Option<&Armature>;

    fn armature_mut(&mut self, handle: ArmatureHandle) -> Option<&mut Armature>;

    /// Look an armature up by name
    fn find_armature(&self, name: &str) -> Option<ArmatureHandle>;

    /// Current frame of the host timeline
    fn current_frame(&self) -> i32;
}

/// Arena-backed [`ArmatureHost`]
#[derive(Debug, Default)]
pub struct Scene {
    armatures: Arena<Armature>,
    frame_current: i32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, armature: Armature) -> ArmatureHandle {
        ArmatureHandle(self.armatures.insert(armature))
    }

    pub fn remove(&mut self, handle: ArmatureHandle) -> Option<Armature> {
        self.armatures.remove(handle.0)
    }

    /// Re-insert an armature the way an undo step or file reload would,
    /// invalidating every handle to it
    pub fn reload(&mut self, handle: ArmatureHandle) -> Option<ArmatureHandle> {
        let armature = self.armatures.remove(handle.0)?;
        Some(self.add(armature))
    }

    /// Reload every armature in the scene
    pub fn reload_all(&mut self) {
        let indices: Vec<_> = self.armatures.iter().map(|(index, _)| index).collect();
        for index in indices {
            if let Some(armature) = self.armatures.remove(index) {
                self.add(armature);
            }
        }
    }

    pub fn rename(&mut self, handle: ArmatureHandle, name: impl Into<String>) -> bool {
        match self.armatures.get_mut(handle.0) {
            Some(armature) => {
                armature.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn set_frame(&mut self, frame: i32) {
        self.frame_current = frame;
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArmatureHandle, &Armature)> {
        self.armatures
            .iter()
            .map(|(index, armature)| (ArmatureHandle(index), armature))
    }

    pub fn len(&self) -> usize {
        self.armatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.armatures.len() == 0
    }
}

impl ArmatureHost for Scene {
    fn armature(&self, handle: ArmatureHandle) -> Option<&Armature> {
        self.armatures.get(handle.0)
    }

    fn armature_mut(&mut self, handle: ArmatureHandle) -> Option<&mut Armature> {
        self.armatures.get_mut(handle.0)
    }

    fn find_armature(&self, name: &str) -> Option<ArmatureHandle> {
        self.iter()
            .find(|(_, armature)| armature.name == name)
            .map(|(handle, _)| handle)
    }

    fn current_frame(&self) -> i32 {
        self.frame_current
    }
}
