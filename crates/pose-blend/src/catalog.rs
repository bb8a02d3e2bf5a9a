//! Poses extracted from a pose library, aligned to the bones they touch

use std::collections::HashMap;

use crate::symmetry::{PoseRow, pair_rows};
use crate::transform::Transform;

/// Marker name that selects the additive base pose
pub const BASE_POSE_NAME: &str = "base_pose";

/// Reserved marker name that never becomes a pose
pub const BIND_POSE_NAME: &str = "bind_pose";

/// Named pose with one optional transform per relevant bone
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    pub name: String,
    /// Indexed like [`PoseCatalog::relevant_bones`]; None leaves the bone alone
    pub transforms: Vec<Option<Transform>>,
}

impl Pose {
    pub fn new(name: impl Into<String>, transforms: Vec<Option<Transform>>) -> Self {
        Self {
            name: name.into(),
            transforms,
        }
    }

    pub fn transform(&self, bone_index: usize) -> Option<&Transform> {
        self.transforms.get(bone_index).and_then(Option::as_ref)
    }

    /// Number of bones this pose affects
    pub fn affected_bones(&self) -> usize {
        self.transforms.iter().flatten().count()
    }
}

/// Derived pose data for one armature
///
/// Built in one go by the extractor and replaced wholesale on rebuild; the
/// bone list never changes in between.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseCatalog {
    relevant_bones: Vec<String>,
    poses: Vec<Pose>,
    base_pose: Option<Pose>,
    rows: Vec<PoseRow>,
    name_index: HashMap<String, usize>,
    additive: bool,
    marker_names: Vec<String>,
}

impl PoseCatalog {
    /// Assemble a catalog from already aligned poses
    ///
    /// Transform lists are padded or truncated to the bone count, and the
    /// symmetric rows and name index are derived from `poses`.
    pub fn from_parts(
        relevant_bones: Vec<String>,
        mut poses: Vec<Pose>,
        mut base_pose: Option<Pose>,
        additive: bool,
    ) -> Self {
        let bone_count = relevant_bones.len();
        for pose in poses.iter_mut().chain(base_pose.iter_mut()) {
            pose.transforms.resize(bone_count, None);
        }

        let marker_names = base_pose
            .iter()
            .chain(poses.iter())
            .map(|pose| pose.name.clone())
            .collect();

        let name_index = poses
            .iter()
            .enumerate()
            .map(|(index, pose)| (pose.name.clone(), index))
            .collect();

        let names: Vec<&str> = poses.iter().map(|pose| pose.name.as_str()).collect();
        let rows = pair_rows(&names);

        Self {
            relevant_bones,
            poses,
            base_pose,
            rows,
            name_index,
            additive,
            marker_names,
        }
    }

    pub(crate) fn with_marker_names(mut self, marker_names: Vec<String>) -> Self {
        self.marker_names = marker_names;
        self
    }

    pub fn relevant_bones(&self) -> &[String] {
        &self.relevant_bones
    }

    pub fn bone_index(&self, bone: &str) -> Option<usize> {
        self.relevant_bones.iter().position(|name| name == bone)
    }

    /// Blendable poses, excluding the base pose
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    pub fn base_pose(&self) -> Option<&Pose> {
        self.base_pose.as_ref()
    }

    pub fn rows(&self) -> &[PoseRow] {
        &self.rows
    }

    pub fn pose(&self, name: &str) -> Option<&Pose> {
        self.name_index.get(name).map(|&index| &self.poses[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Whether the poses hold deltas relative to the base pose
    pub fn is_additive(&self) -> bool {
        self.additive
    }

    /// Every marker name in the source library, reserved ones included
    pub fn marker_names(&self) -> &[String] {
        &self.marker_names
    }

    pub fn is_empty(&self) -> bool {
        self.poses.is_empty() && self.base_pose.is_none()
    }

    /// Same catalog with the named pose left out
    pub fn without_pose(&self, name: &str) -> Self {
        let poses = self
            .poses
            .iter()
            .filter(|pose| pose.name != name)
            .cloned()
            .collect();
        Self::from_parts(
            self.relevant_bones.clone(),
            poses,
            self.base_pose.clone(),
            self.additive,
        )
        .with_marker_names(self.marker_names.clone())
    }
}
