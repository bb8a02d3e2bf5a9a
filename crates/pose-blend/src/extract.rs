//! Pose extraction from a pose library
//!
//! Every marker in the library is sampled on its own frame. Bones whose
//! sampled transform is identity did not take part in that pose and are
//! dropped, so each pose ends up as a sparse set of bone transforms.

use glam::{Quat, Vec3};
use std::collections::HashMap;
use thiserror::Error;

use crate::blend::BlendOptions;
use crate::catalog::{BASE_POSE_NAME, BIND_POSE_NAME, Pose, PoseCatalog};
use crate::library::{ChannelKind, FCurve, PoseLibrary, parse_bone_path};
use crate::transform::{EulerOrder, TRANSFORM_TOLERANCE, Transform, quat_from_euler};

/// Curve that was skipped during extraction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionWarning {
    /// Channel kind the extractor does not convert (axis-angle rotation)
    #[error("Unsupported channel '{channel}' on bone '{bone}'")]
    UnsupportedChannel { bone: String, channel: String },

    /// Data path that is neither a bone property nor a custom property
    #[error("Unrecognized curve path '{0}'")]
    UnrecognizedPath(String),

    /// Array index past the end of the property
    #[error("Component {index} out of range for '{data_path}'")]
    ComponentOutOfRange { data_path: String, index: usize },

    /// Marker sharing its name with an earlier one
    #[error("Duplicate pose marker '{0}'")]
    DuplicateMarker(String),
}

/// Catalog built from a library, plus whatever had to be skipped
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub catalog: PoseCatalog,
    pub warnings: Vec<ExtractionWarning>,
}

/// Bone curve resolved to the slot of its bone
struct BoneCurve<'a> {
    bone: usize,
    channel: ChannelKind,
    index: usize,
    curve: &'a FCurve,
}

/// Raw channel values of one bone on one marker
#[derive(Clone, Copy)]
struct BoneSample {
    location: Vec3,
    /// w, x, y, z
    quaternion: [f32; 4],
    euler: Option<Vec3>,
    scale: Vec3,
}

impl BoneSample {
    const IDENTITY: Self = Self {
        location: Vec3::ZERO,
        quaternion: [1.0, 0.0, 0.0, 0.0],
        euler: None,
        scale: Vec3::ONE,
    };

    fn write(&mut self, channel: ChannelKind, index: usize, value: f32) {
        match channel {
            ChannelKind::Location => self.location[index] = value,
            ChannelKind::RotationQuaternion => self.quaternion[index] = value,
            ChannelKind::RotationEuler => {
                // Converted once the whole triplet is known
                self.euler.get_or_insert(Vec3::ZERO)[index] = value;
            }
            ChannelKind::Scale => self.scale[index] = value,
            ChannelKind::RotationAxisAngle => {}
        }
    }

    fn to_transform(self) -> Transform {
        let rotation = match self.euler {
            Some(angles) => quat_from_euler(EulerOrder::Xyz, angles),
            None => {
                let [w, x, y, z] = self.quaternion;
                Quat::from_xyzw(x, y, z, w)
            }
        };
        Transform::new(self.location, rotation, self.scale)
    }
}

/// Builds a [`PoseCatalog`] from a [`PoseLibrary`]
#[derive(Debug, Clone, Default)]
pub struct PoseExtractor {
    options: BlendOptions,
}

impl PoseExtractor {
    pub fn new(options: BlendOptions) -> Self {
        Self { options }
    }

    pub fn extract(&self, library: &PoseLibrary) -> Extraction {
        let mut warnings = Vec::new();
        let (bone_names, curves) = classify_curves(library, &mut warnings);

        // Sample every marker into a sparse (bone slot, transform) list. The
        // reserved bind pose is sampled too but only widens the bone set.
        let mut sampled: Vec<(&str, Vec<(usize, Transform)>)> = Vec::new();
        let mut bind_slots: Vec<usize> = Vec::new();
        let mut samples = vec![BoneSample::IDENTITY; bone_names.len()];
        for marker in &library.markers {
            let is_bind_pose = marker.name == BIND_POSE_NAME;
            if !is_bind_pose && sampled.iter().any(|(name, _)| *name == marker.name) {
                push_warning(
                    &mut warnings,
                    ExtractionWarning::DuplicateMarker(marker.name.clone()),
                );
                continue;
            }

            samples.fill(BoneSample::IDENTITY);
            let position = marker.frame as f32;
            for curve in &curves {
                let value = curve.curve.evaluate(position);
                samples[curve.bone].write(curve.channel, curve.index, value);
            }

            let contributing: Vec<(usize, Transform)> = samples
                .iter()
                .enumerate()
                .map(|(bone, sample)| (bone, sample.to_transform()))
                .filter(|(_, transform)| {
                    !transform.equals(&Transform::IDENTITY, TRANSFORM_TOLERANCE)
                })
                .collect();
            if is_bind_pose {
                bind_slots.extend(contributing.iter().map(|(bone, _)| *bone));
            } else {
                sampled.push((marker.name.as_str(), contributing));
            }
        }

        // Union of the bones that survived in any pose, sorted by name
        let mut relevant_slots: Vec<usize> = sampled
            .iter()
            .flat_map(|(_, bones)| bones.iter().map(|(bone, _)| *bone))
            .chain(bind_slots)
            .collect();
        relevant_slots.sort_unstable_by(|a, b| bone_names[*a].cmp(&bone_names[*b]));
        relevant_slots.dedup();

        let relevant_bones: Vec<String> = relevant_slots
            .iter()
            .map(|&slot| bone_names[slot].clone())
            .collect();
        let mut aligned_index = vec![usize::MAX; bone_names.len()];
        for (index, &slot) in relevant_slots.iter().enumerate() {
            aligned_index[slot] = index;
        }

        let mut poses: Vec<Pose> = sampled
            .into_iter()
            .map(|(name, bones)| {
                let mut transforms = vec![None; relevant_bones.len()];
                for (slot, transform) in bones {
                    transforms[aligned_index[slot]] = Some(transform);
                }
                Pose::new(name, transforms)
            })
            .collect();

        let base_pose = if poses.is_empty() {
            None
        } else {
            let index = poses
                .iter()
                .position(|pose| pose.name == BASE_POSE_NAME)
                .unwrap_or(0);
            Some(poses.remove(index))
        };

        if self.options.additive {
            for pose in &mut poses {
                for (bone, transform) in pose.transforms.iter_mut().enumerate() {
                    let Some(transform) = transform else {
                        continue;
                    };
                    let base = base_pose
                        .as_ref()
                        .and_then(|base| base.transform(bone))
                        .unwrap_or(&Transform::IDENTITY);
                    transform.make_additive(base);
                }
            }
        }

        log::debug!(
            "Extracted {} poses over {} bones (base: {:?})",
            poses.len(),
            relevant_bones.len(),
            base_pose.as_ref().map(|pose| pose.name.as_str())
        );

        let marker_names = library.markers.iter().map(|m| m.name.clone()).collect();
        let catalog =
            PoseCatalog::from_parts(relevant_bones, poses, base_pose, self.options.additive)
                .with_marker_names(marker_names);

        Extraction { catalog, warnings }
    }
}

/// Resolve bone curves to bone slots, reporting the ones that are skipped
fn classify_curves<'a>(
    library: &'a PoseLibrary,
    warnings: &mut Vec<ExtractionWarning>,
) -> (Vec<String>, Vec<BoneCurve<'a>>) {
    let mut bone_names: Vec<String> = Vec::new();
    let mut bone_slots: HashMap<String, usize> = HashMap::new();
    let mut curves = Vec::new();

    for fcurve in library.fcurves.iter() {
        let Some((bone, property)) = parse_bone_path(&fcurve.data_path) else {
            if fcurve.data_path.starts_with("[\"") {
                // Custom property, such as a pose weight curve
                log::trace!("Skipping property curve {}", fcurve.data_path);
            } else {
                push_warning(
                    warnings,
                    ExtractionWarning::UnrecognizedPath(fcurve.data_path.clone()),
                );
            }
            continue;
        };

        let Some(channel) = ChannelKind::from_property(property) else {
            push_warning(
                warnings,
                ExtractionWarning::UnrecognizedPath(fcurve.data_path.clone()),
            );
            continue;
        };

        if channel == ChannelKind::RotationAxisAngle {
            push_warning(
                warnings,
                ExtractionWarning::UnsupportedChannel {
                    bone,
                    channel: channel.property().to_string(),
                },
            );
            continue;
        }

        if fcurve.array_index >= channel.component_count() {
            push_warning(
                warnings,
                ExtractionWarning::ComponentOutOfRange {
                    data_path: fcurve.data_path.clone(),
                    index: fcurve.array_index,
                },
            );
            continue;
        }

        let slot = match bone_slots.get(&bone) {
            Some(&slot) => slot,
            None => {
                bone_names.push(bone.clone());
                bone_slots.insert(bone, bone_names.len() - 1);
                bone_names.len() - 1
            }
        };

        curves.push(BoneCurve {
            bone: slot,
            channel,
            index: fcurve.array_index,
            curve: fcurve,
        });
    }

    (bone_names, curves)
}

fn push_warning(warnings: &mut Vec<ExtractionWarning>, warning: ExtractionWarning) {
    if !warnings.contains(&warning) {
        log::warn!("{warning}");
        warnings.push(warning);
    }
}
