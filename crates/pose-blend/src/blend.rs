//! Override and additive pose blending

use serde::{Deserialize, Serialize};

use crate::catalog::PoseCatalog;
use crate::transform::Transform;
use crate::weights::WeightStore;

/// Options shared by extraction and blending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendOptions {
    /// Store poses relative to the base pose and blend them additively
    pub additive: bool,
}

impl Default for BlendOptions {
    fn default() -> Self {
        Self { additive: true }
    }
}

impl BlendOptions {
    pub fn mode(&self) -> BlendMode {
        if self.additive {
            BlendMode::Additive
        } else {
            BlendMode::Override
        }
    }
}

/// How pose transforms are combined into the final bone transforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Poses are absolute and replace the current bone transform by weight
    Override,
    /// Poses are deltas layered on top of the base pose
    Additive,
}

/// Blends a [`PoseCatalog`] with the current weights
///
/// Holds nothing between calls except scratch buffers. Weights are read
/// from the store on every call.
#[derive(Debug, Default)]
pub struct BlendEngine {
    weights: Vec<f32>,
    contributions: Vec<(usize, f32)>,
}

impl BlendEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blend into `out`, which is indexed like the catalog's relevant bones
    pub fn blend(
        &mut self,
        mode: BlendMode,
        catalog: &PoseCatalog,
        weights: &WeightStore,
        out: &mut [Transform],
    ) {
        match mode {
            BlendMode::Override => self.override_blend(catalog, weights, out),
            BlendMode::Additive => self.additive_blend(catalog, weights, out),
        }
    }

    /// Weighted replacement of the current bone transforms
    ///
    /// `out` must hold the baseline transform of each bone on entry. Weights
    /// are normalized when their total exceeds one. Bones no pose touches
    /// keep their baseline value.
    pub fn override_blend(
        &mut self,
        catalog: &PoseCatalog,
        weights: &WeightStore,
        out: &mut [Transform],
    ) {
        let total_weight = self.read_weights(catalog, weights);
        let poses = catalog.poses();

        for (bone, current) in out.iter_mut().enumerate().take(catalog.relevant_bones().len()) {
            self.contributions.clear();
            for (index, pose) in poses.iter().enumerate() {
                let weight = self.weights[index];
                if weight > 0.0 && pose.transform(bone).is_some() {
                    let normalized = if total_weight <= 1.0 {
                        weight
                    } else {
                        weight / total_weight
                    };
                    self.contributions.push((index, normalized));
                }
            }

            let Some(&(first_index, first_weight)) = self.contributions.first() else {
                continue;
            };
            let local_sum: f32 = self.contributions.iter().map(|(_, w)| w).sum();

            let (mut result, remaining) = if local_sum < 1.0 {
                (current.scaled(1.0 - local_sum), &self.contributions[..])
            } else {
                let Some(first) = poses[first_index].transform(bone) else {
                    continue;
                };
                (first.scaled(first_weight), &self.contributions[1..])
            };

            for &(index, weight) in remaining {
                if let Some(transform) = poses[index].transform(bone) {
                    result.accumulate_with_shortest_rotation(transform, weight);
                }
            }
            result.normalize_rotation();
            *current = result;
        }
    }

    /// Layer every weighted delta on top of the base pose
    ///
    /// `out` is overwritten; bones the base pose does not define start at
    /// identity.
    pub fn additive_blend(
        &mut self,
        catalog: &PoseCatalog,
        weights: &WeightStore,
        out: &mut [Transform],
    ) {
        self.read_weights(catalog, weights);
        let poses = catalog.poses();
        let base = catalog.base_pose();

        for (bone, current) in out.iter_mut().enumerate().take(catalog.relevant_bones().len()) {
            let mut result = base
                .and_then(|base| base.transform(bone))
                .copied()
                .unwrap_or_default();

            for (pose, &weight) in poses.iter().zip(&self.weights) {
                if weight <= 0.0 {
                    continue;
                }
                if let Some(delta) = pose.transform(bone) {
                    result.normalize_rotation();
                    Transform::blend_from_identity_and_accumulate(&mut result, delta, weight);
                }
            }
            result.normalize_rotation();
            *current = result;
        }
    }

    /// Refresh the per-pose weight buffer and return the total weight
    fn read_weights(&mut self, catalog: &PoseCatalog, weights: &WeightStore) -> f32 {
        self.weights.clear();
        self.weights
            .extend(catalog.poses().iter().map(|pose| weights.weight(&pose.name)));
        self.weights.iter().sum()
    }
}
