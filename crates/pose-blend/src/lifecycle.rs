//! Pose blender instances and the registry that keeps them alive
//!
//! A [`PoseBlender`] owns the derived pose data for one armature and
//! recomputes the bone transforms on request. The [`PoseBlenderContext`]
//! maps armature names to blenders and routes host lifecycle events to
//! them, tearing down blenders whose armature has disappeared.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::armature::{ArmatureHandle, ArmatureHost};
use crate::blend::{BlendEngine, BlendMode, BlendOptions};
use crate::catalog::PoseCatalog;
use crate::error::{PoseBlendError, Result};
use crate::events::{Dispatcher, EventKinds, LifecycleEvent, Subscription};
use crate::extract::{ExtractionWarning, PoseExtractor};
use crate::library::{Interpolation, weight_data_path};
use crate::symmetry::PoseRow;
use crate::transform::Transform;

/// Outcome of [`PoseBlender::paste`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasteSummary {
    /// Weights written to known poses
    pub applied: usize,
    /// Entries naming unknown poses or holding non-numeric values
    pub ignored: usize,
}

/// Blending state for one armature
#[derive(Debug)]
pub struct PoseBlender {
    handle: ArmatureHandle,
    armature_name: String,
    options: BlendOptions,
    catalog: PoseCatalog,
    warnings: Vec<ExtractionWarning>,
    engine: BlendEngine,
    /// Bone transforms seen before the first blend, the override baseline
    rest: HashMap<String, Transform>,
    output: Vec<Transform>,
    subscription: Option<Subscription>,
}

impl PoseBlender {
    /// Build a blender for the armature behind `handle`
    ///
    /// Markers are renumbered, poses extracted, the marker weights keyed
    /// into the pose library and the weight sliders created.
    pub fn new<H: ArmatureHost + ?Sized>(
        host: &mut H,
        handle: ArmatureHandle,
        options: BlendOptions,
    ) -> Result<Self> {
        let mut blender = Self {
            handle,
            armature_name: String::new(),
            options,
            catalog: PoseCatalog::default(),
            warnings: Vec::new(),
            engine: BlendEngine::new(),
            rest: HashMap::new(),
            output: Vec::new(),
            subscription: None,
        };
        blender.rebuild(host)?;

        if let Some(library) = host
            .armature_mut(handle)
            .and_then(|armature| armature.pose_library.as_mut())
        {
            library.key_marker_weights();
        }

        Ok(blender)
    }

    /// Re-extract the poses from the armature's pose library
    pub fn rebuild<H: ArmatureHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        let armature = host
            .armature_mut(self.handle)
            .ok_or_else(|| PoseBlendError::ReferenceLost(self.armature_name.clone()))?;
        self.armature_name = armature.name.clone();

        let library = armature
            .pose_library
            .as_mut()
            .ok_or_else(|| PoseBlendError::MissingPoseLibrary(self.armature_name.clone()))?;
        library.renumber_markers();

        let extraction = PoseExtractor::new(self.options).extract(library);
        self.catalog = extraction.catalog;
        self.warnings = extraction.warnings;
        self.output.clear();

        // Baselines captured earlier win, the bone may now hold blended output
        for bone in self.catalog.relevant_bones() {
            if !self.rest.contains_key(bone) {
                let transform = armature.bone_transform(bone).unwrap_or_default();
                self.rest.insert(bone.clone(), transform);
            }
        }

        log::debug!(
            "Built pose blender for '{}': {} poses, {} bones",
            self.armature_name,
            self.catalog.poses().len(),
            self.catalog.relevant_bones().len()
        );

        self.ensure_properties_exist(host);
        Ok(())
    }

    pub fn handle(&self) -> ArmatureHandle {
        self.handle
    }

    /// Name of the armature as of the last successful update
    pub fn armature_name(&self) -> &str {
        &self.armature_name
    }

    pub fn options(&self) -> BlendOptions {
        self.options
    }

    pub fn catalog(&self) -> &PoseCatalog {
        &self.catalog
    }

    pub fn rows(&self) -> &[PoseRow] {
        self.catalog.rows()
    }

    /// Curves skipped by the last extraction
    pub fn warnings(&self) -> &[ExtractionWarning] {
        &self.warnings
    }

    /// Relevant bones paired with the transforms of the last update
    pub fn output(&self) -> impl Iterator<Item = (&str, &Transform)> {
        self.catalog
            .relevant_bones()
            .iter()
            .map(String::as_str)
            .zip(&self.output)
    }

    /// Resolve the armature, falling back to a lookup by name when the
    /// handle has gone stale. Returns false if the armature is gone.
    pub fn ensure_valid<H: ArmatureHost + ?Sized>(&mut self, host: &H) -> bool {
        if host.armature(self.handle).is_some() {
            return true;
        }
        match host.find_armature(&self.armature_name) {
            Some(handle) => {
                log::debug!("Recovered armature '{}' by name", self.armature_name);
                self.handle = handle;
                true
            }
            None => false,
        }
    }

    /// Create any missing pose weight and its slider metadata
    pub fn ensure_properties_exist<H: ArmatureHost + ?Sized>(&self, host: &mut H) {
        let Some(armature) = host.armature_mut(self.handle) else {
            return;
        };
        for name in self.catalog.marker_names() {
            if armature.weights.ensure_slider(name) {
                log::trace!("Created weight slider '{name}' on '{}'", armature.name);
            }
        }
    }

    /// Blend the current weights and write the result to the armature
    ///
    /// Override mode starts from the bone transforms captured when the
    /// blender was built, so repeated updates with the same weights write
    /// the same result. Every bone transform is computed before the first one is written.
    /// Returns false, writing nothing, if the handle is stale.
    pub fn update_armature<H: ArmatureHost + ?Sized>(&mut self, host: &mut H) -> bool {
        let Some(armature) = host.armature(self.handle) else {
            return false;
        };

        let mode = self.options.mode();
        let bones = self.catalog.relevant_bones();
        self.output.clear();
        match mode {
            BlendMode::Override => self.output.extend(
                bones
                    .iter()
                    .map(|bone| self.rest.get(bone).copied().unwrap_or_default()),
            ),
            BlendMode::Additive => self.output.resize(bones.len(), Transform::IDENTITY),
        }
        self.engine
            .blend(mode, &self.catalog, &armature.weights, &mut self.output);

        let Some(armature) = host.armature_mut(self.handle) else {
            return false;
        };
        for (bone, transform) in bones.iter().zip(&self.output) {
            armature.set_bone_transform(bone, transform);
        }
        true
    }

    /// Dependency graph or frame change. Returns false if the armature is
    /// gone for good.
    pub fn on_update<H: ArmatureHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if !self.ensure_valid(host) {
            return false;
        }
        self.update_armature(host);
        if let Some(armature) = host.armature(self.handle) {
            if armature.name != self.armature_name {
                log::debug!("Armature '{}' renamed to '{}'", self.armature_name, armature.name);
                self.armature_name = armature.name.clone();
            }
        }
        true
    }

    /// Undo step. Returns false if the armature is gone for good.
    pub fn on_undo<H: ArmatureHost + ?Sized>(&mut self, host: &mut H) -> bool {
        if !self.ensure_valid(host) {
            return false;
        }
        self.ensure_properties_exist(host);
        self.update_armature(host);
        true
    }

    fn require_valid<H: ArmatureHost + ?Sized>(&mut self, host: &H) -> Result<()> {
        if self.ensure_valid(host) {
            Ok(())
        } else {
            Err(PoseBlendError::ReferenceLost(self.armature_name.clone()))
        }
    }

    /// Set every pose weight to zero
    pub fn clear<H: ArmatureHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        self.require_valid(host)?;
        if let Some(armature) = host.armature_mut(self.handle) {
            for pose in self.catalog.poses() {
                armature.weights.set(&pose.name, 0.0);
            }
        }
        self.update_armature(host);
        Ok(())
    }

    /// Swap the weights of every mirrored pose pair
    pub fn flip<H: ArmatureHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
        self.require_valid(host)?;
        self.ensure_properties_exist(host);
        if let Some(armature) = host.armature_mut(self.handle) {
            for row in self.catalog.rows() {
                if let PoseRow::Pair(a, b) = row {
                    let weight_a = armature.weights.weight(a);
                    let weight_b = armature.weights.weight(b);
                    armature.weights.set(a, weight_b);
                    armature.weights.set(b, weight_a);
                }
            }
        }
        self.update_armature(host);
        Ok(())
    }

    /// Pose weights as a JSON object of name to weight
    pub fn copy<H: ArmatureHost + ?Sized>(&mut self, host: &H) -> Result<String> {
        self.require_valid(host)?;
        let armature = host
            .armature(self.handle)
            .ok_or_else(|| PoseBlendError::ReferenceLost(self.armature_name.clone()))?;
        let weights: BTreeMap<&str, f32> = self
            .catalog
            .poses()
            .iter()
            .map(|pose| (pose.name.as_str(), armature.weights.weight(&pose.name)))
            .collect();
        Ok(serde_json::to_string(&weights)?)
    }

    /// Merge a JSON object of name to weight into the current weights
    ///
    /// Unknown names and non-numeric values are skipped. Input that is not
    /// a JSON object changes nothing and is reported as `MalformedInput`.
    pub fn paste<H: ArmatureHost + ?Sized>(
        &mut self,
        host: &mut H,
        json: &str,
    ) -> Result<PasteSummary> {
        self.require_valid(host)?;
        let weights = match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(weights)) => weights,
            Ok(other) => {
                return Err(PoseBlendError::MalformedInput(format!(
                    "expected an object of pose weights, got {other}"
                )));
            }
            Err(e) => return Err(PoseBlendError::MalformedInput(e.to_string())),
        };

        let mut summary = PasteSummary::default();
        if let Some(armature) = host.armature_mut(self.handle) {
            for (name, value) in &weights {
                if self.catalog.contains(name) && armature.weights.set_value(name, value) {
                    summary.applied += 1;
                } else {
                    summary.ignored += 1;
                }
            }
        }
        self.update_armature(host);
        Ok(summary)
    }

    /// Key every pose weight at the host's current frame
    ///
    /// Returns the number of keyframes written.
    pub fn key<H: ArmatureHost + ?Sized>(&mut self, host: &mut H) -> Result<usize> {
        self.require_valid(host)?;
        let frame = host.current_frame() as f32;
        self.ensure_properties_exist(host);

        let armature = host
            .armature_mut(self.handle)
            .ok_or_else(|| PoseBlendError::ReferenceLost(self.armature_name.clone()))?;
        for pose in self.catalog.poses() {
            let weight = armature.weights.weight(&pose.name);
            armature
                .weight_curves
                .ensure(&weight_data_path(&pose.name), 0)
                .insert(frame, weight, Interpolation::Linear);
        }
        Ok(self.catalog.poses().len())
    }
}

/// Registry of pose blenders, keyed by armature name
#[derive(Debug, Default)]
pub struct PoseBlenderContext {
    options: BlendOptions,
    blenders: HashMap<String, PoseBlender>,
    dispatcher: Dispatcher<String>,
}

impl PoseBlenderContext {
    pub fn new(options: BlendOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Start blending the armature behind `handle`, or rebuild its poses if
    /// a blender already exists. Either way the blend is applied once.
    pub fn add<H: ArmatureHost + ?Sized>(
        &mut self,
        host: &mut H,
        handle: ArmatureHandle,
    ) -> Result<&PoseBlender> {
        let name = host
            .armature(handle)
            .map(|armature| armature.name.clone())
            .ok_or_else(|| PoseBlendError::ReferenceLost(format!("{:?}", handle.0)))?;

        let blender = match self.blenders.remove(&name) {
            Some(mut blender) => {
                blender.handle = handle;
                if let Err(e) = blender.rebuild(host) {
                    self.blenders.insert(name, blender);
                    return Err(e);
                }
                blender
            }
            None => {
                let mut blender = PoseBlender::new(host, handle, self.options)?;
                let kinds = EventKinds::UPDATE | EventKinds::UNDO;
                blender.subscription = Some(self.dispatcher.subscribe(kinds, name.clone()));
                log::debug!("Added pose blender for '{name}'");
                blender
            }
        };

        let blender = self.blenders.entry(name).or_insert(blender);
        blender.update_armature(host);
        Ok(blender)
    }

    /// Stop blending an armature. Returns false if it had no blender.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.blenders.remove(name) {
            Some(mut blender) => {
                if let Some(subscription) = blender.subscription.take() {
                    self.dispatcher.unsubscribe(subscription);
                }
                log::debug!("Removed pose blender for '{name}'");
                true
            }
            None => false,
        }
    }

    /// Drop every blender
    pub fn clear(&mut self) {
        self.blenders.clear();
        self.dispatcher.clear();
    }

    pub fn get(&self, name: &str) -> Option<&PoseBlender> {
        self.blenders.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.blenders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.blenders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blenders.is_empty()
    }

    /// Registered armature names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.blenders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Route a host lifecycle event to the subscribed blenders
    pub fn dispatch<H: ArmatureHost + ?Sized>(&mut self, event: LifecycleEvent, host: &mut H) {
        if event == LifecycleEvent::LoadPre {
            if !self.blenders.is_empty() {
                log::debug!("Document load, dropping {} pose blenders", self.blenders.len());
            }
            self.clear();
            return;
        }

        for name in self.dispatcher.targets(event) {
            let Some(mut blender) = self.blenders.remove(&name) else {
                continue;
            };

            let alive = match event {
                LifecycleEvent::Undo => blender.on_undo(host),
                _ => blender.on_update(host),
            };

            if !alive {
                log::warn!("Armature '{name}' no longer exists, removing its pose blender");
                if let Some(subscription) = blender.subscription.take() {
                    self.dispatcher.unsubscribe(subscription);
                }
                continue;
            }

            let mut key = name;
            if blender.armature_name != key {
                if self.blenders.contains_key(&blender.armature_name) {
                    log::warn!(
                        "Armature '{key}' was renamed to '{}', which already has a pose blender",
                        blender.armature_name
                    );
                } else {
                    key = blender.armature_name.clone();
                    if let Some(subscription) = &blender.subscription {
                        self.dispatcher.retarget(subscription, key.clone());
                    }
                }
            }
            self.blenders.insert(key, blender);
        }
    }

    /// Recompute one armature's blend. Does nothing for unknown names.
    pub fn update_armature<H: ArmatureHost + ?Sized>(&mut self, name: &str, host: &mut H) -> bool {
        match self.blenders.get_mut(name) {
            Some(blender) => blender.update_armature(host),
            None => false,
        }
    }

    fn blender_mut(&mut self, name: &str) -> Result<&mut PoseBlender> {
        self.blenders
            .get_mut(name)
            .ok_or_else(|| PoseBlendError::NotRegistered(name.to_string()))
    }

    pub fn clear_weights<H: ArmatureHost + ?Sized>(
        &mut self,
        name: &str,
        host: &mut H,
    ) -> Result<()> {
        self.blender_mut(name)?.clear(host)
    }

    pub fn flip<H: ArmatureHost + ?Sized>(&mut self, name: &str, host: &mut H) -> Result<()> {
        self.blender_mut(name)?.flip(host)
    }

    pub fn copy<H: ArmatureHost + ?Sized>(&mut self, name: &str, host: &H) -> Result<String> {
        self.blender_mut(name)?.copy(host)
    }

    pub fn paste<H: ArmatureHost + ?Sized>(
        &mut self,
        name: &str,
        host: &mut H,
        json: &str,
    ) -> Result<PasteSummary> {
        self.blender_mut(name)?.paste(host, json)
    }

    pub fn key<H: ArmatureHost + ?Sized>(&mut self, name: &str, host: &mut H) -> Result<usize> {
        self.blender_mut(name)?.key(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::{Armature, PoseBone, Scene};
    use crate::library::{ChannelKind, CurveSet, FCurve, PoseLibrary, PoseMarker, bone_data_path};
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    /// Jaw rig with a neutral base and mirrored smiles
    fn rig(name: &str) -> Armature {
        let mut jaw = FCurve::new(bone_data_path("jaw", ChannelKind::Location), 1);
        let mut lip_l = FCurve::new(bone_data_path("lip.L", ChannelKind::Location), 0);
        let mut lip_r = FCurve::new(bone_data_path("lip.R", ChannelKind::Location), 0);
        let keys = [
            [0.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, -1.0],
        ];
        for (frame, [j, l, r]) in keys.into_iter().enumerate() {
            let frame = frame as f32;
            jaw.insert(frame, j, Interpolation::Constant);
            lip_l.insert(frame, l, Interpolation::Constant);
            lip_r.insert(frame, r, Interpolation::Constant);
        }

        // Out-of-order frames exercise renumbering
        let library = PoseLibrary::new(
            vec![
                PoseMarker::new("base_pose", 0),
                PoseMarker::new("open", 1),
                PoseMarker::new("smile.L", 2),
                PoseMarker::new("smile.R", 7),
            ],
            [jaw, lip_l, lip_r].into_iter().collect::<CurveSet>(),
        );

        Armature::new(name)
            .with_bone("jaw", PoseBone::default())
            .with_bone("lip.L", PoseBone::default())
            .with_bone("lip.R", PoseBone::default())
            .with_pose_library(library)
    }

    fn location(scene: &Scene, handle: ArmatureHandle, bone: &str) -> Option<Vec3> {
        scene
            .armature(handle)
            .and_then(|a| a.bone_transform(bone))
            .map(|t| t.location)
    }

    #[test]
    fn test_new_prepares_library_and_sliders() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let blender = PoseBlender::new(&mut scene, handle, BlendOptions::default()).unwrap();

        assert_eq!(blender.armature_name(), "face");
        assert_eq!(blender.catalog().relevant_bones(), &["jaw", "lip.L", "lip.R"]);
        assert_eq!(
            blender.rows(),
            &[
                PoseRow::Single("open".into()),
                PoseRow::Pair("smile.R".into(), "smile.L".into()),
            ]
        );

        let armature = scene.armature(handle).unwrap();
        let library = armature.pose_library.as_ref().unwrap();
        assert_eq!(library.markers[3].frame, 3);
        assert!(library.fcurves.find("[\"smile.R\"]", 0).is_some());
        for name in ["base_pose", "open", "smile.L", "smile.R"] {
            assert_eq!(armature.weights.get(name), Some(0.0), "{name}");
            assert!(armature.weights.meta(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_missing_pose_library() {
        let mut scene = Scene::new();
        let handle = scene.add(Armature::new("bare"));
        let result = PoseBlender::new(&mut scene, handle, BlendOptions::default());
        assert!(matches!(result, Err(PoseBlendError::MissingPoseLibrary(name)) if name == "bare"));
    }

    #[test]
    fn test_update_writes_bones() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let mut blender = PoseBlender::new(&mut scene, handle, BlendOptions::default()).unwrap();

        if let Some(armature) = scene.armature_mut(handle) {
            armature.weights.set("open", 0.5);
            armature.weights.set("smile.L", 1.0);
        }
        assert!(blender.update_armature(&mut scene));

        assert_eq!(location(&scene, handle, "jaw"), Some(Vec3::new(0.0, -0.5, 0.0)));
        assert_eq!(location(&scene, handle, "lip.L"), Some(Vec3::X));
        assert_eq!(location(&scene, handle, "lip.R"), Some(Vec3::ZERO));
        assert_eq!(blender.output().count(), 3);
    }

    #[test]
    fn test_clear_and_flip() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let mut blender = PoseBlender::new(&mut scene, handle, BlendOptions::default()).unwrap();

        if let Some(armature) = scene.armature_mut(handle) {
            armature.weights.set("smile.L", 0.75);
            armature.weights.set("open", 0.25);
        }
        blender.flip(&mut scene).unwrap();
        let weights = &scene.armature(handle).unwrap().weights;
        assert_eq!(weights.get("smile.L"), Some(0.0));
        assert_eq!(weights.get("smile.R"), Some(0.75));
        assert_eq!(weights.get("open"), Some(0.25));
        assert_eq!(location(&scene, handle, "lip.R"), Some(Vec3::new(-0.75, 0.0, 0.0)));

        blender.clear(&mut scene).unwrap();
        let weights = &scene.armature(handle).unwrap().weights;
        assert_eq!(weights.get("smile.R"), Some(0.0));
        assert_eq!(weights.get("open"), Some(0.0));
        assert_eq!(location(&scene, handle, "lip.R"), Some(Vec3::ZERO));
    }

    #[test]
    fn test_copy_then_paste() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let mut blender = PoseBlender::new(&mut scene, handle, BlendOptions::default()).unwrap();

        if let Some(armature) = scene.armature_mut(handle) {
            armature.weights.set("open", 0.5);
        }
        let copied = blender.copy(&scene).unwrap();
        assert_eq!(copied, r#"{"open":0.5,"smile.L":0.0,"smile.R":0.0}"#);

        blender.clear(&mut scene).unwrap();
        let summary = blender.paste(&mut scene, &copied).unwrap();
        assert_eq!(summary, PasteSummary { applied: 3, ignored: 0 });
        assert_eq!(scene.armature(handle).unwrap().weights.get("open"), Some(0.5));
        assert_eq!(location(&scene, handle, "jaw"), Some(Vec3::new(0.0, -0.5, 0.0)));
    }

    #[test]
    fn test_paste_ignores_unknown_and_malformed() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let mut blender = PoseBlender::new(&mut scene, handle, BlendOptions::default()).unwrap();

        let summary = blender
            .paste(&mut scene, r#"{"unknown": 0.5, "open": 0.8, "smile.L": "big", "base_pose": 1}"#)
            .unwrap();
        assert_eq!(summary, PasteSummary { applied: 1, ignored: 3 });
        let weights = &scene.armature(handle).unwrap().weights;
        assert_eq!(weights.get("open"), Some(0.8));
        assert!(!weights.contains("unknown"));
        assert_eq!(weights.get("base_pose"), Some(0.0));

        for payload in ["not json", "[0.5]", "0.5"] {
            let result = blender.paste(&mut scene, payload);
            assert!(matches!(result, Err(PoseBlendError::MalformedInput(_))), "{payload}");
        }
        assert_eq!(scene.armature(handle).unwrap().weights.get("open"), Some(0.8));
    }

    #[test]
    fn test_key_writes_weight_curves() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let mut blender = PoseBlender::new(&mut scene, handle, BlendOptions::default()).unwrap();

        if let Some(armature) = scene.armature_mut(handle) {
            armature.weights.set("open", 0.3);
        }
        scene.set_frame(10);
        assert_eq!(blender.key(&mut scene).unwrap(), 3);
        scene.set_frame(20);
        if let Some(armature) = scene.armature_mut(handle) {
            armature.weights.set("open", 0.9);
        }
        blender.key(&mut scene).unwrap();

        let curves = &scene.armature(handle).unwrap().weight_curves;
        assert_eq!(curves.len(), 3);
        let open = curves.find("[\"open\"]", 0).unwrap();
        assert_eq!(open.keyframes().len(), 2);
        assert!((open.evaluate(15.0) - 0.6).abs() < 1e-5);
        assert!(curves.find("[\"base_pose\"]", 0).is_none());
    }

    #[test]
    fn test_stale_handle_recovers_by_name() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let mut blender = PoseBlender::new(&mut scene, handle, BlendOptions::default()).unwrap();

        let reloaded = scene.reload(handle).unwrap();
        assert!(!blender.update_armature(&mut scene));
        assert!(blender.ensure_valid(&scene));
        assert_eq!(blender.handle(), reloaded);
        assert!(blender.update_armature(&mut scene));

        scene.remove(reloaded);
        assert!(!blender.ensure_valid(&scene));
        assert!(matches!(blender.clear(&mut scene), Err(PoseBlendError::ReferenceLost(_))));
    }

    #[test]
    fn test_override_keeps_untouched_bones() {
        let mut scene = Scene::new();
        let mut armature = rig("face");
        armature.bones.insert(
            "jaw".into(),
            PoseBone {
                location: Vec3::new(0.0, 0.0, 5.0),
                ..PoseBone::default()
            },
        );
        let handle = scene.add(armature);
        let mut blender =
            PoseBlender::new(&mut scene, handle, BlendOptions { additive: false }).unwrap();

        if let Some(armature) = scene.armature_mut(handle) {
            armature.weights.set("smile.L", 1.0);
        }
        blender.update_armature(&mut scene);
        assert_eq!(location(&scene, handle, "jaw"), Some(Vec3::new(0.0, 0.0, 5.0)));
        assert_eq!(location(&scene, handle, "lip.L"), Some(Vec3::X));
    }

    #[test]
    fn test_context_add_and_remove() {
        let mut scene = Scene::new();
        let handle = scene.add(rig("face"));
        let mut context = PoseBlenderContext::default();

        context.add(&mut scene, handle).unwrap();
        context.add(&mut scene, handle).unwrap();
        assert_eq!(context.names(), vec!["face"]);

        let bare = scene.add(Armature::new("bare"));
        assert!(matches!(
            context.add(&mut scene, bare),
            Err(PoseBlendError::MissingPoseLibrary(_))
        ));
        assert_eq!(context.len(), 1);

        assert!(context.remove("face"));
        assert!(!context.remove("face"));
        assert!(context.is_empty());
    }

    #[test]
    fn test_context_bulk_ops_need_registration() {
        let mut scene = Scene::new();
        let mut context = PoseBlenderContext::default();
        assert!(matches!(
            context.flip("nobody", &mut scene),
            Err(PoseBlendError::NotRegistered(name)) if name == "nobody"
        ));
        assert!(!context.update_armature("nobody", &mut scene));
    }
}
