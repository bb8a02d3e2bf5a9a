//! Pose library authoring data: markers, keyframed curves and data paths
//!
//! A pose library is a clip where every pose is keyed on its own frame and
//! named by a marker on that frame. Bone curves are addressed by Blender-style
//! data paths such as `pose.bones["spine"].location`, while pose weight
//! curves use the custom property path `["pose_name"]`.

use serde::{Deserialize, Deserializer, Serialize};

/// Named pose marker at an integer frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoseMarker {
    pub name: String,
    pub frame: i32,
}

impl PoseMarker {
    pub fn new(name: impl Into<String>, frame: i32) -> Self {
        Self {
            name: name.into(),
            frame,
        }
    }
}

/// How a curve is evaluated between a keyframe and the next one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Constant,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    #[serde(default)]
    pub interpolation: Interpolation,
}

/// Find the index of the keyframe at or before `position`
///
/// Returns None if there are no keyframes. Positions before the first
/// keyframe map to index 0.
pub fn find_keyframe_index(keyframes: &[Keyframe], position: f32) -> Option<usize> {
    if keyframes.is_empty() {
        return None;
    }

    let last_index = keyframes.len() - 1;
    if position >= keyframes[last_index].frame {
        return Some(last_index);
    }

    // Largest index where keyframes[index].frame <= position
    let mut low = 0;
    let mut high = last_index;
    while low < high {
        let mid = (low + high).div_ceil(2);
        if keyframes[mid].frame <= position {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    Some(low)
}

/// Single animated scalar channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FCurve {
    pub data_path: String,
    #[serde(default)]
    pub array_index: usize,
    #[serde(default, deserialize_with = "sorted_keyframes")]
    keyframes: Vec<Keyframe>,
}

fn sorted_keyframes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Keyframe>, D::Error> {
    let mut keyframes = Vec::<Keyframe>::deserialize(deserializer)?;
    keyframes.sort_by(|a, b| a.frame.total_cmp(&b.frame));
    Ok(keyframes)
}

impl FCurve {
    pub fn new(data_path: impl Into<String>, array_index: usize) -> Self {
        Self {
            data_path: data_path.into(),
            array_index,
            keyframes: Vec::new(),
        }
    }

    /// Build a curve from keyframes in any order
    pub fn with_keyframes(
        data_path: impl Into<String>,
        array_index: usize,
        keyframes: impl IntoIterator<Item = Keyframe>,
    ) -> Self {
        let mut curve = Self::new(data_path, array_index);
        for key in keyframes {
            curve.insert(key.frame, key.value, key.interpolation);
        }
        curve
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    /// Insert a keyframe, replacing the value of one already on `frame`
    pub fn insert(&mut self, frame: f32, value: f32, interpolation: Interpolation) {
        let key = Keyframe {
            frame,
            value,
            interpolation,
        };
        match self
            .keyframes
            .binary_search_by(|k| k.frame.total_cmp(&frame))
        {
            Ok(index) => self.keyframes[index] = key,
            Err(index) => self.keyframes.insert(index, key),
        }
    }

    /// Sample the curve at `position`
    ///
    /// Values hold constant outside the keyed range. An empty curve
    /// evaluates to zero.
    pub fn evaluate(&self, position: f32) -> f32 {
        let Some(index) = find_keyframe_index(&self.keyframes, position) else {
            return 0.0;
        };

        let left = &self.keyframes[index];
        if index + 1 >= self.keyframes.len() || position <= left.frame {
            return left.value;
        }

        let right = &self.keyframes[index + 1];
        match left.interpolation {
            Interpolation::Constant => left.value,
            Interpolation::Linear => {
                let span = right.frame - left.frame;
                let t = if span > 0.0 {
                    ((position - left.frame) / span).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                left.value + (right.value - left.value) * t
            }
        }
    }

    /// Frame range covered by the keyframes
    pub fn range(&self) -> Option<(f32, f32)> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        Some((first.frame, last.frame))
    }
}

/// Curves addressable by `(data_path, array_index)`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveSet {
    curves: Vec<FCurve>,
}

impl CurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FCurve> {
        self.curves.iter()
    }

    pub fn push(&mut self, curve: FCurve) {
        self.curves.push(curve);
    }

    pub fn find(&self, data_path: &str, array_index: usize) -> Option<&FCurve> {
        self.curves
            .iter()
            .find(|c| c.data_path == data_path && c.array_index == array_index)
    }

    /// Get the curve for `(data_path, array_index)`, creating it if absent
    pub fn ensure(&mut self, data_path: &str, array_index: usize) -> &mut FCurve {
        let position = self
            .curves
            .iter()
            .position(|c| c.data_path == data_path && c.array_index == array_index);
        let index = match position {
            Some(index) => index,
            None => {
                self.curves.push(FCurve::new(data_path, array_index));
                self.curves.len() - 1
            }
        };
        &mut self.curves[index]
    }

    pub fn remove(&mut self, data_path: &str, array_index: usize) -> Option<FCurve> {
        let index = self
            .curves
            .iter()
            .position(|c| c.data_path == data_path && c.array_index == array_index)?;
        Some(self.curves.remove(index))
    }
}

impl FromIterator<FCurve> for CurveSet {
    fn from_iter<I: IntoIterator<Item = FCurve>>(iter: I) -> Self {
        Self {
            curves: iter.into_iter().collect(),
        }
    }
}

/// Clip holding one pose per marker
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseLibrary {
    #[serde(default)]
    pub markers: Vec<PoseMarker>,
    #[serde(default)]
    pub fcurves: CurveSet,
}

impl PoseLibrary {
    pub fn new(markers: Vec<PoseMarker>, fcurves: CurveSet) -> Self {
        Self { markers, fcurves }
    }

    /// Frame range spanned by the keyframes and markers
    pub fn frame_range(&self) -> (f32, f32) {
        let keyed = self.fcurves.iter().filter_map(FCurve::range);
        let markers = self.markers.iter().map(|m| (m.frame as f32, m.frame as f32));
        keyed
            .chain(markers)
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
            .unwrap_or((0.0, 0.0))
    }

    /// Move every marker onto the frame matching its list position
    ///
    /// Returns the names of the markers that had to be moved.
    pub fn renumber_markers(&mut self) -> Vec<String> {
        let mut moved = Vec::new();
        for (index, marker) in self.markers.iter_mut().enumerate() {
            let frame = index as i32;
            if marker.frame != frame {
                marker.frame = frame;
                moved.push(marker.name.clone());
            }
        }
        if !moved.is_empty() {
            log::info!("Fixed frame index for poses {}", moved.join(", "));
        }
        moved
    }

    /// Key each marker's weight curve to 1 on its own frame and 0 on the
    /// neighbouring frames, replacing any previous weight curve
    pub fn key_marker_weights(&mut self) {
        let (start_frame, last_frame) = self.frame_range();

        for marker in &self.markers {
            let data_path = weight_data_path(&marker.name);
            self.fcurves.remove(&data_path, 0);

            let frame = marker.frame as f32;
            let curve = self.fcurves.ensure(&data_path, 0);
            if frame > start_frame {
                curve.insert(frame - 1.0, 0.0, Interpolation::Linear);
            }
            curve.insert(frame, 1.0, Interpolation::Linear);
            if frame < last_frame {
                curve.insert(frame + 1.0, 0.0, Interpolation::Linear);
            }
        }
    }
}

/// Bone property a curve animates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Location,
    RotationQuaternion,
    RotationEuler,
    RotationAxisAngle,
    Scale,
}

impl ChannelKind {
    pub fn from_property(property: &str) -> Option<Self> {
        match property {
            "location" => Some(Self::Location),
            "rotation_quaternion" => Some(Self::RotationQuaternion),
            "rotation_euler" => Some(Self::RotationEuler),
            "rotation_axis_angle" => Some(Self::RotationAxisAngle),
            "scale" => Some(Self::Scale),
            _ => None,
        }
    }

    pub fn property(self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::RotationQuaternion => "rotation_quaternion",
            Self::RotationEuler => "rotation_euler",
            Self::RotationAxisAngle => "rotation_axis_angle",
            Self::Scale => "scale",
        }
    }

    /// Number of array components the property has
    pub fn component_count(self) -> usize {
        match self {
            Self::RotationQuaternion | Self::RotationAxisAngle => 4,
            Self::Location | Self::RotationEuler | Self::Scale => 3,
        }
    }
}

/// Split `pose.bones["<bone>"].<property>` into bone name and property
///
/// Quotes and backslashes in the bone name may be escaped with a backslash.
pub fn parse_bone_path(data_path: &str) -> Option<(String, &str)> {
    let rest = data_path.strip_prefix("pose.bones[\"")?;
    let mut bone = String::new();
    let mut chars = rest.char_indices();

    while let Some((index, c)) = chars.next() {
        match c {
            '\\' => {
                let (_, escaped) = chars.next()?;
                bone.push(escaped);
            }
            '"' => {
                let property = rest[index + 1..].strip_prefix("].")?;
                let valid = !property.is_empty()
                    && property
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_');
                return (valid && !bone.is_empty()).then_some((bone, property));
            }
            _ => bone.push(c),
        }
    }

    None
}

/// Data path of a bone property curve
pub fn bone_data_path(bone: &str, channel: ChannelKind) -> String {
    format!("pose.bones[\"{}\"].{}", escape(bone), channel.property())
}

/// Data path of the custom property holding a pose weight
pub fn weight_data_path(pose_name: &str) -> String {
    format!("[\"{}\"]", escape(pose_name))
}

fn escape(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}
