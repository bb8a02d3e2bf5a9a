//! Weighted multi-pose blending for skeletal rigs
//!
//! Named poses authored as markers in a pose library are extracted into a
//! [`PoseCatalog`] of sparse per-bone transforms. Every update the
//! [`BlendEngine`] combines them with the current pose weights, either
//! replacing the bone transforms (override) or layering deltas on top of a
//! base pose (additive). [`PoseBlenderContext`] keeps one [`PoseBlender`]
//! per armature and keeps it consistent across undo, reload and renames.
//!
//! ```
//! use pose_blend::{Armature, PoseBlenderContext, Scene};
//!
//! let mut scene = Scene::new();
//! let handle = scene.add(Armature::new("rig"));
//! let mut context = PoseBlenderContext::default();
//!
//! // An armature without a pose library cannot be blended
//! assert!(context.add(&mut scene, handle).is_err());
//! ```

pub mod armature;
pub mod blend;
pub mod catalog;
pub mod error;
pub mod events;
pub mod extract;
pub mod library;
pub mod lifecycle;
pub mod symmetry;
pub mod transform;
pub mod weights;

// Re-export common types
pub use armature::{Armature, ArmatureHandle, ArmatureHost, BoneRotation, PoseBone, Scene};
pub use blend::{BlendEngine, BlendMode, BlendOptions};
pub use catalog::{Pose, PoseCatalog};
pub use error::{PoseBlendError, Result};
pub use events::{Dispatcher, EventKinds, LifecycleEvent, Subscription};
pub use extract::{Extraction, ExtractionWarning, PoseExtractor};
pub use library::{FCurve, Keyframe, PoseLibrary, PoseMarker};
pub use lifecycle::{PasteSummary, PoseBlender, PoseBlenderContext};
pub use symmetry::{PoseRow, flip_name, pair_rows};
pub use transform::{EulerOrder, Transform};
pub use weights::{SliderMeta, WeightStore};

pub use glam;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
