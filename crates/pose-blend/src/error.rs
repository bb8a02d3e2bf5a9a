use thiserror::Error;

/// Error types for pose blending
#[derive(Error, Debug)]
pub enum PoseBlendError {
    /// The armature has no pose library to build poses from
    #[error("Armature '{0}' has no pose library")]
    MissingPoseLibrary(String),

    /// The armature reference is stale and could not be recovered by name
    #[error("Reference lost: armature '{0}' no longer exists")]
    ReferenceLost(String),

    /// No pose blender is registered for the armature
    #[error("No pose blender registered for '{0}'")]
    NotRegistered(String),

    /// Input such as a pasted weight map could not be understood
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type using PoseBlendError
pub type Result<T> = std::result::Result<T, PoseBlendError>;
