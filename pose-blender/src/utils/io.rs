//! Rig document loading

use anyhow::{Context, Result};
use pose_blend::Armature;
use std::fs;
use std::path::Path;

/// Read a JSON rig document
pub fn load_rig(path: &Path) -> Result<Armature> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read rig file: {}", path.display()))?;
    Armature::from_json(&json)
        .with_context(|| format!("Failed to parse rig file: {}", path.display()))
}
