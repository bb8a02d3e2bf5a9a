//! Rig inspection command

use anyhow::{Context, Result};
use clap::Args;
use pose_blend::{BlendOptions, PoseBlender, PoseRow, Scene};
use std::path::PathBuf;

use crate::utils::{add_table_row, create_table, load_rig};

#[derive(Args)]
pub struct InspectArgs {
    /// Path to the JSON rig document
    pub file: PathBuf,

    /// Extract absolute poses instead of deltas against the base pose
    #[arg(long = "override")]
    pub override_mode: bool,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let armature = load_rig(&args.file)?;
    let name = armature.name.clone();

    let mut scene = Scene::new();
    let handle = scene.add(armature);
    let options = BlendOptions {
        additive: !args.override_mode,
    };
    let blender = PoseBlender::new(&mut scene, handle, options)
        .with_context(|| format!("Failed to build poses for '{name}'"))?;
    let catalog = blender.catalog();

    println!("Armature: {name}");
    println!(
        "Mode: {}",
        if catalog.is_additive() { "additive" } else { "override" }
    );
    println!(
        "Base pose: {}",
        catalog.base_pose().map_or("none", |pose| pose.name.as_str())
    );
    println!("Relevant bones ({}):", catalog.relevant_bones().len());
    for bone in catalog.relevant_bones() {
        println!("  {bone}");
    }
    println!();

    let mut table = create_table(&["Row", "Pose", "Mirror", "Bones"]);
    for (index, row) in catalog.rows().iter().enumerate() {
        let entries: Vec<(&String, Option<&String>)> = match row {
            PoseRow::Single(pose) => vec![(pose, None)],
            PoseRow::Pair(a, b) => vec![(a, Some(b)), (b, Some(a))],
        };
        for (pose, mirror) in entries {
            let bones = catalog.pose(pose).map_or(0, |p| p.affected_bones());
            add_table_row(
                &mut table,
                &[
                    (index + 1).to_string(),
                    pose.clone(),
                    mirror.cloned().unwrap_or_else(|| "-".to_string()),
                    bones.to_string(),
                ],
            );
        }
    }
    table.printstd();

    if !blender.warnings().is_empty() {
        println!();
        println!("Skipped curves:");
        for warning in blender.warnings() {
            println!("  - {warning}");
        }
    }

    Ok(())
}
