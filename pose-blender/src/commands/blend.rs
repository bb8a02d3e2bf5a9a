//! Pose blend evaluation command

use anyhow::{Context, Result, anyhow};
use clap::{Args, ValueEnum};
use pose_blend::{BlendOptions, PoseBlenderContext, Scene, Transform};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::utils::{load_rig, transform_table};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
pub struct BlendArgs {
    /// Path to the JSON rig document
    pub file: PathBuf,

    /// JSON file with a pose name to weight map
    #[arg(short, long)]
    pub weights: Option<PathBuf>,

    /// Set a single pose weight (can be repeated)
    #[arg(short, long = "set", value_name = "NAME=VALUE", value_parser = parse_weight)]
    pub set: Vec<(String, f32)>,

    /// Blend absolute poses over the current bone transforms
    #[arg(long = "override")]
    pub override_mode: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Parse `name=value`, splitting on the last `=`
fn parse_weight(arg: &str) -> Result<(String, f32)> {
    let (name, value) = arg
        .rsplit_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{arg}'"))?;
    if name.is_empty() {
        return Err(anyhow!("missing pose name in '{arg}'"));
    }
    let value: f32 = value
        .trim()
        .parse()
        .with_context(|| format!("invalid weight '{value}'"))?;
    Ok((name.to_string(), value))
}

pub fn execute(args: BlendArgs) -> Result<()> {
    let armature = load_rig(&args.file)?;
    let name = armature.name.clone();

    let mut scene = Scene::new();
    let handle = scene.add(armature);
    let mut context = PoseBlenderContext::new(BlendOptions {
        additive: !args.override_mode,
    });
    context
        .add(&mut scene, handle)
        .with_context(|| format!("Failed to build poses for '{name}'"))?;

    if let Some(path) = &args.weights {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read weights file: {}", path.display()))?;
        let summary = context
            .paste(&name, &mut scene, &json)
            .with_context(|| format!("Failed to apply weights from {}", path.display()))?;
        if summary.ignored > 0 {
            log::warn!("Ignored {} entries in {}", summary.ignored, path.display());
        }
    }

    if !args.set.is_empty() {
        let weights: Map<String, Value> = args
            .set
            .iter()
            .map(|(pose, weight)| (pose.clone(), Value::from(*weight)))
            .collect();
        let summary = context.paste(&name, &mut scene, &Value::Object(weights).to_string())?;
        if summary.ignored > 0 {
            log::warn!("Ignored {} unknown poses", summary.ignored);
        }
    }

    let blender = context
        .get(&name)
        .ok_or_else(|| anyhow!("No pose blender for '{name}'"))?;

    match args.format {
        OutputFormat::Table => transform_table(blender.output()).printstd(),
        OutputFormat::Json => {
            let bones: BTreeMap<&str, &Transform> = blender.output().collect();
            println!("{}", serde_json::to_string_pretty(&bones)?);
        }
    }

    Ok(())
}
