//! Name mirroring command

use anyhow::Result;
use pose_blend::flip_name;

pub fn execute(names: &[String]) -> Result<()> {
    for name in names {
        match flip_name(name) {
            Some(flipped) => println!("{flipped}"),
            None => log::info!("'{name}' has no left/right affix"),
        }
    }
    Ok(())
}
