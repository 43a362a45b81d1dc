//! `regmount translate`: map paths across a mount boundary.

use anyhow::{anyhow, Result};
use regmount_mount::PathTranslator;
use std::path::Path;

pub fn run(path: &Path, target: &str, reverse: bool, mount: Option<&str>) -> Result<()> {
    let configs = super::load_mounts(path)?;

    if reverse {
        let id = mount.ok_or_else(|| anyhow!("--reverse needs --mount"))?;
        let config = configs
            .iter()
            .find(|c| c.id() == id)
            .ok_or_else(|| anyhow!("no mount with id '{id}'"))?;
        let paths = PathTranslator::new(config.mount_point(), config.sub_path());
        println!("{}", paths.to_full(target));
        return Ok(());
    }

    // The innermost mount wins when mount points nest.
    let owner = configs
        .iter()
        .map(|c| PathTranslator::new(c.mount_point(), c.sub_path()))
        .filter(|p| p.contains(target))
        .max_by_key(|p| p.mount_point().len());
    match owner {
        Some(paths) => println!("{} -> {}", paths.mount_point(), paths.to_actual(target)),
        None => println!("{target} is not under any mount"),
    }
    Ok(())
}
