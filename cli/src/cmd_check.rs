//! `regmount check`: validate a mount file.

use anyhow::{Context, Result};
use regmount_mount::{EndpointServices, MountEndpoint, MountFile};
use std::path::Path;

pub fn run(path: &Path, as_json: bool) -> Result<()> {
    let file = MountFile::load(path)
        .with_context(|| format!("read mount file '{}'", path.display()))?;
    let configs = super::load_mounts(path)?;
    let duplicates = file.duplicates()?;

    if as_json {
        let mounts: Vec<serde_json::Value> = configs
            .iter()
            .map(|c| {
                let mode = MountEndpoint::new(c.clone(), EndpointServices::new()).mode();
                serde_json::json!({
                    "id": c.id(),
                    "mountPoint": c.mount_point(),
                    "subPath": c.sub_path(),
                    "mode": format!("{mode:?}").to_lowercase(),
                    "target": c.display_url(),
                    "readOnly": c.read_only(),
                })
            })
            .collect();
        let report = serde_json::json!({
            "mounts": mounts,
            "duplicates": duplicates.iter().map(|c| c.mount_point()).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} mount(s) in {}", configs.len(), path.display());
    for c in &configs {
        let mode = MountEndpoint::new(c.clone(), EndpointServices::new()).mode();
        println!(
            "  {:<24} {:<10} {} {}",
            c.mount_point(),
            format!("{mode:?}").to_lowercase(),
            c.display_url(),
            c.sub_path().unwrap_or("/"),
        );
    }
    for c in &duplicates {
        println!("  warning: {} ({}) is defined more than once", c.mount_point(), c.id());
    }
    Ok(())
}
