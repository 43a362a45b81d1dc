//! `regmount browse`: read a path through the configured mounts.
//!
//! Embedded mounts are served from in-memory registries, optionally seeded
//! from dump archives. Remote mounts need a connector this tool does not
//! ship, so they are skipped.

use anyhow::{anyhow, Context, Result};
use regmount_core::{
    HandledRegistry, HandlerManager, RegistryStore, RequestScope, Resource, Session,
    SUPER_TENANT_ID,
};
use regmount_mount::{EndpointServices, MountHandler, StoreMountRegistry};
use regmount_store::{MemoryEmbeddedFactory, MemoryStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

pub fn run(
    config: &Path,
    seeds: &[String],
    local_seed: Option<&Path>,
    user: &str,
    target: &str,
    as_json: bool,
) -> Result<()> {
    let configs = super::load_mounts(config)?;
    let scope = RequestScope::new(Session::new(user, SUPER_TENANT_ID));

    let local = MemoryStore::new();
    if let Some(file) = local_seed {
        let loaded = local
            .load_file(&scope, "/", file)
            .with_context(|| format!("seed local registry from '{}'", file.display()))?;
        println!("Loaded {loaded} local resource(s)");
    }

    let mut factory = MemoryEmbeddedFactory::new();
    for seed in seeds {
        let (db, file) = parse_seed(seed)?;
        let store = MemoryStore::new();
        store
            .load_file(&scope, "/", &file)
            .with_context(|| format!("seed '{db}' from '{}'", file.display()))?;
        factory = factory.with_store(db, store);
    }

    let services = EndpointServices::new()
        .with_embedded_factory(Arc::new(factory))
        .with_mount_registry(Arc::new(StoreMountRegistry::new()));
    let manager = Arc::new(HandlerManager::new());
    for mount in configs {
        if mount.remote() {
            warn!(
                mount = %mount.mount_point(),
                url = %mount.display_url(),
                "skipping remote mount"
            );
            continue;
        }
        MountHandler::new(mount, services.clone()).install(&manager);
    }
    let registry = HandledRegistry::new(Arc::new(local), manager);

    let resource = registry
        .get(&scope, target)
        .with_context(|| format!("read '{target}'"))?;
    print_resource(&resource, as_json)
}

fn parse_seed(seed: &str) -> Result<(String, PathBuf)> {
    let (db, file) = seed
        .split_once('=')
        .ok_or_else(|| anyhow!("seed '{seed}' is not of the form <db-config>=<file>"))?;
    Ok((db.to_string(), PathBuf::from(file)))
}

fn print_resource(resource: &Resource, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(resource)?);
        return Ok(());
    }

    println!("Path:       {}", resource.path);
    if let Some(media_type) = &resource.media_type {
        println!("Media type: {media_type}");
    }
    if let Some(author) = &resource.author {
        println!("Author:     {author}");
    }
    if !resource.properties.is_empty() {
        println!("Properties:");
        for (key, values) in &resource.properties {
            println!("  {key}: {}", values.join(", "));
        }
    }
    if resource.is_collection() {
        println!("Children:");
        for child in resource.children() {
            println!("  {child}");
        }
    } else {
        println!("Content:    {} byte(s)", resource.bytes().len());
    }
    Ok(())
}
