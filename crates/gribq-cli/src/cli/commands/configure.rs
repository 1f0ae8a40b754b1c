//! `gribq configure` – show or update the persisted configuration.

use anyhow::{Context, Result};
use gribq_core::config::{self, GribqConfig};
use std::fs;
use std::path::Path;

pub fn run_configure(cfg: &mut GribqConfig, storage: Option<&Path>) -> Result<()> {
    let path = config::config_path()?;
    let Some(storage) = storage else {
        println!("# {}", path.display());
        print!("{}", toml::to_string_pretty(cfg)?);
        return Ok(());
    };

    fs::create_dir_all(storage)
        .with_context(|| format!("create storage directory {}", storage.display()))?;
    let storage = storage
        .canonicalize()
        .with_context(|| format!("resolve {}", storage.display()))?;
    cfg.output_dir = Some(storage.clone());
    config::save(cfg)?;
    tracing::info!(output_dir = %storage.display(), "storage directory configured");
    println!("storage directory set to {}", storage.display());
    println!("saved {}", path.display());
    Ok(())
}
