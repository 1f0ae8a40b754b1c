//! `gribq plan` – show the candidate URLs without touching the network.

use anyhow::Result;
use gribq_core::config::GribqConfig;
use gribq_core::model::ModelRegistry;

use super::describe_bbox;
use crate::cli::resolve::resolve;
use crate::cli::QueryArgs;

pub fn run_plan(cfg: &GribqConfig, registry: &ModelRegistry, query: &QueryArgs) -> Result<()> {
    let resolution = resolve(query, cfg, registry)?;
    println!(
        "model {} / {}  f{:03}  {}",
        resolution.model.name(),
        resolution.product,
        resolution.forecast_hour,
        describe_bbox(&resolution.bbox)
    );
    println!("resolved at {}", resolution.now.format("%Y-%m-%d %H:%M UTC"));

    for plan in &resolution.plans {
        println!();
        println!("preset {}", plan.preset.name);
        println!(
            "  variables {} = {}",
            plan.preset.variables.to_hex(),
            plan.preset.variables.selected().collect::<Vec<_>>().join(",")
        );
        println!(
            "  levels    {} = {}",
            plan.preset.levels.to_hex(),
            plan.preset.levels.selected().collect::<Vec<_>>().join(",")
        );
        for (i, candidate) in plan.candidates.iter().enumerate() {
            println!("  {}. {}  {}", i + 1, candidate.cycle, candidate.url);
        }
    }
    Ok(())
}
