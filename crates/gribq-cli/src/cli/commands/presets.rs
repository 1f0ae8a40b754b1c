//! `gribq presets` – list a model's presets.

use anyhow::Result;
use gribq_core::model::ModelRegistry;

pub fn run_presets(registry: &ModelRegistry, model: &str) -> Result<()> {
    let model = registry.get(model)?;
    match model.description() {
        Some(description) => println!("{} - {}", model.name(), description),
        None => println!("{}", model.name()),
    }
    println!(
        "products: {}",
        model.product_names().collect::<Vec<_>>().join(", ")
    );

    let mut any = false;
    for preset in model.presets() {
        any = true;
        println!();
        println!("{}", preset.name);
        println!(
            "  variables ({}): {}",
            preset.variables.to_hex(),
            preset.variables.selected().collect::<Vec<_>>().join(", ")
        );
        println!(
            "  levels    ({}): {}",
            preset.levels.to_hex(),
            preset.levels.selected().collect::<Vec<_>>().join(", ")
        );
    }
    if !any {
        println!("no presets defined");
    }
    Ok(())
}
