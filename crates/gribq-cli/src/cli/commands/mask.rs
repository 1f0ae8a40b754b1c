//! `gribq mask encode|decode` – hex masks against a model's reference lists.

use anyhow::Result;
use gribq_core::bitmask::{decode, encode, MaskBits};
use gribq_core::config::GribqConfig;
use gribq_core::model::{ModelData, ModelRegistry};
use gribq_core::reference::ReferenceList;
use std::sync::Arc;

use crate::cli::{ListKind, MaskCommand};

fn list_of(model: &ModelData, kind: ListKind) -> &Arc<ReferenceList> {
    match kind {
        ListKind::Variables => model.variables(),
        ListKind::Levels => model.levels(),
    }
}

pub fn run_mask(cfg: &GribqConfig, registry: &ModelRegistry, action: &MaskCommand) -> Result<()> {
    match action {
        MaskCommand::Encode { model, list, ids } => {
            let model = registry.get(model.as_deref().unwrap_or(&cfg.model))?;
            let mask = encode(list_of(model, *list), ids)?;
            println!("{}", mask.to_hex());
        }
        MaskCommand::Decode { model, list, mask } => {
            let model = registry.get(model.as_deref().unwrap_or(&cfg.model))?;
            let bits = MaskBits::from_hex(mask)?;
            for id in decode(list_of(model, *list), &bits)? {
                println!("{id}");
            }
        }
    }
    Ok(())
}
