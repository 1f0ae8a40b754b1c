//! Turn CLI flags plus config defaults into per-preset fetch plans.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use gribq_core::config::GribqConfig;
use gribq_core::cycle::ForecastCycle;
use gribq_core::geo::BoundingBox;
use gribq_core::model::{ModelData, ModelRegistry, Preset};
use gribq_core::query::{generate_query_urls, CandidateUrl, QueryFields};
use std::sync::Arc;

use super::QueryArgs;

/// One preset's session: its fields and newest-first candidate URLs.
#[derive(Debug, Clone)]
pub struct PresetPlan {
    pub preset: Preset,
    pub fields: QueryFields,
    pub candidates: Vec<CandidateUrl>,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub model: Arc<ModelData>,
    pub product: String,
    pub now: DateTime<Utc>,
    pub bbox: BoundingBox,
    pub forecast_hour: u32,
    pub cycles: Vec<ForecastCycle>,
    pub plans: Vec<PresetPlan>,
}

impl Resolution {
    /// Newest candidate cycle (candidate lists are never empty).
    pub fn newest_cycle(&self) -> Option<ForecastCycle> {
        self.cycles.first().copied()
    }
}

pub fn resolve(
    args: &QueryArgs,
    cfg: &GribqConfig,
    registry: &ModelRegistry,
) -> Result<Resolution> {
    let model = Arc::clone(registry.get(args.model.as_deref().unwrap_or(&cfg.model))?);
    let product_name = args.product.clone().unwrap_or_else(|| cfg.product.clone());
    let product = Arc::clone(model.product(&product_name)?);

    let preset_names: Vec<String> = if !args.presets.is_empty() {
        args.presets.clone()
    } else if let Some(preset) = &cfg.preset {
        vec![preset.clone()]
    } else {
        bail!("no preset given: pass --preset or set `preset` in the config");
    };

    let bbox = resolve_bbox(args, cfg)?;
    let forecast_hour = args.forecast_hour.unwrap_or(cfg.forecast_hour);
    let now = args.at.unwrap_or_else(Utc::now);
    let cycles = cfg.cycle_schedule().candidates(now)?;

    let mut plans = Vec::with_capacity(preset_names.len());
    for name in &preset_names {
        let preset = model.preset(name)?.clone();
        let fields = QueryFields {
            forecast_hour,
            bbox,
            variables: preset.variables.clone(),
            levels: preset.levels.clone(),
            product: Arc::clone(&product),
        };
        let candidates = generate_query_urls(&cycles, &fields)
            .with_context(|| format!("build URLs for preset {name:?}"))?;
        plans.push(PresetPlan {
            preset,
            fields,
            candidates,
        });
    }

    Ok(Resolution {
        model,
        product: product_name,
        now,
        bbox,
        forecast_hour,
        cycles,
        plans,
    })
}

fn resolve_bbox(args: &QueryArgs, cfg: &GribqConfig) -> Result<BoundingBox> {
    let convention = cfg.longitude_convention;
    if let Some(bounds) = &args.bounds {
        let [lat_min, lat_max, lon_min, lon_max] = bounds.as_slice() else {
            bail!("--bounds takes exactly four values");
        };
        return Ok(BoundingBox::from_explicit_bounds(
            *lat_min, *lat_max, *lon_min, *lon_max, convention,
        )?);
    }

    let location = &cfg.location;
    let (Some(lat), Some(lon)) = (
        args.lat.or(location.latitude),
        args.lon.or(location.longitude),
    ) else {
        bail!("no location: pass --lat and --lon (or --bounds), or set [location] in the config");
    };
    let height = args.height.unwrap_or(location.height);
    let width = args.width.unwrap_or(location.width);
    Ok(BoundingBox::from_center_and_expanse(
        lat, lon, height, width, convention,
    )?)
}
