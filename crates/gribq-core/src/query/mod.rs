//! Query URL builder.
//!
//! Composes a forecast cycle, bounding box and the two selection masks with
//! a [`ProductTemplate`] into request URLs. [`generate_query_urls`] keeps the
//! newest-first order of its input: that order is the retry plan of the
//! retrieval engine.

mod template;

pub use template::{render, ProductTemplate, PLACEHOLDERS};

use crate::bitmask::SelectionMask;
use crate::cycle::ForecastCycle;
use crate::error::{QueryError, QueryResult};
use crate::geo::BoundingBox;
use std::sync::Arc;
use url::Url;

const FLAG_ON: &str = "on";

/// Everything except the cycle: shared by every candidate of one session.
#[derive(Debug, Clone)]
pub struct QueryFields {
    pub forecast_hour: u32,
    pub bbox: BoundingBox,
    pub variables: SelectionMask,
    pub levels: SelectionMask,
    pub product: Arc<ProductTemplate>,
}

impl QueryFields {
    pub fn request_for(&self, cycle: ForecastCycle) -> QueryRequest {
        QueryRequest {
            cycle,
            forecast_hour: self.forecast_hour,
            bbox: self.bbox,
            variables: self.variables.clone(),
            levels: self.levels.clone(),
            product: Arc::clone(&self.product),
        }
    }
}

/// Fully determines one request URL.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub cycle: ForecastCycle,
    pub forecast_hour: u32,
    pub bbox: BoundingBox,
    pub variables: SelectionMask,
    pub levels: SelectionMask,
    pub product: Arc<ProductTemplate>,
}

impl QueryRequest {
    fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            "date" => self.cycle.date_string(),
            "cycle" => self.cycle.hour_string(),
            "forecast_hour" => format!("{:03}", self.forecast_hour),
            "lat_min" => self.bbox.lat_min().to_string(),
            "lat_max" => self.bbox.lat_max().to_string(),
            "lon_min" => self.bbox.lon_min().to_string(),
            "lon_max" => self.bbox.lon_max().to_string(),
            _ => return None,
        };
        Some(value)
    }
}

/// One entry of the retry plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub cycle: ForecastCycle,
    pub url: String,
}

/// Render the product template for `request` and append the inclusion flags.
pub fn build(request: &QueryRequest) -> QueryResult<Url> {
    let product = &request.product;
    let mut url = Url::parse(&product.base_url)
        .map_err(|e| QueryError::Template(format!("base_url {:?}: {e}", product.base_url)))?;

    let mut pairs: Vec<(String, String)> = Vec::with_capacity(
        product.query.len() + request.variables.len() + request.levels.len(),
    );
    for (key, value) in &product.query {
        pairs.push((key.clone(), render(value, |name| request.field(name))?));
    }
    for id in request.variables.selected() {
        pairs.push((format!("{}{}", product.variable_prefix, id), FLAG_ON.to_string()));
    }
    for id in request.levels.selected() {
        pairs.push((format!("{}{}", product.level_prefix, id), FLAG_ON.to_string()));
    }

    if !pairs.is_empty() {
        let mut serializer = url.query_pairs_mut();
        for (key, value) in &pairs {
            serializer.append_pair(key, value);
        }
    }
    Ok(url)
}

/// One URL per candidate cycle, same order as `cycles`.
pub fn generate_query_urls(
    cycles: &[ForecastCycle],
    fields: &QueryFields,
) -> QueryResult<Vec<CandidateUrl>> {
    cycles
        .iter()
        .map(|&cycle| {
            let url = build(&fields.request_for(cycle))?;
            Ok(CandidateUrl {
                cycle,
                url: url.into(),
            })
        })
        .collect()
}
