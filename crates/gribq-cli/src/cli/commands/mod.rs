//! CLI command handlers, one per file.

mod configure;
mod fetch;
mod mask;
mod plan;
mod presets;

pub use configure::run_configure;
pub use fetch::{run_fetch, FetchOptions};
#[cfg(test)]
pub(crate) use fetch::run_sessions;
pub use mask::run_mask;
pub use plan::run_plan;
pub use presets::run_presets;

use gribq_core::geo::BoundingBox;

pub(crate) fn describe_bbox(bbox: &BoundingBox) -> String {
    format!(
        "lat {}..{}, lon {}..{}",
        bbox.lat_min(),
        bbox.lat_max(),
        bbox.lon_min(),
        bbox.lon_max()
    )
}
