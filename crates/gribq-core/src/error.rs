//! Local validation errors raised while resolving a query.
//!
//! None of these are retried: they mean the caller passed something the
//! reference data, geography or template cannot represent.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// A selected id is not part of the reference list.
    #[error("invalid selection: {id:?} is not in the reference list")]
    InvalidSelection { id: String },

    /// Mask has bits set at or beyond the reference list length.
    #[error("mask out of range: highest set bit is {highest_bit}, reference list has {len} items")]
    MaskOutOfRange { highest_bit: usize, len: usize },

    /// Hex mask text could not be parsed.
    #[error("malformed mask {0:?}: expected 0x followed by hex digits")]
    MalformedMask(String),

    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("template error: {0}")]
    Template(String),

    #[error("invalid cycle interval {0}h: must be between 1 and 24 and divide 24")]
    InvalidCycleInterval(u32),

    /// Lookback or availability delay beyond what a forecast archive keeps.
    #[error("{name} of {hours}h exceeds the {max}h limit")]
    HoursOutOfRange { name: &'static str, hours: u32, max: u32 },

    /// Reference lists must not repeat an id (bit positions would be ambiguous).
    #[error("duplicate item {0:?} in reference list")]
    DuplicateItem(String),

    #[error("unknown model {0:?}")]
    UnknownModel(String),

    #[error("unknown preset {preset:?} for model {model:?}")]
    UnknownPreset { model: String, preset: String },

    #[error("unknown product {product:?} for model {model:?}")]
    UnknownProduct { model: String, product: String },
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;
