//! gribq core: resolve a GRIB filter query (model run, area, variables,
//! levels) and fetch it reliably from a rate-limited server.

pub mod config;
pub mod logging;

pub mod bitmask;
pub mod checksum;
pub mod cycle;
pub mod error;
pub mod geo;
pub mod model;
pub mod query;
pub mod reference;
pub mod retrieve;
pub mod storage;

pub use error::{QueryError, QueryResult};
