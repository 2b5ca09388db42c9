//! Core valuation logic. Pure functions over the data model; all external
//! data arrives through the traits in [`crate::ports`].

pub mod bandwidth;
pub mod config;
pub mod crv;
pub mod engine;
pub mod error;
pub mod multiple;
pub mod percentile;
pub mod rounding;
pub mod scenario;
pub mod sector;
pub mod series;
pub mod targets;
