//! multicrv: historical multiple valuation and chance-risk ratio engine.
//!
//! Hexagonal architecture: valuation logic in [`domain`], port traits in [`ports`],
//! file-backed implementations in [`adapters`]. The usual entry point is
//! [`domain::engine::ValuationEngine`].

pub mod domain;
pub mod ports;
pub mod adapters;
