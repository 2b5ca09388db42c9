//! Port traits for the engine's external collaborators.

pub mod config_port;
pub mod fundamentals_port;
pub mod series_port;
