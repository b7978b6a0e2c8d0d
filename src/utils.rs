//! Formatting helpers shared by the CLI and the observability projections

pub mod currency;
pub mod time;
