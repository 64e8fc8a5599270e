//! Command implementations for the Pharmatrain CLI.

pub mod dataset;
pub mod jobs;
pub mod train;
