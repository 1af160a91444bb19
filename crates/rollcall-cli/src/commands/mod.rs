//! CLI subcommand implementations.

pub mod normalize;
pub mod report;
