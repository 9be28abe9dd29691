//! CLI subcommand implementations

pub mod alternatives;
pub mod analyze;
pub mod forecast;
pub mod validate;
