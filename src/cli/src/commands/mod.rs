//! CLI subcommand implementations.

pub mod access;
pub mod chains;
pub mod decide;
pub mod resolve;
pub mod validate;
