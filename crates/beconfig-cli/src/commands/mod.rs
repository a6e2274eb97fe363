//! CLI commands

pub mod validate;
