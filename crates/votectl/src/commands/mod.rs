//! Subcommand implementations.

pub mod vote;
