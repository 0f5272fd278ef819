//! CLI command implementations
//!
//! Each subcommand group has its own module with `run`-style functions.

pub mod download;
pub mod extract;
pub mod plot;
pub mod prodigal;
pub mod summarize;
pub mod uniprot;
