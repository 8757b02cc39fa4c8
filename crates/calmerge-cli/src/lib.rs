//! calmerge command-line interface.
//!
//! This crate provides the `calmerge` binary: `calmerge serve` runs the
//! aggregation server, `calmerge config` inspects the configuration.

pub mod cli;
pub mod commands;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
