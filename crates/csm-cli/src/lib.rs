//! Command-line front end over the CSM admin libraries.

pub mod cli;

pub use cli::{merge_xnames, Cli, Command};
