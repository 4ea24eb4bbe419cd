//! Command implementations for the Lumen CLI.

pub mod config;
pub mod process;
