//! Rollcall CLI library.
//!
//! This crate provides the command-line interface for the attendance
//! inference engine.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
