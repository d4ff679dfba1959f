//! CLI module for the Halldyll queue reconciler.
//!
//! This module provides the command-line interface for planning, applying
//! and exporting SQS queue configuration.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, StateCommands};
pub use output::OutputFormatter;
