//! CLI module for orderscout: argument parsing and subcommands.

pub mod commands;

pub use commands::Cli;
