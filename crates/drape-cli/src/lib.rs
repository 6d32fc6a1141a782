//! Drape CLI - Command-line interface for Drape clothing recommendations
//!
//! This crate provides the CLI application that ties together all Drape components.

pub mod config;

pub use config::{Command, Config};
