//! Command-line interface for inspecting and editing a persisted session

pub mod commands;

pub use commands::*;
