//! Scribe Core - Backend logic for the transcript pipeline
//!
//! This crate contains all pipeline logic with no terminal dependencies.
//! It can be used by the CLI tool or embedded in another frontend.

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod scraper;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
