//! Infrastructure layer for Gleaner.
//!
//! Contains implementations of the traits defined in `gleaner-core`:
//! SQLite lesson storage, the Anthropic model provider, and the
//! `config.toml` loader.

pub mod config;
pub mod llm;
pub mod sqlite;
