//! Shared domain types for Gleaner.
//!
//! This crate contains the data shapes exchanged between the host runtime,
//! the extraction pipeline, the model gateway and the lesson store: turns,
//! session snapshots, candidate and persisted lessons, LLM request/response
//! types, configuration and their error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod lesson;
pub mod llm;
pub mod turn;
