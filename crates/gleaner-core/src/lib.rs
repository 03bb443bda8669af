//! Lesson extraction pipeline and repository trait definitions for Gleaner.
//!
//! This crate defines the "ports" (the model gateway and lesson repository
//! traits) that the infrastructure layer implements, plus the pipeline that
//! drives them. It depends only on `gleaner-types` -- never on
//! `gleaner-infra` or any database/IO crate.

pub mod extraction;
pub mod lesson;
pub mod llm;
