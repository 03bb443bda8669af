//! Lesson persistence for Gleaner.
//!
//! Defines the `LessonRepository` trait that the infrastructure layer
//! implements. The extraction pipeline writes through it one lesson at a time.

pub mod store;
