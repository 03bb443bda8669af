//! Lesson extraction pipeline.
//!
//! A turn flows through the stages in this order:
//!
//! 1. [`trigger`] -- cheap heuristics decide whether analysis is worth a model call
//! 2. [`prompt`] -- the analysis prompt is assembled from recent context
//! 3. the model gateway produces raw text
//! 4. [`parse`] -- raw text must be a JSON array
//! 5. [`filter`] -- each element is admitted or dropped
//! 6. the lesson repository stores each admitted record independently
//!
//! [`evaluator::LessonEvaluator`] sequences the stages and never fails the caller.

pub mod evaluator;
pub mod filter;
pub mod log;
pub mod parse;
pub mod prompt;
pub mod trigger;
