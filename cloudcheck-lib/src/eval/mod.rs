//! Predicate model and evaluation
//!
//! This module implements the assertion language of the engine: an explicit
//! tagged [`Predicate`] tree walked by a recursive evaluator. Keeping the
//! tree as plain data (serde-derived, no callbacks) makes every assertion
//! serializable and diffable, and keeps the evaluator environment-agnostic:
//! all environment variation is resolved during profile binding, before
//! evaluation starts.
//!
//! # Implementation Model
//!
//! A predicate list is an implicit AND; the first failing predicate decides
//! the verdict and supplies the reason. Evaluation is pure over a snapshot
//! except at `CrossResource` nodes, which resolve related resources through
//! the run cache — those are the only suspension points. Absent attribute
//! paths are normal predicate outcomes (false/fail), never faults.
//! `CrossResource` recursion carries the set of descriptors visited along
//! the current path; revisiting one fails the branch instead of looping.

mod evaluator;
mod predicate;

pub use evaluator::{LookupError, Verdict, check};
pub use predicate::{CompareOp, Predicate};
