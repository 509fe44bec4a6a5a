#![doc(hidden)]

//! Core library for cloudcheck
//!
//! This library implements a compliance-policy evaluation engine for live
//! cloud infrastructure: environment profiles declare impact-weighted
//! controls whose assertions are evaluated against resource snapshots
//! fetched through a pluggable provider.
//!
//! # Module Organization
//!
//! - [`commands`]: Command-line interface and orchestration
//! - [`profile`]: Profile documents, controls, and input binding
//! - [`resource`]: Resource descriptors, snapshots, providers, and the run cache
//! - [`eval`]: Predicate model and the recursive evaluator
//! - [`runner`]: Control execution, outcomes, and the report model
//! - [`reports`]: Report generation

pub type Result<T, E = ohno::AppError> = core::result::Result<T, E>;

#[cfg(any(debug_assertions, test))]
pub mod commands;
#[cfg(not(any(debug_assertions, test)))]
mod commands;

pub mod eval;
pub mod profile;
pub mod reports;
pub mod resource;
pub mod runner;

pub use crate::commands::{Host, run};
