//! Report rendering
//!
//! Two renderers over the same [`Report`](crate::runner::Report): a
//! machine-readable JSON document (stdout, stable and diffable between
//! runs) and a short human summary (stderr). Both write through
//! `core::fmt::Write` so tests can render into strings.

mod console;
mod json;

pub use console::generate as generate_console;
pub use json::generate as generate_json;
