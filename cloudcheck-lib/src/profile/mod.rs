//! Profile documents, input binding, and the bound control model
//!
//! A profile is the engine's single source-of-truth input: a versioned TOML
//! document declaring named inputs and an ordered list of impact-weighted
//! controls. Documents are parsed by [`ProfileDoc`] and resolved by
//! [`ProfileDoc::bind`] into a [`Profile`] in which every `#{...}` template
//! (resource selectors, predicate operands, `only_if` preconditions) has
//! been substituted exactly once. All environment variation lives in the
//! inputs; nothing downstream of binding consults the environment again.

mod binder;
mod doc;
mod template;

pub use binder::{Assertion, Control, Profile};
pub use doc::{AssertionDoc, AssertionMode, ControlDoc, InputDecl, InputValue, PROFILE_VERSION, ProfileDoc};
pub use template::substitute;
