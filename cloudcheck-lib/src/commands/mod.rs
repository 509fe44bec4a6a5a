//! Command-line interface and orchestration for cloudcheck
//!
//! This module implements the CLI commands and wires the other modules
//! together into end-to-end workflows: profile loading and binding,
//! provider construction, run execution, and report emission.
//!
//! # Implementation Model
//!
//! Three commands are provided:
//!
//! - **run**: load a profile, bind its inputs, evaluate every control
//!   against the inventory-backed provider, and emit the report (JSON on
//!   stdout, human summary on stderr); exits 1 when any control fails or
//!   errors
//! - **validate**: load and bind a profile without fetching anything,
//!   surfacing every configuration error a run would hit
//! - **init**: write a commented sample profile to start from
//!
//! The `run` function parses command-line arguments using clap and routes
//! to the appropriate handler. All output flows through the [`Host`]
//! abstraction so tests can capture it in memory.

mod common;
mod host;
mod init;
mod run;
mod run_profile;
mod validate;

pub use common::{LogLevel, parse_inputs};
pub use host::Host;
pub use init::{InitArgs, init_profile};
pub use run::run;
pub use run_profile::{RunArgs, run_profile};
pub use validate::{ValidateArgs, validate_profile};
