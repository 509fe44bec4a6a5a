//! Profile execution and result aggregation
//!
//! The runner takes a bound [`Profile`](crate::profile::Profile), a
//! [`Provider`](crate::resource::Provider), and [`RunOptions`], and produces
//! a [`Report`]: one [`Outcome`] per control, sorted by control id, plus an
//! impact-weighted summary score.
//!
//! # Implementation Model
//!
//! Controls are mutually independent and run concurrently on a pool bounded
//! by [`Throttler`]; assertions within one control evaluate sequentially in
//! declared order so failing-assertion indices are deterministic. All
//! provider traffic flows through one run-scoped
//! [`SnapshotCache`](crate::resource::SnapshotCache), which also carries the
//! run deadline. A control is `Error` only when resource resolution fails
//! (not found, provider fault after retries, deadline); a false predicate is
//! `Fail`. Every started control ends with a definite status in the report.

mod executor;
mod report;
mod throttler;

pub use executor::{RunOptions, run};
pub use report::{Outcome, Report, Status};
pub use throttler::Throttler;
