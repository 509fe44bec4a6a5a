//! Resource access for cloud infrastructure
//!
//! This module owns the boundary between the evaluation engine and the cloud
//! control plane. A [`ResourceDescriptor`] names one resource (or an
//! enumerable set) by type and selector; a [`Provider`] turns descriptors
//! into immutable [`ResourceSnapshot`] values; the [`SnapshotCache`] memoizes
//! provider calls for the duration of one evaluation run.
//!
//! Providers are the single seam to any concrete cloud platform. Resource
//! types are plain strings the engine never interprets, so the capability
//! set is open: whatever the configured provider can resolve is supported.
//! [`InventoryProvider`] is a file/memory-backed implementation used by the
//! CLI and by tests.

mod cache;
mod descriptor;
mod inventory;
mod provider;
mod snapshot;

pub use cache::{FetchFailure, SnapshotCache};
pub use descriptor::ResourceDescriptor;
pub use inventory::InventoryProvider;
pub use provider::{FetchError, Provider};
pub use snapshot::ResourceSnapshot;

pub(crate) use snapshot::{lookup, scalar_to_string};
