use super::{FetchError, Provider, ResourceDescriptor, ResourceSnapshot, lookup, scalar_to_string};
use crate::Result;
use camino::Utf8Path;
use futures::future::BoxFuture;
use ohno::{IntoAppError, app_err};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;

const LOG_TARGET: &str = " inventory";

/// A provider backed by an in-memory resource inventory.
///
/// The inventory is a flat list of (resource type, attribute document)
/// pairs, typically loaded from a JSON file captured out-of-band (an
/// infrastructure export, a terraform state dump massaged into shape, a
/// test fixture). Selector values match against the string form of the
/// addressed attribute.
///
/// This is the provider the CLI wires up; live-API providers implement the
/// same [`Provider`] trait and drop in without touching the evaluator.
#[derive(Debug, Default)]
pub struct InventoryProvider {
    resources: Vec<(String, ResourceSnapshot)>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InventoryDoc {
    resources: Vec<InventoryEntry>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct InventoryEntry {
    #[serde(rename = "type")]
    resource_type: String,
    attributes: Value,
}

impl InventoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an inventory from a JSON file of the shape
    /// `{"resources": [{"type": "...", "attributes": {...}}, ...]}`.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading inventory file '{path}'"))?;
        let doc: InventoryDoc = serde_json::from_str(&text).into_app_err_with(|| format!("parsing inventory file '{path}'"))?;

        let mut provider = Self::new();
        for entry in doc.resources {
            if !entry.attributes.is_object() {
                return Err(app_err!("inventory entry for '{}' must have an object under 'attributes'", entry.resource_type));
            }
            provider.insert(entry.resource_type, entry.attributes);
        }
        Ok(provider)
    }

    /// Add one resource to the inventory.
    pub fn insert(&mut self, resource_type: impl Into<String>, attributes: Value) {
        self.resources.push((resource_type.into(), ResourceSnapshot::new(attributes)));
    }

    fn matching<'a>(
        &'a self,
        resource_type: &'a str,
        selector: &'a BTreeMap<String, String>,
    ) -> impl Iterator<Item = &'a ResourceSnapshot> {
        self.resources
            .iter()
            .filter(move |(kind, _)| kind == resource_type)
            .map(|(_, snapshot)| snapshot)
            .filter(move |snapshot| selector_matches(snapshot, selector))
    }
}

fn selector_matches(snapshot: &ResourceSnapshot, selector: &BTreeMap<String, String>) -> bool {
    selector.iter().all(|(key, expected)| {
        lookup(snapshot.root(), key)
            .as_ref()
            .and_then(scalar_to_string)
            .is_some_and(|actual| actual == *expected)
    })
}

impl Provider for InventoryProvider {
    fn fetch<'a>(&'a self, descriptor: &'a ResourceDescriptor) -> BoxFuture<'a, Result<ResourceSnapshot, FetchError>> {
        Box::pin(async move {
            let mut candidates = self.matching(&descriptor.resource_type, &descriptor.selector);
            let first = candidates.next().cloned().ok_or(FetchError::NotFound)?;

            // Selectors are expected to identify a single resource; flag
            // ambiguous ones rather than silently picking a winner.
            let extras = candidates.count();
            if extras > 0 {
                log::debug!(
                    target: LOG_TARGET,
                    "{descriptor} matched {} resources, using the first; tighten the selector",
                    extras + 1,
                );
            }

            Ok(first)
        })
    }

    fn enumerate<'a>(
        &'a self,
        resource_type: &'a str,
        filter: &'a BTreeMap<String, String>,
    ) -> BoxFuture<'a, Result<Vec<ResourceSnapshot>, FetchError>> {
        Box::pin(async move { Ok(self.matching(resource_type, filter).cloned().collect()) })
    }
}
