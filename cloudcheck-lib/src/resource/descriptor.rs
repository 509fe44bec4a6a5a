use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Names one cloud resource (or an enumerable set of resources) by type and
/// selector.
///
/// The selector maps attribute names to expected values; all selector values
/// are fully substituted strings by the time a descriptor exists (templates
/// are resolved during profile binding). A `BTreeMap` keeps the selector
/// sorted, so [`ResourceDescriptor::cache_key`] is canonical without extra
/// work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub resource_type: String,
    pub selector: BTreeMap<String, String>,
}

impl ResourceDescriptor {
    #[must_use]
    pub fn new(resource_type: impl Into<String>, selector: BTreeMap<String, String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            selector,
        }
    }

    /// Canonical cache key: resource type plus sorted selector pairs.
    ///
    /// Two descriptors naming the same resource produce the same key
    /// regardless of how their selectors were assembled.
    #[must_use]
    pub fn cache_key(&self) -> String {
        self.to_string()
    }
}

impl core::fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{{", self.resource_type)?;
        for (i, (key, value)) in self.selector.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{key}={value}")?;
        }
        write!(f, "}}")
    }
}
