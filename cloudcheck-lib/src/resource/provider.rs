use super::{ResourceDescriptor, ResourceSnapshot};
use futures::future::BoxFuture;
use std::collections::BTreeMap;

/// Why a provider call failed.
///
/// The two classes matter to callers in different ways: `NotFound` is
/// terminal for the control that asked (unless the assertion expects
/// absence), while `Transient` is retried before escalating.
#[derive(Debug)]
pub enum FetchError {
    /// The selector matched no resource.
    NotFound,

    /// A transient failure (throttling, connection reset, ...). Worth
    /// retrying.
    Transient(ohno::AppError),
}

impl core::fmt::Display for FetchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "ResourceNotFound"),
            Self::Transient(e) => write!(f, "ProviderError: {e}"),
        }
    }
}

/// Typed accessor over a cloud control plane.
///
/// This is the single seam to the concrete platform: swapping providers
/// must not touch the evaluator. Implementations perform live network calls
/// and may be rate limited; the engine wraps every call in the run-scoped
/// [`SnapshotCache`](super::SnapshotCache), which also owns retries.
pub trait Provider: Send + Sync {
    /// Fetch the single resource named by `descriptor`.
    fn fetch<'a>(&'a self, descriptor: &'a ResourceDescriptor) -> BoxFuture<'a, Result<ResourceSnapshot, FetchError>>;

    /// Enumerate all resources of `resource_type` matching `filter`.
    ///
    /// An empty result set is `Ok(vec![])`, not `NotFound`.
    fn enumerate<'a>(
        &'a self,
        resource_type: &'a str,
        filter: &'a BTreeMap<String, String>,
    ) -> BoxFuture<'a, Result<Vec<ResourceSnapshot>, FetchError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ohno::app_err;

    #[test]
    fn not_found_display_names_the_taxonomy_kind() {
        assert_eq!(FetchError::NotFound.to_string(), "ResourceNotFound");
    }

    #[test]
    fn transient_display_includes_cause() {
        let e = FetchError::Transient(app_err!("throttled"));
        assert!(e.to_string().starts_with("ProviderError:"));
        assert!(e.to_string().contains("throttled"));
    }
}
