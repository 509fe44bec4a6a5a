//! Run-scoped memoization of provider calls.
//!
//! Many controls reference the same VPC, cluster, or security group; the
//! cache collapses those lookups into one provider call per canonical
//! descriptor per run. Concurrent callers for the same key await a single
//! in-flight fetch. Terminal failures (`NotFound`, exhausted retries) are
//! memoized too, so the provider is invoked at most once per key.
//!
//! Provider calls run behind [`seatbelt`] retry middleware so transient
//! control-plane failures (throttling, connection resets) are masked
//! automatically. The cache is an efficiency and API-quota measure only;
//! evaluation is correct with or without it. There is no cross-run
//! persistence.

use super::{FetchError, Provider, ResourceDescriptor, ResourceSnapshot};
use core::time::Duration;
use layered::{Execute, Service, Stack};
use seatbelt::retry::{Backoff, Retry};
use seatbelt::{RecoveryInfo, ResilienceContext};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tick::Clock;
use tokio::sync::OnceCell;
use tokio::time::Instant;

const LOG_TARGET: &str = "     cache";

/// Maximum retries per descriptor, on top of the original provider call.
const MAX_RETRY_ATTEMPTS: u32 = 2;

/// Base delay for exponential backoff between retries.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

/// A terminal, memoized fetch failure. Cheap to clone so every waiter on a
/// collapsed in-flight fetch can receive it.
#[derive(Debug, Clone)]
pub enum FetchFailure {
    /// The selector matched no resource (post-retry if retries applied).
    NotFound,

    /// A transient provider failure that survived the retry budget.
    Transient(Arc<ohno::AppError>),
}

impl core::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "ResourceNotFound"),
            Self::Transient(e) => write!(f, "ProviderError: {e}"),
        }
    }
}

type FetchOutcome = Result<Arc<ResourceSnapshot>, FetchFailure>;
type EnumerateOutcome = Result<Arc<Vec<ResourceSnapshot>>, FetchFailure>;

/// Memoizes `fetch` and `enumerate` results for one evaluation run.
pub struct SnapshotCache {
    provider: Arc<dyn Provider>,
    fetches: Mutex<HashMap<String, Arc<OnceCell<FetchOutcome>>>>,
    enumerations: Mutex<HashMap<String, Arc<OnceCell<EnumerateOutcome>>>>,
    deadline: Option<Instant>,
}

impl core::fmt::Debug for SnapshotCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SnapshotCache")
            .field("provider", &"<dyn Provider>")
            .field("deadline", &self.deadline)
            .finish_non_exhaustive()
    }
}

impl SnapshotCache {
    #[must_use]
    pub fn new(provider: Arc<dyn Provider>, deadline: Option<Instant>) -> Self {
        Self {
            provider,
            fetches: Mutex::new(HashMap::new()),
            enumerations: Mutex::new(HashMap::new()),
            deadline,
        }
    }

    /// Fetch the resource named by `descriptor`, collapsing concurrent
    /// lookups of the same canonical key into a single provider call.
    pub async fn get_or_fetch(&self, descriptor: &ResourceDescriptor) -> FetchOutcome {
        let cell = {
            let mut map = self.fetches.lock().expect("lock not poisoned");
            Arc::clone(map.entry(descriptor.cache_key()).or_default())
        };

        cell.get_or_init(|| async { self.fetch_with_retry(descriptor).await }).await.clone()
    }

    /// Enumerate resources of `resource_type` matching `filter`, memoized
    /// under a key space separate from single fetches.
    pub async fn get_or_enumerate(&self, resource_type: &str, filter: &BTreeMap<String, String>) -> EnumerateOutcome {
        let key = ResourceDescriptor::new(resource_type, filter.clone()).cache_key();
        let cell = {
            let mut map = self.enumerations.lock().expect("lock not poisoned");
            Arc::clone(map.entry(key).or_default())
        };

        cell.get_or_init(|| async { self.enumerate_with_retry(resource_type, filter).await })
            .await
            .clone()
    }

    async fn fetch_with_retry(&self, descriptor: &ResourceDescriptor) -> FetchOutcome {
        let provider = Arc::clone(&self.provider);
        let result = self
            .resilient("fetch", descriptor.clone(), move |descriptor: ResourceDescriptor| {
                let provider = Arc::clone(&provider);
                async move { provider.fetch(&descriptor).await }
            })
            .await;

        match result {
            Ok(snapshot) => Ok(Arc::new(snapshot)),
            Err(FetchError::NotFound) => {
                log::debug!(target: LOG_TARGET, "{descriptor} not found");
                Err(FetchFailure::NotFound)
            }
            Err(FetchError::Transient(e)) => Err(FetchFailure::Transient(Arc::new(e))),
        }
    }

    async fn enumerate_with_retry(&self, resource_type: &str, filter: &BTreeMap<String, String>) -> EnumerateOutcome {
        let provider = Arc::clone(&self.provider);
        let input = (resource_type.to_string(), filter.clone());
        let result = self
            .resilient("enumerate", input, move |(resource_type, filter): (String, BTreeMap<String, String>)| {
                let provider = Arc::clone(&provider);
                async move { provider.enumerate(&resource_type, &filter).await }
            })
            .await;

        match result {
            Ok(snapshots) => Ok(Arc::new(snapshots)),
            Err(FetchError::NotFound) => Err(FetchFailure::NotFound),
            Err(FetchError::Transient(e)) => Err(FetchFailure::Transient(Arc::new(e))),
        }
    }

    /// Execute one provider operation behind retry middleware.
    ///
    /// Only transient failures are retried; `NotFound` and success are
    /// terminal. No retries once the run-level deadline has elapsed.
    async fn resilient<In, Out, Fut, F>(&self, name: &'static str, input: In, operation: F) -> Result<Out, FetchError>
    where
        In: Clone + Send + Sync + 'static,
        Out: Send + 'static,
        Fut: Future<Output = Result<Out, FetchError>> + Send,
        F: Fn(In) -> Fut + Send + Sync + Clone + 'static,
    {
        let clock = Clock::new_tokio();
        let context = ResilienceContext::new(&clock).name(name);
        let deadline = self.deadline;

        let service = (
            Retry::layer("retry", &context)
                .clone_input()
                .recovery_with(move |result: &Result<Out, FetchError>, _| match result {
                    Err(FetchError::Transient(_)) if !deadline.is_some_and(|at| Instant::now() >= at) => {
                        RecoveryInfo::retry()
                    }
                    _ => RecoveryInfo::never(),
                })
                .max_retry_attempts(MAX_RETRY_ATTEMPTS)
                .base_delay(RETRY_BASE_DELAY)
                .backoff(Backoff::Exponential)
                .on_retry(move |_output, args| {
                    log::debug!(
                        target: LOG_TARGET,
                        "retrying {name} (attempt {}, delay {}ms)",
                        args.attempt().index() + 1,
                        args.retry_delay().as_millis(),
                    );
                }),
            Execute::new(move |input: In| {
                let operation = operation.clone();
                async move { operation(input).await }
            }),
        )
            .into_service();

        service.execute(input).await
    }
}
