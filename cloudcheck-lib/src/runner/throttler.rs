use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounds how many controls evaluate at once.
///
/// Controls are independent and could all run in parallel, but every one of
/// them ends in provider calls; a small fixed pool keeps a large profile
/// from stampeding a rate-limited control plane. Wrap in an `Arc` via
/// [`Throttler::new`] and call [`Throttler::acquire`] before each control.
#[derive(Debug)]
pub struct Throttler {
    semaphore: Arc<Semaphore>,
}

impl Throttler {
    /// A throttler admitting at most `max_concurrent` controls at a time.
    pub fn new(max_concurrent: usize) -> Arc<Self> {
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        })
    }

    /// Acquire a slot. The permit must be held for the duration of the
    /// control's evaluation; dropping it admits the next waiter.
    pub async fn acquire(&self) -> tokio::sync::OwnedSemaphorePermit {
        Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .expect("semaphore is never closed")
    }
}
