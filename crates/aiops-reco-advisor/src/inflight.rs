//! In-flight recommendation de-duplication.
//!
//! Alert dispatchers often deliver bursts of the same incident. This cache
//! collapses concurrent requests for the same [`ContextFingerprint`] onto a
//! single model call and lets later requests within the window reuse its
//! result. Degraded results are never reused.
//!
//! The cache only holds a weak handle to a call in progress. When every
//! caller awaiting it is dropped, the call is dropped with them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use tokio::time::Instant;

use aiops_reco_core::{ContextFingerprint, RecommendationResult};

/// A recommendation that any number of callers can await.
pub type SharedRecommendation = Shared<BoxFuture<'static, RecommendationResult>>;

type WeakRecommendation = WeakShared<BoxFuture<'static, RecommendationResult>>;

/// How a caller obtained its recommendation future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// This caller started the model call.
    Started,
    /// This caller joined a call started by someone else.
    Joined,
}

enum Slot {
    Pending(WeakRecommendation),
    Ready(RecommendationResult),
}

struct Entry {
    started_at: Instant,
    generation: u64,
    slot: Slot,
}

impl Entry {
    fn reusable(&self, now: Instant, window: Duration) -> bool {
        if now.duration_since(self.started_at) >= window {
            return false;
        }
        match &self.slot {
            Slot::Pending(weak) => weak.upgrade().is_some(),
            Slot::Ready(result) => !result.degraded,
        }
    }

    fn join(&self) -> Option<SharedRecommendation> {
        match &self.slot {
            Slot::Pending(weak) => weak.upgrade(),
            Slot::Ready(result) => Some(futures::future::ready(result.clone()).boxed().shared()),
        }
    }
}

#[derive(Default)]
struct Inner {
    entries: HashMap<ContextFingerprint, Entry>,
    next_generation: u64,
}

/// A window-bounded map of fingerprints to recommendations.
pub struct InflightCache {
    window: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl InflightCache {
    /// Create a cache whose entries live for `window`.
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// The reuse window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Claim the recommendation for `key`.
    ///
    /// If a reusable entry exists, returns it with [`Claim::Joined`] and
    /// `start` is not called. Otherwise `start` builds the future, which is
    /// tracked and returned with [`Claim::Started`]. The check and the insert
    /// happen under one lock, so concurrent identical requests produce at
    /// most one call.
    pub fn claim<F>(&self, key: &ContextFingerprint, start: F) -> (SharedRecommendation, Claim)
    where
        F: FnOnce() -> BoxFuture<'static, RecommendationResult>,
    {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let window = self.window;
        inner.entries.retain(|_, entry| entry.reusable(now, window));

        if let Some(shared) = inner.entries.get(key).and_then(Entry::join) {
            return (shared, Claim::Joined);
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;

        let call = start();
        let settle_into = Arc::clone(&self.inner);
        let settle_key = key.clone();
        let shared = async move {
            let result = call.await;
            settle(&settle_into, &settle_key, generation, &result);
            result
        }
        .boxed()
        .shared();

        if let Some(weak) = shared.downgrade() {
            inner.entries.insert(
                key.clone(),
                Entry {
                    started_at: now,
                    generation,
                    slot: Slot::Pending(weak),
                },
            );
        }
        (shared, Claim::Started)
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether there are no live entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

/// Replace a finished call's entry with its result, or drop it if degraded.
fn settle(
    inner: &Mutex<Inner>,
    key: &ContextFingerprint,
    generation: u64,
    result: &RecommendationResult,
) {
    let mut inner = inner.lock();
    let current = inner
        .entries
        .get(key)
        .is_some_and(|entry| entry.generation == generation);
    if !current {
        return;
    }
    if result.degraded {
        inner.entries.remove(key);
    } else if let Some(entry) = inner.entries.get_mut(key) {
        entry.slot = Slot::Ready(result.clone());
    }
}
