use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use tokio::runtime::Handle;

use crate::{CacheError, CacheKey, InvalidKeyDerivation};

/// The terminal outcome of a load, as seen by every caller of a key.
pub type Outcome<V, E> = Result<V, CacheError<E>>;

/// The one-shot outcome signal of a pending entry.
type Signal<V, E> = Shared<BoxFuture<'static, Outcome<V, E>>>;

enum EntryState<V, E> {
    Pending(Signal<V, E>),
    Resolved(V),
    Rejected(CacheError<E>),
}

impl<V: Clone, E> EntryState<V, E> {
    fn to_read(&self) -> Read<V, E> {
        match self {
            Self::Pending(signal) => Read::Pending(Suspension {
                signal: signal.clone(),
            }),
            Self::Resolved(value) => Read::Ready(value.clone()),
            Self::Rejected(err) => Read::Failed(err.clone()),
        }
    }
}

type Entries<V, E> = Mutex<HashMap<CacheKey, EntryState<V, E>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The answer of [`SuspendingCache::read`].
///
/// This is similar to [`std::task::Poll`], but the `Pending` variant carries the [`Suspension`]
/// the caller should wait on before reading again.
#[derive(Debug)]
pub enum Read<V, E> {
    /// The resource is loaded.
    Ready(V),
    /// The resource is still loading.
    Pending(Suspension<V, E>),
    /// The resource failed to load. This is permanent for the key.
    Failed(CacheError<E>),
}

impl<V, E> Read<V, E> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Returns the value, if the resource is loaded.
    pub fn ready(self) -> Option<V> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Converts into a [`Poll`] of the outcome, dropping the [`Suspension`].
    ///
    /// The load keeps running on the cache's runtime, so a scheduler that polls the same key again
    /// later observes its outcome.
    pub fn into_poll(self) -> Poll<Outcome<V, E>> {
        match self {
            Self::Ready(value) => Poll::Ready(Ok(value)),
            Self::Pending(_) => Poll::Pending,
            Self::Failed(err) => Poll::Ready(Err(err)),
        }
    }
}

/// A handle to the in-flight load of a pending entry.
///
/// A suspension resolves once the outcome has been recorded in the cache, so reading the same key
/// afterwards no longer suspends. Any number of suspensions may exist for one entry, and all of
/// them observe the same outcome. Dropping a suspension does not cancel the load.
pub struct Suspension<V, E> {
    signal: Signal<V, E>,
}

impl<V, E> Clone for Suspension<V, E> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<V, E> fmt::Debug for Suspension<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension").finish_non_exhaustive()
    }
}

impl<V: Clone, E> Future for Suspension<V, E> {
    type Output = Outcome<V, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.signal.poll_unpin(cx)
    }
}

/// A single-flight cache of asynchronously loaded resources.
///
/// For every distinct [`CacheKey`], the supplied loader is invoked at most once over the lifetime
/// of the cache. Until the load settles, every read of that key answers [`Read::Pending`] with a
/// [`Suspension`], after which the value or the failure is memoized permanently. There is no
/// expiry, invalidation or retry; use a different key to load a resource again.
///
/// The cache is a cheap handle around shared state. Construct it once, and hand clones to every
/// consumer that should share the loaded resources.
///
/// Loads run on the runtime given to [`new`](Self::new), independently of whoever reads the cache.
pub struct SuspendingCache<V, E> {
    name: Arc<str>,
    entries: Arc<Entries<V, E>>,
    runtime: Handle,
}

impl<V, E> Clone for SuspendingCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            entries: Arc::clone(&self.entries),
            runtime: self.runtime.clone(),
        }
    }
}

impl<V, E> fmt::Debug for SuspendingCache<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (entries, pending) = self
            .entries
            .try_lock()
            .map(|entries| {
                let pending = entries
                    .values()
                    .filter(|state| matches!(state, EntryState::Pending(_)))
                    .count();
                (entries.len(), pending)
            })
            .unwrap_or_default();
        f.debug_struct("SuspendingCache")
            .field("name", &self.name)
            .field("entries", &entries)
            .field("pending", &pending)
            .finish()
    }
}

impl<V, E> SuspendingCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Creates an empty cache that runs its loads on `runtime`.
    ///
    /// The `name` is attached as the `cache` tag to all metrics.
    pub fn new(name: impl Into<Arc<str>>, runtime: Handle) -> Self {
        Self {
            name: name.into(),
            entries: Default::default(),
            runtime,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reads the resource identified by `key`, starting its load if this is the first read.
    ///
    /// - For an unseen key, `loader` is invoked exactly once and the future it returns becomes the
    ///   in-flight load. The read answers [`Read::Pending`].
    /// - While the load is in flight, reads answer [`Read::Pending`] without invoking `loader`.
    ///   Reading again any number of times has no side effects.
    /// - Once loaded, reads answer [`Read::Ready`] with a clone of the value.
    /// - Once failed, reads answer [`Read::Failed`] with the memoized error.
    ///
    /// The load is spawned onto the cache's runtime right away. It settles whether or not anybody
    /// awaits a [`Suspension`] of the entry.
    ///
    /// `loader` is invoked while the cache is locked, so it must not read from this cache itself.
    /// The future it returns is free to do so.
    pub fn read<F, Fut>(&self, key: CacheKey, loader: F) -> Read<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let name = self.name.as_ref();
        metric!(counter("caches.access") += 1, "cache" => name);

        let mut entries = lock(&self.entries);
        if let Some(state) = entries.get(&key) {
            let read = state.to_read();
            if read.is_pending() {
                metric!(counter("caches.suspended") += 1, "cache" => name);
            } else {
                metric!(counter("caches.memory.hit") += 1, "cache" => name);
            }
            return read;
        }

        metric!(counter("caches.computation") += 1, "cache" => name);
        let signal = self.settle(key.clone(), loader());
        entries.insert(key, EntryState::Pending(signal.clone()));
        self.runtime.spawn(signal.clone().map(|_| ()));

        metric!(gauge("caches.entries") = entries.len() as u64, "cache" => name);
        metric!(counter("caches.suspended") += 1, "cache" => name);
        Read::Pending(Suspension { signal })
    }

    /// Derives the key from the load parameters and [`read`](Self::read)s it.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidKeyDerivation`] without touching the cache or invoking `loader` when the
    /// parameters have no stable serialization.
    pub fn read_with<P, F, Fut>(
        &self,
        params: &P,
        loader: F,
    ) -> Result<Read<V, E>, InvalidKeyDerivation>
    where
        P: Serialize + ?Sized,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let key = CacheKey::from_params(params)?;
        Ok(self.read(key, loader))
    }

    /// Inspects the entry for `key` without starting a load.
    ///
    /// Returns `None` if the key was never read.
    pub fn peek(&self, key: &CacheKey) -> Option<Read<V, E>> {
        lock(&self.entries).get(key).map(EntryState::to_read)
    }

    /// Reads the resource and waits for it if it is still loading.
    pub async fn get<F, Fut>(&self, key: CacheKey, loader: F) -> Outcome<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        match self.read(key, loader) {
            Read::Ready(value) => Ok(value),
            Read::Pending(suspension) => suspension.await,
            Read::Failed(err) => Err(err),
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        lock(&self.entries).contains_key(key)
    }

    /// The number of entries, pending ones included.
    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wraps the load into the outcome signal of a new entry.
    ///
    /// The signal records the terminal state before it resolves, so no waiter can observe the
    /// outcome while the entry still reads as pending.
    fn settle<Fut>(&self, key: CacheKey, load: Fut) -> Signal<V, E>
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let entries = Arc::downgrade(&self.entries);
        let name = Arc::clone(&self.name);

        let signal = async move {
            let outcome = match AssertUnwindSafe(load).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(err)) => {
                    metric!(counter("caches.computation.failed") += 1, "cache" => name.as_ref());
                    Err(CacheError::LoadFailure(Arc::new(err)))
                }
                Err(panic) => {
                    metric!(counter("caches.computation.panicked") += 1, "cache" => name.as_ref());
                    Err(CacheError::LoadPanicked(panic_message(&*panic).into()))
                }
            };

            record(&entries, key, &outcome);
            outcome
        };

        signal.boxed().shared()
    }
}

/// Moves the entry for `key` into its terminal state.
///
/// This is a noop if the cache has been dropped in the meantime.
fn record<V: Clone, E>(entries: &Weak<Entries<V, E>>, key: CacheKey, outcome: &Outcome<V, E>) {
    let Some(entries) = entries.upgrade() else {
        return;
    };
    let state = match outcome {
        Ok(value) => EntryState::Resolved(value.clone()),
        Err(err) => EntryState::Rejected(err.clone()),
    };
    lock(&entries).insert(key, state);
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
