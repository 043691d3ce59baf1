//! # Suspending resource cache
//!
//! A single-flight memoization primitive for asynchronously loaded resources, meant to be driven
//! by a cooperative scheduler such as a render loop.
//!
//! ## Reading
//!
//! Consumers call [`SuspendingCache::read`] with a [`CacheKey`] and a loader. The first read of a
//! key invokes the loader exactly once. Every read answers one of three states:
//!
//! - [`Read::Ready`]: the value is available, synchronously.
//! - [`Read::Pending`]: the load is still in flight. The caller yields back to its scheduler and
//!   reads again once the attached [`Suspension`] resolves. Reading again before that is harmless
//!   and does not start another load.
//! - [`Read::Failed`]: the load failed. The [`CacheError`] is memoized and replayed to every later
//!   reader; the loader is never retried.
//!
//! Entries are never evicted. To load a resource anew, include something like an attempt counter
//! in its key.
//!
//! ## [`CacheKey`]
//!
//! Keys are derived from the complete set of load parameters via [`CacheKey::from_params`], which
//! hashes a canonical JSON serialization of them. Two call sites asking for the same parameters end
//! up with the same key, and two different parameter sets never share one.
//! Parameters that cannot be serialized, or that contain `NaN` or infinite floats, are rejected
//! with [`InvalidKeyDerivation`].
//!
//! ## Metrics
//!
//! All metrics are tagged with the `cache` name given to [`SuspendingCache::new`], and are only
//! emitted once [`metrics::configure_statsd`] has been called:
//!
//! - `caches.access`: All reads.
//! - `caches.memory.hit`: Reads answered with a memoized value or failure.
//! - `caches.suspended`: Reads answered with a suspension.
//! - `caches.computation`: Loader invocations.
//! - `caches.computation.failed` and `caches.computation.panicked`: Failed loads.
//! - `caches.entries`: A gauge of the number of entries.

#[macro_use]
pub mod metrics;

mod cache;
mod error;
mod finite;
mod key;

pub use cache::{Outcome, Read, SuspendingCache, Suspension};
pub use error::{CacheError, InvalidKeyDerivation};
pub use key::{CacheKey, CacheKeyBuilder};
