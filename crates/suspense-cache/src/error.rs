use std::sync::Arc;

use thiserror::Error;

/// The load parameters of a [`read`](crate::SuspendingCache::read_with) could not be turned into
/// a stable [`CacheKey`](crate::CacheKey).
///
/// This is a programmer error. It is returned at the call site and never stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cache key could not be derived: {reason}")]
pub struct InvalidKeyDerivation {
    reason: String,
}

impl InvalidKeyDerivation {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Describes why the parameters were rejected.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl serde::ser::Error for InvalidKeyDerivation {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        Self::new(msg.to_string())
    }
}

impl From<serde_json::Error> for InvalidKeyDerivation {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// The reason a cached resource is not available.
///
/// Failures of a load are memoized: every caller of the affected key, present and future, observes
/// a clone of the same error.
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The loader itself failed.
    ///
    /// The original error is kept verbatim and shared between all callers.
    #[error("resource failed to load: {0}")]
    LoadFailure(Arc<E>),
    /// The future returned by the loader panicked.
    #[error("resource loader panicked: {0}")]
    LoadPanicked(Arc<str>),
    /// The key for the resource could not be derived.
    #[error(transparent)]
    InvalidKeyDerivation(#[from] InvalidKeyDerivation),
}

impl<E> CacheError<E> {
    /// Returns the original loader error, if this is a [`LoadFailure`](Self::LoadFailure).
    pub fn load_failure(&self) -> Option<&E> {
        match self {
            Self::LoadFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl<E> Clone for CacheError<E> {
    fn clone(&self) -> Self {
        match self {
            Self::LoadFailure(err) => Self::LoadFailure(Arc::clone(err)),
            Self::LoadPanicked(message) => Self::LoadPanicked(Arc::clone(message)),
            Self::InvalidKeyDerivation(err) => Self::InvalidKeyDerivation(err.clone()),
        }
    }
}

impl<E: PartialEq> PartialEq for CacheError<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::LoadFailure(a), Self::LoadFailure(b)) => a == b,
            (Self::LoadPanicked(a), Self::LoadPanicked(b)) => a == b,
            (Self::InvalidKeyDerivation(a), Self::InvalidKeyDerivation(b)) => a == b,
            _ => false,
        }
    }
}
