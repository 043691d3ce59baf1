use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use suspense_cache::{CacheKey, Read, SuspendingCache};

pub use suspense_test::setup;

pub type TestCache = SuspendingCache<String, String>;

/// A loader that counts its invocations and settles after a short delay.
#[derive(Debug, Clone, Default)]
pub struct CountingLoader {
    calls: Arc<AtomicUsize>,
}

impl CountingLoader {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Starts a load that resolves to `outcome`.
    pub fn load(&self, outcome: Result<&str, &str>) -> BoxFuture<'static, Result<String, String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = outcome.map(str::to_owned).map_err(str::to_owned);
        async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            outcome
        }
        .boxed()
    }
}

/// The font parameters the scenarios load.
pub fn font_key(family: &str) -> CacheKey {
    let src = format!("fonts/{family}.ttf");
    CacheKey::from_params(&serde_json::json!({ "family": family, "src": src })).unwrap()
}

/// How a component fared while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendering {
    pub outcome: Result<String, String>,
    pub suspensions: usize,
}

/// Renders a component that needs `key`, re-rendering after every suspension.
pub async fn render_component(
    cache: TestCache,
    loader: CountingLoader,
    key: CacheKey,
    outcome: Result<&'static str, &'static str>,
) -> Rendering {
    let mut suspensions = 0;
    loop {
        match cache.read(key.clone(), || loader.load(outcome)) {
            Read::Ready(value) => {
                return Rendering {
                    outcome: Ok(value),
                    suspensions,
                };
            }
            Read::Failed(err) => {
                let err = err.load_failure().cloned().unwrap_or_else(|| err.to_string());
                return Rendering {
                    outcome: Err(err),
                    suspensions,
                };
            }
            Read::Pending(suspension) => {
                suspensions += 1;
                let _ = suspension.await;
            }
        }
    }
}
