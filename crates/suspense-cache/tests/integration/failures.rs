use suspense_cache::{CacheError, Read};
use tokio::runtime::Handle;
use tokio::task::LocalSet;

use crate::utils::*;

#[tokio::test]
async fn test_failure_is_permanent() {
    setup();
    let cache = TestCache::new("fonts", Handle::current());
    let loader = CountingLoader::default();
    let key = font_key("fontB");

    let local = LocalSet::new();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            local.spawn_local(render_component(
                cache.clone(),
                loader.clone(),
                key.clone(),
                Err("network-error"),
            ))
        })
        .collect();
    local.await;

    for handle in handles {
        let rendering = handle.await.unwrap();
        assert_eq!(rendering.outcome, Err("network-error".to_owned()));
    }

    // later reads fail right away, even with a loader that would succeed
    let later = render_component(cache.clone(), loader.clone(), key.clone(), Ok("ok")).await;
    assert_eq!(later.outcome, Err("network-error".to_owned()));
    assert_eq!(later.suspensions, 0);
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_failure_is_shared() {
    setup();
    let cache = TestCache::new("fonts", Handle::current());
    let loader = CountingLoader::default();
    let key = font_key("fontB");

    let outcome = cache
        .get(key.clone(), || loader.load(Err("network-error")))
        .await;
    let first = match outcome {
        Err(CacheError::LoadFailure(err)) => err,
        other => panic!("expected a load failure, got {other:?}"),
    };

    let Read::Failed(CacheError::LoadFailure(second)) =
        cache.read(key, || loader.load(Ok("ok")))
    else {
        panic!("expected a memoized failure");
    };
    assert!(std::sync::Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn test_failure_does_not_affect_other_keys() {
    setup();
    let cache = TestCache::new("fonts", Handle::current());
    let loader = CountingLoader::default();

    let failed = render_component(
        cache.clone(),
        loader.clone(),
        font_key("fontB"),
        Err("network-error"),
    )
    .await;
    let loaded = render_component(cache.clone(), loader.clone(), font_key("fontA"), Ok("ok")).await;

    assert!(failed.outcome.is_err());
    assert_eq!(loaded.outcome, Ok("ok".to_owned()));
    assert_eq!(loader.calls(), 2);
}
