use futures::future;
use suspense_cache::Read;
use tokio::runtime::Handle;
use tokio::task::LocalSet;

use crate::utils::*;

#[tokio::test]
async fn test_components_share_one_load() {
    setup();
    let cache = TestCache::new("fonts", Handle::current());
    let loader = CountingLoader::default();
    let key = font_key("fontA");

    let local = LocalSet::new();
    let handles: Vec<_> = (0..5)
        .map(|_| {
            local.spawn_local(render_component(
                cache.clone(),
                loader.clone(),
                key.clone(),
                Ok("ok"),
            ))
        })
        .collect();
    local.await;

    for handle in handles {
        let rendering = handle.await.unwrap();
        assert_eq!(rendering.outcome, Ok("ok".to_owned()));
        assert_eq!(rendering.suspensions, 1);
    }
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_memoized_read_does_not_suspend() {
    setup();
    let cache = TestCache::new("fonts", Handle::current());
    let loader = CountingLoader::default();
    let key = font_key("fontA");

    let first = render_component(cache.clone(), loader.clone(), key.clone(), Ok("ok")).await;
    assert_eq!(first.suspensions, 1);

    let second = render_component(cache.clone(), loader.clone(), key, Ok("other")).await;
    assert_eq!(second.outcome, Ok("ok".to_owned()));
    assert_eq!(second.suspensions, 0);
    assert_eq!(loader.calls(), 1);
}

#[tokio::test]
async fn test_pending_reads_are_idempotent() {
    setup();
    let cache = TestCache::new("fonts", Handle::current());
    let loader = CountingLoader::default();
    let key = font_key("fontA");

    let suspensions: Vec<_> = (0..10)
        .map(|_| match cache.read(key.clone(), || loader.load(Ok("ok"))) {
            Read::Pending(suspension) => suspension,
            other => panic!("expected pending, got {other:?}"),
        })
        .collect();
    assert_eq!(cache.len(), 1);
    assert_eq!(loader.calls(), 1);

    // any one of the waiters drives the load for everyone
    let (outcome, _, rest) = future::select_all(suspensions).await;
    assert_eq!(outcome, Ok("ok".to_owned()));
    assert!(matches!(cache.peek(&key), Some(Read::Ready(ref v)) if v == "ok"));
    for suspension in rest {
        assert_eq!(suspension.await, Ok("ok".to_owned()));
    }
}

#[tokio::test]
async fn test_distinct_fonts_load_concurrently() {
    setup();
    let cache = TestCache::new("fonts", Handle::current());
    let loader = CountingLoader::default();

    let renderings = future::join_all(["fontA", "fontB", "fontC"].map(|family| {
        render_component(cache.clone(), loader.clone(), font_key(family), Ok("ok"))
    }))
    .await;

    assert!(renderings.iter().all(|r| r.outcome.is_ok()));
    assert_eq!(loader.calls(), 3);
    assert_eq!(cache.len(), 3);
}
