//! Tests for [`LoadEngine::load`] — the synchronous probe over
//! asynchronous work: dedup, failure acknowledgment, retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use muninn::{LoadEngine, LoadOptions, Muninn};
use serde_json::json;

fn engine_in(dir: &tempfile::TempDir) -> LoadEngine {
    Muninn::builder()
        .cache_name("load-test-cache")
        .cache_dir(dir.path())
        .max_passes(8)
        .build()
        .unwrap()
}

// =========================================================================
// The suspend-via-None protocol
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn first_pass_none_then_resolved_value() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);

    let first_pass = Arc::new(AtomicUsize::new(usize::MAX));
    let observed = Arc::clone(&first_pass);

    let flushed = engine
        .flush(|| {
            let value = engine.load(
                || async { Ok(json!("A")) },
                LoadOptions::new("/page"),
            );
            // remember what the very first pass saw
            observed.compare_exchange(
                usize::MAX,
                value.is_some() as usize,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .ok();
            value
        })
        .await
        .unwrap();

    assert_eq!(first_pass.load(Ordering::SeqCst), 0, "first pass must see None");
    assert_eq!(flushed.content, Some(json!("A")), "final pass sees the value");
    assert_eq!(flushed.data["/page"], json!("A"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_requests_invoke_loader_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let calls = Arc::new(AtomicUsize::new(0));

    let flushed = engine
        .flush(|| {
            // two identical requests within one render pass, the second
            // issued before the first's loader has settled
            let calls_a = Arc::clone(&calls);
            let a = engine.load(
                move || async move {
                    calls_a.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(json!("first"))
                },
                LoadOptions::new("/page"),
            );
            let calls_b = Arc::clone(&calls);
            let b = engine.load(
                move || async move {
                    calls_b.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("second"))
                },
                LoadOptions::new("/page"),
            );
            (a, b)
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1, "only one loader may run");
    assert_eq!(flushed.data["/page"], json!("first"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn distinct_keys_load_concurrently() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);

    let flushed = engine
        .flush(|| {
            for key in ["/a", "/b", "/c"] {
                engine.load(
                    move || async move {
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        Ok(json!(key))
                    },
                    LoadOptions::new(key),
                );
            }
        })
        .await
        .unwrap();

    assert_eq!(flushed.data.len(), 3);
    assert_eq!(flushed.data["/a"], json!("/a"));
    assert_eq!(flushed.data["/c"], json!("/c"));
}

// =========================================================================
// Failure acknowledgment and retry
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_loader_is_retried_after_acknowledgment() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let attempts = Arc::new(AtomicUsize::new(0));

    let flushed = engine
        .flush(|| {
            let attempts = Arc::clone(&attempts);
            engine.load(
                move || async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("upstream unavailable".into())
                    } else {
                        Ok(json!("recovered"))
                    }
                },
                LoadOptions::new("/flaky"),
            )
        })
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2, "one failure, one retry");
    assert_eq!(flushed.data["/flaky"], json!("recovered"));
    assert_eq!(flushed.content, Some(json!("recovered")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn panicking_loader_is_contained_and_retried() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    let attempts = Arc::new(AtomicUsize::new(0));

    let flushed = engine
        .flush(|| {
            let attempts = Arc::clone(&attempts);
            engine.load(
                move || async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        panic!("loader blew up");
                    }
                    Ok(json!("second try"))
                },
                LoadOptions::new("/fragile"),
            )
        })
        .await
        .unwrap();

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(flushed.data["/fragile"], json!("second try"));
}

// =========================================================================
// Priming and durations
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn primed_key_never_invokes_its_loader() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_in(&dir);
    engine.prime("/seeded", json!("from prime"), None).unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let flushed = engine
        .flush(|| {
            let calls = Arc::clone(&calls);
            engine.load(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("from loader"))
                },
                LoadOptions::new("/seeded"),
            )
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(flushed.content, Some(json!("from prime")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn load_with_duration_persists_across_engines() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = engine_in(&dir);
        engine
            .flush(|| {
                engine.load(
                    || async { Ok(json!("durable")) },
                    LoadOptions::new("/cached").duration(Duration::from_secs(60)),
                )
            })
            .await
            .unwrap();
    }

    // a new engine over the same backing file starts warm
    let engine = engine_in(&dir);
    let calls = Arc::new(AtomicUsize::new(0));
    let flushed = engine
        .flush(|| {
            let calls = Arc::clone(&calls);
            engine.load(
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("refetched"))
                },
                LoadOptions::new("/cached"),
            )
        })
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(flushed.content, Some(json!("durable")));
}
