//! Memoization through the SQLite cache store.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use memoria_core::memo::{BoundArguments, CallArgs, Signature};
use memoria_infra::sqlite::open_memo_cache;
use memoria_types::config::MemoriaConfig;
use memoria_types::error::MemoizeError;
use serde_json::{Value, json};
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> MemoriaConfig {
    MemoriaConfig::default().rooted_at(dir.path())
}

fn times_42_signature() -> Signature {
    Signature::builder().required("x").build().unwrap()
}

type BoxedAnswer = Pin<Box<dyn Future<Output = Result<i64, String>> + Send>>;

/// Operation `x -> x * 42` that counts its real invocations.
fn counted_times_42(calls: Arc<AtomicUsize>) -> impl Fn(BoundArguments) -> BoxedAnswer + Send + Sync {
    move |args: BoundArguments| -> BoxedAnswer {
        let calls = calls.clone();
        Box::pin(async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let x: i64 = args.get_as("x").map_err(|e| e.to_string())?;
            Ok(x * 42)
        })
    }
}

#[tokio::test]
async fn repeated_call_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "answers").await.unwrap();
    let memo = cache.wrap(times_42_signature(), counted_times_42(calls.clone()));

    let first: i64 = memo.call(CallArgs::new().named("x", 1)).await.unwrap();
    assert_eq!(first, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second: i64 = memo.call(CallArgs::new().arg(1)).await.unwrap();
    assert_eq!(second, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let other: i64 = memo.call(CallArgs::new().named("x", 2)).await.unwrap();
    assert_eq!(other, 84);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = memo.cache().stats();
    assert_eq!((stats.hits, stats.misses, stats.bypasses), (1, 2, 0));
}

#[tokio::test]
async fn stored_record_holds_canonical_input_and_envelope() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "answers").await.unwrap();
    let memo = cache.wrap(times_42_signature(), counted_times_42(calls));

    let _: i64 = memo.call(CallArgs::new().arg(3)).await.unwrap();

    let records = memo.cache().store().records().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.hash.len(), 64);
    assert_eq!(record.input, "{\n  \"x\": 3\n}");
    let output: Value = serde_json::from_str(&record.output).unwrap();
    assert_eq!(output, json!({"output": 126}));
}

#[tokio::test]
async fn results_survive_reopening() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let calls = Arc::new(AtomicUsize::new(0));

    {
        let cache = open_memo_cache(&config, "answers").await.unwrap();
        let memo = cache.wrap(times_42_signature(), counted_times_42(calls.clone()));
        let _: i64 = memo.call(CallArgs::new().arg(5)).await.unwrap();
    }

    let cache = open_memo_cache(&config, "answers").await.unwrap();
    let memo = cache.wrap(times_42_signature(), counted_times_42(calls.clone()));
    let value: i64 = memo.call(CallArgs::new().named("x", 5)).await.unwrap();
    assert_eq!(value, 210);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bypass_never_touches_store() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "answers").await.unwrap();
    let memo = cache.wrap(times_42_signature(), counted_times_42(calls.clone()));

    for _ in 0..3 {
        let value: i64 = memo
            .call(CallArgs::new().arg(1).use_cache(false))
            .await
            .unwrap();
        assert_eq!(value, 42);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(memo.cache().store().relational().count().await.unwrap(), 0);
    assert_eq!(memo.cache().stats().bypasses, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_calls_store_one_row() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "answers").await.unwrap();
    let memo = Arc::new(cache.wrap(times_42_signature(), counted_times_42(calls.clone())));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let memo = memo.clone();
        handles.push(tokio::spawn(async move {
            memo.call(CallArgs::new().named("x", 7)).await
        }));
    }
    for handle in handles {
        let value: i64 = handle.await.unwrap().unwrap();
        assert_eq!(value, 294);
    }

    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert_eq!(memo.cache().store().relational().count().await.unwrap(), 1);
}

#[tokio::test]
async fn clear_allows_fingerprint_to_be_stored_again() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "answers").await.unwrap();
    let memo = cache.wrap(times_42_signature(), counted_times_42(calls.clone()));

    let _: i64 = memo.call(CallArgs::new().arg(1)).await.unwrap();
    memo.cache().clear().await.unwrap();
    assert!(memo.cache().store().records().await.unwrap().is_empty());

    let _: i64 = memo.call(CallArgs::new().arg(1)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(memo.cache().store().records().await.unwrap().len(), 1);
}

#[tokio::test]
async fn failures_propagate_and_are_not_cached() {
    let dir = TempDir::new().unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "flaky").await.unwrap();
    let counter = attempts.clone();
    let memo = cache.wrap(
        Signature::builder().required("prompt").build().unwrap(),
        move |_args: BoundArguments| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<String, String>("rate limited".to_string())
            }
        },
    );

    for _ in 0..2 {
        let err = memo.call(CallArgs::new().arg("hi")).await.unwrap_err();
        assert!(matches!(err, MemoizeError::Operation(ref msg) if msg == "rate limited"));
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(memo.cache().store().relational().count().await.unwrap(), 0);
}

#[tokio::test]
async fn error_status_values_are_cached() {
    let dir = TempDir::new().unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "chat").await.unwrap();
    let counter = attempts.clone();
    let memo = cache.wrap(
        Signature::builder().required("prompt").build().unwrap(),
        move |_args: BoundArguments| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Value, String>(json!({"status": "error", "detail": "content filtered"}))
            }
        },
    );

    let first: Value = memo.call(CallArgs::new().arg("hi")).await.unwrap();
    let second: Value = memo.call(CallArgs::new().arg("hi")).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first["status"], "error");
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bind_errors_surface_before_any_store_access() {
    let dir = TempDir::new().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "answers").await.unwrap();
    let memo = cache.wrap(times_42_signature(), counted_times_42(calls.clone()));

    let err = memo
        .call::<i64, String, _>(CallArgs::new().named("y", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, MemoizeError::Bind(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_finite_embedding_is_returned_but_never_stored() {
    let dir = TempDir::new().unwrap();
    let attempts = Arc::new(AtomicUsize::new(0));
    let cache = open_memo_cache(&test_config(&dir), "emb_cache").await.unwrap();
    let counter = attempts.clone();
    let memo = cache.wrap(
        Signature::builder().required("text").build().unwrap(),
        move |_args: BoundArguments| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<Vec<f32>, String>(vec![f32::NAN, 1.0])
            }
        },
    );

    for _ in 0..2 {
        let vector: Vec<f32> = memo.call(CallArgs::new().arg("hi")).await.unwrap();
        assert!(vector[0].is_nan());
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(memo.cache().store().relational().count().await.unwrap(), 0);
}
